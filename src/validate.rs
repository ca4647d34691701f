//! Toolkit-version gating for the resolved architecture set.
//!
//! Minimum-version requirements are a static rule table, not control flow:
//! a global floor that applies to any build, plus per-tier floors that fire
//! only when a capability with that prefix is targeted. Adding a new
//! architecture tier is a table edit.

use crate::capability::CapabilitySet;
use crate::error::{Error, Result};
use crate::toolkit::ToolkitVersion;

/// What a rule applies to.
#[derive(Debug, Clone, Copy)]
enum RuleScope {
    /// Any capability present at all.
    Global,
    /// Capabilities whose base tier starts with this prefix.
    TierPrefix(&'static str),
}

struct VersionRule {
    scope: RuleScope,
    min: ToolkitVersion,
}

/// Evaluated in order; the global floor comes first so very old toolkits
/// fail fast regardless of target.
const VERSION_RULES: &[VersionRule] = &[
    VersionRule { scope: RuleScope::Global, min: ToolkitVersion::new(12, 0, 0) },
    VersionRule { scope: RuleScope::TierPrefix("8.9"), min: ToolkitVersion::new(12, 4, 0) },
    VersionRule { scope: RuleScope::TierPrefix("9.0"), min: ToolkitVersion::new(12, 3, 0) },
    VersionRule { scope: RuleScope::TierPrefix("12.0"), min: ToolkitVersion::new(12, 8, 0) },
];

/// Check the toolkit version against every applicable rule for the resolved
/// set. The first violation aborts the build; there is no degraded mode.
pub fn validate(version: ToolkitVersion, capabilities: &CapabilitySet) -> Result<()> {
    for rule in VERSION_RULES {
        if version >= rule.min {
            continue;
        }
        let offending = match rule.scope {
            RuleScope::Global => capabilities.iter().next(),
            RuleScope::TierPrefix(prefix) => {
                capabilities.iter().find(|c| c.tier_starts_with(prefix))
            }
        };
        if let Some(capability) = offending {
            return Err(Error::UnsupportedToolkitVersion {
                capability: capability.to_string(),
                required: rule.min,
                actual: version,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{all_supported, Capability};

    fn set(tokens: &[&str]) -> CapabilitySet {
        tokens.iter().map(|t| Capability::parse(t).unwrap()).collect()
    }

    #[test]
    fn test_global_minimum() {
        let err = validate(ToolkitVersion::new(11, 8, 0), &set(&["8.0"])).unwrap_err();
        assert!(matches!(err, Error::UnsupportedToolkitVersion { .. }));
    }

    #[test]
    fn test_global_minimum_applies_to_any_set() {
        // 11.x fails even when no tier-specific rule would fire.
        assert!(validate(ToolkitVersion::new(11, 8, 0), &set(&["8.6"])).is_err());
        assert!(validate(ToolkitVersion::new(12, 0, 0), &set(&["8.6"])).is_ok());
    }

    #[test]
    fn test_sm89_needs_12_4() {
        let caps = set(&["8.9"]);
        assert!(validate(ToolkitVersion::new(12, 3, 0), &caps).is_err());
        assert!(validate(ToolkitVersion::new(12, 4, 0), &caps).is_ok());
    }

    #[test]
    fn test_sm90_needs_12_3() {
        let caps = set(&["9.0"]);
        let err = validate(ToolkitVersion::new(12, 2, 0), &caps).unwrap_err();
        match err {
            Error::UnsupportedToolkitVersion { capability, required, actual } => {
                assert_eq!(capability, "9.0");
                assert_eq!(required, ToolkitVersion::new(12, 3, 0));
                assert_eq!(actual, ToolkitVersion::new(12, 2, 0));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(validate(ToolkitVersion::new(12, 3, 0), &caps).is_ok());
    }

    #[test]
    fn test_sm120_needs_12_8() {
        let caps = set(&["12.0"]);
        assert!(validate(ToolkitVersion::new(12, 7, 0), &caps).is_err());
        assert!(validate(ToolkitVersion::new(12, 8, 0), &caps).is_ok());
    }

    #[test]
    fn test_tier_rule_skipped_when_absent() {
        // 12.0 toolkit is fine for 8.0/8.6 even though 8.9 would need 12.4.
        assert!(validate(ToolkitVersion::new(12, 0, 0), &set(&["8.0", "8.6"])).is_ok());
    }

    #[test]
    fn test_ptx_marker_does_not_dodge_gating() {
        let caps = set(&["9.0+PTX"]);
        assert!(validate(ToolkitVersion::new(12, 2, 0), &caps).is_err());
    }

    #[test]
    fn test_full_set_needs_12_8() {
        let caps = all_supported();
        assert!(validate(ToolkitVersion::new(12, 4, 0), &caps).is_err());
        assert!(validate(ToolkitVersion::new(12, 8, 0), &caps).is_ok());
    }
}
