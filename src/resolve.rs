//! Target-architecture resolution.
//!
//! Three mutually exclusive sources are tried in priority order: an explicit
//! override list, live device enumeration, and a static fallback covering
//! every supported architecture (so wheels can be cross-built on a machine
//! with no GPU attached). Each source is a [`CapabilityStrategy`]; the
//! resolver commits to the first one that applies and never consults the
//! rest, then enforces that the committed set is non-empty.

use tracing::{info, warn};

use crate::capability::{all_supported, Capability, CapabilitySet};
use crate::device::DeviceQuery;
use crate::error::{Error, Result};

/// Devices below this major tier are skipped during enumeration.
pub const MIN_SUPPORTED_MAJOR: u32 = 8;

/// One source of target architectures. `resolve` returns `None` when the
/// strategy does not apply to this invocation (no override supplied, no
/// devices attached), and `Some` once it has claimed the resolution. The
/// claimed set may still be empty if every candidate entry was rejected.
pub trait CapabilityStrategy {
    fn name(&self) -> &'static str;
    fn resolve(&self) -> Option<CapabilitySet>;

    /// Diagnostic detail for the fatal case where this strategy claimed the
    /// resolution but produced an empty set.
    fn empty_detail(&self) -> String;
}

/// Strategy 1: a user-supplied override list (`;`- or whitespace-separated
/// tokens, each optionally suffixed with `+PTX`). Unknown entries are
/// dropped with a warning; resolution continues with the valid remainder.
pub struct ExplicitOverride<'a> {
    pub raw: Option<&'a str>,
}

impl CapabilityStrategy for ExplicitOverride<'_> {
    fn name(&self) -> &'static str {
        "explicit override"
    }

    fn resolve(&self) -> Option<CapabilitySet> {
        let raw = self.raw?.trim();
        if raw.is_empty() {
            return None;
        }
        let set = raw
            .replace(';', " ")
            .split_whitespace()
            .filter_map(Capability::parse)
            .collect();
        Some(set)
    }

    fn empty_detail(&self) -> String {
        format!("every entry in \"{}\" was rejected", self.raw.unwrap_or("").trim())
    }
}

/// Strategy 2: enumerate attached devices and target each one's native
/// capability. Hardware below [`MIN_SUPPORTED_MAJOR`] is skipped with a
/// warning.
pub struct DeviceDetection<'a> {
    pub devices: &'a dyn DeviceQuery,
}

impl CapabilityStrategy for DeviceDetection<'_> {
    fn name(&self) -> &'static str {
        "device detection"
    }

    fn resolve(&self) -> Option<CapabilitySet> {
        let count = self.devices.device_count();
        if count == 0 {
            return None;
        }
        let mut set = CapabilitySet::new();
        for index in 0..count {
            let (major, minor) = self.devices.device_capability(index);
            if major < MIN_SUPPORTED_MAJOR {
                warn!(index, "skipping device with compute capability {}.{}", major, minor);
                continue;
            }
            set.insert(Capability::from_device(major, minor));
        }
        Some(set)
    }

    fn empty_detail(&self) -> String {
        format!(
            "none of the {} attached devices reaches compute capability {}.0",
            self.devices.device_count(),
            MIN_SUPPORTED_MAJOR
        )
    }
}

/// Strategy 3: the full supported set, taken when nothing else applies.
pub struct StaticFallback;

impl CapabilityStrategy for StaticFallback {
    fn name(&self) -> &'static str {
        "static fallback"
    }

    fn resolve(&self) -> Option<CapabilitySet> {
        Some(all_supported())
    }

    fn empty_detail(&self) -> String {
        "the supported architecture set is empty".to_string()
    }
}

/// Resolve the target capability set for this invocation.
///
/// Emits one `info!` line naming the strategy that fired and the resulting
/// set; build reproducibility audits key off that line.
pub fn resolve_capabilities(
    override_list: Option<&str>,
    devices: &dyn DeviceQuery,
) -> Result<CapabilitySet> {
    let chain: [&dyn CapabilityStrategy; 3] = [
        &ExplicitOverride { raw: override_list },
        &DeviceDetection { devices },
        &StaticFallback,
    ];

    for strategy in chain {
        let Some(set) = strategy.resolve() else {
            continue;
        };
        if set.is_empty() {
            return Err(Error::NoCapabilitiesResolved {
                strategy: strategy.name(),
                detail: strategy.empty_detail(),
            });
        }
        let rendered: Vec<String> = set.iter().map(|c| c.to_string()).collect();
        info!(
            strategy = strategy.name(),
            targets = %rendered.join(";"),
            "resolved target architectures"
        );
        return Ok(set);
    }

    unreachable!("static fallback always resolves");
}
