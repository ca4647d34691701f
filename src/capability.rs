//! Compute-capability tokens and the closed set of supported architectures.
//!
//! A [`Capability`] is a validated `"major.minor"` architecture tier,
//! optionally carrying a `+PTX` forward-compatibility marker. Membership is
//! checked against [`SUPPORTED_ARCHS`]; everything outside that set is
//! rejected at parse sites with a warning rather than an error, so a mixed
//! override list degrades to its valid entries.

use std::collections::BTreeSet;
use std::fmt;

use lazy_static::lazy_static;
use tracing::warn;

/// Marker suffix requesting an additional PTX forward-compatibility code
/// path for a capability.
pub const PTX_SUFFIX: &str = "+PTX";

lazy_static! {
    /// Supported NVIDIA GPU architecture tiers.
    pub static ref SUPPORTED_ARCHS: BTreeSet<&'static str> =
        ["8.0", "8.6", "8.9", "9.0", "12.0"].into_iter().collect();
}

/// A validated compute-capability token.
///
/// Ordering is derived over `(tier, ptx)` so a `BTreeSet<Capability>`
/// iterates deterministically regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capability {
    tier: String,
    ptx: bool,
}

impl Capability {
    /// Parse a raw override token, validating the base tier against
    /// [`SUPPORTED_ARCHS`]. Returns `None` (after a warning) for unknown
    /// tiers; the caller continues with its remaining entries.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let (tier, ptx) = match token.strip_suffix(PTX_SUFFIX) {
            Some(base) => (base, true),
            None => (token, false),
        };
        if !SUPPORTED_ARCHS.contains(tier) {
            warn!(token, "unsupported architecture in override list, skipping");
            return None;
        }
        Some(Self { tier: tier.to_string(), ptx })
    }

    /// Build a capability from a device-reported `(major, minor)` pair.
    /// Device-detected capabilities never carry the PTX marker.
    pub fn from_device(major: u32, minor: u32) -> Self {
        Self { tier: format!("{}.{}", major, minor), ptx: false }
    }

    /// The base `"major.minor"` tier, without any marker.
    pub fn tier(&self) -> &str {
        &self.tier
    }

    /// Whether this capability requests the forward-PTX code path.
    pub fn wants_ptx(&self) -> bool {
        self.ptx
    }

    /// Prefix test over the base tier, used by version gating and arch-code
    /// selection.
    pub fn tier_starts_with(&self, prefix: &str) -> bool {
        self.tier.starts_with(prefix)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ptx {
            write!(f, "{}{}", self.tier, PTX_SUFFIX)
        } else {
            write!(f, "{}", self.tier)
        }
    }
}

/// The resolved target set. `BTreeSet` keeps iteration sorted by rendered
/// token, which makes downstream flag emission reproducible for a fixed set.
pub type CapabilitySet = BTreeSet<Capability>;

/// The full supported set as a [`CapabilitySet`], used as the static
/// fallback when no override is given and no device is attached.
pub fn all_supported() -> CapabilitySet {
    SUPPORTED_ARCHS
        .iter()
        .map(|tier| Capability { tier: (*tier).to_string(), ptx: false })
        .collect()
}
