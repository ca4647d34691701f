//! Compiler-flag composition for the resolved architecture set.
//!
//! Each capability maps to an architecture code through a closed table and
//! contributes a `-gencode` pair to the shared device-compiler flag list
//! (plus a second, `code=compute_` pair when the capability carries the
//! forward-PTX marker). Capabilities are visited in sorted order so a fixed
//! set always composes the same flags.

use tracing::warn;

use crate::capability::CapabilitySet;
use crate::config::BuildSettings;

/// Host-compiler base flags.
pub const CXX_BASE_FLAGS: &[&str] =
    &["-g", "-O3", "-fopenmp", "-lgomp", "-std=c++17", "-DENABLE_BF16"];

/// Device-compiler base flags.
pub const NVCC_BASE_FLAGS: &[&str] = &[
    "-O3",
    "-std=c++17",
    "-U__CUDA_NO_HALF_OPERATORS__",
    "-U__CUDA_NO_HALF_CONVERSIONS__",
    "--use_fast_math",
    "--threads=8",
    "-Xptxas=-v",
    "-diag-suppress=174",
];

/// Architecture tiers that gate kernel-module inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Sm80,
    Sm86,
    Sm89,
    Sm90,
    Sm120,
}

/// Which tiers the resolved set touched, consumed by the module-set
/// builder's inclusion predicates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TierPresence {
    pub sm80: bool,
    pub sm86: bool,
    pub sm89: bool,
    pub sm90: bool,
    pub sm120: bool,
}

impl TierPresence {
    pub fn has(&self, tier: Tier) -> bool {
        match tier {
            Tier::Sm80 => self.sm80,
            Tier::Sm86 => self.sm86,
            Tier::Sm89 => self.sm89,
            Tier::Sm90 => self.sm90,
            Tier::Sm120 => self.sm120,
        }
    }

    pub fn any_of(&self, tiers: &[Tier]) -> bool {
        tiers.iter().any(|tier| self.has(*tier))
    }

    fn mark(&mut self, tier: Tier) {
        match tier {
            Tier::Sm80 => self.sm80 = true,
            Tier::Sm86 => self.sm86 = true,
            Tier::Sm89 => self.sm89 = true,
            Tier::Sm90 => self.sm90 = true,
            Tier::Sm120 => self.sm120 = true,
        }
    }
}

// 9.0 must map to compute_90a (not 90) so the kernels can use wgmma ptx
// instructions.
const ARCH_CODES: &[(&str, &str, Tier)] = &[
    ("8.0", "80", Tier::Sm80),
    ("8.6", "86", Tier::Sm86),
    ("8.9", "89", Tier::Sm89),
    ("9.0", "90a", Tier::Sm90),
    ("12.0", "120", Tier::Sm120),
];

/// The composed per-stage flag lists plus tier presence, shared by every
/// module in the final plan.
#[derive(Debug, Clone)]
pub struct ComposedFlags {
    pub cxx: Vec<String>,
    pub nvcc: Vec<String>,
    pub tiers: TierPresence,
}

/// Compose host- and device-compiler flags for the resolved set.
pub fn compose(capabilities: &CapabilitySet, settings: &BuildSettings) -> ComposedFlags {
    let abi_define = format!("-D_GLIBCXX_USE_CXX11_ABI={}", i32::from(settings.cxx11_abi));

    let mut cxx: Vec<String> = CXX_BASE_FLAGS.iter().map(|f| (*f).to_string()).collect();
    cxx.push(abi_define.clone());
    cxx.extend(settings.extra_cxx_flags.iter().cloned());

    let mut nvcc: Vec<String> = NVCC_BASE_FLAGS.iter().map(|f| (*f).to_string()).collect();
    nvcc.push(abi_define);
    nvcc.extend(settings.extra_nvcc_flags.iter().cloned());

    let mut tiers = TierPresence::default();
    for capability in capabilities {
        let Some((_, code, tier)) = ARCH_CODES
            .iter()
            .find(|(prefix, _, _)| capability.tier_starts_with(prefix))
        else {
            // Device-reported tiers can fall outside the closed set (e.g. 8.7).
            warn!(%capability, "no architecture code for capability, skipping");
            continue;
        };
        tiers.mark(*tier);
        nvcc.push("-gencode".to_string());
        nvcc.push(format!("arch=compute_{},code=sm_{}", code, code));
        if capability.wants_ptx() {
            nvcc.push("-gencode".to_string());
            nvcc.push(format!("arch=compute_{},code=compute_{}", code, code));
        }
    }

    ComposedFlags { cxx, nvcc, tiers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;

    fn set(tokens: &[&str]) -> CapabilitySet {
        tokens.iter().map(|t| Capability::parse(t).unwrap()).collect()
    }

    fn settings() -> BuildSettings {
        BuildSettings::default()
    }

    #[test]
    fn test_base_flags_and_abi_define() {
        let flags = compose(&set(&["8.0"]), &settings());
        assert!(flags.cxx.iter().any(|f| f == "-DENABLE_BF16"));
        assert!(flags.cxx.iter().any(|f| f == "-D_GLIBCXX_USE_CXX11_ABI=1"));
        assert!(flags.nvcc.iter().any(|f| f == "--use_fast_math"));
        assert!(flags.nvcc.iter().any(|f| f == "-D_GLIBCXX_USE_CXX11_ABI=1"));
    }

    #[test]
    fn test_abi_define_off() {
        let flags = compose(&set(&["8.0"]), &BuildSettings { cxx11_abi: false, ..settings() });
        assert!(flags.cxx.iter().any(|f| f == "-D_GLIBCXX_USE_CXX11_ABI=0"));
    }

    #[test]
    fn test_arch_codes() {
        let flags = compose(&set(&["8.0", "8.6", "8.9"]), &settings());
        assert!(flags.nvcc.iter().any(|f| f == "arch=compute_80,code=sm_80"));
        assert!(flags.nvcc.iter().any(|f| f == "arch=compute_86,code=sm_86"));
        assert!(flags.nvcc.iter().any(|f| f == "arch=compute_89,code=sm_89"));
    }

    #[test]
    fn test_sm90_uses_a_variant() {
        let flags = compose(&set(&["9.0"]), &settings());
        assert!(flags.nvcc.iter().any(|f| f == "arch=compute_90a,code=sm_90a"));
        assert!(flags.tiers.sm90);
    }

    #[test]
    fn test_sm120_code() {
        let flags = compose(&set(&["12.0"]), &settings());
        assert!(flags.nvcc.iter().any(|f| f == "arch=compute_120,code=sm_120"));
        assert!(flags.tiers.sm120);
    }

    #[test]
    fn test_ptx_marker_adds_compute_pair() {
        let flags = compose(&set(&["9.0+PTX"]), &settings());
        assert!(flags.nvcc.iter().any(|f| f == "arch=compute_90a,code=sm_90a"));
        assert!(flags.nvcc.iter().any(|f| f == "arch=compute_90a,code=compute_90a"));
    }

    #[test]
    fn test_no_ptx_pair_without_marker() {
        let flags = compose(&set(&["9.0"]), &settings());
        assert!(!flags.nvcc.iter().any(|f| f == "arch=compute_90a,code=compute_90a"));
    }

    #[test]
    fn test_emission_is_deterministic() {
        let a = compose(&set(&["9.0", "8.0", "12.0"]), &settings());
        let b = compose(&set(&["12.0", "9.0", "8.0"]), &settings());
        assert_eq!(a.nvcc, b.nvcc);
        assert_eq!(a.tiers, b.tiers);
    }

    #[test]
    fn test_tier_presence() {
        let flags = compose(&set(&["8.6", "12.0"]), &settings());
        assert!(flags.tiers.any_of(&[Tier::Sm86]));
        assert!(flags.tiers.any_of(&[Tier::Sm89, Tier::Sm120]));
        assert!(!flags.tiers.any_of(&[Tier::Sm89, Tier::Sm90]));
    }

    #[test]
    fn test_unlisted_device_tier_contributes_no_code() {
        // A device can report a tier outside the closed set (e.g. 8.7);
        // it is skipped here rather than mapped to a wrong code.
        let set: CapabilitySet = [Capability::from_device(8, 7)].into_iter().collect();
        let flags = compose(&set, &settings());
        assert!(!flags.nvcc.iter().any(|f| f.starts_with("arch=")));
        assert_eq!(flags.tiers, TierPresence::default());
    }

    #[test]
    fn test_extra_flags_appended() {
        let custom = BuildSettings {
            extra_cxx_flags: vec!["-Wall".to_string()],
            extra_nvcc_flags: vec!["--expt-relaxed-constexpr".to_string()],
            ..settings()
        };
        let flags = compose(&set(&["8.0"]), &custom);
        assert!(flags.cxx.iter().any(|f| f == "-Wall"));
        assert!(flags.nvcc.iter().any(|f| f == "--expt-relaxed-constexpr"));
    }
}
