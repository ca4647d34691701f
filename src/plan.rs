//! Kernel-module selection and the final build plan.
//!
//! Which module variants enter the plan is a small rule table: a tier
//! predicate per module, evaluated against the tier presence the flag
//! composer recorded. The table order is the emission order, so build logs
//! stay stable however the predicates evaluate.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::capability::CapabilitySet;
use crate::error::{Error, Result};
use crate::flags::{ComposedFlags, Tier};
use crate::toolkit::ToolkitVersion;

/// A named build unit handed to the external extension compiler.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModuleSpec {
    pub name: String,
    pub sources: Vec<String>,
    /// Per-stage compile flags, keyed `"cxx"` / `"nvcc"`.
    pub extra_compile_args: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_link_args: Vec<String>,
}

struct ModuleRule {
    name: &'static str,
    sources: &'static [&'static str],
    /// Include the module when any of these tiers is present; an empty list
    /// means the module is always included.
    any_of: &'static [Tier],
    extra_link_args: &'static [&'static str],
}

const MODULE_RULES: &[ModuleRule] = &[
    ModuleRule {
        name: "qattn_sm80",
        sources: &["csrc/qattn/pybind_sm80.cpp", "csrc/qattn/qk_int_sv_f16_cuda_sm80.cu"],
        any_of: &[Tier::Sm80, Tier::Sm86, Tier::Sm89, Tier::Sm90, Tier::Sm120],
        extra_link_args: &[],
    },
    ModuleRule {
        name: "qattn_sm89",
        sources: &["csrc/qattn/pybind_sm89.cpp", "csrc/qattn/qk_int_sv_f8_cuda_sm89.cu"],
        any_of: &[Tier::Sm89, Tier::Sm120],
        extra_link_args: &[],
    },
    ModuleRule {
        name: "qattn_sm90",
        sources: &["csrc/qattn/pybind_sm90.cpp", "csrc/qattn/qk_int_sv_f8_cuda_sm90.cu"],
        any_of: &[Tier::Sm90],
        // The sm90 kernels call into the driver API directly.
        extra_link_args: &["-lcuda"],
    },
    ModuleRule {
        name: "fused",
        sources: &["csrc/fused/pybind.cpp", "csrc/fused/fused.cu"],
        any_of: &[],
        extra_link_args: &[],
    },
];

/// The final ordered module list for one build invocation, together with
/// the inputs it was resolved against (recorded for build-log audits).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedBuildPlan {
    pub capabilities: Vec<String>,
    pub toolkit_version: String,
    pub modules: Vec<ModuleSpec>,
}

impl ResolvedBuildPlan {
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }
}

/// Select the module set for the composed flags. Every included module
/// receives the full shared flag lists; nothing is filtered per module.
pub fn build_plan(
    capabilities: &CapabilitySet,
    toolkit_version: ToolkitVersion,
    flags: &ComposedFlags,
) -> Result<ResolvedBuildPlan> {
    let mut compile_args = BTreeMap::new();
    compile_args.insert("cxx".to_string(), flags.cxx.clone());
    compile_args.insert("nvcc".to_string(), flags.nvcc.clone());

    let modules: Vec<ModuleSpec> = MODULE_RULES
        .iter()
        .filter(|rule| rule.any_of.is_empty() || flags.tiers.any_of(rule.any_of))
        .map(|rule| ModuleSpec {
            name: rule.name.to_string(),
            sources: rule.sources.iter().map(|s| (*s).to_string()).collect(),
            extra_compile_args: compile_args.clone(),
            extra_link_args: rule.extra_link_args.iter().map(|s| (*s).to_string()).collect(),
        })
        .collect();

    // The always-included fused module makes this unreachable; hitting it
    // means an upstream invariant broke.
    if modules.is_empty() {
        return Err(Error::EmptyBuildPlan);
    }

    let plan = ResolvedBuildPlan {
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        toolkit_version: toolkit_version.to_string(),
        modules,
    };
    info!(modules = ?plan.module_names(), "selected kernel modules");
    Ok(plan)
}
