//! Build-time GPU architecture resolution for quantized attention kernels.
//!
//! This crate decides, for one build invocation, which compute capabilities
//! to target, whether the installed CUDA toolkit can build them, which
//! compiler flags each kernel variant needs, and which module variants enter
//! the final build plan. The plan is handed to the external extension
//! compiler; everything here is one-shot, synchronous configuration
//! resolution that fails fast when the environment cannot produce a correct
//! build.

pub mod capability;
pub mod config;
pub mod device;
pub mod error;
pub mod flags;
pub mod plan;
pub mod resolve;
pub mod toolkit;
pub mod validate;

// Re-export commonly used types
pub use capability::{Capability, CapabilitySet, SUPPORTED_ARCHS};
pub use config::{Args, BuildSettings, EmitFormat, ResolverConfig};
pub use device::{DeviceQuery, SmiDeviceQuery};
pub use error::{Error, Result};
pub use plan::{ModuleSpec, ResolvedBuildPlan};
pub use toolkit::{ToolkitProbe, ToolkitVersion};

use toolkit::VersionRunner;

/// Run the full resolution pipeline: probe the toolkit, resolve the target
/// set, gate it against the toolkit version, compose flags, and select the
/// module set.
///
/// Every collaborator is passed in so the pipeline is deterministic under
/// test; the binary wires up the production implementations.
pub fn resolve_build_plan(
    override_list: Option<&str>,
    devices: &dyn DeviceQuery,
    toolkit: &ToolkitProbe,
    runner: &dyn VersionRunner,
    settings: &BuildSettings,
) -> Result<ResolvedBuildPlan> {
    let version = toolkit.version_with(runner)?;
    let capabilities = resolve::resolve_capabilities(override_list, devices)?;
    validate::validate(version, &capabilities)?;
    let composed = flags::compose(&capabilities, settings);
    plan::build_plan(&capabilities, version, &composed)
}
