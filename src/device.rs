//! Host accelerator introspection.
//!
//! Device enumeration is a short blocking query against the host's GPU
//! runtime, performed once per resolution. The production implementation
//! shells out to `nvidia-smi`; tests substitute a scripted fake through the
//! [`DeviceQuery`] trait.

use std::process::Command;

use tracing::debug;

/// Query interface over the host's attached accelerator devices.
pub trait DeviceQuery {
    /// Number of attached devices.
    fn device_count(&self) -> usize;

    /// Native compute capability of the device at `index` as
    /// `(major, minor)`. `index` is in `0..device_count()`.
    fn device_capability(&self, index: usize) -> (u32, u32);
}

/// Device enumeration backed by `nvidia-smi --query-gpu=compute_cap`.
///
/// Probes once at construction; an absent or failing `nvidia-smi` reports
/// zero devices, which sends resolution to the static fallback rather than
/// failing the build.
pub struct SmiDeviceQuery {
    capabilities: Vec<(u32, u32)>,
}

impl SmiDeviceQuery {
    pub fn probe() -> Self {
        let capabilities = query_compute_caps().unwrap_or_default();
        debug!(count = capabilities.len(), "enumerated attached devices");
        Self { capabilities }
    }
}

impl DeviceQuery for SmiDeviceQuery {
    fn device_count(&self) -> usize {
        self.capabilities.len()
    }

    fn device_capability(&self, index: usize) -> (u32, u32) {
        self.capabilities[index]
    }
}

fn query_compute_caps() -> Option<Vec<(u32, u32)>> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=compute_cap", "--format=csv,noheader"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(
        text.lines()
            .filter_map(|line| {
                let (major, minor) = line.trim().split_once('.')?;
                Some((major.parse().ok()?, minor.parse().ok()?))
            })
            .collect(),
    )
}

/// Fixed device list, used by tests and by callers that already know the
/// attached hardware.
pub struct FixedDevices(pub Vec<(u32, u32)>);

impl DeviceQuery for FixedDevices {
    fn device_count(&self) -> usize {
        self.0.len()
    }

    fn device_capability(&self, index: usize) -> (u32, u32) {
        self.0[index]
    }
}
