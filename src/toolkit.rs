//! CUDA toolkit discovery and version probing.
//!
//! The toolkit root is taken from `CUDA_HOME` (or `CUDA_PATH`), checked
//! before probing; a missing toolkit is immediately fatal since nothing
//! downstream can proceed without it. The version is parsed from the
//! free-form `nvcc --version` banner, which carries a `release X.Y` token.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};

/// Parsed toolkit version, ordered by `(major, minor, patch)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ToolkitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ToolkitVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for ToolkitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

impl FromStr for ToolkitVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok());
        let minor = parts.next().and_then(|p| p.parse().ok());
        let patch = match parts.next() {
            Some(p) => p.parse().ok(),
            None => Some(0),
        };
        match (major, minor, patch, parts.next()) {
            (Some(major), Some(minor), Some(patch), None) => {
                Ok(Self { major, minor, patch })
            }
            _ => Err(Error::version_parse(s)),
        }
    }
}

/// Runs the toolkit's version-reporting facility. Injectable so tests never
/// execute a real `nvcc`.
pub trait VersionRunner {
    fn version_output(&self, nvcc: &Path) -> Result<String>;
}

/// Production runner: invokes `nvcc --version` and captures stdout.
pub struct NvccRunner;

impl VersionRunner for NvccRunner {
    fn version_output(&self, nvcc: &Path) -> Result<String> {
        let output = Command::new(nvcc)
            .arg("--version")
            .output()
            .map_err(|e| Error::toolchain(format!("failed to run {}: {}", nvcc.display(), e)))?;
        if !output.status.success() {
            return Err(Error::toolchain(format!(
                "{} exited with status {}",
                nvcc.display(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extract the version token following `release` from free-form `nvcc`
/// banner text, e.g. `Cuda compilation tools, release 12.4, V12.4.131`.
pub fn parse_release_token(output: &str) -> Result<ToolkitVersion> {
    let token = output
        .split_whitespace()
        .skip_while(|word| *word != "release")
        .nth(1)
        .map(|word| word.trim_end_matches(','))
        .ok_or_else(|| Error::version_parse(output.trim()))?;
    token.parse().map_err(|_| Error::version_parse(output.trim()))
}

/// Locator and version probe for an installed CUDA toolkit.
#[derive(Debug)]
pub struct ToolkitProbe {
    root: PathBuf,
}

impl ToolkitProbe {
    /// Locate the toolkit from `CUDA_HOME`, falling back to `CUDA_PATH`,
    /// or an explicit path override when one is given.
    pub fn locate(path_override: Option<&Path>) -> Result<Self> {
        let root = match path_override {
            Some(path) => path.to_path_buf(),
            None => env::var("CUDA_HOME")
                .or_else(|_| env::var("CUDA_PATH"))
                .map(PathBuf::from)
                .map_err(|_| Error::toolchain("CUDA_HOME is unset"))?,
        };
        Self::at(root)
    }

    /// Use an already-known toolkit root. Fails if the directory is absent.
    pub fn at(root: PathBuf) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::toolchain(format!(
                "{} does not exist or is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Probe the installed toolkit version via `nvcc --version`.
    pub fn version(&self) -> Result<ToolkitVersion> {
        self.version_with(&NvccRunner)
    }

    /// Probe with an injected runner.
    pub fn version_with(&self, runner: &dyn VersionRunner) -> Result<ToolkitVersion> {
        let nvcc = self.root.join("bin").join("nvcc");
        let output = runner.version_output(&nvcc)?;
        let version = parse_release_token(&output)?;
        debug!(%version, root = %self.root.display(), "probed toolkit version");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NVCC_BANNER: &str = "nvcc: NVIDIA (R) Cuda compiler driver\n\
        Copyright (c) 2005-2024 NVIDIA Corporation\n\
        Built on Thu_Mar_28_02:18:24_PDT_2024\n\
        Cuda compilation tools, release 12.4, V12.4.131\n\
        Build cuda_12.4.r12.4/compiler.34097967_0";

    #[test]
    fn test_parse_release_token() {
        let version = parse_release_token(NVCC_BANNER).unwrap();
        assert_eq!(version, ToolkitVersion::new(12, 4, 0));
    }

    #[test]
    fn test_parse_release_token_missing() {
        let err = parse_release_token("nvcc: no version here").unwrap_err();
        assert!(matches!(err, Error::VersionParse { .. }));
    }

    #[test]
    fn test_version_from_str() {
        let version: ToolkitVersion = "12.8".parse().unwrap();
        assert_eq!(version, ToolkitVersion::new(12, 8, 0));

        let version: ToolkitVersion = "12.4.131".parse().unwrap();
        assert_eq!(version, ToolkitVersion::new(12, 4, 131));

        assert!("12".parse::<ToolkitVersion>().is_err());
        assert!("12.4.1.1".parse::<ToolkitVersion>().is_err());
        assert!("v12.4".parse::<ToolkitVersion>().is_err());
    }

    #[test]
    fn test_version_ordering() {
        let v12_0 = ToolkitVersion::new(12, 0, 0);
        let v12_4 = ToolkitVersion::new(12, 4, 0);
        let v12_4_131 = ToolkitVersion::new(12, 4, 131);
        assert!(v12_0 < v12_4);
        assert!(v12_4 < v12_4_131);
        assert!(ToolkitVersion::new(11, 8, 0) < v12_0);
    }

    #[test]
    fn test_version_display() {
        assert_eq!(ToolkitVersion::new(12, 4, 0).to_string(), "12.4");
        assert_eq!(ToolkitVersion::new(12, 4, 131).to_string(), "12.4.131");
    }

    #[test]
    fn test_locate_missing_dir() {
        let err = ToolkitProbe::at(PathBuf::from("/nonexistent/cuda-root")).unwrap_err();
        assert!(matches!(err, Error::ToolchainNotFound(_)));
    }
}
