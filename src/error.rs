//! Unified error types for build-plan resolution.

use thiserror::Error;

use crate::toolkit::ToolkitVersion;

/// Unified error type for all resolution operations.
///
/// Every variant here is fatal for the invocation that raised it: a wrong
/// build configuration would silently produce binaries incompatible with the
/// target hardware, so nothing in this taxonomy is retried or degraded.
#[derive(Error, Debug)]
pub enum Error {
    #[error("CUDA toolkit not found: {0}. Set CUDA_HOME (or CUDA_PATH) to a toolkit installation")]
    ToolchainNotFound(String),

    #[error("could not parse toolkit version: expected a \"release X.Y\" token in: {output}")]
    VersionParse { output: String },

    #[error("no target architectures resolved by {strategy}: {detail}")]
    NoCapabilitiesResolved { strategy: &'static str, detail: String },

    #[error("toolkit {actual} is too old for compute capability {capability}: {required} or newer is required")]
    UnsupportedToolkitVersion {
        capability: String,
        required: ToolkitVersion,
        actual: ToolkitVersion,
    },

    #[error("build plan is empty: no kernel module matched the resolved architecture set")]
    EmptyBuildPlan,

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a toolchain-not-found error.
    pub fn toolchain<S: Into<String>>(msg: S) -> Self {
        Error::ToolchainNotFound(msg.into())
    }

    /// Create a version-parse error carrying the raw probe output.
    pub fn version_parse<S: Into<String>>(output: S) -> Self {
        Error::VersionParse { output: output.into() }
    }
}

/// Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::toolchain("CUDA_HOME is unset");
        assert!(matches!(err, Error::ToolchainNotFound(_)));

        let err = Error::version_parse("nvcc: command output without the expected token");
        assert!(matches!(err, Error::VersionParse { .. }));
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::UnsupportedToolkitVersion {
            capability: "8.9".to_string(),
            required: ToolkitVersion::new(12, 4, 0),
            actual: ToolkitVersion::new(12, 1, 0),
        };
        let msg = err.to_string();
        assert!(msg.contains("8.9"));
        assert!(msg.contains("12.4"));
        assert!(msg.contains("12.1"));
    }
}
