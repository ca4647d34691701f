//! Configuration surface for the resolver.
//!
//! Options are loaded from multiple sources, later ones overriding earlier:
//! 1. Default configuration (embedded in binary)
//! 2. User-specified configuration file
//! 3. Environment variables (prefixed with `ARCHGATE_`)
//! 4. Command-line arguments
//!
//! The architecture override additionally honors `TORCH_CUDA_ARCH_LIST` so
//! existing wheel-build environments keep working unchanged.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::Result;

/// Command-line arguments
#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Args {
    /// Configuration file path
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Target architecture list, e.g. "8.0;8.6;9.0+PTX"
    #[clap(long, env = "ARCHGATE_ARCH_LIST")]
    pub arch_list: Option<String>,

    /// CUDA toolkit root (defaults to CUDA_HOME / CUDA_PATH)
    #[clap(long)]
    pub toolkit_path: Option<PathBuf>,

    /// Output format for the resolved plan
    #[clap(long, value_enum, default_value = "json")]
    pub emit: EmitFormat,

    /// Resolve and validate only; emit nothing
    #[clap(long)]
    pub check: bool,

    /// Compile against the C++11 libstdc++ ABI
    #[clap(long)]
    pub cxx11_abi: Option<bool>,
}

/// How the resolved plan is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EmitFormat {
    Json,
    Text,
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Build settings
    #[serde(default)]
    pub build: BuildSettings,
}

/// Flag-composition settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildSettings {
    /// Compile against the C++11 libstdc++ ABI
    #[serde(default = "default_cxx11_abi")]
    pub cxx11_abi: bool,
    /// Extra host-compiler flags appended after the base set
    #[serde(default)]
    pub extra_cxx_flags: Vec<String>,
    /// Extra device-compiler flags appended after the base set
    #[serde(default)]
    pub extra_nvcc_flags: Vec<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            cxx11_abi: default_cxx11_abi(),
            extra_cxx_flags: vec![],
            extra_nvcc_flags: vec![],
        }
    }
}

impl ResolverConfig {
    /// Load configuration from all sources
    pub fn load(args: &Args) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            include_str!("../config/default.toml"),
            config::FileFormat::Toml,
        ));

        // Load user config if specified
        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        // Add environment variables
        builder = builder.add_source(config::Environment::with_prefix("ARCHGATE"));

        // Build config
        let mut config: ResolverConfig = builder.build()?.try_deserialize()?;

        // Override with command line args
        if let Some(abi) = args.cxx11_abi {
            config.build.cxx11_abi = abi;
        }

        Ok(config)
    }
}

/// The architecture override for this invocation: the CLI/env value first,
/// then the `TORCH_CUDA_ARCH_LIST` compatibility alias.
pub fn arch_override(args: &Args) -> Option<String> {
    args.arch_list
        .clone()
        .or_else(|| env::var("TORCH_CUDA_ARCH_LIST").ok())
}

fn default_cxx11_abi() -> bool {
    true
}
