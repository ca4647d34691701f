//! archgate binary.
//!
//! Resolves the build configuration for the quantized attention kernel
//! package and writes the resulting plan to stdout. Any fatal resolution
//! error terminates the process with a non-zero status and a one-line
//! diagnostic on stderr.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use archgate_core::config::{arch_override, Args, EmitFormat, ResolverConfig};
use archgate_core::toolkit::NvccRunner;
use archgate_core::{resolve_build_plan, ResolvedBuildPlan, SmiDeviceQuery, ToolkitProbe};

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = ResolverConfig::load(args)?;

    let toolkit = ToolkitProbe::locate(args.toolkit_path.as_deref())?;
    let devices = SmiDeviceQuery::probe();
    let override_list = arch_override(args);

    let plan = resolve_build_plan(
        override_list.as_deref(),
        &devices,
        &toolkit,
        &NvccRunner,
        &config.build,
    )?;

    if args.check {
        info!("build configuration is valid; nothing emitted");
        return Ok(());
    }

    match args.emit {
        EmitFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        EmitFormat::Text => print_text(&plan),
    }
    Ok(())
}

fn print_text(plan: &ResolvedBuildPlan) {
    println!("toolkit version: {}", plan.toolkit_version);
    println!("target architectures: {}", plan.capabilities.join(";"));
    for module in &plan.modules {
        println!("module {}", module.name);
        for source in &module.sources {
            println!("  source {source}");
        }
        for (stage, stage_flags) in &module.extra_compile_args {
            println!("  {} flags: {}", stage, stage_flags.join(" "));
        }
        if !module.extra_link_args.is_empty() {
            println!("  link args: {}", module.extra_link_args.join(" "));
        }
    }
}
