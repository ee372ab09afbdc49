//! `rvc-optimize`: resolve and print the effective RVC optimization settings.
//!
//! Logs go to stderr (level from `RUST_LOG`), the resolved configuration is
//! written to stdout as TOML so it can be redirected into a config file.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rvc_optimization::{
    config::DEFAULT_CONFIG_FILE, HardwarePreset, OptimizationConfig, Profiler,
};

/// Resolve RVC inference optimization settings and print them as TOML.
///
/// Without a mode flag, settings are layered: built-in defaults, then the
/// config file, then `RVC_*` environment variables.
#[derive(Parser, Debug)]
#[command(name = "rvc-optimize", version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").args(["preset", "detect", "env"])))]
struct Cli {
    /// Use a named preset: apple_silicon, nvidia_gpu or cpu
    #[arg(short, long, value_name = "NAME")]
    preset: Option<HardwarePreset>,

    /// Pick the preset for this host
    #[arg(short, long)]
    detect: bool,

    /// Apply RVC_* variables over the defaults only
    #[arg(short, long)]
    env: bool,

    /// Config file for the layered mode
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Time the resolution and print a report
    #[arg(long)]
    profile: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Defaults, then config file, then environment.
    Layered,
    Preset(HardwarePreset),
    Detect,
    Env,
}

impl Cli {
    fn mode(&self) -> Mode {
        match (self.preset, self.detect, self.env) {
            (Some(preset), _, _) => Mode::Preset(preset),
            (None, true, _) => Mode::Detect,
            (None, false, true) => Mode::Env,
            (None, false, false) => Mode::Layered,
        }
    }

    fn resolve(&self) -> anyhow::Result<OptimizationConfig> {
        let config = match self.mode() {
            Mode::Layered => OptimizationConfig::load(&self.config)
                .with_context(|| format!("loading {}", self.config.display()))?,
            Mode::Preset(preset) => OptimizationConfig::for_preset(preset),
            Mode::Detect => OptimizationConfig::detect_system(),
            Mode::Env => OptimizationConfig::from_env()?,
        };
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut profiler = Profiler::new(cli.profile);
    let config = profiler.measure("resolve_config", || cli.resolve())?;
    config.log_summary();

    let rendered = profiler.measure("render_toml", || config.to_toml())?;
    print!("{rendered}");

    if profiler.is_enabled() {
        profiler.log_report();
        println!();
        for line in profiler.report().lines() {
            println!("# {line}");
        }
    }

    info!(mode = ?cli.mode(), "Configuration resolved");
    Ok(())
}
