//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Meditation - stream-of-consciousness simulator
#[derive(Parser)]
#[command(
    name = "medsim",
    about = "Grow a meditation stream of consciousness one generated thought at a time",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/meditation/logs/meditation.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run a meditation session and save the log
    Run(RunArgs),

    /// Print the resolved configuration as YAML
    Config,
}

/// Per-run overrides applied on top of the loaded configuration
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    /// Number of thoughts to generate
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,

    /// Model identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Opening thought
    #[arg(short, long)]
    pub seed: Option<String>,

    /// Directory for the session log
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Skip the pause between thoughts
    #[arg(long)]
    pub no_pause: bool,
}

impl RunArgs {
    /// Overwrite config values with whatever was given on the command line
    pub fn apply(&self, config: &mut Config) {
        if let Some(iterations) = self.iterations {
            config.session.iterations = iterations;
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.session.temperature = temperature;
        }
        if let Some(seed) = &self.seed {
            config.session.seed = seed.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
    }
}

/// Location of the tracing log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("meditation")
        .join("logs")
        .join("meditation.log")
}
