//! Meditation - stream-of-consciousness simulator
//!
//! CLI entry point: load configuration, run one session, save the log.

use std::fs;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use meditation::cli::{Cli, Command, RunArgs, get_log_path};
use meditation::config::{Config, Environment};
use meditation::events::{EventSink, SessionEvent};
use meditation::llm::create_client;
use meditation::pacing::TokioPacer;
use meditation::session::{SessionRunner, Termination};
use meditation::session_log::SessionLog;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Process environment first, then .env in the working directory
    let env = Environment::from_process();

    let config = Config::load(cli.config.as_ref(), &env).context("Failed to load configuration");
    let config_log_level = config.as_ref().ok().and_then(|c| c.log_level.clone());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            warn!("{:#}", e);
            println!("{} {:#}", "ERROR:".red().bold(), e);
            return Ok(());
        }
    };

    info!(
        "Meditation loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    match cli.command {
        Some(Command::Config) => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
        Some(Command::Run(args)) => {
            debug!(?args, "main: matched Run command");
            cmd_run(config, &args, &env).await
        }
        None => {
            debug!("main: no command, defaulting to run");
            cmd_run(config, &RunArgs::default(), &env).await
        }
    }
}

/// Print the resolved configuration
fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}

/// Run one session and save whatever it produced
///
/// Every failure is reported on stdout; the process still exits normally.
async fn cmd_run(mut config: Config, args: &RunArgs, env: &Environment) -> Result<()> {
    debug!(?args, "cmd_run: called");
    args.apply(&mut config);

    if let Err(e) = config.validate(env) {
        warn!("Configuration invalid: {:#}", e);
        println!("{} {:#}", "ERROR:".red().bold(), e);
        return Ok(());
    }

    let llm = match create_client(&config.llm, env) {
        Ok(llm) => llm,
        Err(e) => {
            warn!("Failed to create LLM client: {}", e);
            println!("{} {}", "ERROR:".red().bold(), e);
            return Ok(());
        }
    };

    let pacer = if args.no_pause {
        TokioPacer::new().without_inter_step()
    } else {
        TokioPacer::new()
    };

    let runner = SessionRunner::new(&config, llm, Arc::new(pacer)).with_sink(Arc::new(ConsoleSink));
    let report = runner.run().await;

    if let Termination::Aborted { .. } | Termination::RetriesExhausted { .. } = report.termination {
        println!("Session ended early: {}", report.termination);
    }

    match SessionLog::new(&config.output.dir).write(&report.stream) {
        Ok(path) => {
            println!("Full stream of consciousness saved to: {}", path.display().to_string().green());
        }
        Err(e) => {
            warn!("Session log not written: {}", e);
            println!("{} {}", "Error:".red().bold(), e);
        }
    }

    Ok(())
}

/// Prints session progress to stdout
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: SessionEvent) {
        match &event {
            SessionEvent::Started { .. } | SessionEvent::Ended { .. } => println!("{}", event.to_string().bold()),
            SessionEvent::ThoughtAccepted { step, text } => {
                println!("{} {}", format!("[Thought {}]:", step).cyan(), text)
            }
            SessionEvent::EmptyResponse { .. } | SessionEvent::RateLimited { .. } => {
                println!("{}", event.to_string().yellow())
            }
            SessionEvent::AttemptFailed { .. } | SessionEvent::RetriesExhausted { .. } => {
                println!("{}", event.to_string().red())
            }
        }
    }
}
