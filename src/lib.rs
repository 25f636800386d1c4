pub mod bridge;
pub mod commands;
pub mod config;
pub mod curriculum;
pub mod matching;
pub mod models;
pub mod monitoring;
pub mod replay;
pub mod session_store;
pub mod telemetry;
pub mod utils;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use commands::{ReplayOptions, StepSource};
use config::EngineConfig;

#[derive(Parser)]
#[command(name = "stepwatch")]
#[command(about = "Checks guided UI walkthroughs against recorded screen traces")]
#[command(version)]
struct Cli {
    /// Engine config file (JSON); defaults apply when absent
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace (JSON lines) against a curriculum and check its expectations
    Replay {
        #[arg(value_name = "TRACE")]
        trace: PathBuf,

        /// Steps file in the server's get_steps format
        #[arg(long, value_name = "PATH", conflicts_with = "session")]
        steps: Option<PathBuf>,

        /// Session to fetch from the curriculum server
        #[arg(long)]
        session: Option<String>,

        /// Track only these step numbers (1-based, comma separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<usize>,

        /// Hand the session over through this store file instead of loading it directly
        #[arg(long, value_name = "PATH")]
        store: Option<PathBuf>,

        /// Log telemetry instead of posting it to the server
        #[arg(long)]
        no_telemetry: bool,
    },

    /// List recorded sessions on the curriculum server, newest first
    Sessions,

    /// Show a session's display name and steps
    Info { session: String },
}

/// Info by default, Debug under `STEPWATCH_DEBUG`; a `RUST_LOG` spec is applied on top and wins.
fn logger(debug: bool, rust_log: Option<&str>) -> env_logger::Builder {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Some(spec) = rust_log {
        builder.parse_filters(spec);
    }
    builder
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    let rust_log = std::env::var(env_logger::DEFAULT_FILTER_ENV).ok();
    logger(config::debug_mode(), rust_log.as_deref()).init();

    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref())?;
    log::debug!("engine config: {config:?}");

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(dispatch(cli.command, config))
}

async fn dispatch(command: Commands, config: EngineConfig) -> Result<()> {
    match command {
        Commands::Sessions => commands::list_sessions(&config).await,
        Commands::Info { session } => commands::session_info(&config, &session).await,
        Commands::Replay {
            trace,
            steps,
            session,
            only,
            store,
            no_telemetry,
        } => {
            let steps = match (steps, session) {
                (Some(path), _) => StepSource::File(path),
                (None, Some(session)) => StepSource::Server(session),
                (None, None) => bail!("either --steps or --session is required"),
            };
            let options = ReplayOptions {
                trace,
                steps,
                only,
                store,
                telemetry: !no_telemetry,
            };

            let report = commands::run_replay(config, options).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.passed() {
                bail!("{} expectation(s) failed", report.mismatches.len());
            }
            Ok(())
        }
    }
}
