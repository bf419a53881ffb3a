//! devmount: mount named audio devices as RTSP endpoints.
//!
//! # Startup Sequence
//!
//! ```text
//! parse args → Config::create + load → validate
//!            → Logger::from_config → tracing subscriber (LoggerLayer)
//!            → Server::create → release local shares → Server::deploy (blocks)
//! ```
//!
//! `--check` prints the merged configuration as JSON and exits.
//!
//! Startup failures are printed to stderr and exit with status 1. Shutdown
//! through SIGINT/SIGTERM exits 0; a failed mount pass exits 1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devmount::observability::{level_filter, LoggerLayer};
use devmount::{Config, Logger, Server, Shared};

#[derive(Parser)]
#[command(name = "devmount")]
#[command(about = "Expose audio devices as RTSP endpoints", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration document (JSON, or TOML with a .toml extension)
    config: PathBuf,

    /// Load and validate the configuration, then exit without serving
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("devmount: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> devmount::Result<()> {
    let mut config = Config::create();
    config.load(&cli.config)?;
    config.validate()?;

    if cli.check {
        println!("{}: ok", cli.config.display());
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let logger = Logger::from_config(&config)?;
    let filter = EnvFilter::builder()
        .with_default_directive(level_filter(logger.level()).into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(LoggerLayer::new(logger.share()))
        .try_init()?;

    let config = Shared::new(config);
    let server = Server::create(&config, &logger)?;
    config.release();
    logger.release();

    let result = server.deploy();
    server.release();
    result.map_err(Into::into)
}
