//! logctl — start, drive and write to a loggerd daemon.
//!
//! # Usage
//!
//! ```text
//! logctl [--config FILE] start
//! logctl [--config FILE] send [--level L] [--tag T] MESSAGE...
//! logctl [--config FILE] open|listen PATH
//! logctl [--config FILE] klog|stop
//! logctl level TEXT [--strict]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{daemon::PathArgs, level::LevelArgs, send::SendArgs};
use loggerd_core::LoggerConfig;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "logctl",
    version,
    about = "Control a loggerd daemon and send it log records",
    long_about = None,
)]
struct Cli {
    /// Configuration file (default: $LOGGERD_CONFIG, then /etc/loggerd.yaml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fork a daemon, make it listen on the configured socket, print its pid.
    Start,

    /// Ask the running daemon to exit.
    Stop,

    /// Send one log record, or print it here when no daemon is reachable.
    Send(SendArgs),

    /// Ask the daemon to write to a new output file.
    Open(PathArgs),

    /// Ask the daemon to accept clients on an additional socket.
    Listen(PathArgs),

    /// Ask the daemon to import kernel messages.
    Klog,

    /// Show how a level name parses.
    Level(LevelArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = || load_config(cli.config.as_deref());
    match cli.command {
        Commands::Start => commands::daemon::start(&config()?),
        Commands::Stop => commands::daemon::stop(&config()?),
        Commands::Send(args) => args.run(&config()?),
        Commands::Open(args) => commands::daemon::open(&config()?, &args),
        Commands::Listen(args) => commands::daemon::listen(&config()?, &args),
        Commands::Klog => commands::daemon::klog(&config()?),
        Commands::Level(args) => args.run(),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<LoggerConfig> {
    let config = match path {
        Some(path) => LoggerConfig::load_at(path),
        None => LoggerConfig::load(),
    };
    config.context("failed to load configuration")
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
