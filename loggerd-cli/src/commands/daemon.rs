//! `logctl start|stop|open|listen|klog` — daemon lifecycle and control requests.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use loggerd_client::{errno, Exchange, LogClient, RemoteResult};
use loggerd_core::LoggerConfig;

#[derive(Args, Debug)]
pub struct PathArgs {
    /// Path handed to the daemon.
    pub path: PathBuf,
}

pub fn start(config: &LoggerConfig) -> Result<()> {
    let mut client = LogClient::new();
    let pid = client
        .start_daemon(config)
        .context("failed to start log daemon")?;

    let listen = client
        .request_listen(&config.socket)
        .with_context(|| format!("failed to reach daemon {pid}"))?;
    if let Err(err) = check(&listen, &format!("listen on {}", config.socket.display())) {
        let _ = client.request_exit();
        return Err(err);
    }

    if let Some(output) = &config.output {
        let open = client
            .request_open(output)
            .with_context(|| format!("failed to reach daemon {pid}"))?;
        if let Err(err) = check(&open, &format!("open {}", output.display())) {
            let _ = client.request_exit();
            return Err(err);
        }
    }

    // Dropping the bootstrap connection leaves the daemon serving the socket.
    client.disconnect();
    println!("{pid}");
    Ok(())
}

pub fn stop(config: &LoggerConfig) -> Result<()> {
    let mut client = connect(config)?;
    let exchange = client.request_exit().context("failed to send exit request")?;
    check(&exchange, "exit")?;
    println!("daemon stop requested");
    Ok(())
}

pub fn open(config: &LoggerConfig, args: &PathArgs) -> Result<()> {
    let mut client = connect(config)?;
    let exchange = client
        .request_open(&args.path)
        .context("failed to send open request")?;
    check(&exchange, &format!("open {}", args.path.display()))
}

pub fn listen(config: &LoggerConfig, args: &PathArgs) -> Result<()> {
    let mut client = connect(config)?;
    let exchange = client
        .request_listen(&args.path)
        .context("failed to send listen request")?;
    check(&exchange, &format!("listen on {}", args.path.display()))
}

pub fn klog(config: &LoggerConfig) -> Result<()> {
    let mut client = connect(config)?;
    let exchange = client
        .request_kernel_import()
        .context("failed to send kernel import request")?;
    check(&exchange, "import kernel messages")
}

fn connect(config: &LoggerConfig) -> Result<LogClient> {
    let mut client = LogClient::new();
    client
        .connect_via_socket(&config.socket)
        .with_context(|| format!("daemon is not reachable at {}", config.socket.display()))?;
    Ok(client)
}

/// Turn a refused request into an error naming what was attempted.
fn check(exchange: &Exchange, what: &str) -> Result<()> {
    match exchange.result {
        RemoteResult::Success => Ok(()),
        RemoteResult::Failure(Some(code)) => {
            bail!("daemon could not {what}: {}", errno::describe(code))
        }
        RemoteResult::Failure(None) => bail!("daemon could not {what}"),
    }
}
