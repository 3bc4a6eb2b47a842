//! `logctl send` — emit one record.

use anyhow::{bail, Context, Result};
use clap::Args;

use loggerd_client::{Delivery, LogClient};
use loggerd_core::{LoggerConfig, Severity};

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Severity name or number (debug, info, notice, warning, error, ...).
    #[arg(long, short, default_value = "info")]
    pub level: Severity,

    /// Tag identifying the sender.
    #[arg(long, short, default_value = "logctl")]
    pub tag: String,

    /// Message text; words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,
}

impl SendArgs {
    pub fn run(self, config: &LoggerConfig) -> Result<()> {
        let mut client = LogClient::new();
        if let Err(err) = client.connect_via_socket(&config.socket) {
            tracing::debug!(error = %err, "no daemon, logging to console");
        }

        let message = self.message.join(" ");
        let delivery = client
            .emit(self.level, &self.tag, &message)
            .context("failed to send log record")?;
        if let Delivery::Remote(exchange) = delivery {
            if !exchange.result.is_success() {
                bail!("daemon rejected the record (errno {})", exchange.result.errno());
            }
        }
        Ok(())
    }
}
