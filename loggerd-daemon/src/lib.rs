//! Reference log daemon: the message-serving loop a bootstrapped child runs.

mod error;
pub mod kmsg;
pub mod protocol;
mod runtime;
pub mod sink;

pub use error::DaemonError;
pub use runtime::{run, serve, start_blocking};
pub use sink::{format_line, LogSink};
