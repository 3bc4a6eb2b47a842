//! loggerd core library — severities, log records, wire framing, config.
//!
//! - [`severity`] — ordered levels and their textual aliases
//! - [`record`] — [`LogRecord`] and its fixed-size payload layout
//! - [`message`] — header + payload framing shared by client and daemon
//! - [`config`] — YAML [`LoggerConfig`]
//! - [`error`] — [`CodecError`], [`ConfigError`], [`UnknownSeverity`]

pub mod config;
pub mod error;
pub mod message;
pub mod record;
pub mod severity;

pub use config::LoggerConfig;
pub use error::{CodecError, ConfigError, UnknownSeverity};
pub use message::{read_message, write_message, Message, Operation};
pub use record::{LogRecord, MESSAGE_CAPACITY, RECORD_SIZE, TAG_CAPACITY};
pub use severity::{level_to_string, parse_level, Severity};
