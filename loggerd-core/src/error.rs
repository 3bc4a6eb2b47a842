//! Error types for loggerd-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while framing or decoding protocol messages.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The underlying stream failed or ended mid-message.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload of {0} bytes exceeds protocol limit")]
    PayloadTooLarge(u64),

    #[error("malformed log record: {0}")]
    MalformedRecord(String),
}

/// Text that names no known severity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level '{0}'; expected one of emergency, alert, critical, error, warning, notice, info, debug or 0-7")]
pub struct UnknownSeverity(pub String);

/// Failures loading a [`crate::config::LoggerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error; serde_yaml supplies line and column.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
