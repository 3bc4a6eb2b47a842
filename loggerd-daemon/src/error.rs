use std::path::PathBuf;

use thiserror::Error;

use loggerd_core::CodecError;

/// Error surface for the daemon runtime and its connections.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
