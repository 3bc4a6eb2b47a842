//! Client error types.

use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use loggerd_core::CodecError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// A required argument was empty; nothing was sent.
    #[error("invalid argument: {0} must not be empty")]
    InvalidArgument(&'static str),

    /// Opening or connecting the transport failed; connection state unchanged.
    #[error("cannot connect to {path}: {source}")]
    Transport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Codec(#[from] CodecError),

    #[error("already connected to a log daemon")]
    AlreadyConnected,

    #[error("not connected to a log daemon")]
    NotConnected,

    /// The forked daemon did not signal readiness.
    #[error("log daemon failed to initialize: {0}")]
    DaemonInit(String),

    #[error("cannot fork log daemon: {0}")]
    Fork(#[from] Errno),
}

impl ClientError {
    /// errno equivalent, for callers that report failures numerically.
    pub fn raw_os_error(&self) -> i32 {
        match self {
            ClientError::InvalidArgument(_) => Errno::EINVAL as i32,
            ClientError::Transport { source, .. } | ClientError::Io(source) => {
                source.raw_os_error().unwrap_or(Errno::EIO as i32)
            }
            ClientError::Codec(CodecError::Io(source)) => {
                source.raw_os_error().unwrap_or(Errno::EIO as i32)
            }
            ClientError::Codec(_) => Errno::EPROTO as i32,
            ClientError::AlreadyConnected => Errno::EEXIST as i32,
            ClientError::NotConnected => Errno::ENOTCONN as i32,
            ClientError::DaemonInit(_) => Errno::EIO as i32,
            ClientError::Fork(errno) => *errno as i32,
        }
    }
}
