//! loggerd client library.
//!
//! A process talks to its log daemon through a [`LogClient`]: connect to a
//! running daemon (or fork a private one), submit records, and issue
//! control requests. With no daemon, records go to the console instead.
//!
//! Every logging call leaves the thread's `errno` untouched unless a daemon
//! exchange happened, in which case it carries the daemon's result.

mod bootstrap;
pub mod client;
pub mod errno;
mod error;
pub mod format;
pub mod transport;

use std::sync::{Mutex, OnceLock, PoisonError};

pub use client::{Delivery, Exchange, LogClient, RemoteResult};
pub use error::ClientError;
pub use nix::unistd::Pid;
pub use transport::Transport;

pub use loggerd_core::Severity;

/// The process-wide client used by [`log_fmt!`] and [`log_errno!`].
pub fn shared() -> &'static Mutex<LogClient> {
    static SHARED: OnceLock<Mutex<LogClient>> = OnceLock::new();
    SHARED.get_or_init(|| Mutex::new(LogClient::new()))
}

/// Run `f` on the shared client. `errno` as seen by `f` is the caller's;
/// taking the lock does not disturb it. A poisoned lock is recovered.
pub fn with_shared<R>(f: impl FnOnce(&mut LogClient) -> R) -> R {
    let guard = errno::ErrnoGuard::save();
    let mut client = shared().lock().unwrap_or_else(PoisonError::into_inner);
    drop(guard);
    f(&mut client)
}

/// Log a formatted message through the shared client.
///
/// ```no_run
/// use loggerd_client::{log_fmt, Severity};
/// let _ = log_fmt!(Severity::Notice, "mount", "mounted {} on {}", "/dev/sda1", "/data");
/// ```
#[macro_export]
macro_rules! log_fmt {
    ($severity:expr, $tag:expr, $($arg:tt)+) => {
        $crate::with_shared(|client| client.emit_fmt($severity, $tag, ::std::format_args!($($arg)+)))
    };
}

/// Like [`log_fmt!`], with a description of the current `errno` appended.
#[macro_export]
macro_rules! log_errno {
    ($severity:expr, $tag:expr, $($arg:tt)+) => {
        $crate::with_shared(|client| client.emit_errno($severity, $tag, ::std::format_args!($($arg)+)))
    };
}
