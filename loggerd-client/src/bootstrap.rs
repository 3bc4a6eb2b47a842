//! Forking a private daemon and handing its socket to the client.

use std::fs::{self, OpenOptions};
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::panic::{self, AssertUnwindSafe};

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::{close, dup2, fork, ForkResult, Pid};

use loggerd_core::{read_message, LoggerConfig, Operation};

use crate::client::LogClient;
use crate::errno;
use crate::error::ClientError;
use crate::transport::Transport;

/// Exit status of a child whose body panicked.
const PANIC_STATUS: i32 = 101;

/// Upper bound on descriptors swept when `/proc/self/fd` is unavailable.
const FALLBACK_FD_LIMIT: RawFd = 1024;

impl LogClient {
    /// Fork a daemon running [`loggerd_daemon::serve`] with `config` and
    /// connect to it.
    pub fn start_daemon(&mut self, config: &LoggerConfig) -> Result<Pid, ClientError> {
        let config = config.clone();
        self.start_daemon_with(move |stream| loggerd_daemon::serve(stream, config))
    }

    /// Fork a child running `body` on one end of a fresh socket pair and
    /// connect to the other end once the child reports ready.
    ///
    /// The child must send `OK` as its first message. Anything else, or the
    /// child exiting first, is [`ClientError::DaemonInit`]; the child is
    /// then killed and reaped and no connection is installed.
    pub fn start_daemon_with<F>(&mut self, body: F) -> Result<Pid, ClientError>
    where
        F: FnOnce(UnixStream) -> i32,
    {
        if self.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }

        let (parent_end, child_end) = UnixStream::pair()?;

        // SAFETY: the child only closes descriptors and runs `body` before
        // exiting; it never returns into the caller's stack.
        match unsafe { fork() }? {
            ForkResult::Child => {
                drop(parent_end);
                isolate_descriptors(child_end.as_raw_fd());
                let status = panic::catch_unwind(AssertUnwindSafe(|| body(child_end)))
                    .unwrap_or(PANIC_STATUS);
                std::process::exit(status);
            }
            ForkResult::Parent { child } => {
                drop(child_end);
                let mut stream = parent_end;
                match wait_ready(&mut stream) {
                    Ok(()) => {
                        tracing::info!(pid = child.as_raw(), "log daemon started");
                        self.install(Some(Transport::from(stream)));
                        Ok(child)
                    }
                    Err(reason) => {
                        tracing::warn!(pid = child.as_raw(), %reason, "log daemon failed to start");
                        let _ = kill(child, Signal::SIGKILL);
                        let _ = waitpid(child, None);
                        errno::set(Errno::EIO as i32);
                        Err(ClientError::DaemonInit(reason))
                    }
                }
            }
        }
    }
}

/// Read the one readiness message. `Err` carries a description of what
/// arrived instead.
fn wait_ready(stream: &mut UnixStream) -> Result<(), String> {
    match read_message(stream) {
        Ok(message) if message.operation() == Some(Operation::Ok) => Ok(()),
        Ok(message) => Err(format!(
            "expected OK, got code {} with {} byte payload",
            message.code,
            message.payload.len()
        )),
        Err(err) => Err(err.to_string()),
    }
}

/// Close everything but `keep` and point stdio at `/dev/null`.
fn isolate_descriptors(keep: RawFd) {
    let open: Vec<RawFd> = match fs::read_dir("/proc/self/fd") {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect(),
        Err(_) => (0..FALLBACK_FD_LIMIT).collect(),
    };
    for fd in open.into_iter().filter(|&fd| fd != keep) {
        // The directory handle used above is already gone; EBADF is fine.
        let _ = close(fd);
    }

    let Ok(null) = OpenOptions::new().read(true).write(true).open("/dev/null") else {
        return;
    };
    let null = null.into_raw_fd();
    for target in 0..=2 {
        if target != null && target != keep {
            let _ = dup2(null, target);
        }
    }
    if null > 2 {
        let _ = close(null);
    }
}
