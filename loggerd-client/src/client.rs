//! The logging client: connection ownership, synchronous exchanges, and the
//! record-emitting front end.

use std::fmt;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use loggerd_core::{read_message, write_message, LogRecord, Message, Operation, Severity};

use crate::errno::{self, ErrnoGuard};
use crate::error::ClientError;
use crate::format;
use crate::transport::Transport;

/// Outcome reported by the daemon for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteResult {
    Success,
    /// `FAIL`, with the daemon's error code when it sent one.
    Failure(Option<i32>),
}

impl RemoteResult {
    fn from_terminal(message: &Message) -> Self {
        let code = parse_code(&message.payload);
        match message.operation() {
            Some(Operation::Ok) => match code {
                None | Some(0) => RemoteResult::Success,
                Some(code) => RemoteResult::Failure(Some(code)),
            },
            _ => RemoteResult::Failure(code),
        }
    }

    pub fn is_success(self) -> bool {
        self == RemoteResult::Success
    }

    /// Value mirrored into `errno` after the exchange; 0 when no code.
    pub fn errno(self) -> i32 {
        match self {
            RemoteResult::Success | RemoteResult::Failure(None) => 0,
            RemoteResult::Failure(Some(code)) => code,
        }
    }
}

/// One completed request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    /// Bytes written for the request, header included.
    pub written: usize,
    pub result: RemoteResult,
}

/// Where a submitted record ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// No daemon connected; the record went to the console.
    Console,
    Remote(Exchange),
}

impl Delivery {
    pub fn is_success(&self) -> bool {
        match self {
            Delivery::Console => true,
            Delivery::Remote(exchange) => exchange.result.is_success(),
        }
    }
}

/// A process's handle on its log daemon.
///
/// Holds at most one connection. Without one, records are written to the
/// console (stderr unless replaced with [`LogClient::with_console`]).
pub struct LogClient {
    connection: Option<Transport>,
    console: Box<dyn Write + Send>,
}

impl Default for LogClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogClient")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl LogClient {
    pub fn new() -> Self {
        Self::with_console(io::stderr())
    }

    pub fn with_console(console: impl Write + Send + 'static) -> Self {
        Self {
            connection: None,
            console: Box::new(console),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connection_fd(&self) -> Option<RawFd> {
        self.connection.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Adopt `transport` as the active connection if one is given; `None`
    /// leaves the current state alone. Returns the active descriptor.
    pub fn install(&mut self, transport: Option<Transport>) -> Option<RawFd> {
        if let Some(transport) = transport {
            self.connection = Some(transport);
        }
        self.connection_fd()
    }

    /// Connect through a named pipe opened write-only and synchronous.
    pub fn connect_via_file(&mut self, path: &Path) -> Result<RawFd, ClientError> {
        self.connect_with(path, "cannot open log pipe", Transport::open_pipe)
    }

    /// Connect through a local stream socket.
    pub fn connect_via_socket(&mut self, path: &Path) -> Result<RawFd, ClientError> {
        self.connect_with(path, "cannot connect socket", Transport::connect_socket)
    }

    fn connect_with(
        &mut self,
        path: &Path,
        diagnostic: &str,
        open: impl FnOnce(&Path) -> io::Result<Transport>,
    ) -> Result<RawFd, ClientError> {
        if path.as_os_str().is_empty() {
            return Err(ClientError::InvalidArgument("path"));
        }
        if self.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }
        match open(path) {
            Ok(transport) => {
                tracing::debug!(path = %path.display(), "connected to log daemon");
                self.install(Some(transport)).ok_or(ClientError::NotConnected)
            }
            Err(source) => {
                let _ = writeln!(self.console, "{diagnostic} {}: {source}", path.display());
                Err(ClientError::Transport {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Close the active connection, if any.
    pub fn disconnect(&mut self) {
        if let Some(transport) = self.connection.take() {
            tracing::debug!(fd = transport.as_raw_fd(), "disconnected from log daemon");
        }
    }

    /// Send one request and block until its `OK` or `FAIL` arrives.
    ///
    /// Messages seen before the terminal one are read in full and
    /// discarded. On success `errno` is set to the remote result's code.
    pub fn exchange(&mut self, op: Operation, payload: &[u8]) -> Result<Exchange, ClientError> {
        let written = self.send_request(op, payload)?;
        let result = self.await_terminal()?;
        Ok(Exchange { written, result })
    }

    fn send_request(&mut self, op: Operation, payload: &[u8]) -> Result<usize, ClientError> {
        let transport = self.connection.as_mut().ok_or(ClientError::NotConnected)?;
        let written = write_message(transport, &Message::new(op, payload))?;
        tracing::debug!(op = %op, written, "request sent");
        Ok(written)
    }

    fn await_terminal(&mut self) -> Result<RemoteResult, ClientError> {
        let transport = self.connection.as_mut().ok_or(ClientError::NotConnected)?;
        loop {
            let message = read_message(transport)?;
            match message.operation() {
                Some(op) if op.is_terminal() => {
                    let result = RemoteResult::from_terminal(&message);
                    errno::set(result.errno());
                    return Ok(result);
                }
                _ => tracing::debug!(
                    code = message.code,
                    len = message.payload.len(),
                    "skipping non-terminal message"
                ),
            }
        }
    }

    fn request_path(&mut self, op: Operation, path: &Path) -> Result<Exchange, ClientError> {
        if path.as_os_str().is_empty() {
            return Err(ClientError::InvalidArgument("path"));
        }
        self.exchange(op, path.as_os_str().as_bytes())
    }

    /// Ask the daemon to accept clients on an additional socket at `path`.
    pub fn request_listen(&mut self, path: &Path) -> Result<Exchange, ClientError> {
        self.request_path(Operation::Listen, path)
    }

    /// Ask the daemon to use `path` as its primary output.
    pub fn request_open(&mut self, path: &Path) -> Result<Exchange, ClientError> {
        self.request_path(Operation::Open, path)
    }

    /// Ask the daemon to terminate.
    ///
    /// Once the request is on the wire the local connection is closed,
    /// whatever the reply. If it could not be sent the connection is kept.
    pub fn request_exit(&mut self) -> Result<Exchange, ClientError> {
        let written = self.send_request(Operation::Quit, &[])?;
        let result = self.await_terminal();
        self.disconnect();
        Ok(Exchange {
            written,
            result: result?,
        })
    }

    /// Ask the daemon to start importing the kernel ring buffer.
    pub fn request_kernel_import(&mut self) -> Result<Exchange, ClientError> {
        self.exchange(Operation::Klog, &[])
    }

    /// Deliver `record` with its message trimmed of trailing whitespace.
    ///
    /// Without a connection the record is printed as `<tag>: <message>` on
    /// the console and the call succeeds.
    pub fn submit(&mut self, record: &LogRecord) -> Result<Delivery, ClientError> {
        let record = record.trimmed();
        if !self.is_connected() {
            let _ = writeln!(self.console, "{}", record.console_line());
            let _ = self.console.flush();
            return Ok(Delivery::Console);
        }
        self.exchange(Operation::Add, &record.encode())
            .map(Delivery::Remote)
    }

    /// Build a record stamped with the current time and pid, and submit it.
    pub fn emit(
        &mut self,
        severity: Severity,
        tag: &str,
        message: &str,
    ) -> Result<Delivery, ClientError> {
        if tag.is_empty() {
            return Err(ClientError::InvalidArgument("tag"));
        }
        self.submit(&LogRecord::new(severity, tag, message))
    }

    /// [`emit`](Self::emit) a message rendered from `args`.
    ///
    /// `errno` is left untouched unless a daemon exchange happened.
    pub fn emit_fmt(
        &mut self,
        severity: Severity,
        tag: &str,
        args: fmt::Arguments<'_>,
    ) -> Result<Delivery, ClientError> {
        let guard = ErrnoGuard::save();
        let message = format::render(args);
        settle(guard, self.emit(severity, tag, &message))
    }

    /// Like [`emit_fmt`](Self::emit_fmt), appending a description of the
    /// `errno` value current at entry when it is non-zero.
    pub fn emit_errno(
        &mut self,
        severity: Severity,
        tag: &str,
        args: fmt::Arguments<'_>,
    ) -> Result<Delivery, ClientError> {
        let guard = ErrnoGuard::save();
        let message = format::render_with_errno(args, guard.saved());
        settle(guard, self.emit(severity, tag, &message))
    }

    /// Log, then hand back `status` so an error path can do both at once.
    pub fn return_emit_fmt<T>(
        &mut self,
        status: T,
        severity: Severity,
        tag: &str,
        args: fmt::Arguments<'_>,
    ) -> T {
        let _ = self.emit_fmt(severity, tag, args);
        status
    }

    pub fn return_emit_errno<T>(
        &mut self,
        status: T,
        severity: Severity,
        tag: &str,
        args: fmt::Arguments<'_>,
    ) -> T {
        let _ = self.emit_errno(severity, tag, args);
        status
    }
}

/// Restore `errno` unless the daemon answered, in which case its result
/// (already mirrored by the exchange) stands.
fn settle(
    guard: ErrnoGuard,
    result: Result<Delivery, ClientError>,
) -> Result<Delivery, ClientError> {
    if let Ok(Delivery::Remote(_)) = result {
        guard.release();
    }
    result
}

/// Decimal error code in a terminal payload. NULs and whitespace around the
/// digits are ignored; anything else yields `None`.
fn parse_code(payload: &[u8]) -> Option<i32> {
    let text = std::str::from_utf8(payload).ok()?;
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if text.is_empty() {
        return None;
    }
    text.parse().ok()
}
