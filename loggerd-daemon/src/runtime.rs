use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::errno::Errno;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, Mutex};

use loggerd_core::{CodecError, LogRecord, LoggerConfig, Message, Operation, Severity};

use crate::error::{io_err, DaemonError};
use crate::kmsg::{self, KMSG_PATH};
use crate::protocol::{codec_errno, errno_of, path_payload, read_message, write_message};
use crate::sink::LogSink;

/// State shared by every connection of one daemon process.
struct DaemonState {
    sink: Arc<Mutex<LogSink>>,
    threshold: Severity,
    listeners: Mutex<Vec<PathBuf>>,
    klog_started: AtomicBool,
    shutdown: broadcast::Sender<()>,
}

struct Reply {
    message: Message,
    quit: bool,
}

impl Reply {
    fn done(result: Result<(), i32>) -> Self {
        let message = match result {
            Ok(()) => Message::empty(Operation::Ok),
            Err(errno) => Message::fail_with(errno),
        };
        Self {
            message,
            quit: false,
        }
    }
}

/// Run the daemon on an already connected stream and return the process
/// exit status. This is the body the forked child executes.
pub fn serve(stream: StdUnixStream, config: LoggerConfig) -> i32 {
    match start_blocking(stream, config) {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, "loggerd exited with error");
            1
        }
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(stream: StdUnixStream, config: LoggerConfig) -> Result<(), DaemonError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    let result = runtime.block_on(run(stream, config));
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

/// Run the daemon runtime.
///
/// Sends the readiness `OK` on `stream` once the sink is set up, then serves
/// requests until `QUIT`, or until the bootstrap connection closes while no
/// listening socket is bound.
pub async fn run(stream: StdUnixStream, config: LoggerConfig) -> Result<(), DaemonError> {
    stream
        .set_nonblocking(true)
        .map_err(|e| io_err("bootstrap socket", e))?;
    let mut stream = UnixStream::from_std(stream).map_err(|e| io_err("bootstrap socket", e))?;

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(16);
    let state = Arc::new(DaemonState {
        sink: Arc::new(Mutex::new(LogSink::new(config.buffer_records))),
        threshold: config.level,
        listeners: Mutex::new(Vec::new()),
        klog_started: AtomicBool::new(false),
        shutdown: shutdown_tx,
    });

    if let Some(output) = &config.output {
        if let Err(err) = state.sink.lock().await.open(output) {
            tracing::warn!(path = %output.display(), error = %err, "configured output unavailable, buffering");
        }
    }

    write_message(&mut stream, &Message::empty(Operation::Ok)).await?;
    tracing::info!(pid = std::process::id(), "loggerd ready");

    {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_client(stream, state.clone()).await {
                tracing::error!(error = %err, "bootstrap connection error");
            }
            if state.listeners.lock().await.is_empty() {
                tracing::info!("bootstrap connection closed with no listeners, shutting down");
                state.request_shutdown();
            }
        });
    }

    let _ = shutdown_rx.recv().await;

    for path in state.listeners.lock().await.drain(..) {
        let _ = fs::remove_file(&path);
    }
    tracing::info!("loggerd stopped");
    Ok(())
}

/// Connection task. Boxed because `LISTEN` spawns further connection tasks
/// from inside one, and a recursive `async fn` has no nameable `Send` type.
type ConnectionTask = Pin<Box<dyn Future<Output = Result<(), DaemonError>> + Send>>;

fn handle_client(stream: UnixStream, state: Arc<DaemonState>) -> ConnectionTask {
    Box::pin(serve_connection(stream, state))
}

async fn serve_connection(stream: UnixStream, state: Arc<DaemonState>) -> Result<(), DaemonError> {
    let (mut reader, mut writer) = stream.into_split();

    loop {
        let request = match read_message(&mut reader).await {
            Ok(request) => request,
            Err(CodecError::Io(err)) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(err @ CodecError::PayloadTooLarge(_)) => {
                // The payload was never read, so the stream cannot be realigned.
                write_message(&mut writer, &Message::fail_with(codec_errno(&err))).await?;
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        let reply = state.dispatch(request).await;
        write_message(&mut writer, &reply.message).await?;
        if reply.quit {
            state.request_shutdown();
            break;
        }
    }

    Ok(())
}

impl DaemonState {
    async fn dispatch(self: &Arc<Self>, request: Message) -> Reply {
        let op = request.operation();
        tracing::debug!(code = request.code, len = request.payload.len(), "request");

        match op {
            Some(Operation::Add) => Reply::done(self.add(&request.payload).await),
            Some(Operation::Open) => Reply::done(match path_payload(&request.payload) {
                Ok(path) => self.sink.lock().await.open(&path).map_err(|e| errno_of(&e)),
                Err(errno) => Err(errno),
            }),
            Some(Operation::Listen) => Reply::done(match path_payload(&request.payload) {
                Ok(path) => self.listen(path).await,
                Err(errno) => Err(errno),
            }),
            Some(Operation::Klog) => Reply::done(self.import_kernel_log()),
            Some(Operation::Quit) => Reply {
                message: Message::empty(Operation::Ok),
                quit: true,
            },
            Some(Operation::Ok) | Some(Operation::Fail) | None => {
                tracing::warn!(code = request.code, "unsupported request");
                Reply::done(Err(Errno::ENOSYS as i32))
            }
        }
    }

    async fn add(&self, payload: &[u8]) -> Result<(), i32> {
        let record = LogRecord::decode(payload).map_err(|e| codec_errno(&e))?;
        if !record.severity().admits(self.threshold) {
            return Ok(());
        }
        self.sink
            .lock()
            .await
            .push(&record)
            .map_err(|e| errno_of(&e))
    }

    async fn listen(self: &Arc<Self>, path: PathBuf) -> Result<(), i32> {
        prepare_socket_for_bind(&path)?;
        let listener = UnixListener::bind(&path).map_err(|e| errno_of(&e))?;
        set_socket_permissions(&path).map_err(|e| errno_of(&e))?;
        self.listeners.lock().await.push(path.clone());

        let state = self.clone();
        tokio::spawn(async move {
            if let Err(err) = accept_loop(listener, &path, state).await {
                tracing::error!(socket = %path.display(), error = %err, "listener failed");
            }
        });
        Ok(())
    }

    fn import_kernel_log(&self) -> Result<(), i32> {
        if self.klog_started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        kmsg::spawn_import(Path::new(KMSG_PATH), self.sink.clone()).map_err(|err| {
            self.klog_started.store(false, Ordering::SeqCst);
            errno_of(&err)
        })
    }

    fn request_shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}

async fn accept_loop(
    listener: UnixListener,
    socket: &Path,
    state: Arc<DaemonState>,
) -> Result<(), DaemonError> {
    tracing::info!(socket = %socket.display(), "listening for log clients");
    let mut shutdown_rx = state.shutdown.subscribe();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(socket, e))?;
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_client(stream, state).await {
                        tracing::error!(error = %err, "log client error");
                    }
                });
            }
        }
    }

    Ok(())
}

/// Clear `socket` for binding. Only a socket nobody answers on is removed;
/// a live socket is `EADDRINUSE` and any other existing file is `EEXIST`.
fn prepare_socket_for_bind(socket: &Path) -> Result<(), i32> {
    let metadata = match fs::symlink_metadata(socket) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(errno_of(&err)),
    };
    if !metadata.file_type().is_socket() {
        tracing::warn!(path = %socket.display(), "refusing to listen over a non-socket file");
        return Err(Errno::EEXIST as i32);
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => return Err(Errno::EADDRINUSE as i32),
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale log socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(errno_of(&err)),
    }
}

fn set_socket_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}
