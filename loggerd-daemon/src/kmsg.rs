//! Kernel ring buffer import from `/dev/kmsg`.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use loggerd_core::record::unix_seconds_now;
use loggerd_core::{LogRecord, Severity};

use crate::sink::LogSink;

pub const KMSG_PATH: &str = "/dev/kmsg";
pub const KERNEL_TAG: &str = "kernel";

/// Parse one `/dev/kmsg` record: `<prio>,<seq>,<usec>,<flags>[,...];<text>`.
///
/// Continuation lines (` KEY=value`) and malformed lines yield `None`.
pub fn parse_line(line: &str) -> Option<LogRecord> {
    if line.starts_with(' ') {
        return None;
    }
    let (prefix, text) = line.split_once(';')?;
    let prio: u32 = prefix.split(',').next()?.trim().parse().ok()?;
    let severity = Severity::from_u32(prio & 7)?;
    Some(LogRecord::with_origin(
        severity,
        KERNEL_TAG,
        text,
        unix_seconds_now(),
        0,
    ))
}

/// Open `path` and feed every record read from it into `sink` on a
/// dedicated thread. The open happens on the caller so its error can be
/// reported back to the requesting client.
pub fn spawn_import(path: &Path, sink: Arc<Mutex<LogSink>>) -> io::Result<()> {
    let file = File::open(path)?;
    let path = path.to_path_buf();
    std::thread::Builder::new()
        .name("kmsg-import".into())
        .spawn(move || {
            let reader = BufReader::new(file);
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    // /dev/kmsg reports overwritten entries as EPIPE; keep reading.
                    Err(err) if err.raw_os_error() == Some(nix::errno::Errno::EPIPE as i32) => {
                        continue
                    }
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "kernel log import stopped");
                        break;
                    }
                };
                if let Some(record) = parse_line(&line) {
                    if let Err(err) = sink.blocking_lock().push(&record) {
                        tracing::warn!(error = %err, "failed to store kernel record");
                    }
                }
            }
        })?;
    Ok(())
}
