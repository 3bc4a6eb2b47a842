//! Where accepted records go.
//!
//! Until a primary output is opened, records wait in a bounded in-memory
//! queue (oldest dropped first). Opening an output flushes the queue into it.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use loggerd_core::LogRecord;

pub struct LogSink {
    output: Option<(PathBuf, File)>,
    pending: VecDeque<LogRecord>,
    capacity: usize,
    dropped: u64,
}

impl LogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            output: None,
            pending: VecDeque::new(),
            capacity,
            dropped: 0,
        }
    }

    /// Make `path` the primary output. Buffered records are written to it
    /// first; the previous output, if any, is closed.
    pub fn open(&mut self, path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        while let Some(record) = self.pending.front() {
            file.write_all(format_line(record).as_bytes())?;
            self.pending.pop_front();
        }
        file.flush()?;
        tracing::info!(path = %path.display(), "primary log output opened");
        self.output = Some((path.to_path_buf(), file));
        Ok(())
    }

    pub fn push(&mut self, record: &LogRecord) -> io::Result<()> {
        if let Some((_, file)) = self.output.as_mut() {
            return file.write_all(format_line(record).as_bytes());
        }
        if self.capacity == 0 {
            self.dropped += 1;
            return Ok(());
        }
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
            self.dropped += 1;
            if self.dropped.is_power_of_two() {
                tracing::warn!(dropped = self.dropped, "log buffer full, dropping oldest records");
            }
        }
        self.pending.push_back(record.clone());
        Ok(())
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_ref().map(|(path, _)| path.as_path())
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// `<time> <LEVEL> <tag>[<pid>]: <message>` with a trailing newline.
pub fn format_line(record: &LogRecord) -> String {
    let time = DateTime::<Utc>::from_timestamp(record.timestamp(), 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| record.timestamp().to_string());
    format!(
        "{time} {} {}[{}]: {}\n",
        record.severity(),
        record.tag(),
        record.pid(),
        record.message()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use loggerd_core::Severity;
    use std::fs;
    use tempfile::TempDir;

    fn record(message: &str) -> LogRecord {
        LogRecord::with_origin(Severity::Notice, "init", message, 1_700_000_000, 1)
    }

    #[test]
    fn line_format_is_stable() {
        assert_eq!(
            format_line(&record("mounted /data")),
            "2023-11-14T22:13:20Z NOTICE init[1]: mounted /data\n"
        );
    }

    #[test]
    fn records_are_buffered_until_output_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages");
        let mut sink = LogSink::new(8);

        sink.push(&record("one")).unwrap();
        sink.push(&record("two")).unwrap();
        assert_eq!(sink.pending(), 2);
        assert!(!path.exists());

        sink.open(&path).unwrap();
        assert_eq!(sink.pending(), 0);
        sink.push(&record("three")).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("one"));
        assert!(lines[2].ends_with("three"));
        assert_eq!(sink.output_path(), Some(path.as_path()));
    }

    #[test]
    fn full_buffer_drops_oldest() {
        let mut sink = LogSink::new(2);
        for msg in ["a", "b", "c"] {
            sink.push(&record(msg)).unwrap();
        }
        assert_eq!(sink.pending(), 2);
        assert_eq!(sink.dropped(), 1);
    }

    #[test]
    fn open_failure_keeps_buffer() {
        let dir = TempDir::new().unwrap();
        let mut sink = LogSink::new(4);
        sink.push(&record("kept")).unwrap();
        let err = sink.open(&dir.path().join("missing").join("messages")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(sink.pending(), 1);
        assert!(sink.output_path().is_none());
    }
}
