//! The structured log record and its fixed-size wire layout.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CodecError;
use crate::severity::Severity;

/// Capacity of the tag field in bytes, terminating NUL included.
pub const TAG_CAPACITY: usize = 64;

/// Capacity of the message field in bytes, terminating NUL included.
pub const MESSAGE_CAPACITY: usize = 4096;

/// Size of an encoded record: severity, tag, message, timestamp, pid.
pub const RECORD_SIZE: usize = 4 + TAG_CAPACITY + MESSAGE_CAPACITY + 8 + 4;

/// One log entry. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    severity: Severity,
    tag: String,
    message: String,
    timestamp: i64,
    pid: i32,
}

impl LogRecord {
    /// Build a record stamped with the current time and process id.
    ///
    /// Tag and message are cut to fit their capacities.
    pub fn new(severity: Severity, tag: &str, message: &str) -> Self {
        Self::with_origin(
            severity,
            tag,
            message,
            unix_seconds_now(),
            std::process::id() as i32,
        )
    }

    pub fn with_origin(
        severity: Severity,
        tag: &str,
        message: &str,
        timestamp: i64,
        pid: i32,
    ) -> Self {
        Self {
            severity,
            tag: truncate_to(tag, TAG_CAPACITY - 1).to_string(),
            message: truncate_to(message, MESSAGE_CAPACITY - 1).to_string(),
            timestamp,
            pid,
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Seconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Copy of this record with trailing whitespace and control characters
    /// removed from the message. The tag is left alone.
    pub fn trimmed(&self) -> Self {
        let message = self
            .message
            .trim_end_matches(|c: char| c.is_whitespace() || c.is_control());
        Self {
            message: message.to_string(),
            ..self.clone()
        }
    }

    /// `<tag>: <message>`, the console fallback form without newline.
    pub fn console_line(&self) -> String {
        format!("{}: {}", self.tag, self.message)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RECORD_SIZE);
        buf.extend_from_slice(&self.severity.as_u32().to_ne_bytes());
        put_field(&mut buf, &self.tag, TAG_CAPACITY);
        put_field(&mut buf, &self.message, MESSAGE_CAPACITY);
        buf.extend_from_slice(&self.timestamp.to_ne_bytes());
        buf.extend_from_slice(&self.pid.to_ne_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != RECORD_SIZE {
            return Err(CodecError::MalformedRecord(format!(
                "expected {RECORD_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let (level, rest) = bytes.split_at(4);
        let (tag, rest) = rest.split_at(TAG_CAPACITY);
        let (message, rest) = rest.split_at(MESSAGE_CAPACITY);
        let (timestamp, pid) = rest.split_at(8);

        let level = u32::from_ne_bytes(array(level));
        let severity = Severity::from_u32(level)
            .ok_or_else(|| CodecError::MalformedRecord(format!("unknown level {level}")))?;

        Ok(Self {
            severity,
            tag: take_field(tag)?,
            message: take_field(message)?,
            timestamp: i64::from_ne_bytes(array(timestamp)),
            pid: i32::from_ne_bytes(array(pid)),
        })
    }
}

pub fn unix_seconds_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Longest prefix of `s` no longer than `max` bytes that ends on a char
/// boundary.
pub fn truncate_to(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn put_field(buf: &mut Vec<u8>, text: &str, capacity: usize) {
    let text = truncate_to(text, capacity - 1).as_bytes();
    buf.extend_from_slice(text);
    buf.resize(buf.len() + capacity - text.len(), 0);
}

fn take_field(raw: &[u8]) -> Result<String, CodecError> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8(raw[..end].to_vec())
        .map_err(|e| CodecError::MalformedRecord(format!("field is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trimming_strips_trailing_whitespace_only_from_message() {
        let record = LogRecord::new(Severity::Info, "net ", "hello \t\n");
        let trimmed = record.trimmed();
        assert_eq!(trimmed.message(), "hello");
        assert_eq!(trimmed.tag(), "net ");
        assert_eq!(record.message(), "hello \t\n", "original is untouched");
    }

    #[test]
    fn trimming_strips_control_characters() {
        let record = LogRecord::new(Severity::Info, "t", "done\r\0\x07");
        assert_eq!(record.trimmed().message(), "done");
    }

    #[test]
    fn fields_are_cut_to_capacity() {
        let tag = "t".repeat(200);
        let message = "m".repeat(10_000);
        let record = LogRecord::new(Severity::Debug, &tag, &message);
        assert_eq!(record.tag().len(), TAG_CAPACITY - 1);
        assert_eq!(record.message().len(), MESSAGE_CAPACITY - 1);
    }

    #[test]
    fn truncation_never_splits_a_character() {
        // 'é' is two bytes; a cut at 3 bytes must back off to 2.
        assert_eq!(truncate_to("éé", 3), "é");
        assert_eq!(truncate_to("abc", 10), "abc");
    }

    #[test]
    fn record_is_stamped_with_current_process() {
        let record = LogRecord::new(Severity::Notice, "boot", "up");
        assert_eq!(record.pid(), std::process::id() as i32);
        assert!(record.timestamp() > 0);
    }

    #[test]
    fn encoded_record_has_fixed_size_and_decodes() {
        let record = LogRecord::with_origin(Severity::Warning, "disk", "almost full", 1_700_000_000, 42);
        let bytes = record.encode();
        assert_eq!(bytes.len(), RECORD_SIZE);
        assert_eq!(LogRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn decode_rejects_short_payload_and_bad_level() {
        assert!(matches!(
            LogRecord::decode(&[0u8; 10]),
            Err(CodecError::MalformedRecord(_))
        ));

        let mut bytes = LogRecord::new(Severity::Info, "t", "m").encode();
        bytes[..4].copy_from_slice(&99u32.to_ne_bytes());
        let err = LogRecord::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("unknown level 99"));
    }
}
