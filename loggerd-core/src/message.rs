//! Length-prefixed request/response framing.
//!
//! ```text
//! +-----------+-------------+----------------------+
//! | code: u32 | length: u64 | payload: length bytes|
//! +-----------+-------------+----------------------+
//! ```
//!
//! Integers are native endian; both ends always live on the same host.

use std::fmt;
use std::io::{Read, Write};

use crate::error::CodecError;

pub const HEADER_SIZE: usize = 12;

/// Upper bound on a payload a reader will allocate for.
pub const MAX_PAYLOAD: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Operation {
    Ok = 0,
    Fail = 1,
    Open = 2,
    Add = 3,
    Listen = 4,
    Quit = 5,
    Klog = 6,
}

impl Operation {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Operation::Ok,
            1 => Operation::Fail,
            2 => Operation::Open,
            3 => Operation::Add,
            4 => Operation::Listen,
            5 => Operation::Quit,
            6 => Operation::Klog,
            _ => return None,
        })
    }

    /// `OK` and `FAIL` end an exchange.
    pub fn is_terminal(self) -> bool {
        matches!(self, Operation::Ok | Operation::Fail)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Ok => "OK",
            Operation::Fail => "FAIL",
            Operation::Open => "OPEN",
            Operation::Add => "ADD",
            Operation::Listen => "LISTEN",
            Operation::Quit => "QUIT",
            Operation::Klog => "KLOG",
        };
        f.write_str(name)
    }
}

/// One framed message. The code stays raw so that messages with codes this
/// build does not know can still be read, and their payload consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub code: u32,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(op: Operation, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            code: op.code(),
            payload: payload.into(),
        }
    }

    pub fn empty(op: Operation) -> Self {
        Self::new(op, Vec::new())
    }

    /// `FAIL` carrying a decimal error code.
    pub fn fail_with(errno: i32) -> Self {
        Self::new(Operation::Fail, errno.to_string())
    }

    pub fn operation(&self) -> Option<Operation> {
        Operation::from_code(self.code)
    }

    /// Header and payload as one contiguous buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.code.to_ne_bytes());
        buf.extend_from_slice(&(self.payload.len() as u64).to_ne_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Decoded fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub code: u32,
    pub length: u64,
}

impl Header {
    pub fn parse(raw: &[u8; HEADER_SIZE]) -> Result<Self, CodecError> {
        let mut code = [0u8; 4];
        let mut length = [0u8; 8];
        code.copy_from_slice(&raw[..4]);
        length.copy_from_slice(&raw[4..]);
        let header = Self {
            code: u32::from_ne_bytes(code),
            length: u64::from_ne_bytes(length),
        };
        if header.length > MAX_PAYLOAD {
            return Err(CodecError::PayloadTooLarge(header.length));
        }
        Ok(header)
    }
}

/// Write `message` as one unit. Returns the number of bytes written.
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<usize, CodecError> {
    let bytes = message.to_bytes();
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(bytes.len())
}

/// Read a header and then exactly `length` payload bytes.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Message, CodecError> {
    let mut raw = [0u8; HEADER_SIZE];
    reader.read_exact(&mut raw)?;
    let header = Header::parse(&raw)?;
    let mut payload = vec![0u8; header.length as usize];
    reader.read_exact(&mut payload)?;
    Ok(Message {
        code: header.code,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    /// Hands out at most `chunk` bytes per read call.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn header_precedes_exact_payload() {
        let bytes = Message::new(Operation::Open, "/var/log/messages").to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE + 17);
        assert_eq!(&bytes[..4], &Operation::Open.code().to_ne_bytes());
        assert_eq!(&bytes[4..12], &17u64.to_ne_bytes());
        assert_eq!(&bytes[12..], b"/var/log/messages");
    }

    #[test]
    fn partial_reads_are_reassembled() {
        let mut stream = Vec::new();
        write_message(&mut stream, &Message::new(Operation::Add, vec![7u8; 300])).unwrap();
        write_message(&mut stream, &Message::empty(Operation::Ok)).unwrap();

        let mut reader = Trickle {
            data: &stream,
            chunk: 5,
        };
        let first = read_message(&mut reader).unwrap();
        assert_eq!(first.operation(), Some(Operation::Add));
        assert_eq!(first.payload.len(), 300);
        let second = read_message(&mut reader).unwrap();
        assert_eq!(second.operation(), Some(Operation::Ok));
        assert!(second.payload.is_empty());
    }

    #[test]
    fn unknown_codes_are_still_framed() {
        let mut stream = Vec::new();
        write_message(&mut stream, &Message { code: 99, payload: b"xyz".to_vec() }).unwrap();
        let msg = read_message(&mut Cursor::new(stream)).unwrap();
        assert_eq!(msg.code, 99);
        assert_eq!(msg.operation(), None);
        assert_eq!(msg.payload, b"xyz");
    }

    #[test]
    fn truncated_stream_is_an_io_error() {
        let bytes = Message::new(Operation::Listen, "/run/log.sock").to_bytes();
        let err = read_message(&mut Cursor::new(&bytes[..bytes.len() - 3])).unwrap_err();
        assert!(matches!(err, CodecError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn oversized_length_is_rejected_before_allocating() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&Operation::Add.code().to_ne_bytes());
        raw.extend_from_slice(&(MAX_PAYLOAD + 1).to_ne_bytes());
        let err = read_message(&mut Cursor::new(raw)).unwrap_err();
        assert!(matches!(err, CodecError::PayloadTooLarge(_)));
    }

    #[test]
    fn fail_payload_is_decimal_ascii() {
        assert_eq!(Message::fail_with(13).payload, b"13");
    }
}
