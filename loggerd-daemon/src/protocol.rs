//! Async side of the message framing, plus errno helpers for `FAIL` replies.

use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use nix::errno::Errno;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use loggerd_core::message::{Header, HEADER_SIZE};
use loggerd_core::{CodecError, Message};

pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message, CodecError> {
    let mut raw = [0u8; HEADER_SIZE];
    reader.read_exact(&mut raw).await?;
    let header = Header::parse(&raw)?;
    let mut payload = vec![0u8; header.length as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Message {
        code: header.code,
        payload,
    })
}

pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Message,
) -> Result<(), CodecError> {
    writer.write_all(&message.to_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// errno carried back to the client for an I/O failure.
pub fn errno_of(err: &io::Error) -> i32 {
    err.raw_os_error().unwrap_or(Errno::EIO as i32)
}

/// errno carried back to the client for a codec failure.
pub fn codec_errno(err: &CodecError) -> i32 {
    match err {
        CodecError::Io(err) => errno_of(err),
        CodecError::PayloadTooLarge(_) => Errno::EMSGSIZE as i32,
        CodecError::MalformedRecord(_) => Errno::EINVAL as i32,
    }
}

/// Path argument of `OPEN`/`LISTEN`. Trailing NULs are tolerated.
pub fn path_payload(payload: &[u8]) -> Result<PathBuf, i32> {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    if end == 0 {
        return Err(Errno::EINVAL as i32);
    }
    Ok(PathBuf::from(std::ffi::OsStr::from_bytes(&payload[..end])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use loggerd_core::Operation;

    #[tokio::test]
    async fn async_framing_matches_blocking_framing() {
        let mut buf = Vec::new();
        loggerd_core::write_message(&mut buf, &Message::new(Operation::Open, "/tmp/x")).unwrap();
        loggerd_core::write_message(&mut buf, &Message::fail_with(2)).unwrap();

        let mut reader = buf.as_slice();
        let open = read_message(&mut reader).await.unwrap();
        assert_eq!(open.operation(), Some(Operation::Open));
        assert_eq!(open.payload, b"/tmp/x");
        let fail = read_message(&mut reader).await.unwrap();
        assert_eq!(fail.payload, b"2");

        let mut out = Vec::new();
        write_message(&mut out, &Message::empty(Operation::Ok)).await.unwrap();
        let back = loggerd_core::read_message(&mut out.as_slice()).unwrap();
        assert_eq!(back.operation(), Some(Operation::Ok));
    }

    #[test]
    fn path_payload_strips_nul_and_rejects_empty() {
        assert_eq!(path_payload(b"/var/log/a\0\0").unwrap(), PathBuf::from("/var/log/a"));
        assert_eq!(path_payload(b"").unwrap_err(), Errno::EINVAL as i32);
        assert_eq!(path_payload(b"\0").unwrap_err(), Errno::EINVAL as i32);
    }

    #[test]
    fn io_errors_keep_their_os_code() {
        let err = io::Error::from_raw_os_error(Errno::EACCES as i32);
        assert_eq!(errno_of(&err), 13);
        assert_eq!(errno_of(&io::Error::new(io::ErrorKind::Other, "x")), 5);
    }
}
