//! The descriptor a client talks to its daemon through.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::net::UnixStream;
use std::path::Path;

use nix::fcntl::OFlag;

/// A connected channel to a daemon.
#[derive(Debug)]
pub enum Transport {
    /// A named pipe opened write-only with synchronous writes. Reads go to
    /// the OS as-is, so responses cannot be received over it.
    Pipe(File),
    /// A local stream socket.
    Socket(UnixStream),
}

impl Transport {
    pub fn open_pipe(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .custom_flags(OFlag::O_SYNC.bits())
            .open(path)?;
        Ok(Transport::Pipe(file))
    }

    pub fn connect_socket(path: &Path) -> io::Result<Self> {
        UnixStream::connect(path).map(Transport::Socket)
    }
}

impl From<UnixStream> for Transport {
    fn from(stream: UnixStream) -> Self {
        Transport::Socket(stream)
    }
}

impl AsRawFd for Transport {
    fn as_raw_fd(&self) -> RawFd {
        match self {
            Transport::Pipe(file) => file.as_raw_fd(),
            Transport::Socket(stream) => stream.as_raw_fd(),
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Pipe(file) => file.read(buf),
            Transport::Socket(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Pipe(file) => file.write(buf),
            Transport::Socket(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Pipe(file) => file.flush(),
            Transport::Socket(stream) => stream.flush(),
        }
    }
}
