//! The local side of the proxy: an already-connected `AF_UNIX` socket to the
//! real application or the real compositor, which — unlike the inter-proxy
//! channel — can carry file descriptors natively via `SCM_RIGHTS`.
//!
//! Accepting the socket is out of scope; this module only reads and writes
//! an already connected [`UnixStream`] so the pipeline has somewhere to get
//! the real fds it is about to translate into shadow fds, and somewhere to
//! hand back the fds it reconstructs.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use sendfd::{RecvWithFd, SendWithFd};

use crate::error::FdError;

/// Maximum number of ancillary fds accepted in a single `recvmsg` call. A
/// Wayland message signature carries at most a handful of fd arguments, so
/// this comfortably bounds any single frame's worth of descriptors.
const MAX_FDS_PER_RECV: usize = 28;

/// Wraps a connected local socket, passing descriptors across it alongside
/// bytes via `SCM_RIGHTS`.
pub struct LocalConnection {
    stream: UnixStream,
}

impl LocalConnection {
    pub fn new(stream: UnixStream) -> Self {
        Self { stream }
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    /// Read up to `buf.len()` bytes plus any ancillary fds sent alongside
    /// them. Returns the number of bytes read and the fds received, in the
    /// order the kernel delivered them.
    pub fn recv(&self, buf: &mut [u8]) -> Result<(usize, Vec<OwnedFd>), FdError> {
        let mut raw_fds = [0 as RawFd; MAX_FDS_PER_RECV];
        let (n, fd_count) = self
            .stream
            .recv_with_fd(buf, &mut raw_fds)
            .map_err(FdError::Io)?;
        // SAFETY: `recv_with_fd` reports `fd_count` fds it just received and
        // transferred ownership of into this process; each entry in
        // `raw_fds[..fd_count]` is therefore a live, uniquely-owned fd.
        let fds = raw_fds[..fd_count]
            .iter()
            .map(|&raw| unsafe { OwnedFd::from_raw_fd(raw) })
            .collect();
        Ok((n, fds))
    }

    /// Write `buf` and hand over ownership of `fds` alongside it in one
    /// `sendmsg` call.
    pub fn send(&self, buf: &[u8], fds: &[RawFd]) -> Result<usize, FdError> {
        self.stream.send_with_fd(buf, fds).map_err(FdError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn round_trips_bytes_and_an_fd_over_a_socketpair() {
        let (a, b) = UnixStream::pair().unwrap();
        let sender = LocalConnection::new(a);
        let receiver = LocalConnection::new(b);

        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(b"payload").unwrap();
        let fd: OwnedFd = tmp.into();

        sender.send(b"hello", &[fd.as_raw_fd()]).unwrap();
        std::mem::forget(fd); // ownership now lives with the kernel message

        let mut buf = [0u8; 5];
        let (n, received_fds) = receiver.recv(&mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(received_fds.len(), 1);
    }
}
