//! Graphics-buffer capability boundary.
//!
//! The real backend (driver import/export, dmabuf mmap) is out of scope.
//! This module only defines the seam: a trait the pipeline calls through,
//! and a null implementation used whenever `--no-gpu` is set or no device
//! path was configured, so capability-gated behavior degrades to a no-op
//! instead of threading an `Option` through every call site.

use crate::{error::WorkerError, shadow::GraphicsFormat};

/// What the pipeline needs from a graphics backend to treat a dmabuf-backed
/// shadow as a synchronizable buffer instead of opaque bytes.
pub trait GraphicsBackend: Send + Sync {
    /// Import a buffer described by `format`, backed by `fd`, returning an
    /// opaque handle used by later calls. The hardware import itself is the
    /// opaque capability this trait exists to keep out of this crate.
    fn import(&self, fd: std::os::fd::RawFd, format: &GraphicsFormat) -> Result<u64, WorkerError>;

    /// Read the buffer's current content into `out` for diffing.
    fn read_back(&self, handle: u64, out: &mut [u8]) -> Result<(), WorkerError>;

    /// Write new content into the buffer.
    fn write(&self, handle: u64, data: &[u8]) -> Result<(), WorkerError>;

    fn release(&self, handle: u64);
}

/// Backend used when no graphics device is configured or `--no-gpu` was
/// passed: graphics buffers are tracked (their descriptor still crosses the
/// channel) but never read back or written, so they arrive on the far side
/// as an allocated-but-unsynchronized buffer.
#[derive(Debug, Default)]
pub struct NullGraphicsBackend;

impl GraphicsBackend for NullGraphicsBackend {
    fn import(&self, _fd: std::os::fd::RawFd, _format: &GraphicsFormat) -> Result<u64, WorkerError> {
        Ok(0)
    }

    fn read_back(&self, _handle: u64, _out: &mut [u8]) -> Result<(), WorkerError> {
        Ok(())
    }

    fn write(&self, _handle: u64, _data: &[u8]) -> Result<(), WorkerError> {
        Ok(())
    }

    fn release(&self, _handle: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_backend_is_a_harmless_no_op() {
        let backend = NullGraphicsBackend;
        let format = GraphicsFormat {
            width: 4,
            height: 4,
            format: 0,
            planes: vec![],
            modifier: 0,
        };
        let handle = backend.import(-1, &format).unwrap();
        let mut buf = [0u8; 16];
        backend.read_back(handle, &mut buf).unwrap();
        assert_eq!(buf, [0u8; 16]);
        backend.write(handle, &buf).unwrap();
        backend.release(handle);
    }
}
