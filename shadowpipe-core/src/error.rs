//! Error taxonomy for the pipeline.
//!
//! Each variant says, via its doc comment, what the caller is expected to do
//! with it: some errors drop a single message, some poison a shadow, some are
//! fatal to the connection. The types are deliberately granular so a caller
//! can match on them instead of re-deriving the taxonomy from a string.

use shadowpipe_protocol::ParseError;
use thiserror::Error;

/// Parse-time errors. Log and drop the connection.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame header")]
    BadHeader,
    #[error("signature/size mismatch: {0}")]
    SizeCheck(#[from] ParseError),
    #[error("message for unknown interface carried {0} fd(s); cannot forward blind")]
    FdOnUnknownInterface(usize),
    #[error("object id {0} is already bound")]
    DoubleBind(u32),
}

/// Handler-level semantic errors. Log and drop the single message, the
/// connection survives.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("destructor referenced unknown object id {0}")]
    DestroyUnknown(u32),
    #[error("message referenced unbound object id {0}")]
    UnboundObject(u32),
    #[error("bind requested unsupported dynamic interface {0:?}")]
    UnsupportedDynamicInterface(String),
}

/// Fd classification failures. Log and drop the message carrying the fd.
#[derive(Debug, Error)]
pub enum FdError {
    #[error("fstat failed for fd: {0}")]
    Stat(#[source] std::io::Error),
    #[error("mmap failed for fd: {0}")]
    Mmap(#[source] std::io::Error),
    #[error("unsupported fd category")]
    UnsupportedCategory,
    #[error("local socket I/O failed: {0}")]
    Io(#[source] std::io::Error),
    #[error("fd reconstruction failed: {0}")]
    Reconstruct(#[source] std::io::Error),
}

/// Worker task failures. Content-update failures poison the shadow and the
/// pipeline continues; graphics-buffer init failures are fatal to the
/// connection (`fatal() == true`).
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("allocation failure while processing shadow {0}")]
    Allocation(i32),
    #[error("graphics driver error initializing shadow {0}: {1}")]
    GraphicsInit(i32, String),
    #[error("compression backend error: {0}")]
    Compression(String),
}

impl WorkerError {
    /// Whether this failure is critical enough to drop the whole connection.
    pub fn fatal(&self) -> bool {
        matches!(self, WorkerError::GraphicsInit(..))
    }
}

/// Channel I/O errors. Shut down both directions cleanly.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("channel write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("channel closed")]
    Closed,
}

/// Top-level pipeline error, used where a caller needs one type to bubble up
/// through `?` before deciding, at the top of the loop, which of the above
/// policies applies.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error(transparent)]
    Fd(#[from] FdError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}
