//! Object registry, shadow-fd map, message pipeline and worker pool for the
//! core of a transparent display-server protocol proxy.
//!
//! This crate does not open a socket, accept a connection, or frame bytes
//! crossing the channel between the two proxy halves — it is the part that
//! sits between two already-connected byte streams and makes the fds one of
//! them carries reach the other as ordinary bytes.

pub mod channel;
pub mod compress;
pub mod config;
pub mod error;
pub mod gpu;
pub mod local;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod shadow;
pub mod workers;

pub use config::{Config, Side};
pub use error::PipelineError;
pub use pipeline::Pipeline;
