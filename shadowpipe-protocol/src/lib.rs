//! Static protocol descriptor table and wire codec.
//!
//! This crate is the "leaf" component of the pipeline (spec component 1): it
//! knows nothing about object lifetimes, shadow fds, or connections. It only
//! describes what a message looks like on the wire for the interfaces the
//! core chooses to interpret, and provides the size-check rule and
//! argument encode/decode routines that both proxy directions share.

mod interface;
mod signature;
mod wire;

pub use interface::{
    find_interface, Direction, Interface, MessageDesc, DISPLAY_OBJECT_ID, INTERFACES, WL_BUFFER,
    WL_CALLBACK, WL_COMPOSITOR, WL_DISPLAY, WL_REGISTRY, WL_SHM, WL_SHM_POOL, WL_SURFACE,
};
pub use signature::{ArgKind, Signature};
pub use wire::{
    build_frame, decode_args, encode_args, expected_counts, header_length_valid, read_header,
    size_check, Argument, FrameHeader, ParseError, HEADER_LEN,
};
