//! Argument kinds that make up a message signature.
//!
//! Mirrors the argument taxonomy `wayland-backend` uses for its `ArgumentType`,
//! plus the dynamic-interface `new_id` triple (`wl_registry.bind`) which the
//! static `NewId` variant cannot express because the target interface is not
//! known until runtime.

/// One argument slot in a request/event signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// A signed 32-bit integer.
    Int,
    /// An unsigned 32-bit integer.
    Uint,
    /// A 24.8 signed fixed-point number.
    Fixed,
    /// A nul-terminated, length-prefixed string.
    Str { nullable: bool },
    /// A length-prefixed byte array.
    Array,
    /// A reference to an existing object.
    Object { nullable: bool },
    /// A newly created object id of a statically known interface.
    NewId,
    /// A newly created object id whose interface is carried on the wire:
    /// `(string interface, uint version, uint new_id)`.
    NewIdDynamic,
    /// A file descriptor, drawn from the out-of-band fd queue. Occupies no
    /// wire bytes.
    Fd,
}

/// The signature of a request or event: an ordered list of argument kinds.
pub type Signature = &'static [ArgKind];

pub(crate) fn pad4(n: usize) -> usize {
    (n + 3) & !3
}
