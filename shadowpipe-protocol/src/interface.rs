//! Static interface descriptor table.
//!
//! In a full implementation this would be generated from the upstream
//! interface XML (as `wayland-scanner` does for `wayland-backend`). The core
//! only needs enough of the table to exercise object lifecycle tracking and
//! fd-bearing requests end to end; every interface not named here takes the
//! unknown-interface passthrough path described in the dispatcher.

use crate::signature::ArgKind;

/// Wire metadata for a single request or event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageDesc {
    /// Name, for logging only.
    pub name: &'static str,
    /// Ordered argument kinds.
    pub signature: &'static [ArgKind],
    /// Whether handling this message destroys the sending/target object.
    pub is_destructor: bool,
    /// Interface bound to a `NewId` argument in this signature, if any.
    pub new_id_interface: Option<&'static Interface>,
}

/// Describes the requests and events of one interface.
#[derive(Debug, PartialEq)]
pub struct Interface {
    /// Interface name, as it appears on the wire (e.g. in `wl_registry.global`).
    pub name: &'static str,
    /// Messages sent from client to server.
    pub requests: &'static [MessageDesc],
    /// Messages sent from server to client.
    pub events: &'static [MessageDesc],
}

impl Interface {
    /// Look up a request by opcode.
    pub fn request(&self, opcode: u16) -> Option<&'static MessageDesc> {
        self.requests.get(opcode as usize)
    }

    /// Look up an event by opcode.
    pub fn event(&self, opcode: u16) -> Option<&'static MessageDesc> {
        self.events.get(opcode as usize)
    }

    /// Look up the message table for the given direction.
    pub fn messages(&self, direction: Direction) -> &'static [MessageDesc] {
        match direction {
            Direction::Request => self.requests,
            Direction::Event => self.events,
        }
    }
}

/// Which half of a bidirectional interface a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client-to-server.
    Request,
    /// Server-to-client.
    Event,
}

macro_rules! iface {
    ($name:ident = $wire_name:literal, requests: [$($req:expr),* $(,)?], events: [$($evt:expr),* $(,)?] $(,)?) => {
        pub static $name: Interface = Interface {
            name: $wire_name,
            requests: &[$($req),*],
            events: &[$($evt),*],
        };
    };
}

macro_rules! msg {
    ($name:literal, [$($arg:expr),* $(,)?]) => {
        MessageDesc { name: $name, signature: &[$($arg),*], is_destructor: false, new_id_interface: None }
    };
    ($name:literal, [$($arg:expr),* $(,)?], destructor) => {
        MessageDesc { name: $name, signature: &[$($arg),*], is_destructor: true, new_id_interface: None }
    };
    ($name:literal, [$($arg:expr),* $(,)?], creates $iface:expr) => {
        MessageDesc { name: $name, signature: &[$($arg),*], is_destructor: false, new_id_interface: Some(&$iface) }
    };
}

// wl_callback: a one-shot event sink handed back by requests like wl_display.sync.
iface! {
    WL_CALLBACK = "wl_callback",
    requests: [],
    events: [msg!("done", [ArgKind::Uint])],
}

// wl_buffer: backs a region of a shm pool or a graphics buffer.
iface! {
    WL_BUFFER = "wl_buffer",
    requests: [msg!("destroy", [], destructor)],
    events: [msg!("release", [])],
}

// wl_shm_pool: a named shadow-fd-backed pool from which buffers are carved.
iface! {
    WL_SHM_POOL = "wl_shm_pool",
    requests: [
        msg!("create_buffer", [
            ArgKind::NewId,
            ArgKind::Int,
            ArgKind::Int,
            ArgKind::Int,
            ArgKind::Int,
            ArgKind::Uint,
        ], creates WL_BUFFER),
        msg!("destroy", [], destructor),
        msg!("resize", [ArgKind::Int]),
    ],
    events: [],
}

// wl_shm: the shared-memory pool factory; create_pool is the fd-bearing request
// exercised by the SHM pool transfer scenario.
iface! {
    WL_SHM = "wl_shm",
    requests: [
        msg!("create_pool", [ArgKind::NewId, ArgKind::Fd, ArgKind::Int], creates WL_SHM_POOL),
    ],
    events: [msg!("format", [ArgKind::Uint])],
}

// wl_surface: minimal subset sufficient to track object lifecycle.
iface! {
    WL_SURFACE = "wl_surface",
    requests: [
        msg!("destroy", [], destructor),
        msg!("attach", [ArgKind::Object { nullable: true }, ArgKind::Int, ArgKind::Int]),
        msg!("commit", []),
    ],
    events: [],
}

// wl_compositor: factory for surfaces.
iface! {
    WL_COMPOSITOR = "wl_compositor",
    requests: [
        msg!("create_surface", [ArgKind::NewId], creates WL_SURFACE),
    ],
    events: [],
}

// wl_registry: the dynamic-interface bind path (NewIdDynamic).
iface! {
    WL_REGISTRY = "wl_registry",
    requests: [
        msg!("bind", [ArgKind::NewIdDynamic]),
    ],
    events: [
        msg!("global", [ArgKind::Uint, ArgKind::Str { nullable: false }, ArgKind::Uint]),
        msg!("global_remove", [ArgKind::Uint]),
    ],
}

// wl_display: the root object, always bound to id 1.
iface! {
    WL_DISPLAY = "wl_display",
    requests: [
        msg!("sync", [ArgKind::NewId], creates WL_CALLBACK),
        msg!("get_registry", [ArgKind::NewId], creates WL_REGISTRY),
    ],
    events: [
        msg!("error", [ArgKind::Object { nullable: false }, ArgKind::Uint, ArgKind::Str { nullable: false }]),
        msg!("delete_id", [ArgKind::Uint]),
    ],
}

/// All statically known interfaces, for name lookup.
pub static INTERFACES: &[&Interface] = &[
    &WL_DISPLAY,
    &WL_REGISTRY,
    &WL_CALLBACK,
    &WL_COMPOSITOR,
    &WL_SURFACE,
    &WL_SHM,
    &WL_SHM_POOL,
    &WL_BUFFER,
];

/// Resolve an interface by its wire name. Returns `None` for anything not in
/// the built-in table, which the dispatcher treats as an unknown interface.
pub fn find_interface(name: &str) -> Option<&'static Interface> {
    INTERFACES.iter().copied().find(|iface| iface.name == name)
}

/// The well-known object id of `wl_display`, bound implicitly on connection
/// start on both sides.
pub const DISPLAY_OBJECT_ID: u32 = 1;
