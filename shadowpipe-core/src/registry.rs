//! Per-connection object registry.
//!
//! Ids are dense small integers from two allocation domains: positive ids are
//! allocated by the client, negative ids by the server. The wire frame
//! carries a plain `u32`; reinterpreting it as `i32` recovers the domain
//! directly from the sign bit, so a vector for positive ids plus a vector for
//! negative ids (indexed by the negated id) gives O(1) lookup without a hash
//! map.

use shadowpipe_protocol::Interface;
use thiserror::Error;

/// A connection-local object id. Positive: client-allocated. Negative:
/// server-allocated. Never zero.
pub type ObjectId = i32;

/// Reinterpret a wire `u32` object id as the signed [`ObjectId`] used
/// internally.
pub fn from_wire(id: u32) -> ObjectId {
    id as i32
}

/// Convert an internal [`ObjectId`] back to its wire representation.
pub fn to_wire(id: ObjectId) -> u32 {
    id as u32
}

/// Payload data the registry owns alongside an object's interface. Only the
/// interfaces the core interprets carry a non-trivial payload; everything
/// else (including all unknown-interface objects) is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ObjectPayload {
    #[default]
    None,
    /// A `wl_shm_pool`: the shadow-fd remote id backing it, so destroying the
    /// pool can release the protocol reference on that shadow.
    ShmPool { shadow_remote_id: i32 },
    /// A `wl_buffer` carved from a pool.
    Buffer { pool: ObjectId },
}

/// A tracked protocol object.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolObject {
    /// `None` for an object bound to an interface this crate has no static
    /// descriptor for. Such an object is still tracked — so the id is
    /// reserved and zombie state still applies — but its messages are
    /// forwarded unread.
    pub interface: Option<&'static Interface>,
    /// Destroyed by the owning side but the id may still appear briefly in
    /// in-flight messages from the peer.
    pub zombie: bool,
    pub payload: ObjectPayload,
}

impl ProtocolObject {
    pub fn new(interface: &'static Interface) -> Self {
        Self {
            interface: Some(interface),
            zombie: false,
            payload: ObjectPayload::None,
        }
    }

    pub fn opaque() -> Self {
        Self {
            interface: None,
            zombie: false,
            payload: ObjectPayload::None,
        }
    }
}

/// Errors from registry operations: insertion of an already-present id is
/// an error, as is removal of a missing id.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("object id is zero")]
    ZeroId,
    #[error("object id {0} already present")]
    AlreadyPresent(ObjectId),
    #[error("object id {0} not present")]
    NotPresent(ObjectId),
}

/// Two-segment dense object table: a `Vec` for positive (client-allocated)
/// ids and a `Vec` for negative (server-allocated) ids, in place of an
/// intrusive linked list.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    positive: Vec<Option<ProtocolObject>>,
    negative: Vec<Option<ProtocolObject>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, id: ObjectId) -> Result<&mut Option<ProtocolObject>, RegistryError> {
        if id == 0 {
            return Err(RegistryError::ZeroId);
        }
        let (vec, idx) = if id > 0 {
            (&mut self.positive, id as usize - 1)
        } else {
            (&mut self.negative, (-id) as usize - 1)
        };
        if idx >= vec.len() {
            vec.resize_with(idx + 1, || None);
        }
        Ok(&mut vec[idx])
    }

    /// Bind `id` to `interface`. Errors if `id` is already bound (a non-zombie
    /// double-bind is a protocol error).
    pub fn insert(
        &mut self,
        id: ObjectId,
        interface: &'static Interface,
    ) -> Result<(), RegistryError> {
        let slot = self.slot(id)?;
        if slot.is_some() {
            return Err(RegistryError::AlreadyPresent(id));
        }
        *slot = Some(ProtocolObject::new(interface));
        Ok(())
    }

    /// Bind `id` to no known interface: the id is reserved and tracked, but
    /// this crate cannot decode its messages.
    pub fn insert_opaque(&mut self, id: ObjectId) -> Result<(), RegistryError> {
        let slot = self.slot(id)?;
        if slot.is_some() {
            return Err(RegistryError::AlreadyPresent(id));
        }
        *slot = Some(ProtocolObject::opaque());
        Ok(())
    }

    /// Remove and return the object bound to `id`.
    pub fn remove(&mut self, id: ObjectId) -> Result<ProtocolObject, RegistryError> {
        let slot = self.slot(id)?;
        slot.take().ok_or(RegistryError::NotPresent(id))
    }

    /// Mark `id` as a zombie in place, leaving it present for in-flight
    /// lookups but semantically drained.
    pub fn mark_zombie(&mut self, id: ObjectId) -> Result<(), RegistryError> {
        let slot = self.slot(id)?;
        match slot {
            Some(obj) => {
                obj.zombie = true;
                Ok(())
            }
            None => Err(RegistryError::NotPresent(id)),
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&ProtocolObject> {
        if id == 0 {
            return None;
        }
        let (vec, idx) = if id > 0 {
            (&self.positive, id as usize - 1)
        } else {
            (&self.negative, (-id) as usize - 1)
        };
        vec.get(idx).and_then(|o| o.as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut ProtocolObject> {
        if id == 0 {
            return None;
        }
        let (vec, idx) = if id > 0 {
            (&mut self.positive, id as usize - 1)
        } else {
            (&mut self.negative, (-id) as usize - 1)
        };
        vec.get_mut(idx).and_then(|o| o.as_mut())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadowpipe_protocol::WL_DISPLAY;

    #[test]
    fn insert_get_remove() {
        let mut reg = ObjectRegistry::new();
        reg.insert(1, &WL_DISPLAY).unwrap();
        assert!(reg.contains(1));
        assert_eq!(reg.get(1).unwrap().interface.unwrap().name, "wl_display");
        reg.remove(1).unwrap();
        assert!(!reg.contains(1));
    }

    #[test]
    fn double_insert_errors() {
        let mut reg = ObjectRegistry::new();
        reg.insert(5, &WL_DISPLAY).unwrap();
        assert_eq!(
            reg.insert(5, &WL_DISPLAY),
            Err(RegistryError::AlreadyPresent(5))
        );
    }

    #[test]
    fn remove_missing_errors() {
        let mut reg = ObjectRegistry::new();
        assert_eq!(reg.remove(9), Err(RegistryError::NotPresent(9)));
    }

    #[test]
    fn negative_domain_is_distinct() {
        let mut reg = ObjectRegistry::new();
        reg.insert(3, &WL_DISPLAY).unwrap();
        reg.insert(-3, &WL_DISPLAY).unwrap();
        assert!(reg.contains(3) && reg.contains(-3));
        reg.remove(3).unwrap();
        assert!(!reg.contains(3) && reg.contains(-3));
    }

    #[test]
    fn zero_id_errors() {
        let mut reg = ObjectRegistry::new();
        assert_eq!(reg.insert(0, &WL_DISPLAY), Err(RegistryError::ZeroId));
    }

    #[test]
    fn opaque_object_has_no_interface() {
        let mut reg = ObjectRegistry::new();
        reg.insert_opaque(11).unwrap();
        assert!(reg.get(11).unwrap().interface.is_none());
    }
}
