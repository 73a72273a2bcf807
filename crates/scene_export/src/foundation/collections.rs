//! Arena keys and handle maps
//!
//! Every object the exporter owns lives in a [`SlotMap`] and is addressed by a
//! typed key. Keys stay valid (and unique) for the lifetime of their map, which
//! is what lets group overlays and engine bindings reference nodes without
//! owning them.

pub use slotmap::{Key, SecondaryMap, SlotMap};

slotmap::new_key_type! {
    /// Stable key of a node inside a scene graph arena
    pub struct NodeId;

    /// Key of a native geometry handle owned by a scene graph
    pub struct GeometryKey;

    /// Opaque handle to an object living in a target engine scene
    pub struct EngineHandle;
}

/// Handle-based map using slot map for stable references
pub type HandleMap<K, T> = SlotMap<K, T>;
