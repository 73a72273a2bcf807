//! Intermediate representation
//!
//! An engine-agnostic node tree built from a [`SourceScene`](crate::source::SourceScene)
//! before any target-engine object exists.
//!
//! ## Architecture
//!
//! ```text
//! SourceObject ──classify──▶ Node (common record + NodeKind payload)
//!                               │
//!                               ▼
//!                     SceneGraph (slotmap arena, owns nodes + geometry)
//!                               │
//!                               ▼
//!                     GroupNode overlay (one per active view layer)
//! ```
//!
//! Nodes are addressed by [`NodeId`] keys. Parents are stored as an optional
//! key and children as ordered key lists, so the tree has no ownership
//! cycles. Group nodes only hold keys and never own what they reference.

mod camera;
mod graph;
mod group;
mod light;
mod mesh;
mod node;

pub use camera::{CameraNode, CameraProjection};
pub use graph::{SceneGraph, Traverse, ROOT_NODE_NAME};
pub use group::{GroupMember, GroupNode};
pub use light::{LightNode, LightSubtype};
pub use mesh::{Geometry, GeometryPool, MeshData, VertexFormat};
pub use node::{Node, NodeKind};

pub use crate::foundation::collections::{GeometryKey, NodeId};

use thiserror::Error;

/// Errors raised while building or querying the intermediate representation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Linking would make a node its own ancestor
    #[error("Adding '{child}' as a child of '{parent}' would create a cycle")]
    Cycle {
        /// Name of the would-be parent
        parent: String,
        /// Name of the would-be child
        child: String,
    },

    /// More nodes were created than the source objects justify
    #[error("Created {created} IR nodes for {objects} source objects (limit {limit})")]
    OverCreation {
        /// Nodes created so far
        created: usize,
        /// Source objects translated so far
        objects: usize,
        /// Largest allowed node count
        limit: usize,
    },

    /// A mesh has no usable triangles
    #[error("Malformed mesh '{name}': {reason}")]
    MalformedMesh {
        /// Object name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// The object cannot be represented by the target engine
    #[error("Unsupported object '{name}' of type {object_type}")]
    UnsupportedObjectType {
        /// Object name
        name: String,
        /// Type tag, with subtype where relevant
        object_type: String,
    },

    /// Key does not belong to this graph
    #[error("Unknown node")]
    UnknownNode,

    /// The node exists but is not a mesh
    #[error("Node '{0}' is not a mesh")]
    NotAMesh(String),

    /// The graph was used after `teardown()`
    #[error("Scene graph has already been torn down")]
    TornDown,
}
