//! Target engine abstraction
//!
//! The exporter talks to the render engine only through [`TargetScene`].
//! Every object the engine creates is addressed by an opaque
//! [`EngineHandle`]. [`RecordingScene`] is an in-memory implementation used
//! for saving scenes and for tests.

mod recording;

pub use recording::{EngineObject, EngineObjectKind, RecordingScene, ResourceEntry, SceneFile, SceneNodeState};

pub use crate::foundation::collections::EngineHandle;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::{Axis, Vec3};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by the target engine
#[derive(Error, Debug)]
pub enum BackendError {
    /// Handle does not name a live engine object
    #[error("Unknown engine handle {0:?}")]
    UnknownHandle(EngineHandle),

    /// Handle names an object of another kind
    #[error("Engine object '{name}' is a {found}, expected a {expected}")]
    WrongKind {
        /// Object name
        name: String,
        /// Kind the operation needs
        expected: &'static str,
        /// Kind of the object
        found: &'static str,
    },

    /// An argument is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Writing the scene files failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The scene could not be encoded
    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Pixel rectangle a camera renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Left edge
    pub x: i32,
    /// Bottom edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// View volume of a camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Frustum {
    /// Symmetric perspective frustum
    Perspective {
        /// Vertical field of view, degrees
        fov_y: f32,
        /// Width over height
        aspect: f32,
        /// Near plane
        near: f32,
        /// Far plane
        far: f32,
    },
    /// Box-shaped view volume
    Orthographic {
        /// Left plane
        left: f32,
        /// Right plane
        right: f32,
        /// Bottom plane
        bottom: f32,
        /// Top plane
        top: f32,
        /// Near plane
        near: f32,
        /// Far plane
        far: f32,
    },
}

/// Viewport and frustum passed when creating a camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSetup {
    /// Output rectangle
    pub viewport: Viewport,
    /// View volume
    pub frustum: Frustum,
}

/// Scene API of the target render engine
///
/// Scene nodes (plain nodes, meshes and cameras) form a tree through
/// [`add_child`](Self::add_child) and carry a translation, a scale and
/// single-axis rotations. Meshes draw a geometry binding with an
/// appearance. Render passes draw their render groups through one camera.
pub trait TargetScene {
    /// Create a plain transform node
    fn create_node(&mut self, name: &str) -> BackendResult<EngineHandle>;

    /// Create a mesh node without content
    fn create_mesh(&mut self, name: &str) -> BackendResult<EngineHandle>;

    /// Create a camera node
    fn create_camera(&mut self, name: &str, setup: &CameraSetup) -> BackendResult<EngineHandle>;

    /// Upload an index buffer
    fn create_index_array(&mut self, name: &str, indices: &[u32]) -> BackendResult<EngineHandle>;

    /// Upload a tightly packed `vec3` vertex buffer
    fn create_vertex_array(&mut self, name: &str, components: &[f32]) -> BackendResult<EngineHandle>;

    /// Compile a vertex and fragment shader into an effect
    fn create_effect(&mut self, name: &str, vertex_shader: &str, fragment_shader: &str) -> BackendResult<EngineHandle>;

    /// Create an appearance drawing with `effect`
    fn create_appearance(&mut self, name: &str, effect: EngineHandle) -> BackendResult<EngineHandle>;

    /// Create a geometry binding for the inputs of `effect`
    fn create_geometry(&mut self, name: &str, effect: EngineHandle) -> BackendResult<EngineHandle>;

    /// Bind an index array to a geometry binding
    fn set_index_buffer(&mut self, geometry: EngineHandle, indices: EngineHandle) -> BackendResult<()>;

    /// Bind a vertex array to the effect input called `attribute`
    fn set_vertex_buffer(&mut self, geometry: EngineHandle, attribute: &str, array: EngineHandle) -> BackendResult<()>;

    /// Make `mesh` draw `geometry` with `appearance`
    fn set_mesh_content(&mut self, mesh: EngineHandle, geometry: EngineHandle, appearance: EngineHandle) -> BackendResult<()>;

    /// Set the local scale of a scene node
    fn set_scale(&mut self, node: EngineHandle, scale: Vec3) -> BackendResult<()>;

    /// Set the local rotation about `axis`, degrees
    fn set_rotation(&mut self, node: EngineHandle, axis: Axis, degrees: f32) -> BackendResult<()>;

    /// Set the local translation of a scene node
    fn set_translation(&mut self, node: EngineHandle, translation: Vec3) -> BackendResult<()>;

    /// Make `child` a child of `parent`
    fn add_child(&mut self, parent: EngineHandle, child: EngineHandle) -> BackendResult<()>;

    /// Create an empty render group
    fn create_render_group(&mut self, name: &str) -> BackendResult<EngineHandle>;

    /// Create a render pass without camera
    fn create_render_pass(&mut self, name: &str) -> BackendResult<EngineHandle>;

    /// Draw `mesh` as part of `group` at position `order`
    fn add_mesh_to_group(&mut self, group: EngineHandle, mesh: EngineHandle, order: i32) -> BackendResult<()>;

    /// Nest `nested` inside `group` at position `order`
    fn add_group_to_group(&mut self, group: EngineHandle, nested: EngineHandle, order: i32) -> BackendResult<()>;

    /// Draw `group` as part of `pass` at position `order`
    fn add_group_to_pass(&mut self, pass: EngineHandle, group: EngineHandle, order: i32) -> BackendResult<()>;

    /// Render `pass` through `camera`
    fn set_pass_camera(&mut self, pass: EngineHandle, camera: EngineHandle) -> BackendResult<()>;

    /// Destroy an engine object and drop every reference to it
    fn destroy(&mut self, handle: EngineHandle) -> BackendResult<()>;

    /// Human readable list of problems; empty when the scene is valid
    fn validation_report(&self) -> String;

    /// Write the scene description and its binary resources
    fn serialize_to_files(&self, scene_path: &std::path::Path, resources_path: &std::path::Path) -> BackendResult<()>;
}
