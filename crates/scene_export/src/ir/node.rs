//! Node record and its typed variants

use std::fmt;

use crate::foundation::collections::NodeId;
use crate::foundation::math::{Mat4, Vec3};
use crate::source::{ObjectId, SourceObject};

use super::camera::CameraNode;
use super::light::LightNode;
use super::mesh::MeshData;

/// Variant payload of a node
///
/// Closed set: adding a kind forces every `match` in the exporter to handle it.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain transform node, also used for placeholders
    Generic,
    /// Triangulated mesh owning one geometry handle
    Mesh(MeshData),
    /// Perspective or orthographic camera
    Camera(CameraNode),
    /// Point, sun, spot or area light
    Light(LightNode),
}

impl NodeKind {
    /// Short label used in logs and node descriptions
    pub fn label(&self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Mesh(_) => "Mesh",
            Self::Camera(camera) => camera.label(),
            Self::Light(light) => light.label(),
        }
    }
}

/// A node of the intermediate representation
///
/// Holds the local transform exactly as the source declares it. The world
/// matrix is a snapshot kept for debugging; nothing downstream reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node name; not required to be unique
    pub name: String,
    /// Local translation
    pub location: Vec3,
    /// Local Euler rotation, radians
    pub rotation: Vec3,
    /// Euler axis order as declared by the source
    pub rotation_order: String,
    /// Local scale
    pub scale: Vec3,
    /// World transform snapshot, informational only
    pub matrix_world: Mat4,
    pub(crate) source: Option<ObjectId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    placeholder: bool,
    kind: NodeKind,
}

impl Node {
    /// Create a generic node with identity transform and no backing object
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: Vec3::zeros(),
            rotation: Vec3::zeros(),
            rotation_order: "XYZ".to_string(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            matrix_world: Mat4::identity(),
            source: None,
            parent: None,
            children: Vec::new(),
            placeholder: false,
            kind: NodeKind::Generic,
        }
    }

    /// Create a placeholder with identity transform and no backing object
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            placeholder: true,
            ..Self::new(name)
        }
    }

    /// Create a node carrying the transform and identity of `object`
    pub fn from_source(object: &SourceObject, kind: NodeKind) -> Self {
        Self {
            name: object.name.clone(),
            location: object.location,
            rotation: object.rotation_euler,
            rotation_order: object.rotation_mode.clone(),
            scale: object.scale,
            matrix_world: object.matrix_world.unwrap_or_else(Mat4::identity),
            source: Some(object.id),
            parent: None,
            children: Vec::new(),
            placeholder: false,
            kind,
        }
    }

    /// Create a placeholder standing in for `object`
    ///
    /// Keeps the object's transform and identity so that children still find
    /// their parent and land where the source put them.
    pub fn placeholder_for(object: &SourceObject, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            placeholder: true,
            ..Self::from_source(object, NodeKind::Generic)
        }
    }

    /// Whether this node has no parent
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether this node stands in for missing or unusable content
    pub const fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Parent key, absent for the root
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in traversal order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Identity of the backing source object
    pub const fn source(&self) -> Option<ObjectId> {
        self.source
    }

    /// Variant payload
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Mesh payload, if this is a mesh
    pub fn as_mesh(&self) -> Option<&MeshData> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Camera payload, if this is a camera
    pub fn as_camera(&self) -> Option<&CameraNode> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Light payload, if this is a light
    pub fn as_light(&self) -> Option<&LightNode> {
        match &self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IR node of type: {} and name: {}", self.kind.label(), self.name)?;
        if self.placeholder {
            f.write_str(" (placeholder)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ObjectType;

    #[test]
    fn test_new_node_has_unit_scale() {
        let node = Node::new("Empty");

        assert_eq!(node.scale, Vec3::new(1.0, 1.0, 1.0));
        assert!(node.is_root());
        assert!(!node.is_placeholder());
        assert!(node.source().is_none());
    }

    #[test]
    fn test_placeholder_for_keeps_transform_and_identity() {
        let object = SourceObject::new(3, "Broken", ObjectType::Mesh)
            .with_location(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Vec3::new(0.1, 0.0, 0.0), "ZYX");
        let node = Node::placeholder_for(&object, "Placeholder");

        assert!(node.is_placeholder());
        assert_eq!(node.source(), Some(ObjectId(3)));
        assert_eq!(node.location, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(node.rotation_order, "ZYX");
        assert_eq!(node.kind(), &NodeKind::Generic);
    }

    #[test]
    fn test_display_names_kind() {
        let node = Node::placeholder("Root node");
        assert_eq!(node.to_string(), "IR node of type: Generic and name: Root node (placeholder)");
    }
}
