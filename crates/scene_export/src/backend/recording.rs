//! In-memory reference engine
//!
//! Records every scene API call in a slotmap of engine objects, evaluates
//! node transforms the way the real engine does and writes the result as a
//! RON scene description plus a binary resource file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compiler::RotationConvention;
use crate::foundation::collections::{SecondaryMap, SlotMap};
use crate::foundation::math::{Axis, Mat4, Vec3};

use super::{BackendError, BackendResult, CameraSetup, EngineHandle, Frustum, TargetScene};

/// Transform state of a scene node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNodeState {
    /// Parent node
    pub parent: Option<EngineHandle>,
    /// Child nodes in insertion order
    pub children: Vec<EngineHandle>,
    /// Local translation
    pub translation: Vec3,
    /// Local rotation per axis, engine degrees
    pub rotation: [f32; 3],
    /// Local scale
    pub scale: Vec3,
}

impl Default for SceneNodeState {
    fn default() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            translation: Vec3::zeros(),
            rotation: [0.0; 3],
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl SceneNodeState {
    /// Local matrix; rotations apply X first, then Y, then Z
    fn local_matrix(&self, convention: RotationConvention) -> Mat4 {
        let rotation = [Axis::X, Axis::Y, Axis::Z]
            .into_iter()
            .fold(Mat4::identity(), |acc, axis| {
                convention.rotation_matrix(axis, self.rotation[axis.index()]) * acc
            });
        Mat4::new_translation(&self.translation) * rotation * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// What an engine object is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineObjectKind {
    /// Plain transform node
    Node,
    /// Drawable node
    Mesh {
        /// Geometry binding
        geometry: Option<EngineHandle>,
        /// Appearance
        appearance: Option<EngineHandle>,
    },
    /// Camera node
    Camera(CameraSetup),
    /// Index buffer; data lives in the resource file
    IndexArray {
        /// Number of indices
        count: usize,
    },
    /// `vec3` vertex buffer; data lives in the resource file
    VertexArray {
        /// Number of vertices
        count: usize,
    },
    /// Compiled shader pair
    Effect {
        /// Vertex shader source
        vertex_shader: String,
        /// Fragment shader source
        fragment_shader: String,
    },
    /// Effect instance with uniform values
    Appearance {
        /// Effect drawn with
        effect: EngineHandle,
    },
    /// Buffers bound to effect inputs
    Geometry {
        /// Effect whose inputs are bound
        effect: EngineHandle,
        /// Index array
        indices: Option<EngineHandle>,
        /// Vertex arrays by attribute name
        inputs: BTreeMap<String, EngineHandle>,
    },
    /// Ordered meshes and nested groups
    RenderGroup {
        /// Meshes with render order
        meshes: Vec<(EngineHandle, i32)>,
        /// Nested groups with render order
        groups: Vec<(EngineHandle, i32)>,
    },
    /// Groups rendered through one camera
    RenderPass {
        /// Camera
        camera: Option<EngineHandle>,
        /// Groups with render order
        groups: Vec<(EngineHandle, i32)>,
    },
}

impl EngineObjectKind {
    /// Short kind name
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Node => "Node",
            Self::Mesh { .. } => "MeshNode",
            Self::Camera(_) => "Camera",
            Self::IndexArray { .. } => "IndexArray",
            Self::VertexArray { .. } => "VertexArray",
            Self::Effect { .. } => "Effect",
            Self::Appearance { .. } => "Appearance",
            Self::Geometry { .. } => "GeometryBinding",
            Self::RenderGroup { .. } => "RenderGroup",
            Self::RenderPass { .. } => "RenderPass",
        }
    }

    const fn is_scene_node(&self) -> bool {
        matches!(self, Self::Node | Self::Mesh { .. } | Self::Camera(_))
    }

    /// Forget every reference to `handle`
    fn unlink(&mut self, handle: EngineHandle) {
        match self {
            Self::Mesh { geometry, appearance } => {
                if *geometry == Some(handle) {
                    *geometry = None;
                }
                if *appearance == Some(handle) {
                    *appearance = None;
                }
            }
            Self::Geometry { indices, inputs, .. } => {
                if *indices == Some(handle) {
                    *indices = None;
                }
                inputs.retain(|_, array| *array != handle);
            }
            Self::RenderGroup { meshes, groups } => {
                meshes.retain(|(mesh, _)| *mesh != handle);
                groups.retain(|(group, _)| *group != handle);
            }
            Self::RenderPass { camera, groups } => {
                if *camera == Some(handle) {
                    *camera = None;
                }
                groups.retain(|(group, _)| *group != handle);
            }
            _ => {}
        }
    }
}

/// One recorded engine object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineObject {
    /// Name given at creation
    pub name: String,
    /// Kind and kind specific state
    pub kind: EngineObjectKind,
    /// Transform state, present for scene nodes
    pub node: Option<SceneNodeState>,
}

#[derive(Debug, Clone)]
enum Buffer {
    Indices(Vec<u32>),
    Vertices(Vec<f32>),
}

impl Buffer {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Indices(data) => bytemuck::cast_slice(data),
            Self::Vertices(data) => bytemuck::cast_slice(data),
        }
    }
}

/// Location of one buffer in the resource file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Array object owning the data
    pub handle: EngineHandle,
    /// Byte offset
    pub offset: usize,
    /// Byte length
    pub length: usize,
}

/// Contents of a `.scene` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    /// Scene name
    pub name: String,
    /// Rotation convention the stored angles follow
    pub rotation_convention: RotationConvention,
    /// Objects in creation order
    pub objects: Vec<(EngineHandle, EngineObject)>,
    /// Buffer table of the `.resources` file
    pub resources: Vec<ResourceEntry>,
}

/// Reference engine recording every call
#[derive(Debug)]
pub struct RecordingScene {
    name: String,
    convention: RotationConvention,
    objects: SlotMap<EngineHandle, EngineObject>,
    buffers: SecondaryMap<EngineHandle, Buffer>,
}

impl RecordingScene {
    /// Create an empty scene
    pub fn new(name: impl Into<String>, convention: RotationConvention) -> Self {
        Self {
            name: name.into(),
            convention,
            objects: SlotMap::with_key(),
            buffers: SecondaryMap::new(),
        }
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rotation convention of [`TargetScene::set_rotation`]
    pub const fn convention(&self) -> RotationConvention {
        self.convention
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing has been created
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Object behind `handle`
    pub fn object(&self, handle: EngineHandle) -> Option<&EngineObject> {
        self.objects.get(handle)
    }

    /// Live objects in creation order
    pub fn objects(&self) -> impl Iterator<Item = (EngineHandle, &EngineObject)> {
        self.objects.iter()
    }

    /// First object called `name`
    pub fn find_by_name(&self, name: &str) -> Option<EngineHandle> {
        self.objects.iter().find(|(_, object)| object.name == name).map(|(handle, _)| handle)
    }

    /// Handles of every object of kind `label`
    pub fn handles_of_kind(&self, label: &str) -> Vec<EngineHandle> {
        self.objects
            .iter()
            .filter(|(_, object)| object.kind.label() == label)
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Index data of an index array
    pub fn index_data(&self, handle: EngineHandle) -> Option<&[u32]> {
        match self.buffers.get(handle)? {
            Buffer::Indices(data) => Some(data),
            Buffer::Vertices(_) => None,
        }
    }

    /// Vertex data of a vertex array
    pub fn vertex_data(&self, handle: EngineHandle) -> Option<&[f32]> {
        match self.buffers.get(handle)? {
            Buffer::Vertices(data) => Some(data),
            Buffer::Indices(_) => None,
        }
    }

    /// World matrix of a scene node
    pub fn model_matrix(&self, handle: EngineHandle) -> BackendResult<Mat4> {
        let mut matrix = Mat4::identity();
        let mut current = Some(handle);
        while let Some(id) = current {
            let state = self.scene_node(id)?;
            matrix = state.local_matrix(self.convention) * matrix;
            current = state.parent;
        }
        Ok(matrix)
    }

    /// Read a `.scene` file back
    pub fn read_scene_file(path: impl AsRef<Path>) -> BackendResult<SceneFile> {
        let text = std::fs::read_to_string(path)?;
        ron::from_str(&text).map_err(|e| BackendError::Serialize(e.to_string()))
    }

    fn insert(&mut self, name: &str, kind: EngineObjectKind) -> EngineHandle {
        let node = kind.is_scene_node().then(SceneNodeState::default);
        let handle = self.objects.insert(EngineObject {
            name: name.to_string(),
            kind,
            node,
        });
        log::trace!("Created {} '{}'", self.objects[handle].kind.label(), name);
        handle
    }

    fn get(&self, handle: EngineHandle) -> BackendResult<&EngineObject> {
        self.objects.get(handle).ok_or(BackendError::UnknownHandle(handle))
    }

    fn get_mut(&mut self, handle: EngineHandle) -> BackendResult<&mut EngineObject> {
        self.objects.get_mut(handle).ok_or(BackendError::UnknownHandle(handle))
    }

    fn expect_kind(
        &self,
        handle: EngineHandle,
        expected: &'static str,
        accept: fn(&EngineObjectKind) -> bool,
    ) -> BackendResult<()> {
        let object = self.get(handle)?;
        if accept(&object.kind) {
            Ok(())
        } else {
            Err(BackendError::WrongKind {
                name: object.name.clone(),
                expected,
                found: object.kind.label(),
            })
        }
    }

    fn scene_node(&self, handle: EngineHandle) -> BackendResult<&SceneNodeState> {
        let object = self.get(handle)?;
        object.node.as_ref().ok_or_else(|| BackendError::WrongKind {
            name: object.name.clone(),
            expected: "scene node",
            found: object.kind.label(),
        })
    }

    fn scene_node_mut(&mut self, handle: EngineHandle) -> BackendResult<&mut SceneNodeState> {
        let object = self.get_mut(handle)?;
        match object.node.as_mut() {
            Some(state) => Ok(state),
            None => Err(BackendError::WrongKind {
                name: object.name.clone(),
                expected: "scene node",
                found: object.kind.label(),
            }),
        }
    }

    fn is_ancestor_or_self(&self, ancestor: EngineHandle, mut node: EngineHandle) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.objects.get(node).and_then(|o| o.node.as_ref()).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn push_group_member(&mut self, group: EngineHandle, member: EngineHandle, order: i32, mesh: bool) -> BackendResult<()> {
        let object = self.get_mut(group)?;
        match &mut object.kind {
            EngineObjectKind::RenderGroup { meshes, groups } => {
                let list = if mesh { meshes } else { groups };
                list.retain(|(existing, _)| *existing != member);
                list.push((member, order));
                Ok(())
            }
            other => Err(BackendError::WrongKind {
                name: object.name.clone(),
                expected: "RenderGroup",
                found: other.label(),
            }),
        }
    }
}

fn is_effect(kind: &EngineObjectKind) -> bool {
    matches!(kind, EngineObjectKind::Effect { .. })
}

fn is_render_group(kind: &EngineObjectKind) -> bool {
    matches!(kind, EngineObjectKind::RenderGroup { .. })
}

impl TargetScene for RecordingScene {
    fn create_node(&mut self, name: &str) -> BackendResult<EngineHandle> {
        Ok(self.insert(name, EngineObjectKind::Node))
    }

    fn create_mesh(&mut self, name: &str) -> BackendResult<EngineHandle> {
        Ok(self.insert(
            name,
            EngineObjectKind::Mesh {
                geometry: None,
                appearance: None,
            },
        ))
    }

    fn create_camera(&mut self, name: &str, setup: &CameraSetup) -> BackendResult<EngineHandle> {
        Ok(self.insert(name, EngineObjectKind::Camera(*setup)))
    }

    fn create_index_array(&mut self, name: &str, indices: &[u32]) -> BackendResult<EngineHandle> {
        if indices.is_empty() {
            return Err(BackendError::InvalidArgument(format!("index array '{name}' is empty")));
        }
        let handle = self.insert(name, EngineObjectKind::IndexArray { count: indices.len() });
        self.buffers.insert(handle, Buffer::Indices(indices.to_vec()));
        Ok(handle)
    }

    fn create_vertex_array(&mut self, name: &str, components: &[f32]) -> BackendResult<EngineHandle> {
        if components.is_empty() || components.len() % 3 != 0 {
            return Err(BackendError::InvalidArgument(format!(
                "vertex array '{name}' has {} components, expected a non-zero multiple of 3",
                components.len()
            )));
        }
        let handle = self.insert(name, EngineObjectKind::VertexArray { count: components.len() / 3 });
        self.buffers.insert(handle, Buffer::Vertices(components.to_vec()));
        Ok(handle)
    }

    fn create_effect(&mut self, name: &str, vertex_shader: &str, fragment_shader: &str) -> BackendResult<EngineHandle> {
        if vertex_shader.trim().is_empty() || fragment_shader.trim().is_empty() {
            return Err(BackendError::InvalidArgument(format!("effect '{name}' has an empty shader stage")));
        }
        Ok(self.insert(
            name,
            EngineObjectKind::Effect {
                vertex_shader: vertex_shader.to_string(),
                fragment_shader: fragment_shader.to_string(),
            },
        ))
    }

    fn create_appearance(&mut self, name: &str, effect: EngineHandle) -> BackendResult<EngineHandle> {
        self.expect_kind(effect, "Effect", is_effect)?;
        Ok(self.insert(name, EngineObjectKind::Appearance { effect }))
    }

    fn create_geometry(&mut self, name: &str, effect: EngineHandle) -> BackendResult<EngineHandle> {
        self.expect_kind(effect, "Effect", is_effect)?;
        Ok(self.insert(
            name,
            EngineObjectKind::Geometry {
                effect,
                indices: None,
                inputs: BTreeMap::new(),
            },
        ))
    }

    fn set_index_buffer(&mut self, geometry: EngineHandle, indices: EngineHandle) -> BackendResult<()> {
        self.expect_kind(indices, "IndexArray", |k| matches!(k, EngineObjectKind::IndexArray { .. }))?;
        let object = self.get_mut(geometry)?;
        match &mut object.kind {
            EngineObjectKind::Geometry { indices: slot, .. } => {
                *slot = Some(indices);
                Ok(())
            }
            other => Err(BackendError::WrongKind {
                name: object.name.clone(),
                expected: "GeometryBinding",
                found: other.label(),
            }),
        }
    }

    fn set_vertex_buffer(&mut self, geometry: EngineHandle, attribute: &str, array: EngineHandle) -> BackendResult<()> {
        self.expect_kind(array, "VertexArray", |k| matches!(k, EngineObjectKind::VertexArray { .. }))?;
        let effect = match &self.get(geometry)?.kind {
            EngineObjectKind::Geometry { effect, .. } => *effect,
            other => {
                return Err(BackendError::WrongKind {
                    name: self.get(geometry)?.name.clone(),
                    expected: "GeometryBinding",
                    found: other.label(),
                })
            }
        };

        let declares_input = match &self.get(effect)?.kind {
            EngineObjectKind::Effect { vertex_shader, .. } => vertex_shader
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .any(|token| token == attribute),
            _ => false,
        };
        if !declares_input {
            return Err(BackendError::InvalidArgument(format!("effect has no input named '{attribute}'")));
        }

        if let EngineObjectKind::Geometry { inputs, .. } = &mut self.get_mut(geometry)?.kind {
            inputs.insert(attribute.to_string(), array);
        }
        Ok(())
    }

    fn set_mesh_content(&mut self, mesh: EngineHandle, geometry: EngineHandle, appearance: EngineHandle) -> BackendResult<()> {
        self.expect_kind(geometry, "GeometryBinding", |k| matches!(k, EngineObjectKind::Geometry { .. }))?;
        self.expect_kind(appearance, "Appearance", |k| matches!(k, EngineObjectKind::Appearance { .. }))?;
        let object = self.get_mut(mesh)?;
        match &mut object.kind {
            EngineObjectKind::Mesh {
                geometry: geometry_slot,
                appearance: appearance_slot,
            } => {
                *geometry_slot = Some(geometry);
                *appearance_slot = Some(appearance);
                Ok(())
            }
            other => Err(BackendError::WrongKind {
                name: object.name.clone(),
                expected: "MeshNode",
                found: other.label(),
            }),
        }
    }

    fn set_scale(&mut self, node: EngineHandle, scale: Vec3) -> BackendResult<()> {
        self.scene_node_mut(node)?.scale = scale;
        Ok(())
    }

    fn set_rotation(&mut self, node: EngineHandle, axis: Axis, degrees: f32) -> BackendResult<()> {
        self.scene_node_mut(node)?.rotation[axis.index()] = degrees;
        Ok(())
    }

    fn set_translation(&mut self, node: EngineHandle, translation: Vec3) -> BackendResult<()> {
        self.scene_node_mut(node)?.translation = translation;
        Ok(())
    }

    fn add_child(&mut self, parent: EngineHandle, child: EngineHandle) -> BackendResult<()> {
        self.scene_node(parent)?;
        let old_parent = self.scene_node(child)?.parent;
        if self.is_ancestor_or_self(child, parent) {
            return Err(BackendError::InvalidArgument(format!(
                "linking '{}' below '{}' would create a cycle",
                self.get(child)?.name,
                self.get(parent)?.name
            )));
        }

        if let Some(old_parent) = old_parent {
            self.scene_node_mut(old_parent)?.children.retain(|&c| c != child);
        }
        self.scene_node_mut(child)?.parent = Some(parent);
        self.scene_node_mut(parent)?.children.push(child);
        Ok(())
    }

    fn create_render_group(&mut self, name: &str) -> BackendResult<EngineHandle> {
        Ok(self.insert(
            name,
            EngineObjectKind::RenderGroup {
                meshes: Vec::new(),
                groups: Vec::new(),
            },
        ))
    }

    fn create_render_pass(&mut self, name: &str) -> BackendResult<EngineHandle> {
        Ok(self.insert(
            name,
            EngineObjectKind::RenderPass {
                camera: None,
                groups: Vec::new(),
            },
        ))
    }

    fn add_mesh_to_group(&mut self, group: EngineHandle, mesh: EngineHandle, order: i32) -> BackendResult<()> {
        self.expect_kind(mesh, "MeshNode", |k| matches!(k, EngineObjectKind::Mesh { .. }))?;
        self.push_group_member(group, mesh, order, true)
    }

    fn add_group_to_group(&mut self, group: EngineHandle, nested: EngineHandle, order: i32) -> BackendResult<()> {
        self.expect_kind(nested, "RenderGroup", is_render_group)?;
        if group == nested {
            return Err(BackendError::InvalidArgument("a render group cannot contain itself".to_string()));
        }
        self.push_group_member(group, nested, order, false)
    }

    fn add_group_to_pass(&mut self, pass: EngineHandle, group: EngineHandle, order: i32) -> BackendResult<()> {
        self.expect_kind(group, "RenderGroup", is_render_group)?;
        let object = self.get_mut(pass)?;
        match &mut object.kind {
            EngineObjectKind::RenderPass { groups, .. } => {
                groups.retain(|(existing, _)| *existing != group);
                groups.push((group, order));
                Ok(())
            }
            other => Err(BackendError::WrongKind {
                name: object.name.clone(),
                expected: "RenderPass",
                found: other.label(),
            }),
        }
    }

    fn set_pass_camera(&mut self, pass: EngineHandle, camera: EngineHandle) -> BackendResult<()> {
        self.expect_kind(camera, "Camera", |k| matches!(k, EngineObjectKind::Camera(_)))?;
        let object = self.get_mut(pass)?;
        match &mut object.kind {
            EngineObjectKind::RenderPass { camera: slot, .. } => {
                *slot = Some(camera);
                Ok(())
            }
            other => Err(BackendError::WrongKind {
                name: object.name.clone(),
                expected: "RenderPass",
                found: other.label(),
            }),
        }
    }

    fn destroy(&mut self, handle: EngineHandle) -> BackendResult<()> {
        let removed = self.objects.remove(handle).ok_or(BackendError::UnknownHandle(handle))?;
        self.buffers.remove(handle);

        if let Some(state) = removed.node {
            if let Some(parent) = state.parent.and_then(|p| self.objects.get_mut(p)).and_then(|o| o.node.as_mut()) {
                parent.children.retain(|&c| c != handle);
            }
            for child in state.children {
                if let Some(child_state) = self.objects.get_mut(child).and_then(|o| o.node.as_mut()) {
                    child_state.parent = None;
                }
            }
        }
        for (_, object) in &mut self.objects {
            object.kind.unlink(handle);
        }

        log::trace!("Destroyed {} '{}'", removed.kind.label(), removed.name);
        Ok(())
    }

    fn validation_report(&self) -> String {
        let mut problems = Vec::new();
        let live = |handle: &EngineHandle| self.objects.contains_key(*handle);

        for (_, object) in &self.objects {
            let name = &object.name;
            match &object.kind {
                EngineObjectKind::Mesh { geometry, appearance } => {
                    if geometry.is_none() {
                        problems.push(format!("MeshNode '{name}' has no geometry binding"));
                    }
                    if appearance.is_none() {
                        problems.push(format!("MeshNode '{name}' has no appearance"));
                    }
                }
                EngineObjectKind::Camera(setup) => {
                    if setup.viewport.width == 0 || setup.viewport.height == 0 {
                        problems.push(format!("Camera '{name}' has an empty viewport"));
                    }
                    let (near, far) = match setup.frustum {
                        Frustum::Perspective { near, far, .. } | Frustum::Orthographic { near, far, .. } => (near, far),
                    };
                    if !(near > 0.0 && far > near) {
                        problems.push(format!("Camera '{name}' has invalid clip planes {near}..{far}"));
                    }
                }
                EngineObjectKind::Appearance { effect } if !live(effect) => {
                    problems.push(format!("Appearance '{name}' references a destroyed effect"));
                }
                EngineObjectKind::Geometry { effect, indices, inputs } => {
                    if !live(effect) {
                        problems.push(format!("GeometryBinding '{name}' references a destroyed effect"));
                    }
                    if indices.is_none() {
                        problems.push(format!("GeometryBinding '{name}' has no index buffer"));
                    }
                    if inputs.is_empty() {
                        problems.push(format!("GeometryBinding '{name}' has no vertex input"));
                    }
                }
                EngineObjectKind::RenderGroup { meshes, groups } if meshes.is_empty() && groups.is_empty() => {
                    problems.push(format!("RenderGroup '{name}' is empty"));
                }
                EngineObjectKind::RenderPass { camera: None, .. } => {
                    problems.push(format!("RenderPass '{name}' has no camera"));
                }
                _ => {}
            }
        }

        problems.join("\n")
    }

    fn serialize_to_files(&self, scene_path: &Path, resources_path: &Path) -> BackendResult<()> {
        let mut resources = Vec::new();
        let mut blob = Vec::new();
        for (handle, _) in &self.objects {
            if let Some(buffer) = self.buffers.get(handle) {
                let bytes = buffer.bytes();
                resources.push(ResourceEntry {
                    handle,
                    offset: blob.len(),
                    length: bytes.len(),
                });
                blob.extend_from_slice(bytes);
            }
        }

        let file = SceneFile {
            name: self.name.clone(),
            rotation_convention: self.convention,
            objects: self.objects.iter().map(|(h, o)| (h, o.clone())).collect(),
            resources,
        };
        let text = ron::ser::to_string_pretty(&file, ron::ser::PrettyConfig::default())
            .map_err(|e| BackendError::Serialize(e.to_string()))?;

        std::fs::write(scene_path, text)?;
        std::fs::write(resources_path, blob)?;
        log::info!(
            "Saved scene '{}' to {} and {}",
            self.name,
            scene_path.display(),
            resources_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Viewport;
    use crate::foundation::math::{Mat4Ext, Point3};
    use approx::assert_relative_eq;

    fn scene() -> RecordingScene {
        RecordingScene::new("Test", RotationConvention::Clockwise)
    }

    fn camera_setup() -> CameraSetup {
        CameraSetup {
            viewport: Viewport {
                x: 0,
                y: 0,
                width: 640,
                height: 480,
            },
            frustum: Frustum::Perspective {
                fov_y: 40.0,
                aspect: 4.0 / 3.0,
                near: 0.1,
                far: 100.0,
            },
        }
    }

    #[test]
    fn test_clockwise_rotation_turns_negative() {
        let mut scene = scene();
        let node = scene.create_node("Rotated").unwrap();
        scene.set_rotation(node, Axis::Z, 90.0).unwrap();

        let matrix = scene.model_matrix(node).unwrap();
        assert_relative_eq!(matrix, Mat4::rotation_z(-std::f32::consts::FRAC_PI_2), epsilon = 1e-6);
    }

    #[test]
    fn test_model_matrix_composes_parents() {
        let mut scene = scene();
        let parent = scene.create_node("Parent").unwrap();
        let child = scene.create_node("Child").unwrap();
        scene.set_translation(parent, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        scene.set_scale(child, Vec3::new(2.0, 2.0, 2.0)).unwrap();
        scene.add_child(parent, child).unwrap();

        let point = scene.model_matrix(child).unwrap().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(point.x, 3.0);
    }

    #[test]
    fn test_add_child_rejects_cycles() {
        let mut scene = scene();
        let a = scene.create_node("A").unwrap();
        let b = scene.create_node("B").unwrap();
        scene.add_child(a, b).unwrap();

        assert!(scene.add_child(b, a).is_err());
        assert!(scene.add_child(a, a).is_err());
    }

    #[test]
    fn test_vertex_buffer_needs_matching_effect_input() {
        let mut scene = scene();
        let effect = scene.create_effect("Effect", "in vec3 a_position;", "void main() {}").unwrap();
        let geometry = scene.create_geometry("Geometry", effect).unwrap();
        let array = scene.create_vertex_array("Vertices", &[0.0, 0.0, 0.0]).unwrap();

        assert!(scene.set_vertex_buffer(geometry, "a_position", array).is_ok());
        assert!(matches!(
            scene.set_vertex_buffer(geometry, "a_normal", array),
            Err(BackendError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let mut scene = scene();
        let node = scene.create_node("Node").unwrap();
        let group = scene.create_render_group("Group").unwrap();

        assert!(matches!(
            scene.add_mesh_to_group(group, node, 0),
            Err(BackendError::WrongKind { expected: "MeshNode", .. })
        ));
        assert!(scene.set_translation(group, Vec3::zeros()).is_err());
    }

    #[test]
    fn test_validation_report_lists_problems() {
        let mut scene = scene();
        scene.create_mesh("Empty mesh").unwrap();
        scene.create_render_pass("Pass").unwrap();
        scene.create_render_group("Group").unwrap();

        let report = scene.validation_report();
        assert!(report.contains("MeshNode 'Empty mesh' has no geometry binding"));
        assert!(report.contains("RenderPass 'Pass' has no camera"));
        assert!(report.contains("RenderGroup 'Group' is empty"));
    }

    #[test]
    fn test_destroy_unlinks_references() {
        let mut scene = scene();
        let camera = scene.create_camera("Camera", &camera_setup()).unwrap();
        let pass = scene.create_render_pass("Pass").unwrap();
        let group = scene.create_render_group("Group").unwrap();
        scene.set_pass_camera(pass, camera).unwrap();
        scene.add_group_to_pass(pass, group, 0).unwrap();

        scene.destroy(group).unwrap();

        assert!(scene.object(group).is_none());
        match &scene.object(pass).unwrap().kind {
            EngineObjectKind::RenderPass { groups, camera: Some(_) } => assert!(groups.is_empty()),
            other => panic!("unexpected pass state {other:?}"),
        }
        assert!(scene.validation_report().is_empty());
        assert!(scene.destroy(group).is_err());
    }

    #[test]
    fn test_serialize_writes_both_files() {
        let dir = std::env::temp_dir().join("scene_export_recording_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let (scene_path, resources_path) = (dir.join("Test.scene"), dir.join("Test.resources"));

        let mut scene = scene();
        scene.create_index_array("Indices", &[0, 1, 2]).unwrap();
        scene.create_vertex_array("Vertices", &[0.0; 9]).unwrap();
        scene.serialize_to_files(&scene_path, &resources_path).unwrap();

        let file = RecordingScene::read_scene_file(&scene_path).unwrap();
        assert_eq!(file.name, "Test");
        assert_eq!(file.objects.len(), 2);
        assert_eq!(file.resources[0].length, 12);
        assert_eq!(file.resources[1].offset, 12);
        assert_eq!(std::fs::metadata(&resources_path).unwrap().len(), 12 + 36);
    }
}
