//! IR to engine emission

use crate::backend::{CameraSetup, EngineHandle, Frustum, TargetScene, Viewport};
use crate::compiler::{TransformChain, TransformCompiler, TransformOp};
use crate::foundation::collections::SecondaryMap;
use crate::foundation::math::utils::rad_to_deg;
use crate::ir::{CameraNode, CameraProjection, MeshData, Node, NodeId, NodeKind, SceneGraph};
use crate::shaders::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};

use super::ExportError;

/// Engine handles created for the nodes of one graph
#[derive(Debug, Default)]
pub struct EmittedScene {
    content: SecondaryMap<NodeId, EngineHandle>,
    chain_nodes: usize,
}

impl EmittedScene {
    /// Content handle of IR node `id`
    pub fn content(&self, id: NodeId) -> Option<EngineHandle> {
        self.content.get(id).copied()
    }

    /// Number of emitted IR nodes
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Number of primitive transform nodes created
    pub const fn chain_nodes(&self) -> usize {
        self.chain_nodes
    }
}

/// Walks the IR depth-first and recreates it in the target scene
pub struct GraphEmitter<'a, S: TargetScene> {
    scene: &'a mut S,
    compiler: TransformCompiler,
}

impl<'a, S: TargetScene> GraphEmitter<'a, S> {
    /// Emitter writing into `scene`
    pub fn new(scene: &'a mut S, compiler: TransformCompiler) -> Self {
        Self { scene, compiler }
    }

    /// Emit every node of `graph`
    pub fn emit(&mut self, graph: &SceneGraph) -> Result<EmittedScene, ExportError> {
        let mut emitted = EmittedScene::default();
        if let Some(root) = graph.root() {
            self.emit_node(graph, root, None, &mut emitted)?;
        }
        log::debug!(
            "Emitted {} nodes with {} transform nodes",
            emitted.len(),
            emitted.chain_nodes
        );
        Ok(emitted)
    }

    fn emit_node(
        &mut self,
        graph: &SceneGraph,
        id: NodeId,
        parent_anchor: Option<EngineHandle>,
        emitted: &mut EmittedScene,
    ) -> Result<(), ExportError> {
        let node = graph.node(id)?;
        let chain = self.compiler.compile(node)?;
        let content = self.create_content(graph, id, node)?;
        emitted.content.insert(id, content);

        let links = match &chain {
            Some(chain) => self.create_chain(&node.name, chain)?,
            None => None,
        };
        let first = match links {
            Some((first, last)) => {
                self.scene.add_child(last, content)?;
                emitted.chain_nodes += chain.as_ref().map_or(0, TransformChain::len);
                first
            }
            None => content,
        };

        for &child in node.children() {
            self.emit_node(graph, child, Some(content), emitted)?;
        }

        if let Some(parent) = parent_anchor {
            self.scene.add_child(parent, first)?;
        }
        Ok(())
    }

    /// Create one engine node per op, linked outermost to innermost
    fn create_chain(
        &mut self,
        name: &str,
        chain: &TransformChain,
    ) -> Result<Option<(EngineHandle, EngineHandle)>, ExportError> {
        let mut first = None;
        let mut previous: Option<EngineHandle> = None;

        for op in chain.ops() {
            let handle = match *op {
                TransformOp::Translate(offset) => {
                    let handle = self.scene.create_node(&format!("{name}_translate"))?;
                    self.scene.set_translation(handle, offset)?;
                    handle
                }
                TransformOp::Rotate { axis, degrees } => {
                    let handle = self
                        .scene
                        .create_node(&format!("{name}_rotate_{}", axis.to_string().to_lowercase()))?;
                    self.scene.set_rotation(handle, axis, degrees)?;
                    handle
                }
                TransformOp::Scale(factors) => {
                    let handle = self.scene.create_node(&format!("{name}_scale"))?;
                    self.scene.set_scale(handle, factors)?;
                    handle
                }
            };

            if let Some(previous) = previous {
                self.scene.add_child(previous, handle)?;
            }
            first.get_or_insert(handle);
            previous = Some(handle);
        }

        Ok(first.zip(previous))
    }

    fn create_content(&mut self, graph: &SceneGraph, id: NodeId, node: &Node) -> Result<EngineHandle, ExportError> {
        match node.kind() {
            NodeKind::Generic => Ok(self.scene.create_node(&node.name)?),
            NodeKind::Light(light) => {
                log::debug!("Emitting {} '{}' as a plain node", light.label(), node.name);
                Ok(self.scene.create_node(&node.name)?)
            }
            NodeKind::Mesh(mesh) => self.create_mesh(graph, id, &node.name, mesh),
            NodeKind::Camera(camera) => Ok(self.scene.create_camera(&node.name, &camera_setup(camera))?),
        }
    }

    fn create_mesh(&mut self, graph: &SceneGraph, id: NodeId, name: &str, mesh: &MeshData) -> Result<EngineHandle, ExportError> {
        let geometry = graph.geometry(id)?;
        let (vertex_shader, fragment_shader) = mesh
            .custom_shaders()
            .unwrap_or((DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER));

        let indices = self.scene.create_index_array(&format!("{name}_indices"), &geometry.index_buffer())?;
        let vertices = self.scene.create_vertex_array(&format!("{name}_vertices"), &geometry.vertex_buffer())?;
        let effect = self.scene.create_effect(&format!("{name}_effect"), vertex_shader, fragment_shader)?;
        let binding = self.scene.create_geometry(&format!("{name}_geometry"), effect)?;
        let appearance = self.scene.create_appearance(&format!("{name}_appearance"), effect)?;

        self.scene.set_index_buffer(binding, indices)?;
        self.scene.set_vertex_buffer(binding, &mesh.vertex_format.position, vertices)?;
        if !mesh.vertex_format.normal.is_empty() {
            let normals = self.scene.create_vertex_array(&format!("{name}_normals"), &geometry.normal_buffer())?;
            self.scene.set_vertex_buffer(binding, &mesh.vertex_format.normal, normals)?;
        }

        let handle = self.scene.create_mesh(name)?;
        self.scene.set_mesh_content(handle, binding, appearance)?;
        Ok(handle)
    }
}

/// Viewport and frustum of a camera node
pub fn camera_setup(camera: &CameraNode) -> CameraSetup {
    let aspect = camera.aspect_ratio();
    let frustum = match camera.projection {
        CameraProjection::Perspective => Frustum::Perspective {
            fov_y: rad_to_deg(camera.vertical_fov),
            aspect,
            near: camera.z_near,
            far: camera.z_far,
        },
        CameraProjection::Orthographic { x_mag, y_mag } => {
            let (half_width, half_height) = if aspect >= 1.0 {
                (x_mag / 2.0, y_mag / 2.0 / aspect)
            } else {
                (x_mag / 2.0 * aspect, y_mag / 2.0)
            };
            Frustum::Orthographic {
                left: -half_width,
                right: half_width,
                bottom: -half_height,
                top: half_height,
                near: camera.z_near,
                far: camera.z_far,
            }
        }
    };

    CameraSetup {
        viewport: Viewport {
            x: 0,
            y: 0,
            width: camera.width,
            height: camera.height,
        },
        frustum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::backend::RecordingScene;
    use crate::compiler::RotationConvention;
    use crate::config::CreationLimits;
    use crate::source::{CameraData, ObjectId, ObjectType, PolygonMesh, ProjectionType, RenderSettings, SourceObject};

    fn emit(graph: &SceneGraph) -> (RecordingScene, EmittedScene) {
        let mut scene = RecordingScene::new("Test", RotationConvention::Clockwise);
        let emitted = GraphEmitter::new(&mut scene, TransformCompiler::default()).emit(graph).unwrap();
        (scene, emitted)
    }

    #[test]
    fn test_root_has_no_chain_and_children_attach_below_content() {
        let mut graph = SceneGraph::new(RenderSettings::default(), CreationLimits::default());
        let parent = graph.add_node(&SourceObject::new(1, "Parent", ObjectType::Other("EMPTY".into()))).unwrap();
        let child = graph
            .add_node(&SourceObject::mesh(2, "Child", PolygonMesh::plane(1.0)).with_parent(ObjectId(1)))
            .unwrap();

        let (scene, emitted) = emit(&graph);

        let root = emitted.content(graph.root().unwrap()).unwrap();
        assert!(scene.object(root).unwrap().node.as_ref().unwrap().parent.is_none());
        assert_eq!(emitted.chain_nodes(), 10);

        let parent_content = emitted.content(parent).unwrap();
        let child_translate = scene.find_by_name("Child_translate").unwrap();
        assert_eq!(scene.object(child_translate).unwrap().node.as_ref().unwrap().parent, Some(parent_content));

        let child_scale = scene.find_by_name("Child_scale").unwrap();
        let child_content = emitted.content(child).unwrap();
        assert_eq!(scene.object(child_content).unwrap().node.as_ref().unwrap().parent, Some(child_scale));

        graph.teardown();
    }

    #[test]
    fn test_identity_node_lands_on_parent() {
        let mut graph = SceneGraph::new(RenderSettings::default(), CreationLimits::default());
        let id = graph.add_node(&SourceObject::mesh(1, "Plane", PolygonMesh::plane(1.0))).unwrap();

        let (scene, emitted) = emit(&graph);

        assert_relative_eq!(scene.model_matrix(emitted.content(id).unwrap()).unwrap(), crate::foundation::math::Mat4::identity());

        graph.teardown();
    }

    #[test]
    fn test_mesh_content_is_valid() {
        let mut graph = SceneGraph::new(RenderSettings::default(), CreationLimits::default());
        let id = graph.add_node(&SourceObject::mesh(1, "Cube", PolygonMesh::cube(2.0))).unwrap();

        let (scene, emitted) = emit(&graph);
        let indices = scene.find_by_name("Cube_indices").unwrap();

        assert_eq!(scene.index_data(indices).unwrap().len(), 36);
        assert!(emitted.content(id).is_some());
        assert!(scene.find_by_name("Cube_normals").is_none());
        assert_eq!(scene.validation_report(), "");

        graph.teardown();
    }

    #[test]
    fn test_orthographic_camera_frustum() {
        let data = CameraData {
            projection: ProjectionType::Orthographic,
            ortho_scale: 8.0,
            ..CameraData::default()
        };
        let camera = CameraNode::from_source("Ortho", &data, &RenderSettings::new(800, 400)).unwrap();

        match camera_setup(&camera).frustum {
            Frustum::Orthographic { right, top, .. } => {
                assert_relative_eq!(right, 4.0);
                assert_relative_eq!(top, 2.0);
            }
            other => panic!("expected orthographic frustum, got {other:?}"),
        }
    }
}
