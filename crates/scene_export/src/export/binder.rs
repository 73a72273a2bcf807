//! Render group and render pass binding
//!
//! Runs after emission. Each enabled view layer becomes one render group,
//! nested collections become nested render groups, and every camera of the
//! layer gets a render pass drawing that layer's group.

use crate::backend::{EngineHandle, TargetScene};
use crate::ir::{GroupMember, GroupNode, NodeId, SceneGraph};

use super::emitter::EmittedScene;
use super::ExportError;

/// Counts of what the binder created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingSummary {
    /// Render groups kept in the scene
    pub render_groups: usize,
    /// Render passes created
    pub render_passes: usize,
    /// Render groups destroyed for having no meshes
    pub destroyed_groups: usize,
}

/// Creates render groups and passes from grouping overlays
pub struct PassBinder<'a, S: TargetScene> {
    scene: &'a mut S,
    summary: BindingSummary,
}

impl<'a, S: TargetScene> PassBinder<'a, S> {
    /// Binder writing into `scene`
    pub fn new(scene: &'a mut S) -> Self {
        Self {
            scene,
            summary: BindingSummary::default(),
        }
    }

    /// Bind one group per view layer, in layer order
    pub fn bind(
        mut self,
        graph: &SceneGraph,
        layers: &[GroupNode],
        emitted: &EmittedScene,
    ) -> Result<BindingSummary, ExportError> {
        for layer in layers {
            self.bind_layer(graph, layer, emitted)?;
        }
        Ok(self.summary)
    }

    fn bind_layer(&mut self, graph: &SceneGraph, layer: &GroupNode, emitted: &EmittedScene) -> Result<(), ExportError> {
        let group = self.scene.create_render_group(&layer.name)?;
        let group = if self.fill_group(graph, layer, group, emitted)? {
            self.summary.render_groups += 1;
            Some(group)
        } else {
            log::debug!("View layer '{}' has no meshes, destroying its render group", layer.name);
            self.scene.destroy(group)?;
            self.summary.destroyed_groups += 1;
            None
        };

        let cameras = cameras_of(graph, layer, emitted)?;
        if cameras.is_empty() {
            log::info!("View layer '{}' has no camera, no render pass created", layer.name);
        }
        for (camera_name, camera) in cameras {
            let pass = self.scene.create_render_pass(&format!("{}_{}_pass", layer.name, camera_name))?;
            self.scene.set_pass_camera(pass, camera)?;
            if let Some(group) = group {
                self.scene.add_group_to_pass(pass, group, 0)?;
            }
            self.summary.render_passes += 1;
        }
        Ok(())
    }

    /// Add the meshes and nested groups of `source` to `target`
    ///
    /// Returns whether `target` ended up with any content.
    fn fill_group(
        &mut self,
        graph: &SceneGraph,
        source: &GroupNode,
        target: EngineHandle,
        emitted: &EmittedScene,
    ) -> Result<bool, ExportError> {
        let mut mesh_order = 0;
        let mut group_order = 0;

        for member in &source.children {
            match member {
                GroupMember::Node(id) => {
                    if let Some(mesh) = drawable_mesh(graph, *id, emitted)? {
                        self.scene.add_mesh_to_group(target, mesh, mesh_order)?;
                        mesh_order += 1;
                    }
                }
                GroupMember::Group(nested) => {
                    let handle = self.scene.create_render_group(&nested.name)?;
                    if self.fill_group(graph, nested, handle, emitted)? {
                        self.scene.add_group_to_group(target, handle, group_order)?;
                        group_order += 1;
                        self.summary.render_groups += 1;
                    } else {
                        log::debug!("Collection '{}' has no meshes, destroying its render group", nested.name);
                        self.scene.destroy(handle)?;
                        self.summary.destroyed_groups += 1;
                    }
                }
            }
        }

        Ok(mesh_order > 0 || group_order > 0)
    }
}

fn drawable_mesh(graph: &SceneGraph, id: NodeId, emitted: &EmittedScene) -> Result<Option<EngineHandle>, ExportError> {
    let node = graph.node(id)?;
    if node.is_placeholder() || node.as_mesh().is_none() {
        return Ok(None);
    }
    Ok(emitted.content(id))
}

/// Emitted cameras anywhere in `layer`, in membership order
fn cameras_of<'g>(
    graph: &'g SceneGraph,
    layer: &GroupNode,
    emitted: &EmittedScene,
) -> Result<Vec<(&'g str, EngineHandle)>, ExportError> {
    let mut cameras: Vec<(&'g str, EngineHandle)> = Vec::new();
    for id in layer.all_nodes() {
        let node = graph.node(id)?;
        if node.as_camera().is_none() {
            continue;
        }
        if let Some(handle) = emitted.content(id) {
            if !cameras.iter().any(|(_, existing)| *existing == handle) {
                cameras.push((node.name.as_str(), handle));
            }
        }
    }
    Ok(cameras)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{EngineObjectKind, RecordingScene};
    use crate::compiler::{RotationConvention, TransformCompiler};
    use crate::config::CreationLimits;
    use crate::export::emitter::GraphEmitter;
    use crate::source::{CameraData, Collection, ObjectId, PolygonMesh, RenderSettings, SourceObject, ViewLayer};

    fn bind(objects: &[SourceObject], layers: &[ViewLayer]) -> (RecordingScene, BindingSummary) {
        let mut graph = SceneGraph::new(RenderSettings::default(), CreationLimits::default());
        for object in objects {
            graph.add_node(object).unwrap();
        }
        let groups = graph.as_groups(layers).unwrap();

        let mut scene = RecordingScene::new("Test", RotationConvention::Clockwise);
        let emitted = GraphEmitter::new(&mut scene, TransformCompiler::default()).emit(&graph).unwrap();
        let summary = PassBinder::new(&mut scene).bind(&graph, &groups, &emitted).unwrap();
        graph.teardown();
        (scene, summary)
    }

    #[test]
    fn test_meshes_are_ordered_per_group() {
        let objects = [
            SourceObject::mesh(1, "A", PolygonMesh::plane(1.0)),
            SourceObject::mesh(2, "B", PolygonMesh::plane(1.0)),
            SourceObject::camera(3, "Camera", CameraData::default()),
        ];
        let layer = ViewLayer::new("View Layer").with_objects([ObjectId(1), ObjectId(2), ObjectId(3)]);

        let (scene, summary) = bind(&objects, &[layer]);

        assert_eq!(summary.render_groups, 1);
        assert_eq!(summary.render_passes, 1);
        let group = scene.find_by_name("View Layer").unwrap();
        match &scene.object(group).unwrap().kind {
            EngineObjectKind::RenderGroup { meshes, .. } => {
                let orders: Vec<i32> = meshes.iter().map(|(_, order)| *order).collect();
                assert_eq!(orders, vec![0, 1]);
            }
            other => panic!("expected render group, got {other:?}"),
        }
        assert_eq!(scene.validation_report(), "");
    }

    #[test]
    fn test_layer_without_camera_has_no_pass() {
        let objects = [SourceObject::mesh(1, "A", PolygonMesh::plane(1.0))];
        let layer = ViewLayer::new("View Layer").with_objects([ObjectId(1)]);

        let (scene, summary) = bind(&objects, &[layer]);

        assert_eq!(summary.render_passes, 0);
        assert!(scene.handles_of_kind("RenderPass").is_empty());
    }

    #[test]
    fn test_nested_group_orders_restart_per_parent() {
        let objects = [
            SourceObject::mesh(1, "A", PolygonMesh::plane(1.0)),
            SourceObject::mesh(2, "B", PolygonMesh::plane(1.0)),
            SourceObject::mesh(3, "C", PolygonMesh::plane(1.0)),
        ];
        let layer = ViewLayer::new("View Layer")
            .with_objects([ObjectId(1)])
            .with_collection(Collection::new("First").with_objects([ObjectId(2)]))
            .with_collection(Collection::new("Second").with_objects([ObjectId(3)]));

        let (scene, summary) = bind(&objects, &[layer]);

        assert_eq!(summary.render_groups, 3);
        let group = scene.find_by_name("View Layer").unwrap();
        match &scene.object(group).unwrap().kind {
            EngineObjectKind::RenderGroup { meshes, groups } => {
                assert_eq!(meshes.len(), 1);
                assert_eq!(meshes[0].1, 0);
                let orders: Vec<i32> = groups.iter().map(|(_, order)| *order).collect();
                assert_eq!(orders, vec![0, 1]);
            }
            other => panic!("expected render group, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_collection_group_is_destroyed() {
        let objects = [
            SourceObject::mesh(1, "A", PolygonMesh::plane(1.0)),
            SourceObject::light(2, "Lamp", Default::default()),
        ];
        let layer = ViewLayer::new("View Layer")
            .with_objects([ObjectId(1)])
            .with_collection(Collection::new("Lights").with_objects([ObjectId(2)]));

        let (scene, summary) = bind(&objects, &[layer]);

        assert_eq!(summary.destroyed_groups, 1);
        assert!(scene.find_by_name("Lights").is_none());
        assert_eq!(scene.handles_of_kind("RenderGroup").len(), 1);
    }
}
