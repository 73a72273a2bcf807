//! Scene graph container
//!
//! Owns every IR node of one scene in a slotmap arena together with the
//! geometry pool of its meshes. Nodes link to each other by key only.
//!
//! The graph is single use: build it, hand it to the emitter, then call
//! [`SceneGraph::teardown`]. Any access after teardown fails with
//! [`GraphError::TornDown`]. Dropping a graph that was never torn down
//! leaks its geometry handles and asserts in debug builds.

use std::fmt;

use crate::config::CreationLimits;
use crate::foundation::collections::{NodeId, SlotMap};
use crate::source::{ObjectId, ObjectType, RenderSettings, SourceObject, ViewLayer};

use super::camera::CameraNode;
use super::group::GroupNode;
use super::light::LightNode;
use super::mesh::{Geometry, GeometryPool, MeshData, VertexFormat};
use super::node::{Node, NodeKind};
use super::GraphError;

/// Name of the synthetic root created by [`SceneGraph::new`]
pub const ROOT_NODE_NAME: &str = "Root node";

/// Owner of the IR tree of one scene
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    geometry: GeometryPool,
    root: Option<NodeId>,
    render: RenderSettings,
    limits: CreationLimits,
    vertex_format: VertexFormat,
    objects_seen: usize,
    created: usize,
    placeholders: usize,
    torn_down: bool,
}

impl SceneGraph {
    /// Create a graph rooted at a synthetic placeholder
    ///
    /// Every source object then becomes a child of that root and compiles
    /// its own transform chain. The synthetic root does not count towards
    /// the creation limits.
    pub fn new(render: RenderSettings, limits: CreationLimits) -> Self {
        let mut graph = Self::uninitialized(render, limits);
        let root = graph.nodes.insert(Node::placeholder(ROOT_NODE_NAME));
        graph.root = Some(root);
        graph
    }

    /// Create an empty graph whose first added node becomes the root
    pub fn uninitialized(render: RenderSettings, limits: CreationLimits) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            geometry: GeometryPool::new(),
            root: None,
            render,
            limits,
            vertex_format: VertexFormat::default(),
            objects_seen: 0,
            created: 0,
            placeholders: 0,
            torn_down: false,
        }
    }

    /// Set the attribute names bound by meshes created from now on
    pub fn with_vertex_format(mut self, vertex_format: VertexFormat) -> Self {
        self.vertex_format = vertex_format;
        self
    }

    fn ensure_live(&self) -> Result<(), GraphError> {
        if self.torn_down {
            Err(GraphError::TornDown)
        } else {
            Ok(())
        }
    }

    /// Translate `object` into a node
    ///
    /// The node is attached below the node backed by the object's declared
    /// parent, or below the root when that parent has not been translated.
    /// Content that cannot be represented becomes a placeholder.
    pub fn add_node(&mut self, object: &SourceObject) -> Result<NodeId, GraphError> {
        self.ensure_live()?;
        let parent = match object.parent {
            Some(parent_id) => {
                let found = self.find_by_source(parent_id)?;
                if found.is_none() {
                    log::debug!("Parent {} of '{}' not translated, attaching to root", parent_id, object.name);
                }
                found
            }
            None => None,
        };
        self.add_object(object, parent)
    }

    /// Translate `object` into a node attached below `parent`
    pub fn add_node_with_parent(&mut self, object: &SourceObject, parent: NodeId) -> Result<NodeId, GraphError> {
        self.ensure_live()?;
        if !self.nodes.contains_key(parent) {
            return Err(GraphError::UnknownNode);
        }
        self.add_object(object, Some(parent))
    }

    /// Add a placeholder node without source object below the root
    pub fn add_placeholder(&mut self, name: impl Into<String>) -> Result<NodeId, GraphError> {
        self.ensure_live()?;
        self.placeholders += 1;
        self.insert(Node::placeholder(name), None)
    }

    fn add_object(&mut self, object: &SourceObject, parent: Option<NodeId>) -> Result<NodeId, GraphError> {
        self.objects_seen += 1;

        let node = match self.classify(object) {
            Ok(kind) => Node::from_source(object, kind),
            Err(err @ (GraphError::MalformedMesh { .. } | GraphError::UnsupportedObjectType { .. })) => {
                log::warn!("{}; substituting a placeholder", err);
                self.placeholders += 1;
                Node::placeholder_for(object, object.name.clone())
            }
            Err(err) => return Err(err),
        };

        let id = self.insert(node, parent)?;
        log::debug!("Added {}", self.nodes[id]);
        Ok(id)
    }

    fn classify(&mut self, object: &SourceObject) -> Result<NodeKind, GraphError> {
        let unsupported = |detail: &str| GraphError::UnsupportedObjectType {
            name: object.name.clone(),
            object_type: detail.to_string(),
        };

        match &object.object_type {
            ObjectType::Mesh => {
                let polygons = object.mesh.as_ref().ok_or_else(|| GraphError::MalformedMesh {
                    name: object.name.clone(),
                    reason: "no polygon data".to_string(),
                })?;
                let geometry = Geometry::triangulate(polygons).map_err(|reason| GraphError::MalformedMesh {
                    name: object.name.clone(),
                    reason,
                })?;
                let malformed = geometry.is_malformed();
                let key = self.geometry.allocate(geometry);
                if malformed {
                    self.geometry.release(key);
                    return Err(GraphError::MalformedMesh {
                        name: object.name.clone(),
                        reason: "no faces after triangulation".to_string(),
                    });
                }
                Ok(NodeKind::Mesh(MeshData::new(key, self.vertex_format.clone())))
            }
            ObjectType::Camera => {
                let data = object.camera.as_ref().ok_or_else(|| unsupported("CAMERA (no camera data)"))?;
                CameraNode::from_source(&object.name, data, &self.render).map(NodeKind::Camera)
            }
            ObjectType::Light => {
                let data = object.light.as_ref().ok_or_else(|| unsupported("LIGHT (no light data)"))?;
                Ok(NodeKind::Light(LightNode::from_source(data)))
            }
            ObjectType::Other(tag) => Err(unsupported(tag)),
        }
    }

    fn insert(&mut self, mut node: Node, parent: Option<NodeId>) -> Result<NodeId, GraphError> {
        let created = self.created + 1;
        if self.limits.is_exceeded(created, self.objects_seen) {
            return Err(GraphError::OverCreation {
                created,
                objects: self.objects_seen,
                limit: self.limits.limit_for(self.objects_seen),
            });
        }
        self.created = created;

        let Some(root) = self.root else {
            node.name.push_str(" (Root node)");
            let id = self.nodes.insert(node);
            self.root = Some(id);
            return Ok(id);
        };

        let parent = parent.unwrap_or(root);
        node.parent = Some(parent);
        let id = self.nodes.insert(node);
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// Make `child` the last child of `parent`
    ///
    /// A child that already has a parent is moved. Fails when `child` is
    /// `parent` itself or one of its ancestors.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        self.ensure_live()?;
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return Err(GraphError::UnknownNode);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(GraphError::Cycle {
                parent: self.nodes[parent].name.clone(),
                child: self.nodes[child].name.clone(),
            });
        }

        if let Some(old_parent) = self.nodes[child].parent {
            self.nodes[old_parent].children.retain(|&c| c != child);
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        Ok(())
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(node).and_then(Node::parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Whether `node` is part of the tree below the root
    pub fn contains(&self, node: NodeId) -> Result<bool, GraphError> {
        match self.root {
            Some(root) => self.contains_from(root, node),
            None => self.ensure_live().map(|()| false),
        }
    }

    /// Whether `node` is `ancestor` or one of its descendants
    pub fn contains_from(&self, ancestor: NodeId, node: NodeId) -> Result<bool, GraphError> {
        self.ensure_live()?;
        Ok(self.nodes.contains_key(ancestor) && self.is_ancestor_or_self(ancestor, node))
    }

    /// Depth-first pre-order iterator over the whole tree
    pub fn traverse(&self) -> Result<Traverse<'_>, GraphError> {
        self.ensure_live()?;
        Ok(Traverse::new(&self.nodes, self.root))
    }

    /// Depth-first pre-order iterator over the subtree at `start`
    pub fn traverse_from(&self, start: NodeId) -> Result<Traverse<'_>, GraphError> {
        self.ensure_live()?;
        if !self.nodes.contains_key(start) {
            return Err(GraphError::UnknownNode);
        }
        Ok(Traverse::new(&self.nodes, Some(start)))
    }

    /// Nodes matching `predicate` in traversal order
    ///
    /// Stops after `limit` matches; `0` means unbounded.
    pub fn find(&self, predicate: impl FnMut(&Node) -> bool, limit: usize) -> Result<Vec<NodeId>, GraphError> {
        Ok(collect_matches(self.traverse()?, predicate, limit))
    }

    /// Like [`find`](Self::find), restricted to the subtree at `start`
    pub fn find_from(
        &self,
        start: NodeId,
        predicate: impl FnMut(&Node) -> bool,
        limit: usize,
    ) -> Result<Vec<NodeId>, GraphError> {
        Ok(collect_matches(self.traverse_from(start)?, predicate, limit))
    }

    /// First node backed by source object `source`
    pub fn find_by_source(&self, source: ObjectId) -> Result<Option<NodeId>, GraphError> {
        Ok(self
            .traverse()?
            .find(|(_, node)| node.source() == Some(source))
            .map(|(id, _)| id))
    }

    /// Node behind `id`
    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.ensure_live()?;
        self.nodes.get(id).ok_or(GraphError::UnknownNode)
    }

    /// Mutable node behind `id`
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.ensure_live()?;
        self.nodes.get_mut(id).ok_or(GraphError::UnknownNode)
    }

    /// Root key, absent until the first node is added to an uninitialized graph
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes in the tree, root included
    pub fn node_count(&self) -> usize {
        if self.torn_down {
            0
        } else {
            self.nodes.len()
        }
    }

    /// Number of nodes in the subtree at `start`
    pub fn subtree_size(&self, start: NodeId) -> Result<usize, GraphError> {
        Ok(self.traverse_from(start)?.count())
    }

    /// Number of placeholders substituted so far, synthetic root excluded
    pub const fn placeholder_count(&self) -> usize {
        self.placeholders
    }

    /// Number of source objects translated so far
    pub const fn objects_seen(&self) -> usize {
        self.objects_seen
    }

    /// Triangulated geometry of mesh node `id`
    pub fn geometry(&self, id: NodeId) -> Result<&Geometry, GraphError> {
        let node = self.node(id)?;
        let mesh = node.as_mesh().ok_or_else(|| GraphError::NotAMesh(node.name.clone()))?;
        self.geometry.get(mesh.geometry).ok_or(GraphError::UnknownNode)
    }

    /// Geometry pool of this graph
    pub const fn geometry_pool(&self) -> &GeometryPool {
        &self.geometry
    }

    /// Whether [`teardown`](Self::teardown) already ran
    pub const fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// One group per enabled view layer
    ///
    /// Must be called after every object has been added, since groups only
    /// reference nodes that already exist.
    pub fn as_groups(&self, layers: &[ViewLayer]) -> Result<Vec<GroupNode>, GraphError> {
        let mut groups = Vec::new();
        for layer in layers {
            if !layer.enabled {
                log::debug!("Skipping disabled view layer '{}'", layer.name);
                continue;
            }
            groups.push(GroupNode::from_view_layer(self, layer)?);
        }
        Ok(groups)
    }

    /// Release every geometry handle, children before parents
    ///
    /// Returns the number of handles released. A second call does nothing.
    pub fn teardown(&mut self) -> usize {
        if self.torn_down {
            log::debug!("Scene graph already torn down");
            return 0;
        }

        let order: Vec<NodeId> = Traverse::new(&self.nodes, self.root).map(|(id, _)| id).collect();
        let mut released = 0;
        for id in order.into_iter().rev() {
            if let Some(mesh) = self.nodes[id].as_mesh() {
                if self.geometry.release(mesh.geometry) {
                    released += 1;
                }
            }
        }
        if self.geometry.live_count() > 0 {
            log::warn!("{} geometry handles were not reachable from the root", self.geometry.live_count());
        }

        self.torn_down = true;
        log::debug!("Scene graph torn down, released {} geometry handles", released);
        released
    }

    fn fmt_subtree(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = &self.nodes[id];
        writeln!(f, "{:indent$}{}", "", node, indent = depth * 2)?;
        for &child in node.children() {
            self.fmt_subtree(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("live_geometry", &self.geometry.live_count())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl fmt::Display for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) if !self.torn_down => self.fmt_subtree(f, root, 0),
            Some(_) => f.write_str("<torn down>"),
            None => f.write_str("<empty>"),
        }
    }
}

impl Drop for SceneGraph {
    fn drop(&mut self) {
        if self.torn_down || std::thread::panicking() {
            return;
        }
        log::warn!(
            "Scene graph dropped without teardown, {} geometry handles leaked",
            self.geometry.live_count()
        );
        debug_assert!(self.torn_down, "scene graph dropped without teardown");
    }
}

fn collect_matches(traverse: Traverse<'_>, mut predicate: impl FnMut(&Node) -> bool, limit: usize) -> Vec<NodeId> {
    let matches = traverse.filter(|(_, node)| predicate(node)).map(|(id, _)| id);
    if limit == 0 {
        matches.collect()
    } else {
        matches.take(limit).collect()
    }
}

/// Lazy depth-first pre-order traversal
///
/// Children are visited in insertion order. Cloning restarts nothing; call
/// [`SceneGraph::traverse`] again for a fresh pass.
#[derive(Clone)]
pub struct Traverse<'a> {
    nodes: &'a SlotMap<NodeId, Node>,
    stack: Vec<NodeId>,
}

impl<'a> Traverse<'a> {
    fn new(nodes: &'a SlotMap<NodeId, Node>, start: Option<NodeId>) -> Self {
        Self {
            nodes,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for Traverse<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.nodes.get(id)?;
        self.stack.extend(node.children().iter().rev());
        Some((id, node))
    }
}
