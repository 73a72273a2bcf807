//! View layer grouping overlay

use crate::source::{Collection, ObjectId, ViewLayer};

use super::graph::SceneGraph;
use super::{GraphError, NodeId};

/// One member of a group
#[derive(Debug, Clone, PartialEq)]
pub enum GroupMember {
    /// Reference to a node of the scene graph
    Node(NodeId),
    /// Nested collection
    Group(GroupNode),
}

/// Non-owning grouping of scene graph nodes
///
/// Built once per view layer after the tree is complete. Nested collections
/// become nested groups.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    /// Layer or collection name
    pub name: String,
    /// Name of the view layer this group belongs to
    pub layer: String,
    /// Members in declaration order, direct objects first
    pub children: Vec<GroupMember>,
}

impl GroupNode {
    /// Group the members of `layer`
    ///
    /// Excluded collections are skipped with everything they contain.
    /// Members without a node in `graph` are skipped.
    pub fn from_view_layer(graph: &SceneGraph, layer: &ViewLayer) -> Result<Self, GraphError> {
        let children = collect_members(graph, &layer.name, &layer.objects, &layer.collections)?;
        Ok(Self {
            name: layer.name.clone(),
            layer: layer.name.clone(),
            children,
        })
    }

    fn from_collection(graph: &SceneGraph, layer: &str, collection: &Collection) -> Result<Self, GraphError> {
        let children = collect_members(graph, layer, &collection.objects, &collection.children)?;
        Ok(Self {
            name: collection.name.clone(),
            layer: layer.to_string(),
            children,
        })
    }

    /// Direct node members
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().filter_map(|member| match member {
            GroupMember::Node(id) => Some(*id),
            GroupMember::Group(_) => None,
        })
    }

    /// Direct nested groups
    pub fn groups(&self) -> impl Iterator<Item = &GroupNode> {
        self.children.iter().filter_map(|member| match member {
            GroupMember::Node(_) => None,
            GroupMember::Group(group) => Some(group),
        })
    }

    /// Node members of this group and all nested groups, depth-first
    pub fn all_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_nodes(&mut out);
        out
    }

    fn collect_nodes(&self, out: &mut Vec<NodeId>) {
        for member in &self.children {
            match member {
                GroupMember::Node(id) => out.push(*id),
                GroupMember::Group(group) => group.collect_nodes(out),
            }
        }
    }

    /// Whether the group has no members at all
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

fn collect_members(
    graph: &SceneGraph,
    layer: &str,
    objects: &[ObjectId],
    collections: &[Collection],
) -> Result<Vec<GroupMember>, GraphError> {
    let mut members = Vec::with_capacity(objects.len() + collections.len());

    for &object in objects {
        match graph.find_by_source(object)? {
            Some(id) => members.push(GroupMember::Node(id)),
            None => log::debug!("Object {} of layer '{}' has no IR node, skipping", object, layer),
        }
    }

    for collection in collections {
        if collection.excluded {
            log::debug!("Skipping excluded collection '{}' in layer '{}'", collection.name, layer);
            continue;
        }
        members.push(GroupMember::Group(GroupNode::from_collection(graph, layer, collection)?));
    }

    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CreationLimits;
    use crate::source::{PolygonMesh, RenderSettings, SourceObject};

    fn graph_with_meshes(count: u32) -> SceneGraph {
        let mut graph = SceneGraph::new(RenderSettings::default(), CreationLimits::default());
        for id in 1..=count {
            graph.add_node(&SourceObject::mesh(id, format!("Mesh{id}"), PolygonMesh::plane(1.0))).unwrap();
        }
        graph
    }

    #[test]
    fn test_disabled_layer_yields_no_group() {
        let mut graph = graph_with_meshes(2);
        let layers = vec![
            ViewLayer::new("Active").with_objects([ObjectId(1)]),
            ViewLayer::new("Hidden").with_objects([ObjectId(2)]).with_enabled(false),
        ];

        let groups = graph.as_groups(&layers).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Active");
        assert_eq!(groups[0].all_nodes().len(), 1);

        graph.teardown();
    }

    #[test]
    fn test_nested_collections_become_nested_groups() {
        let mut graph = graph_with_meshes(3);
        let layer = ViewLayer::new("View Layer")
            .with_objects([ObjectId(1)])
            .with_collection(
                Collection::new("Props")
                    .with_objects([ObjectId(2)])
                    .with_child(Collection::new("Small").with_objects([ObjectId(3)])),
            );

        let group = GroupNode::from_view_layer(&graph, &layer).unwrap();

        assert_eq!(group.nodes().count(), 1);
        let props = group.groups().next().unwrap();
        assert_eq!(props.name, "Props");
        assert_eq!(props.layer, "View Layer");
        assert_eq!(props.groups().next().unwrap().name, "Small");
        assert_eq!(group.all_nodes().len(), 3);

        graph.teardown();
    }

    #[test]
    fn test_excluded_collection_is_skipped() {
        let mut graph = graph_with_meshes(2);
        let mut hidden = Collection::new("Hidden").with_objects([ObjectId(2)]);
        hidden.excluded = true;
        let layer = ViewLayer::new("View Layer").with_objects([ObjectId(1)]).with_collection(hidden);

        let group = GroupNode::from_view_layer(&graph, &layer).unwrap();

        assert_eq!(group.groups().count(), 0);
        assert_eq!(group.all_nodes().len(), 1);

        graph.teardown();
    }

    #[test]
    fn test_untranslated_members_are_skipped() {
        let mut graph = graph_with_meshes(1);
        let layer = ViewLayer::new("View Layer").with_objects([ObjectId(1), ObjectId(42)]);

        let group = GroupNode::from_view_layer(&graph, &layer).unwrap();

        assert_eq!(group.children.len(), 1);

        graph.teardown();
    }
}
