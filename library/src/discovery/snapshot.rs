//! Read-only view of the scene graph used by discovery.
//!
//! The host graph can change under us while a session runs, so discovery
//! captures node identity, keyable inputs and edges once and traverses the
//! copy. Nothing here mutates the scene.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::scene::{AttrFilter, Connection, NodeId, NodeType, PlugId, Scene, short_name};

#[derive(Clone, Debug, PartialEq)]
pub struct NodeView {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub parent: Option<NodeId>,
    /// Keyable, visible attributes in declaration order.
    pub keyable: Vec<String>,
    /// Every attribute, whatever its flags.
    pub attributes: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, NodeView>,
    connections: Vec<Connection>,
}

/// Evaluation-engine detection: which driven-key curves feed a plug.
pub trait DrivenKeyQuery {
    fn driven_key_curves(&self, plug: &PlugId) -> Vec<NodeId>;

    fn driven_key_count(&self, plug: &PlugId) -> usize {
        self.driven_key_curves(plug).len()
    }
}

impl GraphSnapshot {
    pub fn capture<S: Scene + ?Sized>(scene: &S) -> Self {
        let mut snapshot = GraphSnapshot::default();
        for id in scene.node_ids() {
            let (Some(name), Some(node_type)) = (scene.node_name(id), scene.node_type(id)) else {
                // Deleted between listing and query
                continue;
            };
            snapshot.order.push(id);
            snapshot.nodes.insert(
                id,
                NodeView {
                    id,
                    name,
                    node_type,
                    parent: scene.parent(id),
                    keyable: scene.list_attributes(id, AttrFilter::KEYABLE_VISIBLE),
                    attributes: scene.list_attributes(id, AttrFilter::ALL),
                },
            );
        }
        snapshot.connections = scene
            .connections()
            .into_iter()
            .filter(|c| {
                snapshot.nodes.contains_key(&c.from.node_id)
                    && snapshot.nodes.contains_key(&c.to.node_id)
            })
            .collect();
        snapshot
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeView> {
        self.nodes.get(&id)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    pub fn node_type(&self, id: NodeId) -> Option<&NodeType> {
        self.nodes.get(&id).map(|n| &n.node_type)
    }

    /// Nodes in the host's listing order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeView> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn keyable_attributes(&self, id: NodeId) -> &[String] {
        self.nodes
            .get(&id)
            .map(|n| n.keyable.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_attribute(&self, id: NodeId, attr: &str) -> bool {
        self.nodes
            .get(&id)
            .map(|n| n.attributes.iter().any(|a| a == attr))
            .unwrap_or(false)
    }

    /// The plug feeding `plug`, if any.
    pub fn source_of(&self, plug: &PlugId) -> Option<&PlugId> {
        self.connections
            .iter()
            .find(|c| &c.to == plug)
            .map(|c| &c.from)
    }

    /// Like [`GraphSnapshot::source_of`] but walks through `unitConversion`
    /// nodes to the real driver.
    pub fn source_skipping_conversions(&self, plug: &PlugId) -> Option<&PlugId> {
        let mut source = self.source_of(plug)?;
        let mut seen = HashSet::new();
        while self.node_type(source.node_id) == Some(&NodeType::UnitConversion) {
            if !seen.insert(source.node_id) {
                return None;
            }
            source = self.source_of(&PlugId::new(source.node_id, "input"))?;
        }
        Some(source)
    }

    /// Connections feeding any attribute of `id`.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.to.node_id == id)
    }

    /// First shape below a transform, or the node itself if it is a shape.
    pub fn shape_of(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        if node.node_type.is_shape() {
            return Some(id);
        }
        self.nodes()
            .find(|n| n.parent == Some(id) && n.node_type.is_shape())
            .map(|n| n.id)
    }

    /// The mesh a control displays on. Only transforms have one.
    pub fn surface_of(&self, control: NodeId) -> Option<NodeId> {
        if self.node_type(control)? != &NodeType::Transform {
            return None;
        }
        let shape = self.shape_of(control)?;
        (self.node_type(shape)? == &NodeType::Mesh).then_some(shape)
    }

    /// Every node upstream of `plug`, breadth first, each visited once.
    ///
    /// Starts at the node driving `plug` and then follows all inputs of each
    /// visited node.
    pub fn upstream_nodes(&self, plug: &PlugId) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        if let Some(source) = self.source_of(plug) {
            queue.push_back(source.node_id);
        }

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            for conn in self.incoming(current) {
                if !visited.contains(&conn.from.node_id) {
                    queue.push_back(conn.from.node_id);
                }
            }
        }
        order
    }

    /// Exact full-name lookup, falling back to `*:name`.
    ///
    /// Returns every match so callers can treat ambiguity.
    pub fn find_by_name(&self, name: &str) -> Vec<NodeId> {
        let exact: Vec<NodeId> = self
            .nodes()
            .filter(|n| n.name == name)
            .map(|n| n.id)
            .collect();
        if !exact.is_empty() {
            return exact;
        }
        self.nodes()
            .filter(|n| {
                n.name
                    .rsplit_once(':')
                    .map(|(_, base)| base == name)
                    .unwrap_or(false)
            })
            .map(|n| n.id)
            .collect()
    }

    /// Short name of a node (`rig:CTRL_L_eye` → `CTRL_L_eye`).
    pub fn short_name(&self, id: NodeId) -> Option<&str> {
        self.name(id).map(short_name)
    }
}

impl DrivenKeyQuery for GraphSnapshot {
    fn driven_key_curves(&self, plug: &PlugId) -> Vec<NodeId> {
        let Some(source) = self.source_skipping_conversions(plug) else {
            return Vec::new();
        };
        match self.node_type(source.node_id) {
            Some(t) if t.is_driven_key_curve() => vec![source.node_id],
            // Several driven keys on one attribute are summed by a blend node
            Some(NodeType::BlendWeighted) => self
                .incoming(source.node_id)
                .filter(|c| {
                    self.node_type(c.from.node_id)
                        .map(|t| t.is_driven_key_curve())
                        .unwrap_or(false)
                })
                .map(|c| c.from.node_id)
                .collect(),
            _ => Vec::new(),
        }
    }
}
