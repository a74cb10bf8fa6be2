//! In-process scene graph.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attribute::{AttrFilter, AttrValue, Attribute};
use super::connection::{Connection, NodeId, PlugId};
use super::node::{MeshData, NodeType, SceneNode};
use super::{ColorStorage, Scene, SceneError, SceneResult, Viewports};
use crate::color::UnitColor;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Viewport {
    pub name: String,
    #[serde(default = "default_true")]
    pub redraw_on_manipulation: bool,
}

const fn default_true() -> bool {
    true
}

/// A complete scene held in memory.
///
/// Color set edits leave construction-history nodes behind
/// (`createColorSet`, `polyColorPerVertex`, `deleteColorSet`), the same
/// trail an interactive host leaves.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct MemoryScene {
    #[serde(default)]
    pub nodes: Vec<SceneNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub viewports: Vec<Viewport>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(json_str: &str) -> Result<Self, serde_json::Error> {
        let scene: MemoryScene = serde_json::from_str(json_str)?;

        Ok(scene)
    }

    pub fn save(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Adds a node under a unique name derived from `name`.
    pub fn add_node(&mut self, name: &str, node_type: NodeType, parent: Option<NodeId>) -> NodeId {
        let unique = self.unique_name(name, None);
        let mut node = SceneNode::new(Uuid::new_v4(), &unique, node_type);
        node.parent = parent;
        let id = node.id;
        self.nodes.push(node);
        id
    }

    /// Adds a transform with a mesh shape below it. Returns `(transform, shape)`.
    pub fn add_mesh(&mut self, name: &str, vertex_count: usize) -> (NodeId, NodeId) {
        let transform = self.add_node(name, NodeType::Transform, None);
        let shape_name = format!("{}Shape", self.get_node(transform).map(|n| n.name.as_str()).unwrap_or(name));
        let shape = self.add_node(&shape_name, NodeType::Mesh, Some(transform));
        if let Some(node) = self.get_node_mut(shape) {
            node.mesh = Some(MeshData::new(vertex_count));
            node.add_attribute(Attribute::plain("displayColors", false));
        }
        (transform, shape)
    }

    pub fn add_viewport(&mut self, name: &str) {
        self.viewports.push(Viewport {
            name: name.to_string(),
            redraw_on_manipulation: true,
        });
    }

    /// Adds `attr` to `id`, ignoring duplicates. Builder helper for fixtures.
    pub fn with_attribute(&mut self, id: NodeId, attr: Attribute) -> &mut Self {
        if let Some(node) = self.get_node_mut(id) {
            node.add_attribute(attr);
        }
        self
    }

    /// Numeric value of a plug, if the attribute exists and is numeric.
    pub fn plug_value(&self, plug: &PlugId) -> Option<f64> {
        self.get_node(plug.node_id)?
            .attributes
            .get(&plug.attr)?
            .value
            .as_f64()
    }

    /// `name` if free, otherwise `name` with the lowest free numeric suffix.
    fn unique_name(&self, name: &str, ignore: Option<NodeId>) -> String {
        let taken = |candidate: &str| {
            self.nodes
                .iter()
                .any(|n| n.name == candidate && Some(n.id) != ignore)
        };
        if !taken(name) {
            return name.to_string();
        }
        let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
        let mut index = 1;
        loop {
            let candidate = format!("{}{}", stem, index);
            if !taken(&candidate) {
                return candidate;
            }
            index += 1;
        }
    }

    fn mesh_mut(&mut self, surface: NodeId) -> SceneResult<&mut MeshData> {
        self.get_node_mut(surface)
            .ok_or_else(|| SceneError::not_found(format!("surface {}", surface)))?
            .mesh
            .as_mut()
            .ok_or_else(|| SceneError::invalid_input(format!("{} is not a mesh", surface)))
    }

    fn mesh(&self, surface: NodeId) -> Option<&MeshData> {
        self.get_node(surface)?.mesh.as_ref()
    }

    fn record_history(&mut self, node_type: NodeType, color_set: &str) {
        let base = node_type.as_str().to_string();
        let id = self.add_node(&format!("{}1", base), node_type, None);
        self.with_attribute(id, Attribute::plain("colorSetName", color_set));
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.parent == Some(id))
            .map(|n| n.id)
            .collect();
        for child in children {
            self.remove_subtree(child);
        }
        self.connections.retain(|c| !c.touches(id));
        self.nodes.retain(|n| n.id != id);
    }
}

impl Scene for MemoryScene {
    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    fn node_name(&self, id: NodeId) -> Option<String> {
        self.get_node(id).map(|n| n.name.clone())
    }

    fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get_node(id).map(|n| n.node_type.clone())
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    fn list_attributes(&self, id: NodeId, filter: AttrFilter) -> Vec<String> {
        self.get_node(id)
            .map(|n| n.attribute_names(filter))
            .unwrap_or_default()
    }

    fn attribute(&self, id: NodeId, name: &str) -> Option<Attribute> {
        self.get_node(id)?.attributes.get(name).cloned()
    }

    fn add_attribute(&mut self, id: NodeId, attr: Attribute) -> SceneResult<()> {
        let node = self
            .get_node_mut(id)
            .ok_or_else(|| SceneError::not_found(format!("node {}", id)))?;
        let name = attr.name.clone();
        if !node.add_attribute(attr) {
            return Err(SceneError::already_exists(format!("{}.{}", node.name, name)));
        }
        Ok(())
    }

    fn set_attribute(&mut self, id: NodeId, name: &str, value: AttrValue) -> SceneResult<()> {
        let node = self
            .get_node_mut(id)
            .ok_or_else(|| SceneError::not_found(format!("node {}", id)))?;
        let node_name = node.name.clone();
        let attr = node
            .attributes
            .get_mut(name)
            .ok_or_else(|| SceneError::not_found(format!("{}.{}", node_name, name)))?;
        if let (Some(min), Some(v)) = (attr.min, value.as_f64()) {
            if v < min {
                return Err(SceneError::invalid_input(format!(
                    "{}.{} below minimum {}",
                    node_name, name, min
                )));
            }
        }
        attr.value = value;
        Ok(())
    }

    fn connections(&self) -> Vec<Connection> {
        self.connections.clone()
    }

    fn source_of(&self, plug: &PlugId) -> Option<PlugId> {
        self.connections
            .iter()
            .find(|c| &c.to == plug)
            .map(|c| c.from.clone())
    }

    fn connect(&mut self, from: PlugId, to: PlugId, force: bool) -> SceneResult<Option<PlugId>> {
        if self.get_node(from.node_id).is_none() {
            return Err(SceneError::not_found(format!("source node {}", from.node_id)));
        }
        if self.get_node(to.node_id).is_none() {
            return Err(SceneError::not_found(format!("destination node {}", to.node_id)));
        }
        if from == to {
            return Err(SceneError::invalid_input(format!(
                "cannot connect {} to itself",
                from
            )));
        }

        // Each input accepts at most one connection
        let displaced = match self.connections.iter().position(|c| c.to == to) {
            Some(index) if self.connections[index].from == from => {
                return Err(SceneError::already_exists(format!("{} -> {}", from, to)));
            }
            Some(index) if force => Some(self.connections.remove(index).from),
            Some(_) => {
                return Err(SceneError::already_exists(format!("input {} is connected", to)));
            }
            None => None,
        };

        self.connections.push(Connection::new(from, to));
        Ok(displaced)
    }

    fn disconnect(&mut self, from: &PlugId, to: &PlugId) -> SceneResult<()> {
        let index = self
            .connections
            .iter()
            .position(|c| &c.from == from && &c.to == to)
            .ok_or_else(|| SceneError::not_found(format!("{} -> {}", from, to)))?;
        self.connections.remove(index);
        Ok(())
    }

    fn create_node(
        &mut self,
        name: &str,
        node_type: NodeType,
        parent: Option<NodeId>,
    ) -> SceneResult<NodeId> {
        if name.is_empty() {
            return Err(SceneError::invalid_input("empty node name"));
        }
        if let Some(parent_id) = parent {
            if self.get_node(parent_id).is_none() {
                return Err(SceneError::not_found(format!("parent {}", parent_id)));
            }
        }
        Ok(self.add_node(name, node_type, parent))
    }

    fn delete_node(&mut self, id: NodeId) -> SceneResult<()> {
        if self.get_node(id).is_none() {
            return Err(SceneError::not_found(format!("node {}", id)));
        }
        self.remove_subtree(id);
        Ok(())
    }

    fn rename_node(&mut self, id: NodeId, name: &str) -> SceneResult<String> {
        if name.is_empty() {
            return Err(SceneError::invalid_input("empty node name"));
        }
        let unique = self.unique_name(name, Some(id));
        let node = self
            .get_node_mut(id)
            .ok_or_else(|| SceneError::not_found(format!("node {}", id)))?;
        node.name = unique.clone();
        Ok(unique)
    }
}

impl ColorStorage for MemoryScene {
    fn color_set_names(&self, surface: NodeId) -> Vec<String> {
        self.mesh(surface)
            .map(|m| m.color_sets.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    fn current_color_set(&self, surface: NodeId) -> Option<String> {
        self.mesh(surface)?.current_color_set.clone()
    }

    fn vertex_count(&self, surface: NodeId) -> Option<usize> {
        self.mesh(surface).map(|m| m.vertex_count)
    }

    fn color_set_values(&self, surface: NodeId, name: &str) -> Option<Vec<UnitColor>> {
        self.mesh(surface)?.color_set(name).map(|s| s.colors.clone())
    }

    fn create_color_set(&mut self, surface: NodeId, name: &str) -> SceneResult<()> {
        let mesh = self.mesh_mut(surface)?;
        if mesh.color_set(name).is_some() {
            return Err(SceneError::already_exists(format!("color set {}", name)));
        }
        mesh.color_sets.push(super::node::ColorSetData {
            name: name.to_string(),
            colors: Vec::new(),
        });
        self.record_history(NodeType::CreateColorSet, name);
        Ok(())
    }

    fn delete_color_set(&mut self, surface: NodeId, name: &str) -> SceneResult<()> {
        let mesh = self.mesh_mut(surface)?;
        let index = mesh
            .color_sets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SceneError::not_found(format!("color set {}", name)))?;
        mesh.color_sets.remove(index);
        if mesh.current_color_set.as_deref() == Some(name) {
            mesh.current_color_set = None;
        }
        self.record_history(NodeType::DeleteColorSet, name);
        Ok(())
    }

    fn set_current_color_set(&mut self, surface: NodeId, name: &str) -> SceneResult<()> {
        let mesh = self.mesh_mut(surface)?;
        if mesh.color_set(name).is_none() {
            return Err(SceneError::not_found(format!("color set {}", name)));
        }
        mesh.current_color_set = Some(name.to_string());
        Ok(())
    }

    fn set_vertex_colors(
        &mut self,
        surface: NodeId,
        name: &str,
        colors: Vec<UnitColor>,
    ) -> SceneResult<()> {
        let mesh = self.mesh_mut(surface)?;
        if colors.len() != mesh.vertex_count {
            return Err(SceneError::invalid_input(format!(
                "expected {} colors, got {}",
                mesh.vertex_count,
                colors.len()
            )));
        }
        let set = mesh
            .color_set_mut(name)
            .ok_or_else(|| SceneError::not_found(format!("color set {}", name)))?;
        set.colors = colors;
        self.record_history(NodeType::PolyColorPerVertex, name);
        Ok(())
    }
}

impl Viewports for MemoryScene {
    fn viewports(&self) -> Vec<String> {
        self.viewports.iter().map(|v| v.name.clone()).collect()
    }

    fn set_redraw_on_manipulation(&mut self, viewport: &str, enabled: bool) -> SceneResult<()> {
        let panel = self
            .viewports
            .iter_mut()
            .find(|v| v.name == viewport)
            .ok_or_else(|| SceneError::not_found(format!("viewport {}", viewport)))?;
        panel.redraw_on_manipulation = enabled;
        Ok(())
    }
}
