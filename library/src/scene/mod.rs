//! Interfaces to the host scene graph.
//!
//! The host owns every node, attribute and connection. Everything in this
//! crate talks to it through the traits below; [`MemoryScene`] is the
//! in-process implementation used by tests and JSON round-trips.

pub mod attribute;
pub mod connection;
pub mod memory;
pub mod node;
pub mod pattern;

use thiserror::Error;

pub use attribute::{AttrFilter, AttrValue, Attribute};
pub use connection::{Connection, NodeId, PlugId};
pub use memory::MemoryScene;
pub use node::{NodeType, SceneNode, short_name};
pub use pattern::NamePattern;

use crate::color::UnitColor;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl SceneError {
    pub fn not_found(what: impl Into<String>) -> Self {
        SceneError::NotFound(what.into())
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        SceneError::AlreadyExists(what.into())
    }

    pub fn invalid_input(what: impl Into<String>) -> Self {
        SceneError::InvalidInput(what.into())
    }
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Node, attribute and connection access.
pub trait Scene {
    /// All node ids in creation order.
    fn node_ids(&self) -> Vec<NodeId>;
    fn node_name(&self, id: NodeId) -> Option<String>;
    fn node_type(&self, id: NodeId) -> Option<NodeType>;
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    fn exists(&self, id: NodeId) -> bool {
        self.node_name(id).is_some()
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node_ids()
            .into_iter()
            .filter(|&child| self.parent(child) == Some(id))
            .collect()
    }

    /// Nodes whose full name matches `pattern`, or `*:pattern` when nothing
    /// matches bare.
    fn ls_pattern(&self, pattern: &NamePattern) -> Vec<NodeId> {
        let matching = |p: &NamePattern| -> Vec<NodeId> {
            self.node_ids()
                .into_iter()
                .filter(|&id| {
                    self.node_name(id)
                        .map(|name| p.matches(&name))
                        .unwrap_or(false)
                })
                .collect()
        };
        let bare = matching(pattern);
        if !bare.is_empty() {
            return bare;
        }
        pattern
            .namespaced()
            .map(|namespaced| matching(&namespaced))
            .unwrap_or_default()
    }

    /// Exact name lookup, falling back to the name under any namespace.
    fn find_by_name(&self, name: &str) -> Vec<NodeId> {
        let ids = self.node_ids();
        let exact: Vec<NodeId> = ids
            .iter()
            .copied()
            .filter(|&id| self.node_name(id).as_deref() == Some(name))
            .collect();
        if !exact.is_empty() {
            return exact;
        }
        ids.into_iter()
            .filter(|&id| {
                self.node_name(id)
                    .and_then(|n| n.rsplit_once(':').map(|(_, base)| base == name))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn ls_type(&self, types: &[NodeType]) -> Vec<NodeId> {
        self.node_ids()
            .into_iter()
            .filter(|&id| {
                self.node_type(id)
                    .map(|t| types.contains(&t))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn list_attributes(&self, id: NodeId, filter: AttrFilter) -> Vec<String>;
    fn attribute(&self, id: NodeId, name: &str) -> Option<Attribute>;

    fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    fn add_attribute(&mut self, id: NodeId, attr: Attribute) -> SceneResult<()>;
    fn set_attribute(&mut self, id: NodeId, name: &str, value: AttrValue) -> SceneResult<()>;

    /// Every connection in the scene.
    fn connections(&self) -> Vec<Connection>;

    fn source_of(&self, plug: &PlugId) -> Option<PlugId> {
        self.connections()
            .into_iter()
            .find(|c| &c.to == plug)
            .map(|c| c.from)
    }

    fn destinations_of(&self, plug: &PlugId) -> Vec<PlugId> {
        self.connections()
            .into_iter()
            .filter(|c| &c.from == plug)
            .map(|c| c.to)
            .collect()
    }

    /// Connects `from` into `to`.
    ///
    /// An input accepts one source. With `force` the existing source is
    /// replaced and returned; without it an occupied input is `AlreadyExists`.
    fn connect(&mut self, from: PlugId, to: PlugId, force: bool) -> SceneResult<Option<PlugId>>;
    fn disconnect(&mut self, from: &PlugId, to: &PlugId) -> SceneResult<()>;

    /// Creates a node. The requested name is made unique; read it back with
    /// [`Scene::node_name`].
    fn create_node(
        &mut self,
        name: &str,
        node_type: NodeType,
        parent: Option<NodeId>,
    ) -> SceneResult<NodeId>;
    /// Deletes a node together with all of its connections.
    fn delete_node(&mut self, id: NodeId) -> SceneResult<()>;
    /// Renames a node and returns the unique name it actually received.
    fn rename_node(&mut self, id: NodeId, name: &str) -> SceneResult<String>;

    /// The shape below a transform, or the node itself when it is a shape.
    fn shape_of(&self, id: NodeId) -> Option<NodeId> {
        let node_type = self.node_type(id)?;
        if node_type.is_shape() {
            return Some(id);
        }
        self.children(id).into_iter().find(|&child| {
            self.node_type(child)
                .map(|t| t.is_shape())
                .unwrap_or(false)
        })
    }

    /// Attributes of `id` driven by an animation curve.
    fn animated_attributes(&self, id: NodeId) -> Vec<String> {
        let mut animated: Vec<String> = Vec::new();
        for conn in self.connections() {
            if conn.to.node_id != id || animated.contains(&conn.to.attr) {
                continue;
            }
            let from_curve = self
                .node_type(conn.from.node_id)
                .map(|t| t.is_anim_curve())
                .unwrap_or(false);
            if from_curve {
                animated.push(conn.to.attr);
            }
        }
        animated
    }
}

/// Per-surface named color channels.
pub trait ColorStorage {
    fn color_set_names(&self, surface: NodeId) -> Vec<String>;
    fn current_color_set(&self, surface: NodeId) -> Option<String>;
    fn vertex_count(&self, surface: NodeId) -> Option<usize>;
    fn color_set_values(&self, surface: NodeId, name: &str) -> Option<Vec<UnitColor>>;

    fn create_color_set(&mut self, surface: NodeId, name: &str) -> SceneResult<()>;
    fn delete_color_set(&mut self, surface: NodeId, name: &str) -> SceneResult<()>;
    fn set_current_color_set(&mut self, surface: NodeId, name: &str) -> SceneResult<()>;
    fn set_vertex_colors(
        &mut self,
        surface: NodeId,
        name: &str,
        colors: Vec<UnitColor>,
    ) -> SceneResult<()>;
}

/// Interactive viewports of the host.
pub trait Viewports {
    fn viewports(&self) -> Vec<String>;
    fn set_redraw_on_manipulation(&mut self, viewport: &str, enabled: bool) -> SceneResult<()>;
}

/// Everything a feedback session needs from its host.
pub trait Host: Scene + ColorStorage + Viewports {}

impl<T: Scene + ColorStorage + Viewports> Host for T {}
