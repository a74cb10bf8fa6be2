//! Connection model for the scene dependency graph.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type NodeId = Uuid;

/// Identifies a specific attribute (plug) on a specific node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlugId {
    pub node_id: NodeId,
    pub attr: String,
}

impl PlugId {
    pub fn new(node_id: NodeId, attr: &str) -> Self {
        Self {
            node_id,
            attr: attr.to_string(),
        }
    }
}

impl fmt::Display for PlugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_id, self.attr)
    }
}

/// A dependency edge: `from` drives `to`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Connection {
    pub id: Uuid,
    /// Driver plug (output side)
    pub from: PlugId,
    /// Driven plug (input side)
    pub to: PlugId,
}

impl Connection {
    pub fn new(from: PlugId, to: PlugId) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
        }
    }

    pub fn touches(&self, node_id: NodeId) -> bool {
        self.from.node_id == node_id || self.to.node_id == node_id
    }
}
