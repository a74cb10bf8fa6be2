use std::collections::HashSet;

use crate::scene::NodeId;

/// A user-facing rig control and the mesh its feedback is drawn on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Control {
    pub node: NodeId,
    pub name: String,
    pub surface: NodeId,
}

/// Controls in first-seen order, each at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlSet {
    controls: Vec<Control>,
    seen: HashSet<NodeId>,
}

impl ControlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `control` unless its node is already present.
    pub fn insert(&mut self, control: Control) -> bool {
        if !self.seen.insert(control.node) {
            return false;
        }
        self.controls.push(control);
        true
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.seen.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Control> {
        self.controls.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.controls.iter().map(|c| c.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ControlSet {
    type Item = &'a Control;
    type IntoIter = std::slice::Iter<'a, Control>;

    fn into_iter(self) -> Self::IntoIter {
        self.controls.iter()
    }
}

impl IntoIterator for ControlSet {
    type Item = Control;
    type IntoIter = std::vec::IntoIter<Control>;

    fn into_iter(self) -> Self::IntoIter {
        self.controls.into_iter()
    }
}
