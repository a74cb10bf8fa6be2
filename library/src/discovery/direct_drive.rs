use log::debug;

use super::snapshot::GraphSnapshot;
use super::{ControlSet, DiscoveryStrategy, TopologyMode};
use crate::scene::{NodeId, NamePattern};

/// Discovery for rigs without driven keys: controls are whatever matches the
/// board's naming convention. No traversal happens.
#[derive(Clone, Debug)]
pub struct DirectDriveStrategy {
    patterns: Vec<NamePattern>,
}

impl DirectDriveStrategy {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| NamePattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Nodes matching `pattern`, or `*:pattern` when nothing matches bare.
    fn matches(&self, view: &GraphSnapshot, pattern: &NamePattern) -> Vec<NodeId> {
        let bare: Vec<NodeId> = view
            .nodes()
            .filter(|n| pattern.matches(&n.name))
            .map(|n| n.id)
            .collect();
        if !bare.is_empty() {
            return bare;
        }
        match pattern.namespaced() {
            Ok(namespaced) => view
                .nodes()
                .filter(|n| namespaced.matches(&n.name))
                .map(|n| n.id)
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl DiscoveryStrategy for DirectDriveStrategy {
    fn mode(&self) -> TopologyMode {
        TopologyMode::DirectDrive
    }

    fn discover(&self, view: &GraphSnapshot, aggregator: NodeId) -> ControlSet {
        let mut controls = ControlSet::new();
        for pattern in &self.patterns {
            let matched = self.matches(view, pattern);
            debug!("Pattern '{}' matched {} nodes", pattern.as_str(), matched.len());
            for node in matched {
                if node == aggregator {
                    continue;
                }
                // Shapes match too (`CTRL_L_eyeShape`); only transforms with a mesh count
                if let Some(control) = super::geometry_control(view, node) {
                    controls.insert(control);
                }
            }
        }
        controls
    }
}
