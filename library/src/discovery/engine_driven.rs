use log::debug;

use super::snapshot::GraphSnapshot;
use super::{ControlSet, DiscoveryStrategy, TopologyMode};
use crate::scene::{NodeId, PlugId, short_name};

/// Discovery for rigs whose aggregator inputs are driven-key outputs.
///
/// The common chain is `control -> curve -> aggregator.<input>`, walked
/// backwards one hop at a time. Look inputs sit behind longer chains
/// (curve, blend weights, locators, constraints, more curves), so their whole
/// upstream graph is searched for the configured look drivers instead.
#[derive(Clone, Debug)]
pub struct EngineDrivenStrategy {
    look_attributes: Vec<String>,
    look_drivers: Vec<String>,
}

impl EngineDrivenStrategy {
    pub fn new(look_attributes: Vec<String>, look_drivers: Vec<String>) -> Self {
        Self {
            look_attributes,
            look_drivers,
        }
    }

    /// Allow-list check on the namespace-free name: equal to a driver id or
    /// starting with one.
    pub fn is_look_driver(&self, name: &str) -> bool {
        let base = short_name(name);
        self.look_drivers
            .iter()
            .any(|driver| !driver.is_empty() && base.starts_with(driver.as_str()))
    }

    /// `aggregator.<input> <- curve <- control` for every keyable input.
    fn curve_drivers(&self, view: &GraphSnapshot, aggregator: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        for attr in view.keyable_attributes(aggregator) {
            let plug = PlugId::new(aggregator, attr);
            let Some(curve) = view
                .source_of(&plug)
                .map(|p| p.node_id)
                .filter(|&id| {
                    view.node_type(id)
                        .map(|t| t.is_driven_key_curve())
                        .unwrap_or(false)
                })
            else {
                debug!("No driven-key curve on input '{}'", attr);
                continue;
            };

            let Some(control) = view
                .source_skipping_conversions(&PlugId::new(curve, "input"))
                .map(|p| p.node_id)
            else {
                debug!("Curve on input '{}' has no driver", attr);
                continue;
            };

            // Degenerate wiring can loop back into the aggregator
            if control == aggregator || found.contains(&control) {
                continue;
            }
            found.push(control);
        }
        found
    }

    /// Configured look drivers anywhere upstream of the look inputs.
    fn look_input_drivers(&self, view: &GraphSnapshot, aggregator: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        for attr in &self.look_attributes {
            if !view.has_attribute(aggregator, attr) {
                debug!("Look input '{}' missing on aggregator", attr);
                continue;
            }
            for node in view.upstream_nodes(&PlugId::new(aggregator, attr)) {
                if node == aggregator || found.contains(&node) {
                    continue;
                }
                if view.name(node).map(|n| self.is_look_driver(n)).unwrap_or(false) {
                    found.push(node);
                }
            }
        }
        found
    }
}

impl DiscoveryStrategy for EngineDrivenStrategy {
    fn mode(&self) -> TopologyMode {
        TopologyMode::EngineDriven
    }

    fn discover(&self, view: &GraphSnapshot, aggregator: NodeId) -> ControlSet {
        let mut controls = ControlSet::new();
        let candidates = self
            .curve_drivers(view, aggregator)
            .into_iter()
            .chain(self.look_input_drivers(view, aggregator));

        for node in candidates {
            match super::geometry_control(view, node) {
                Some(control) => {
                    controls.insert(control);
                }
                None => debug!(
                    "Skipping driver '{}': no mesh to draw feedback on",
                    view.name(node).unwrap_or("?")
                ),
            }
        }
        controls
    }
}
