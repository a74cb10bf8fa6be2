//! Finding the rig controls behind the aggregator's inputs.
//!
//! Two rig topologies are supported. In an engine-driven rig every
//! aggregator input is fed by a driven-key curve whose input is a control, so
//! controls are found by walking the graph upstream. In a direct-drive rig
//! the controls carry their own curves and are found by naming convention.
//! The topology is detected once per call and dispatched to a
//! [`DiscoveryStrategy`].

pub mod control_set;
pub mod direct_drive;
pub mod engine_driven;
pub mod snapshot;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use control_set::{Control, ControlSet};
pub use direct_drive::DirectDriveStrategy;
pub use engine_driven::EngineDrivenStrategy;
pub use snapshot::{DrivenKeyQuery, GraphSnapshot};

use crate::config::FeedbackConfig;
use crate::scene::{NodeId, PlugId};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TopologyMode {
    /// Aggregator inputs are fed by driven-key curves keyed off controls.
    EngineDriven,
    /// Controls are animated directly and named by convention.
    DirectDrive,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    #[error("aggregator '{0}' not found")]
    AggregatorNotFound(String),
    #[error("aggregator '{name}' is ambiguous ({count} matches)")]
    AggregatorAmbiguous { name: String, count: usize },
    #[error("node {0} is not part of the captured graph")]
    InvalidAggregator(NodeId),
    #[error("invalid control pattern: {0}")]
    Pattern(String),
}

pub trait DiscoveryStrategy {
    fn mode(&self) -> TopologyMode;

    /// Controls driving `aggregator`, in traversal order.
    fn discover(&self, view: &GraphSnapshot, aggregator: NodeId) -> ControlSet;
}

/// Result of one discovery pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Discovery {
    pub mode: TopologyMode,
    pub controls: ControlSet,
}

/// Resolves the aggregator by name: exact first, then under any namespace.
///
/// No match and more than one match are both errors.
pub fn resolve_aggregator(view: &GraphSnapshot, name: &str) -> Result<NodeId, DiscoveryError> {
    match view.find_by_name(name).as_slice() {
        [] => Err(DiscoveryError::AggregatorNotFound(name.to_string())),
        [id] => Ok(*id),
        many => Err(DiscoveryError::AggregatorAmbiguous {
            name: name.to_string(),
            count: many.len(),
        }),
    }
}

/// Engine-driven as soon as any keyable input of the aggregator has a
/// driven-key curve.
pub fn detect_mode<Q: DrivenKeyQuery + ?Sized>(
    query: &Q,
    aggregator: NodeId,
    inputs: &[String],
) -> TopologyMode {
    let curves: usize = inputs
        .iter()
        .map(|attr| query.driven_key_count(&PlugId::new(aggregator, attr)))
        .sum();
    debug!("Aggregator has {} driven-key curves on its inputs", curves);
    if curves > 0 {
        TopologyMode::EngineDriven
    } else {
        TopologyMode::DirectDrive
    }
}

pub fn strategy_for(
    mode: TopologyMode,
    config: &FeedbackConfig,
) -> Result<Box<dyn DiscoveryStrategy>, DiscoveryError> {
    let strategy: Box<dyn DiscoveryStrategy> = match mode {
        TopologyMode::EngineDriven => Box::new(EngineDrivenStrategy::new(
            config.look_attributes.clone(),
            config.look_drivers.clone(),
        )),
        TopologyMode::DirectDrive => Box::new(
            DirectDriveStrategy::new(config.control_patterns.as_slice())
                .map_err(|e| DiscoveryError::Pattern(e.to_string()))?,
        ),
    };
    Ok(strategy)
}

/// Detects the topology of `aggregator` and collects its controls.
pub fn discover(
    view: &GraphSnapshot,
    aggregator: NodeId,
    config: &FeedbackConfig,
) -> Result<Discovery, DiscoveryError> {
    if view.node(aggregator).is_none() {
        return Err(DiscoveryError::InvalidAggregator(aggregator));
    }
    let mode = detect_mode(view, aggregator, view.keyable_attributes(aggregator));
    let strategy = strategy_for(mode, config)?;
    let controls = strategy.discover(view, aggregator);
    info!("Discovered {} controls ({:?})", controls.len(), strategy.mode());
    Ok(Discovery { mode, controls })
}

/// Builds a [`Control`] for `node` if it displays on a mesh.
pub(crate) fn geometry_control(view: &GraphSnapshot, node: NodeId) -> Option<Control> {
    let surface = view.surface_of(node)?;
    Some(Control {
        node,
        name: view.name(node)?.to_string(),
        surface,
    })
}
