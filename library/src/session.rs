//! Session lifecycle: wipe previous feedback, discover controls, annotate.

use log::{debug, info, warn};
use thiserror::Error;

use crate::annotate::{self, AnnotateError, Annotation};
use crate::color::{self, ColorError};
use crate::config::FeedbackConfig;
use crate::discovery::{self, Control, DiscoveryError, GraphSnapshot, TopologyMode};
use crate::scene::{AttrFilter, AttrValue, Attribute, Host, NodeId, NodeType, Scene, SceneError};

pub const DISPLAY_COLORS_ATTR: &str = "displayColors";

/// Construction history left by color set edits. Only feedback produces it.
const HISTORY_TYPES: [NodeType; 3] = [
    NodeType::CreateColorSet,
    NodeType::DeleteColorSet,
    NodeType::PolyColorPerVertex,
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("no controls found for '{0}', nothing to do")]
    NothingToDo(String),
}

/// Why one control did not get feedback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error(transparent)]
    Annotate(#[from] AnnotateError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub modifiers: usize,
    pub formulas: usize,
    pub history: usize,
}

impl ResetReport {
    pub fn total(&self) -> usize {
        self.modifiers + self.formulas + self.history
    }
}

/// What happened to one discovered control.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlStatus {
    Annotated(Annotation),
    /// Free axis count outside 1..=2; nothing was installed.
    Unsupported,
    Failed(ControlError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlOutcome {
    pub control: Control,
    pub axes: Vec<String>,
    pub status: ControlStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitReport {
    pub aggregator: NodeId,
    pub mode: TopologyMode,
    pub reset: ResetReport,
    pub outcomes: Vec<ControlOutcome>,
}

impl InitReport {
    pub fn annotated(&self) -> impl Iterator<Item = &Annotation> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            ControlStatus::Annotated(annotation) => Some(annotation),
            _ => None,
        })
    }

    /// Controls left alone because of their axis count.
    pub fn skipped(&self) -> impl Iterator<Item = &ControlOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ControlStatus::Unsupported)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ControlOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ControlStatus::Failed(_)))
    }

    /// At least one control received feedback.
    pub fn succeeded(&self) -> bool {
        self.annotated().next().is_some()
    }
}

/// Removes every trace of previous feedback.
///
/// Modifiers are removed only when tagged; untagged ones belong to other
/// workflows. Color set history is removed unconditionally. Failures are
/// logged per node and never stop the pass.
pub fn reset_all<S: Scene + ?Sized>(scene: &mut S, config: &FeedbackConfig) -> ResetReport {
    let marker = config.marker_attribute.as_str();
    let mut report = ResetReport::default();

    for modifier in scene.ls_type(&[NodeType::PolyColorMod]) {
        if !annotate::is_tagged(&*scene, modifier, marker) {
            debug!("Keeping untagged modifier {:?}", scene.node_name(modifier));
            continue;
        }
        match annotate::detach_modifier(scene, modifier) {
            Ok(()) => report.modifiers += 1,
            Err(e) => warn!("[reset_all] Could not remove modifier: {}", e),
        }
    }

    for formula in scene.ls_type(&[NodeType::Expression]) {
        if !annotate::is_tagged(&*scene, formula, marker) {
            continue;
        }
        match scene.delete_node(formula) {
            Ok(()) => report.formulas += 1,
            Err(e) => warn!("[reset_all] Could not remove formula node: {}", e),
        }
    }

    for node in scene.ls_type(&HISTORY_TYPES) {
        match scene.delete_node(node) {
            Ok(()) => report.history += 1,
            Err(e) => warn!("[reset_all] Could not remove history node: {}", e),
        }
    }

    if report.total() > 0 {
        info!(
            "Removed {} modifiers, {} formulas, {} history nodes",
            report.modifiers, report.formulas, report.history
        );
    }
    report
}

/// The attributes a control can move along.
///
/// Engine-driven rigs lock every channel but the free ones, so the
/// keyable+visible attributes are the axes. Direct-drive controls carry
/// their own curves and the animated attributes are the axes.
pub fn free_axes<S: Scene + ?Sized>(scene: &S, control: NodeId, mode: TopologyMode) -> Vec<String> {
    match mode {
        TopologyMode::EngineDriven => scene.list_attributes(control, AttrFilter::KEYABLE_VISIBLE),
        TopologyMode::DirectDrive => scene.animated_attributes(control),
    }
}

fn show_colors<S: Scene + ?Sized>(scene: &mut S, surface: NodeId) -> Result<(), SceneError> {
    match scene.set_attribute(surface, DISPLAY_COLORS_ATTR, AttrValue::from(true)) {
        Err(SceneError::NotFound(_)) if scene.exists(surface) => {
            scene.add_attribute(surface, Attribute::plain(DISPLAY_COLORS_ATTR, true))
        }
        other => other,
    }
}

fn prepare_surface<H: Host + ?Sized>(
    scene: &mut H,
    control: &Control,
    config: &FeedbackConfig,
) -> Result<(), ColorError> {
    color::reset_channel(scene, control.surface, &config.color_set)?;
    color::fill_uniform(scene, control.surface, &config.color_set, config.sentinel_color)?;
    if let Err(e) = show_colors(scene, control.surface) {
        warn!("[initialize] Could not enable color display on '{}': {}", control.name, e);
    }
    Ok(())
}

/// Rebuilds feedback on every control driving the configured aggregator.
///
/// Previous feedback is always removed first, so repeated calls converge on
/// the same scene. Controls with an unsupported axis count are skipped
/// untouched. One control failing never stops the others; its error is kept
/// in the report.
pub fn initialize<H: Host + ?Sized>(
    scene: &mut H,
    config: &FeedbackConfig,
) -> Result<InitReport, SessionError> {
    let reset = reset_all(scene, config);

    for viewport in scene.viewports() {
        if let Err(e) = scene.set_redraw_on_manipulation(&viewport, false) {
            warn!("[initialize] Could not update viewport '{}': {}", viewport, e);
        }
    }

    let view = GraphSnapshot::capture(&*scene);
    let aggregator = discovery::resolve_aggregator(&view, &config.aggregator).map_err(|e| {
        warn!("[initialize] {}", e);
        e
    })?;
    let found = discovery::discover(&view, aggregator, config)?;
    if found.controls.is_empty() {
        warn!("[initialize] No controls found for '{}', nothing to do", config.aggregator);
        return Err(SessionError::NothingToDo(config.aggregator.clone()));
    }

    let mut outcomes = Vec::with_capacity(found.controls.len());
    for control in found.controls {
        let axes = free_axes(&*scene, control.node, found.mode);
        let status = match prepare_surface(scene, &control, config) {
            Err(e) => ControlStatus::Failed(e.into()),
            Ok(()) if !(1..=2).contains(&axes.len()) => {
                debug!("'{}' has {} free axes, skipping", control.name, axes.len());
                ControlStatus::Unsupported
            }
            Ok(()) => match annotate::annotate(scene, &control, &axes, config) {
                Ok(annotation) => ControlStatus::Annotated(annotation),
                Err(e) => ControlStatus::Failed(e.into()),
            },
        };
        if let ControlStatus::Failed(e) = &status {
            warn!("[initialize] Skipping '{}': {}", control.name, e);
        }
        outcomes.push(ControlOutcome {
            control,
            axes,
            status,
        });
    }

    let report = InitReport {
        aggregator,
        mode: found.mode,
        reset,
        outcomes,
    };
    info!(
        "Feedback installed on {} of {} controls",
        report.annotated().count(),
        report.outcomes.len()
    );
    Ok(report)
}

/// Entry point for hosts: `true` when any control got feedback.
pub fn run<H: Host + ?Sized>(scene: &mut H, config: &FeedbackConfig) -> bool {
    match initialize(scene, config) {
        Ok(report) => report.succeeded(),
        Err(e) => {
            warn!("[run] {}", e);
            false
        }
    }
}
