//! Installs live color feedback on rig controls.
//!
//! For one control this creates a `polyColorMod` on the control's mesh that
//! reads the feedback color set, splices it into the mesh's render input and
//! binds an expression node computing the modifier's hue from the control's
//! translation. Both generated nodes carry the marker attribute so
//! [`crate::session::reset_all`] can find them again.

use log::{debug, info, warn};
use thiserror::Error;

use crate::color;
use crate::config::FeedbackConfig;
use crate::discovery::Control;
use crate::formula::FeedbackFormula;
use crate::scene::{
    AttrValue, Attribute, ColorStorage, NodeId, NodeType, PlugId, Scene, SceneError, short_name,
};

pub const RENDER_INPUT: &str = "inMesh";
pub const MODIFIER_INPUT: &str = "inputPolymesh";
pub const MODIFIER_OUTPUT: &str = "output";
pub const HUE_ATTR: &str = "huev";
pub const FORMULA_ATTR: &str = "formula";
pub const SOURCE_ATTR: &str = "expression";
pub const MULTIPLIER_INPUT: &str = "multiplier";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotateError {
    #[error("control '{0}' not found")]
    ControlNotFound(String),
    #[error("control '{0}' has no mesh")]
    NoSurface(String),
    #[error("color set '{set}' missing on '{control}'")]
    ColorSetMissing { control: String, set: String },
    #[error("control '{control}' has {count} free axes, expected 1 or 2")]
    UnsupportedAxisCount { control: String, count: usize },
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Nodes created for one control.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub control: NodeId,
    pub modifier: NodeId,
    pub modifier_name: String,
    pub formula_node: NodeId,
    pub formula_name: String,
    pub formula: FeedbackFormula,
    /// Whatever fed the render input before; now feeds the modifier.
    pub displaced_input: Option<PlugId>,
}

/// `CTRL_L_mouth_corner` → `L_mouth_corner`.
pub fn base_name(control_name: &str) -> &str {
    let short = short_name(control_name);
    short.split_once('_').map(|(_, rest)| rest).unwrap_or(short)
}

/// Whether `id` carries the marker attribute.
pub fn is_tagged<S: Scene + ?Sized>(scene: &S, id: NodeId, marker: &str) -> bool {
    scene.has_attribute(id, marker)
}

fn tag<S: Scene + ?Sized>(scene: &mut S, id: NodeId, marker: &str) -> Result<(), SceneError> {
    match scene.add_attribute(id, Attribute::plain(marker, true)) {
        Err(SceneError::AlreadyExists(_)) => Ok(()),
        other => other,
    }
}

/// Gives `control` a multiplier of 1, creating the attribute when missing.
pub fn ensure_multiplier<S: Scene + ?Sized>(
    scene: &mut S,
    control: NodeId,
    attr: &str,
) -> Result<(), SceneError> {
    if scene.has_attribute(control, attr) {
        scene.set_attribute(control, attr, AttrValue::from(1.0))
    } else {
        scene.add_attribute(control, Attribute::plain(attr, 1.0).with_min(1.0))
    }
}

/// Removes a modifier and hands the render input back to what fed it.
pub fn detach_modifier<S: Scene + ?Sized>(scene: &mut S, modifier: NodeId) -> Result<(), SceneError> {
    let upstream = scene.source_of(&PlugId::new(modifier, MODIFIER_INPUT));
    let downstream = scene.destinations_of(&PlugId::new(modifier, MODIFIER_OUTPUT));
    scene.delete_node(modifier)?;

    if let Some(source) = upstream {
        for target in downstream {
            if let Err(e) = scene.connect(source.clone(), target.clone(), false) {
                warn!("[detach_modifier] Could not restore {} -> {}: {}", source, target, e);
            }
        }
    }
    Ok(())
}

/// Installs feedback on `control`.
///
/// `axes` are the control's free movement attributes; one or two select a
/// formula, any other count is rejected after removing the partly built
/// modifier. A missing control or color set is reported before anything is
/// created.
pub fn annotate<S: Scene + ColorStorage + ?Sized>(
    scene: &mut S,
    control: &Control,
    axes: &[String],
    config: &FeedbackConfig,
) -> Result<Annotation, AnnotateError> {
    if !scene.exists(control.node) {
        warn!("[annotate] Can't find node with given name -> '{}'", control.name);
        return Err(AnnotateError::ControlNotFound(control.name.clone()));
    }
    if scene.node_type(control.surface) != Some(NodeType::Mesh) {
        warn!("[annotate] '{}' has no mesh to draw on", control.name);
        return Err(AnnotateError::NoSurface(control.name.clone()));
    }
    if !color::exists(&*scene, control.surface, &config.color_set) {
        warn!("[annotate] Can't find color set with name -> '{}'", config.color_set);
        return Err(AnnotateError::ColorSetMissing {
            control: control.name.clone(),
            set: config.color_set.clone(),
        });
    }

    let modifier = scene.create_node("polyColorMod1", NodeType::PolyColorMod, None)?;
    match install(scene, control, modifier, axes, config) {
        Ok(annotation) => Ok(annotation),
        Err(e) => {
            if let Err(cleanup) = detach_modifier(scene, modifier) {
                warn!("[annotate] Could not remove partial modifier: {}", cleanup);
            }
            Err(e)
        }
    }
}

fn install<S: Scene + ?Sized>(
    scene: &mut S,
    control: &Control,
    modifier: NodeId,
    axes: &[String],
    config: &FeedbackConfig,
) -> Result<Annotation, AnnotateError> {
    scene.add_attribute(modifier, Attribute::plain("baseColorName", config.color_set.as_str()))?;
    scene.add_attribute(modifier, Attribute::keyable(HUE_ATTR, 0.0))?;
    tag(scene, modifier, &config.marker_attribute)?;

    // Splice into the render input, keeping the previous source upstream
    let render_input = PlugId::new(control.surface, RENDER_INPUT);
    let previous = scene.source_of(&render_input);
    if let Some(source) = &previous {
        scene.connect(source.clone(), PlugId::new(modifier, MODIFIER_INPUT), false)?;
    }
    scene.connect(PlugId::new(modifier, MODIFIER_OUTPUT), render_input, true)?;
    if let Some(source) = &previous {
        info!("Feedback on '{}' replaces render input {}", control.name, source);
    }

    let Some(formula) = FeedbackFormula::for_axes(axes) else {
        debug!("'{}' has {} free axes, skipping", control.name, axes.len());
        return Err(AnnotateError::UnsupportedAxisCount {
            control: control.name.clone(),
            count: axes.len(),
        });
    };

    ensure_multiplier(scene, control.node, &config.multiplier_attribute)?;

    let base = base_name(&control.name);
    let modifier_name = match scene.rename_node(modifier, &format!("{}_CM", base)) {
        Ok(name) => name,
        Err(e) => {
            warn!("[annotate] Could not rename modifier for '{}': {}", control.name, e);
            scene.node_name(modifier).unwrap_or_default()
        }
    };

    let formula_node =
        scene.create_node(&format!("{}_CExpression", base), NodeType::Expression, None)?;
    let formula_name = scene.node_name(formula_node).unwrap_or_default();
    if let Err(e) = bind_formula(scene, control, modifier, &modifier_name, formula_node, &formula, config) {
        if let Err(cleanup) = scene.delete_node(formula_node) {
            warn!("[annotate] Could not remove partial formula node: {}", cleanup);
        }
        return Err(e);
    }

    debug!("Installed {:?} feedback on '{}'", formula, control.name);
    Ok(Annotation {
        control: control.node,
        modifier,
        modifier_name,
        formula_node,
        formula_name,
        formula,
        displaced_input: previous,
    })
}

fn bind_formula<S: Scene + ?Sized>(
    scene: &mut S,
    control: &Control,
    modifier: NodeId,
    modifier_name: &str,
    formula_node: NodeId,
    formula: &FeedbackFormula,
    config: &FeedbackConfig,
) -> Result<(), AnnotateError> {
    let encoded = serde_json::to_string(formula)
        .map_err(|e| SceneError::invalid_input(format!("formula encoding failed: {}", e)))?;
    let source = formula.source(&control.name, modifier_name, &config.multiplier_attribute);
    scene.add_attribute(formula_node, Attribute::plain(FORMULA_ATTR, encoded).hidden())?;
    scene.add_attribute(formula_node, Attribute::plain(SOURCE_ATTR, source))?;
    tag(scene, formula_node, &config.marker_attribute)?;

    for (index, axis) in formula.inputs().into_iter().enumerate() {
        scene.connect(
            PlugId::new(control.node, axis),
            PlugId::new(formula_node, &input_attr(index)),
            false,
        )?;
    }
    scene.connect(
        PlugId::new(control.node, &config.multiplier_attribute),
        PlugId::new(formula_node, MULTIPLIER_INPUT),
        false,
    )?;
    scene.connect(
        PlugId::new(formula_node, "output"),
        PlugId::new(modifier, HUE_ATTR),
        true,
    )?;
    Ok(())
}

fn input_attr(index: usize) -> String {
    format!("input[{}]", index)
}

fn plug_number<S: Scene + ?Sized>(scene: &S, plug: &PlugId) -> Option<f64> {
    scene.attribute(plug.node_id, &plug.attr)?.value.as_f64()
}

/// Recomputes every tagged formula node and pushes the hue into its
/// modifier, the way the host re-evaluates expressions when a control moves.
///
/// Returns how many modifiers were updated.
pub fn evaluate_feedback<S: Scene + ?Sized>(scene: &mut S, config: &FeedbackConfig) -> usize {
    let mut updated = 0;
    for node in scene.ls_type(&[NodeType::Expression]) {
        if !is_tagged(&*scene, node, &config.marker_attribute) {
            continue;
        }
        let Some(formula) = scene
            .attribute(node, FORMULA_ATTR)
            .and_then(|a| a.value.as_str().map(str::to_string))
            .and_then(|json| serde_json::from_str::<FeedbackFormula>(&json).ok())
        else {
            warn!("[evaluate_feedback] Formula node {} has no readable formula", node);
            continue;
        };

        let values: Vec<f64> = (0..formula.inputs().len())
            .map(|i| {
                scene
                    .source_of(&PlugId::new(node, &input_attr(i)))
                    .and_then(|src| plug_number(&*scene, &src))
                    .unwrap_or(0.0)
            })
            .collect();
        let multiplier = scene
            .source_of(&PlugId::new(node, MULTIPLIER_INPUT))
            .and_then(|src| plug_number(&*scene, &src))
            .unwrap_or(1.0);
        let hue = formula.hue_delta(&values, multiplier);

        for target in scene.destinations_of(&PlugId::new(node, "output")) {
            match scene.set_attribute(target.node_id, &target.attr, AttrValue::from(hue)) {
                Ok(()) => updated += 1,
                Err(e) => warn!("[evaluate_feedback] {}", e),
            }
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;

    fn setup(axes: &[&str]) -> (MemoryScene, Control, FeedbackConfig) {
        let config = FeedbackConfig::default();
        let mut scene = MemoryScene::new();
        let (node, surface) = scene.add_mesh("CTRL_L_mouth_corner", 6);
        for axis in axes {
            scene.with_attribute(node, Attribute::keyable(axis, 0.0));
        }
        color::reset_channel(&mut scene, surface, &config.color_set).unwrap();
        let control = Control {
            node,
            name: "CTRL_L_mouth_corner".to_string(),
            surface,
        };
        (scene, control, config)
    }

    fn axes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("CTRL_L_mouth_corner"), "L_mouth_corner");
        assert_eq!(base_name("rig:CTRL_C_jaw"), "C_jaw");
        assert_eq!(base_name("jaw"), "jaw");
    }

    #[test]
    fn test_single_axis_install() {
        let (mut scene, control, config) = setup(&["translateY"]);
        let annotation = annotate(&mut scene, &control, &axes(&["translateY"]), &config).unwrap();

        assert_eq!(annotation.modifier_name, "L_mouth_corner_CM");
        assert_eq!(annotation.formula_name, "L_mouth_corner_CExpression");
        assert!(matches!(annotation.formula, FeedbackFormula::SingleAxis { .. }));
        assert!(is_tagged(&scene, annotation.modifier, "feedback"));
        assert!(is_tagged(&scene, annotation.formula_node, "feedback"));
        assert_eq!(
            scene.source_of(&PlugId::new(control.surface, RENDER_INPUT)),
            Some(PlugId::new(annotation.modifier, MODIFIER_OUTPUT))
        );
        let multiplier = scene.attribute(control.node, "feedback_Multiply").unwrap();
        assert_eq!(multiplier.value.as_f64(), Some(1.0));
    }

    #[test]
    fn test_unsupported_axis_count_leaves_nothing() {
        let (mut scene, control, config) =
            setup(&["translateX", "translateY", "translateZ"]);
        let err = annotate(
            &mut scene,
            &control,
            &axes(&["translateX", "translateY", "translateZ"]),
            &config,
        )
        .unwrap_err();

        assert!(matches!(err, AnnotateError::UnsupportedAxisCount { count: 3, .. }));
        assert!(scene.ls_type(&[NodeType::PolyColorMod]).is_empty());
        assert!(scene.ls_type(&[NodeType::Expression]).is_empty());
        assert_eq!(scene.source_of(&PlugId::new(control.surface, RENDER_INPUT)), None);
        assert!(!scene.has_attribute(control.node, "feedback_Multiply"));
    }

    #[test]
    fn test_previous_render_input_is_spliced_and_restored() {
        let (mut scene, control, config) = setup(&["translateY"]);
        let deformer = scene.add_node("skinCluster1", NodeType::Other("skinCluster".into()), None);
        scene
            .connect(
                PlugId::new(deformer, "outputGeometry"),
                PlugId::new(control.surface, RENDER_INPUT),
                false,
            )
            .unwrap();

        let annotation = annotate(&mut scene, &control, &axes(&["translateY"]), &config).unwrap();
        assert_eq!(
            annotation.displaced_input,
            Some(PlugId::new(deformer, "outputGeometry"))
        );
        assert_eq!(
            scene.source_of(&PlugId::new(annotation.modifier, MODIFIER_INPUT)),
            Some(PlugId::new(deformer, "outputGeometry"))
        );

        detach_modifier(&mut scene, annotation.modifier).unwrap();
        assert_eq!(
            scene.source_of(&PlugId::new(control.surface, RENDER_INPUT)),
            Some(PlugId::new(deformer, "outputGeometry"))
        );
    }

    #[test]
    fn test_missing_color_set_is_reported_before_creation() {
        let (mut scene, control, mut config) = setup(&["translateY"]);
        config.color_set = "other_set".to_string();
        let err = annotate(&mut scene, &control, &axes(&["translateY"]), &config).unwrap_err();
        assert!(matches!(err, AnnotateError::ColorSetMissing { .. }));
        assert!(scene.ls_type(&[NodeType::PolyColorMod]).is_empty());
    }

    #[test]
    fn test_missing_control_is_reported() {
        let (mut scene, control, config) = setup(&["translateY"]);
        scene.delete_node(control.node).unwrap();
        let err = annotate(&mut scene, &control, &axes(&["translateY"]), &config).unwrap_err();
        assert_eq!(err, AnnotateError::ControlNotFound("CTRL_L_mouth_corner".to_string()));
    }

    #[test]
    fn test_existing_multiplier_is_reset() {
        let (mut scene, control, config) = setup(&["translateY"]);
        scene.with_attribute(
            control.node,
            Attribute::plain("feedback_Multiply", 4.0).with_min(1.0),
        );
        annotate(&mut scene, &control, &axes(&["translateY"]), &config).unwrap();
        let value = scene.attribute(control.node, "feedback_Multiply").unwrap().value;
        assert_eq!(value.as_f64(), Some(1.0));
    }

    #[test]
    fn test_evaluate_feedback_follows_control() {
        let (mut scene, control, config) = setup(&["translateX", "translateY"]);
        let annotation = annotate(
            &mut scene,
            &control,
            &axes(&["translateX", "translateY"]),
            &config,
        )
        .unwrap();

        scene
            .set_attribute(control.node, "translateX", AttrValue::from(0.25))
            .unwrap();
        scene
            .set_attribute(control.node, "translateY", AttrValue::from(-0.25))
            .unwrap();
        assert_eq!(evaluate_feedback(&mut scene, &config), 1);
        let hue = scene.plug_value(&PlugId::new(annotation.modifier, HUE_ATTR)).unwrap();
        assert!((hue - (-27.0)).abs() < 1e-9);

        scene
            .set_attribute(control.node, "translateY", AttrValue::from(50.0))
            .unwrap();
        evaluate_feedback(&mut scene, &config);
        let hue = scene.plug_value(&PlugId::new(annotation.modifier, HUE_ATTR)).unwrap();
        assert_eq!(hue, crate::formula::HUE_FLOOR);
    }
}
