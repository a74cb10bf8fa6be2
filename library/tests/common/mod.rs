//! Rig fixtures shared by the integration tests.
#![allow(dead_code)]

use rig_feedback::scene::{Attribute, MemoryScene, NodeId, NodeType, PlugId, Scene};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn wire(scene: &mut MemoryScene, from: (NodeId, &str), to: (NodeId, &str)) {
    scene
        .connect(PlugId::new(from.0, from.1), PlugId::new(to.0, to.1), false)
        .unwrap();
}

/// A transform with a mesh and the given keyable channels.
pub fn control(scene: &mut MemoryScene, name: &str, channels: &[&str]) -> NodeId {
    let (node, _) = scene.add_mesh(name, 8);
    for channel in channels {
        scene.with_attribute(node, Attribute::keyable(channel, 0.0));
    }
    node
}

/// `control.<channel> -> curve -> aggregator.<input>`
pub fn driven_key(
    scene: &mut MemoryScene,
    control: NodeId,
    channel: &str,
    aggregator: NodeId,
    input: &str,
) -> NodeId {
    let curve = scene.add_node(&format!("{}_sdk", input), NodeType::AnimCurveUU, None);
    wire(scene, (control, channel), (curve, "input"));
    wire(scene, (curve, "output"), (aggregator, input));
    curve
}

/// Time curve animating `node.<attr>`.
pub fn animate(scene: &mut MemoryScene, node: NodeId, attr: &str) {
    let name = format!("{}_{}", scene.node_name(node).unwrap(), attr);
    let curve = scene.add_node(&name, NodeType::AnimCurveTL, None);
    wire(scene, (curve, "output"), (node, attr));
}

pub struct EngineRig {
    pub scene: MemoryScene,
    pub aggregator: NodeId,
    pub jaw: NodeId,
    pub mouth_corner: NodeId,
    pub brow: NodeId,
    pub mouth_3d: NodeId,
    pub eye: NodeId,
    pub tongue: NodeId,
    pub brow_deformer: NodeId,
    pub paint_modifier: NodeId,
}

/// A board whose expression inputs are fed by driven keys.
///
/// - `jawOpen` <- CTRL_C_jaw (1 free axis)
/// - `mouthCornerPullL`, `mouthStretchL` <- CTRL_L_mouth_corner (2 axes, twice)
/// - `browRaiseL` <- CTRL_L_brow (1 axis, mesh already deformed)
/// - `mouthFunnel` <- CTRL_C_mouth_3d (3 axes)
/// - `noseWrinkle` <- a curve with nothing upstream
/// - `tongueOut` <- CTRL_C_tongue, a locator
/// - `eyeLookLeftL` <- multi-hop chain from CTRL_L_eye
pub fn engine_rig() -> EngineRig {
    let mut scene = MemoryScene::new();
    scene.add_viewport("modelPanel1");
    scene.add_viewport("modelPanel4");

    let aggregator = scene.add_node("CTRL_expressions", NodeType::Transform, None);
    for input in [
        "jawOpen",
        "mouthCornerPullL",
        "mouthStretchL",
        "browRaiseL",
        "mouthFunnel",
        "noseWrinkle",
        "tongueOut",
        "eyeLookLeftL",
    ] {
        scene.with_attribute(aggregator, Attribute::keyable(input, 0.0));
    }

    let jaw = control(&mut scene, "CTRL_C_jaw", &["translateY"]);
    driven_key(&mut scene, jaw, "translateY", aggregator, "jawOpen");

    let mouth_corner = control(&mut scene, "CTRL_L_mouth_corner", &["translateX", "translateY"]);
    driven_key(&mut scene, mouth_corner, "translateX", aggregator, "mouthCornerPullL");
    let conversion = scene.add_node("unitConversion1", NodeType::UnitConversion, None);
    wire(&mut scene, (mouth_corner, "translateY"), (conversion, "input"));
    let stretch = scene.add_node("mouthStretchL_sdk", NodeType::AnimCurveUU, None);
    wire(&mut scene, (conversion, "output"), (stretch, "input"));
    wire(&mut scene, (stretch, "output"), (aggregator, "mouthStretchL"));

    let brow = control(&mut scene, "CTRL_L_brow", &["translateY"]);
    driven_key(&mut scene, brow, "translateY", aggregator, "browRaiseL");
    let brow_shape = scene.shape_of(brow).unwrap();
    let brow_deformer = scene.add_node("browCluster", NodeType::Other("skinCluster".into()), None);
    wire(&mut scene, (brow_deformer, "outputGeometry"), (brow_shape, "inMesh"));

    let mouth_3d = control(
        &mut scene,
        "CTRL_C_mouth_3d",
        &["translateX", "translateY", "translateZ"],
    );
    driven_key(&mut scene, mouth_3d, "translateZ", aggregator, "mouthFunnel");

    let orphan = scene.add_node("noseWrinkle_sdk", NodeType::AnimCurveUU, None);
    wire(&mut scene, (orphan, "output"), (aggregator, "noseWrinkle"));

    let tongue = scene.add_node("CTRL_C_tongue", NodeType::Transform, None);
    scene.add_node("CTRL_C_tongueShape", NodeType::Locator, Some(tongue));
    scene.with_attribute(tongue, Attribute::keyable("translateY", 0.0));
    driven_key(&mut scene, tongue, "translateY", aggregator, "tongueOut");

    let eye = control(&mut scene, "CTRL_L_eye", &["translateX", "translateY"]);
    let eye_curve = scene.add_node("CTRL_L_eye_curve", NodeType::AnimCurveUL, None);
    let blend = scene.add_node("LOC_L_eye_blend", NodeType::BlendWeighted, None);
    let locator = scene.add_node("LOC_L_eyeAim", NodeType::Transform, None);
    let constraint = scene.add_node("LOC_L_eye_orient", NodeType::Constraint, None);
    let look = scene.add_node("eyeLookLeftL_sdk", NodeType::AnimCurveUA, None);
    wire(&mut scene, (eye, "translateX"), (eye_curve, "input"));
    wire(&mut scene, (eye_curve, "output"), (blend, "input[0]"));
    wire(&mut scene, (blend, "output"), (locator, "rotateY"));
    wire(&mut scene, (locator, "rotate"), (constraint, "target"));
    wire(&mut scene, (constraint, "constraintRotate"), (look, "input"));
    wire(&mut scene, (look, "output"), (aggregator, "eyeLookLeftL"));

    let paint_modifier = scene.add_node("paintColorMod", NodeType::PolyColorMod, None);

    EngineRig {
        scene,
        aggregator,
        jaw,
        mouth_corner,
        brow,
        mouth_3d,
        eye,
        tongue,
        brow_deformer,
        paint_modifier,
    }
}

pub struct DirectRig {
    pub scene: MemoryScene,
    pub aggregator: NodeId,
    pub jaw: NodeId,
    pub mouth: NodeId,
    pub mouth_3d: NodeId,
    pub blink: NodeId,
}

/// A board without driven keys; controls carry their own animation.
pub fn direct_rig() -> DirectRig {
    let mut scene = MemoryScene::new();
    scene.add_viewport("modelPanel4");

    let aggregator = scene.add_node("CTRL_expressions", NodeType::Transform, None);
    scene
        .with_attribute(aggregator, Attribute::keyable("jawOpen", 0.0))
        .with_attribute(aggregator, Attribute::keyable("mouthSmileL", 0.0));

    let jaw = control(&mut scene, "CTRL_C_jaw", &["translateX", "translateY"]);
    animate(&mut scene, jaw, "translateY");

    let mouth = control(&mut scene, "CTRL_L_mouth", &["translateX", "translateY"]);
    animate(&mut scene, mouth, "translateX");
    animate(&mut scene, mouth, "translateY");

    let mouth_3d = control(
        &mut scene,
        "CTRL_R_mouth",
        &["translateX", "translateY", "translateZ"],
    );
    for axis in ["translateX", "translateY", "translateZ"] {
        animate(&mut scene, mouth_3d, axis);
    }

    let blink = control(&mut scene, "CTRL_R_blink", &["translateY"]);

    let look_at = scene.add_node("CTRL_L_lookAt", NodeType::Transform, None);
    scene.add_node("CTRL_L_lookAtShape", NodeType::Locator, Some(look_at));

    DirectRig {
        scene,
        aggregator,
        jaw,
        mouth,
        mouth_3d,
        blink,
    }
}
