//! Integration tests for control discovery on both rig topologies.

mod common;

use rig_feedback::FeedbackConfig;
use rig_feedback::discovery::{
    self, DirectDriveStrategy, DiscoveryError, DiscoveryStrategy, EngineDrivenStrategy,
    GraphSnapshot, TopologyMode,
};
use rig_feedback::scene::{Attribute, NodeType, Scene};

use common::{direct_rig, driven_key, engine_rig, init_logger};

#[test]
fn test_engine_driven_discovery_order() {
    init_logger();
    let rig = engine_rig();
    let view = GraphSnapshot::capture(&rig.scene);

    let found = discovery::discover(&view, rig.aggregator, &FeedbackConfig::default()).unwrap();
    assert_eq!(found.mode, TopologyMode::EngineDriven);
    // Traversal order: aggregator inputs first, then look drivers
    assert_eq!(
        found.controls.names(),
        vec![
            "CTRL_C_jaw",
            "CTRL_L_mouth_corner",
            "CTRL_L_brow",
            "CTRL_C_mouth_3d",
            "CTRL_L_eye"
        ]
    );
    assert!(!found.controls.contains(rig.tongue));
    assert!(!found.controls.contains(rig.aggregator));
}

#[test]
fn test_engine_driven_deduplicates_shared_driver() {
    let rig = engine_rig();
    let view = GraphSnapshot::capture(&rig.scene);
    let found = discovery::discover(&view, rig.aggregator, &FeedbackConfig::default()).unwrap();

    // CTRL_L_mouth_corner drives two inputs
    let hits = found
        .controls
        .iter()
        .filter(|c| c.node == rig.mouth_corner)
        .count();
    assert_eq!(hits, 1);
}

#[test]
fn test_engine_driven_surface_is_the_control_mesh() {
    let rig = engine_rig();
    let view = GraphSnapshot::capture(&rig.scene);
    let found = discovery::discover(&view, rig.aggregator, &FeedbackConfig::default()).unwrap();

    for control in &found.controls {
        assert_eq!(Some(control.surface), rig.scene.shape_of(control.node));
        assert_eq!(rig.scene.node_type(control.surface), Some(NodeType::Mesh));
    }
}

#[test]
fn test_aggregator_driving_itself_is_excluded() {
    let mut rig = engine_rig();
    // Give the aggregator a mesh so only the self check can exclude it
    rig.scene
        .add_node("CTRL_expressionsShape", NodeType::Mesh, Some(rig.aggregator));
    rig.scene
        .with_attribute(rig.aggregator, Attribute::keyable("cheekPuff", 0.0))
        .with_attribute(rig.aggregator, Attribute::keyable("selfDrive", 0.0));
    driven_key(
        &mut rig.scene,
        rig.aggregator,
        "selfDrive",
        rig.aggregator,
        "cheekPuff",
    );

    let view = GraphSnapshot::capture(&rig.scene);
    let found = discovery::discover(&view, rig.aggregator, &FeedbackConfig::default()).unwrap();
    assert!(!found.controls.contains(rig.aggregator));
    assert_eq!(found.controls.len(), 5);
}

#[test]
fn test_look_drivers_come_from_config() {
    let rig = engine_rig();
    let view = GraphSnapshot::capture(&rig.scene);

    let without_eye = EngineDrivenStrategy::new(
        vec!["eyeLookLeftL".to_string()],
        vec!["CTRL_R_eye".to_string()],
    );
    assert!(!without_eye.discover(&view, rig.aggregator).contains(rig.eye));

    let with_eye = EngineDrivenStrategy::new(
        vec!["eyeLookLeftL".to_string()],
        vec!["CTRL_L_eye".to_string()],
    );
    assert!(with_eye.discover(&view, rig.aggregator).contains(rig.eye));
}

#[test]
fn test_direct_drive_discovery() {
    init_logger();
    let rig = direct_rig();
    let view = GraphSnapshot::capture(&rig.scene);

    let found = discovery::discover(&view, rig.aggregator, &FeedbackConfig::default()).unwrap();
    assert_eq!(found.mode, TopologyMode::DirectDrive);
    // Pattern order, then scene order; the locator is dropped
    assert_eq!(
        found.controls.names(),
        vec!["CTRL_C_jaw", "CTRL_L_mouth", "CTRL_R_mouth", "CTRL_R_blink"]
    );
}

#[test]
fn test_direct_drive_uses_configured_patterns() {
    let rig = direct_rig();
    let view = GraphSnapshot::capture(&rig.scene);

    let strategy = DirectDriveStrategy::new(&["CTRL_R_*"]).unwrap();
    assert_eq!(strategy.mode(), TopologyMode::DirectDrive);
    assert_eq!(
        strategy.discover(&view, rig.aggregator).names(),
        vec!["CTRL_R_mouth", "CTRL_R_blink"]
    );
}

#[test]
fn test_snapshot_is_isolated_from_later_edits() {
    let mut rig = direct_rig();
    let view = GraphSnapshot::capture(&rig.scene);
    rig.scene.delete_node(rig.blink).unwrap();

    let found = discovery::discover(&view, rig.aggregator, &FeedbackConfig::default()).unwrap();
    assert!(found.controls.contains(rig.blink));
}

#[test]
fn test_namespaced_aggregator_is_resolved() {
    let mut rig = direct_rig();
    rig.scene
        .rename_node(rig.aggregator, "face:CTRL_expressions")
        .unwrap();
    let view = GraphSnapshot::capture(&rig.scene);

    assert_eq!(
        discovery::resolve_aggregator(&view, "CTRL_expressions"),
        Ok(rig.aggregator)
    );
    assert_eq!(
        discovery::resolve_aggregator(&view, "CTRL_faceboard"),
        Err(DiscoveryError::AggregatorNotFound("CTRL_faceboard".to_string()))
    );
}
