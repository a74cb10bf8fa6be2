//! Color set helpers on top of [`ColorStorage`].

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::{ColorStorage, NodeId, SceneError};

/// An RGB color with every channel in `0.0..=1.0`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct UnitColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl UnitColor {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Normalizes loosely specified RGB input.
    ///
    /// Channels above 1 are read as 0-255 values and capped at 1, negative
    /// channels become 0, anything else is already a unit value.
    pub fn from_rgb(rgb: [f64; 3]) -> Self {
        let [r, g, b] = rgb.map(normalize_channel);
        Self { r, g, b }
    }
}

fn normalize_channel(value: f64) -> f64 {
    if value > 1.0 {
        (value / 255.0).min(1.0)
    } else if value < 0.0 {
        0.0
    } else {
        value
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColorError {
    #[error("surface {0} has no color sets")]
    NoColorSets(NodeId),
    #[error("color set '{name}' not found on {surface}")]
    MissingSet { surface: NodeId, name: String },
    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub fn is_empty<C: ColorStorage + ?Sized>(storage: &C, surface: NodeId) -> bool {
    storage.color_set_names(surface).is_empty()
}

pub fn exists<C: ColorStorage + ?Sized>(storage: &C, surface: NodeId, name: &str) -> bool {
    storage.color_set_names(surface).iter().any(|s| s == name)
}

fn require_set<C: ColorStorage + ?Sized>(
    storage: &C,
    surface: NodeId,
    name: &str,
) -> Result<(), ColorError> {
    if is_empty(storage, surface) {
        return Err(ColorError::NoColorSets(surface));
    }
    if !exists(storage, surface, name) {
        return Err(ColorError::MissingSet {
            surface,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Deletes every color set on `surface`. Returns how many were removed.
pub fn remove_all<C: ColorStorage + ?Sized>(
    storage: &mut C,
    surface: NodeId,
) -> Result<usize, ColorError> {
    let names = storage.color_set_names(surface);
    for name in &names {
        storage.delete_color_set(surface, name)?;
    }
    Ok(names.len())
}

/// Makes `name` the displayed color set.
pub fn activate<C: ColorStorage + ?Sized>(
    storage: &mut C,
    surface: NodeId,
    name: &str,
) -> Result<(), ColorError> {
    require_set(storage, surface, name)?;
    storage.set_current_color_set(surface, name)?;
    Ok(())
}

/// Writes one color to every vertex of `name`.
pub fn fill_uniform<C: ColorStorage + ?Sized>(
    storage: &mut C,
    surface: NodeId,
    name: &str,
    rgb: [f64; 3],
) -> Result<UnitColor, ColorError> {
    require_set(storage, surface, name)?;
    let color = UnitColor::from_rgb(rgb);
    let vertex_count = storage.vertex_count(surface).unwrap_or(0);
    storage.set_vertex_colors(surface, name, vec![color; vertex_count])?;
    debug!("Filled {} vertices of '{}' with {:?}", vertex_count, name, color);
    Ok(color)
}

/// Drops all existing color sets on `surface` and starts a fresh, current
/// `name` set.
pub fn reset_channel<C: ColorStorage + ?Sized>(
    storage: &mut C,
    surface: NodeId,
    name: &str,
) -> Result<(), ColorError> {
    remove_all(storage, surface)?;
    storage.create_color_set(surface, name)?;
    activate(storage, surface, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_from_rgb_rescales_and_clamps() {
        let c = UnitColor::from_rgb([300.0, -10.0, 128.0]);
        assert!(approx(c.r, 1.0));
        assert!(approx(c.g, 0.0));
        assert!(approx(c.b, 128.0 / 255.0));
    }

    #[test]
    fn test_from_rgb_keeps_unit_values() {
        let c = UnitColor::from_rgb([1.0, 1.0, 0.0]);
        assert_eq!(c, UnitColor::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_fill_requires_existing_set() {
        let mut scene = MemoryScene::new();
        let (_, shape) = scene.add_mesh("CTRL_C_jaw", 4);

        let err = fill_uniform(&mut scene, shape, "feedback_set", [1.0, 1.0, 0.0]).unwrap_err();
        assert_eq!(err, ColorError::NoColorSets(shape));

        scene.create_color_set(shape, "other").unwrap();
        let err = fill_uniform(&mut scene, shape, "feedback_set", [1.0, 1.0, 0.0]).unwrap_err();
        assert!(matches!(err, ColorError::MissingSet { .. }));
    }

    #[test]
    fn test_fill_writes_every_vertex() {
        let mut scene = MemoryScene::new();
        let (_, shape) = scene.add_mesh("CTRL_C_jaw", 5);
        reset_channel(&mut scene, shape, "feedback_set").unwrap();

        fill_uniform(&mut scene, shape, "feedback_set", [300.0, -10.0, 128.0]).unwrap();
        let values = scene.color_set_values(shape, "feedback_set").unwrap();
        assert_eq!(values.len(), 5);
        assert!(values.iter().all(|c| approx(c.r, 1.0) && approx(c.g, 0.0)));
    }

    #[test]
    fn test_reset_channel_replaces_existing_sets() {
        let mut scene = MemoryScene::new();
        let (_, shape) = scene.add_mesh("CTRL_C_jaw", 2);
        scene.create_color_set(shape, "colorSet1").unwrap();
        scene.create_color_set(shape, "colorSet2").unwrap();

        reset_channel(&mut scene, shape, "feedback_set").unwrap();
        assert_eq!(scene.color_set_names(shape), vec!["feedback_set"]);
        assert_eq!(scene.current_color_set(shape).as_deref(), Some("feedback_set"));
    }
}
