//! Hue formulas driving the feedback color modifiers.

use serde::{Deserialize, Serialize};

/// Lowest hue delta a formula can produce.
pub const HUE_FLOOR: f64 = -60.0;
/// Hue delta per unit of travel before gain.
pub const HUE_SCALE: f64 = -60.0;
pub const SINGLE_AXIS_GAIN: f64 = 1.2;
pub const DUAL_AXIS_GAIN: f64 = 0.9;

const TRANSLATE_CHANNELS: [&str; 3] = ["translateX", "translateY", "translateZ"];

/// Which formula a control gets, keyed to the axes it can move along.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedbackFormula {
    SingleAxis { axis: String },
    DualAxis { first: String, second: String },
}

impl FeedbackFormula {
    /// Picks the formula for a control's free axes.
    ///
    /// Axes that are translate channels are used as inputs. Otherwise the
    /// single-axis formula reads `translateY` and the dual-axis one
    /// `translateX`/`translateY`. Returns `None` for any count but 1 or 2.
    pub fn for_axes(axes: &[String]) -> Option<Self> {
        let is_translate = |a: &String| TRANSLATE_CHANNELS.contains(&a.as_str());
        match axes {
            [axis] => Some(FeedbackFormula::SingleAxis {
                axis: if is_translate(axis) {
                    axis.clone()
                } else {
                    "translateY".to_string()
                },
            }),
            [first, second] if is_translate(first) && is_translate(second) => {
                Some(FeedbackFormula::DualAxis {
                    first: first.clone(),
                    second: second.clone(),
                })
            }
            [_, _] => Some(FeedbackFormula::DualAxis {
                first: "translateX".to_string(),
                second: "translateY".to_string(),
            }),
            _ => None,
        }
    }

    pub fn gain(&self) -> f64 {
        match self {
            FeedbackFormula::SingleAxis { .. } => SINGLE_AXIS_GAIN,
            FeedbackFormula::DualAxis { .. } => DUAL_AXIS_GAIN,
        }
    }

    /// Control attributes the formula reads, in input order.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            FeedbackFormula::SingleAxis { axis } => vec![axis.as_str()],
            FeedbackFormula::DualAxis { first, second } => vec![first.as_str(), second.as_str()],
        }
    }

    /// Hue delta for the given input values, never below [`HUE_FLOOR`].
    ///
    /// Missing inputs read as 0.
    pub fn hue_delta(&self, values: &[f64], multiplier: f64) -> f64 {
        let travel: f64 = (0..self.inputs().len())
            .map(|i| values.get(i).copied().unwrap_or(0.0).abs())
            .sum();
        let delta = HUE_SCALE * self.gain() * travel * multiplier;
        // NaN input must still land inside the range
        if delta.is_nan() {
            return HUE_FLOOR;
        }
        delta.max(HUE_FLOOR)
    }

    /// Expression text as the host would show it.
    pub fn source(&self, control: &str, modifier: &str, multiplier_attr: &str) -> String {
        let travel = self
            .inputs()
            .iter()
            .map(|axis| format!("abs({}.{})", control, axis))
            .collect::<Vec<_>>()
            .join(" + ");
        format!(
            "{}.huev = max({}, ({}) * ({}) * {} * {}.{});",
            modifier,
            HUE_FLOOR,
            travel,
            HUE_SCALE,
            self.gain(),
            control,
            multiplier_attr
        )
    }
}
