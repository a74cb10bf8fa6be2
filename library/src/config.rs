use directories::ProjectDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FeedbackError;
use crate::scene::NamePattern;

/// Names and conventions of the rig the feedback session runs against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Node that aggregates the expression inputs.
    pub aggregator: String,
    /// Color set holding the feedback colors.
    pub color_set: String,
    /// Fill color of a fresh feedback set. Accepts unit or 0-255 values.
    pub sentinel_color: [f64; 3],
    /// Aggregator inputs fed through multi-hop eye setups.
    pub look_attributes: Vec<String>,
    /// Control names (or name prefixes) that drive the look attributes.
    pub look_drivers: Vec<String>,
    /// Wildcards naming controls when there is no driven-key setup.
    pub control_patterns: Vec<String>,
    /// Boolean attribute tagging every generated node.
    pub marker_attribute: String,
    /// Per-control sensitivity attribute read by the formulas.
    pub multiplier_attribute: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            aggregator: "CTRL_expressions".to_string(),
            color_set: "feedback_set".to_string(),
            sentinel_color: [1.0, 1.0, 0.0],
            look_attributes: vec!["eyeLookLeftR".to_string(), "eyeLookLeftL".to_string()],
            look_drivers: vec![
                "CTRL_C_eye".to_string(),
                "CTRL_L_eye".to_string(),
                "CTRL_R_eye".to_string(),
            ],
            control_patterns: vec![
                "CTRL_C_*".to_string(),
                "CTRL_L_*".to_string(),
                "CTRL_R_*".to_string(),
            ],
            marker_attribute: "feedback".to_string(),
            multiplier_attribute: "feedback_Multiply".to_string(),
        }
    }
}

impl FeedbackConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, FeedbackError> {
        let config: FeedbackConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, FeedbackError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, FeedbackError> {
        let toml_str = fs::read_to_string(path)?;
        Self::from_toml(&toml_str)
    }

    /// Loads `path` (or the per-user config file), falling back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) => p,
            None => return Self::default(),
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                info!("Feedback config loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load feedback config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), FeedbackError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), FeedbackError> {
        if self.aggregator.is_empty() {
            return Err(FeedbackError::config("aggregator name is empty"));
        }
        if self.color_set.is_empty() {
            return Err(FeedbackError::config("color set name is empty"));
        }
        if self.marker_attribute.is_empty() || self.multiplier_attribute.is_empty() {
            return Err(FeedbackError::config("attribute names must not be empty"));
        }
        for pattern in &self.control_patterns {
            NamePattern::new(pattern)?;
        }
        Ok(())
    }
}

/// `feedback.toml` in the per-user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("io", "metaboard", "rig_feedback")
        .map(|dirs| dirs.config_dir().join("feedback.toml"))
}
