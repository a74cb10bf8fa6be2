pub mod annotate;
pub mod color;
pub mod config;
pub mod discovery;
pub mod error;
pub mod formula;
pub mod scene;
pub mod session;

pub use config::FeedbackConfig;
pub use error::FeedbackError;
pub use scene::MemoryScene;
pub use session::{InitReport, initialize, reset_all, run};

/// Loads a scene and a config, runs a full feedback pass and returns the
/// updated scene as JSON.
pub fn initialize_json(
    scene_json: &str,
    config: &FeedbackConfig,
) -> Result<(String, InitReport), FeedbackError> {
    let mut scene = MemoryScene::load(scene_json)?;
    let report = initialize(&mut scene, config)?;
    Ok((scene.save()?, report))
}
