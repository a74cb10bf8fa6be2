use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Feedback session failed: {0}")]
    Session(#[from] crate::session::SessionError),
    #[error("Config error: {0}")]
    Config(String),
}

impl FeedbackError {
    pub fn config(msg: impl Into<String>) -> Self {
        FeedbackError::Config(msg.into())
    }
}
