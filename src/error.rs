//! Error types for the acoustic modeller

use thiserror::Error;

/// Main error type for the acoustic modeller
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Markup error: {0}")]
    Markup(String),

    #[error("No phonological feature set for locale '{0}'")]
    FeatureSetNotFound(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("Unknown element collection: {0}")]
    UnknownCollection(String),

    #[error("Scheduling error: {0}")]
    Schedule(String),

    #[error("Unrecognized model '{0}' has no ordering declaration")]
    UnrecognizedModel(String),

    #[error("Model '{model}' failed: {message}")]
    Model { model: String, message: String },

    #[error("Invalid attribute '{attribute}' on node {node}: {message}")]
    InvalidAttribute {
        node: usize,
        attribute: String,
        message: String,
    },

    #[error("Segment {0} already carries millisecond durations")]
    AlreadyNormalized(usize),
}

/// Result type for acoustic modeller operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Convenience constructor for failures raised inside a model
    pub fn model(model: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Model {
            model: model.into(),
            message: message.into(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
