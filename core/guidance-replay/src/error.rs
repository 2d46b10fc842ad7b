//! Errors for the replay tool.

use std::path::PathBuf;

use guidance_core::GuidanceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Scenario {path} is malformed: {details}")]
    ScenarioMalformed { path: PathBuf, details: String },

    #[error("Scenario is invalid: {0}")]
    ScenarioInvalid(String),

    #[error(transparent)]
    Config(#[from] GuidanceError),

    #[error("Failed to encode output: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, ReplayError>;
