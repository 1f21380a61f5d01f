use thiserror::Error;

use crate::command::QueueKind;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tracker id must be defined")]
    MissingTrackerId,

    #[error("Backend unavailable: window.{} is not defined", .0.global_name())]
    BackendUnavailable(QueueKind),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}
