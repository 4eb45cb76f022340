use thiserror::Error;

use crate::types::{Epoch, LevelIndex};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Journal database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Level {index} not found ({available} levels available)")]
    LevelNotFound { index: LevelIndex, available: usize },

    #[error("Level {index} is malformed: {reason}")]
    MalformedLevel { index: LevelIndex, reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Failed to spawn worker '{name}': {source}")]
    WorkerSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker '{name}' of epoch {epoch} panicked")]
    WorkerPanicked { name: &'static str, epoch: Epoch },

    #[error("Journal writer thread has stopped")]
    JournalClosed,

    #[error("Invalid lifecycle transition: {reason}")]
    InvalidTransition { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
