//! Error types for the pacing engine.
//!
//! `NotFound` and `Conflict` surface to the caller as request failures.
//! Inside the scheduler and responder loops, per-task and per-recipient
//! failures are caught, logged, and skipped — they never abort a batch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Messaging channel error: {0}")]
    Channel(String),
}

impl TrackerError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        TrackerError::NotFound { entity, id }
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::Channel(err.to_string())
    }
}
