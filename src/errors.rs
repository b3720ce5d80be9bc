// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// A processing stage rejected its input (malformed stylesheet, bad
    /// image data, failing external command, ...).
    #[error("task '{task}' failed in stage '{stage}': {message}")]
    Stage {
        task: String,
        stage: String,
        message: String,
    },

    #[error("Dev server error: {0}")]
    Server(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssetdagError {
    /// True for failures caused by the content flowing through a stage, as
    /// opposed to filesystem or configuration problems.
    pub fn is_stage_failure(&self) -> bool {
        matches!(self, AssetdagError::Stage { .. })
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;
