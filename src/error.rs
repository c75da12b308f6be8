//! Error types for `tracker`.

use thiserror::Error;

/// Main error type for the tracker persistence layer.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Store failure, passed through from `rusqlite` untouched.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// A story was created against a project id that does not exist.
    #[error("project not found: {id}")]
    ProjectNotFound { id: i64 },
}

/// Result type alias for `tracker`.
pub type Result<T> = std::result::Result<T, TrackerError>;
