//! Errors raised while resolving paths and reading settings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A setting was present but unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config or preferences file could not be parsed or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No home directory to anchor `~/.playa` on.
    #[error("Path error: {0}")]
    Path(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
