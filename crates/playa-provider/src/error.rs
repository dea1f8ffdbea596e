//! Provider error types.

use playa_config_and_utils::CoreError;
use playa_database::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Core(#[from] CoreError),

    /// `begin_upgrade` was called while another upgrade was running.
    #[error("An upgrade is already in progress")]
    UpgradeInProgress,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
