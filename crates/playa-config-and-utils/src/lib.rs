//! Core types, configuration, and utilities for the playa data layer.

mod config;
mod error;
mod logging;
mod paths;
mod preferences;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
pub use preferences::Preferences;
