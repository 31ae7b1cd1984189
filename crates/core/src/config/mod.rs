//! Configuration loading and types.

mod loader;
mod types;

use thiserror::Error;

pub use loader::{load_config, load_config_from_str};
pub use types::{app_dir, Config, ConverterConfig, DatabaseConfig, HistoryConfig, ServerConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
