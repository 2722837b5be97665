//! Error types for `cmdmenu` core library.

use thiserror::Error;

/// Result type alias using `cmdmenu` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `cmdmenu` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
