//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while loading or decoding tenant configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading config rows from the store failed.
    #[error("config store error: {0}")]
    Database(#[from] database::DatabaseError),

    /// A stored value was not valid base64.
    #[error("config value decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// A stored value could not be decrypted with the process key.
    #[error("config value decryption failed")]
    Decrypt,

    /// The supplied encryption key was not 32 bytes.
    #[error("settings key must be 32 bytes")]
    InvalidKey,
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
