//! Error types for aggregation operations.

use thiserror::Error;

/// Errors that can occur while building or syncing a unified profile.
///
/// These only escape through the direct build API; the sync trigger
/// catches, logs, and swallows them so a preference write never fails
/// because of its downstream sync.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// Store operation failed.
    #[error("store error: {0}")]
    Database(#[from] database::DatabaseError),

    /// Identity provider lookup failed.
    #[error("identity provider error: {0}")]
    Profile(#[from] identity_client::ClientError),
}

/// Result type for aggregation operations.
pub type Result<T> = std::result::Result<T, AggregatorError>;
