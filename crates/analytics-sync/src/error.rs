//! Sink delivery errors.

use thiserror::Error;

/// A failed delivery to a downstream sink.
///
/// Sink failures are carried as values inside
/// [`SyncOutcome`](crate::SyncOutcome), never thrown upward: the preference
/// write that triggered a sync must not fail because a sink did.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure.
    #[error("sink request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The sink answered with a non-success status.
    #[error("sink returned status {status}")]
    Status { status: u16 },

    /// The token endpoint rejected the client-credentials grant.
    #[error("token endpoint returned status {status}")]
    TokenStatus { status: u16 },

    /// The token response carried no access token.
    #[error("token response had no access_token")]
    TokenMissing,
}
