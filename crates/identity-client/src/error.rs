//! Identity provider client errors.

use thiserror::Error;

/// Errors that can occur talking to the identity provider.
///
/// An absent profile is not an error; lookups return `Ok(None)` and the
/// caller decides whether that is fatal.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure.
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// No identity-provider config is cached for the tenant.
    #[error("no identity provider config for tenant {brand_id}/{region_id}")]
    Unconfigured { brand_id: String, region_id: String },

    /// The provider answered with an unexpected status.
    #[error("identity provider returned status {status}")]
    Status { status: u16 },

    /// The provider's response body was not valid JSON.
    #[error("identity provider response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for identity provider operations.
pub type Result<T> = std::result::Result<T, ClientError>;
