//! Tenant configuration cache for Meridian.
//!
//! Per-tenant configuration lives encrypted in the database
//! (`tenant_configs`); this crate keeps an in-memory projection of it,
//! keyed by a composite `(app, brand, region, market?, locale?, group?)`
//! key and decoded through per-consumer schemas.
//!
//! The cache is an injected object, not a global: construct one
//! [`ConfigCache`] at startup, `refresh` the consumers you serve, and share
//! it behind an `Arc`.
//!
//! # Example
//!
//! ```no_run
//! use tenant_config::{CompositeKey, ConfigCache, SettingsCipher, ANALYTICS_STORE_APP};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = database::Database::connect("sqlite:meridian.db?mode=rwc").await?;
//! let cipher = SettingsCipher::from_base64_key("bWVyaWRpYW4tc2V0dGluZ3Mta2V5LTMyLWJ5dGVzISE=")?;
//! let cache = ConfigCache::new(db, cipher);
//!
//! cache.refresh(ANALYTICS_STORE_APP).await?;
//! let key = CompositeKey::consumer(ANALYTICS_STORE_APP, "CM", "NA", Some("registration"));
//! let settings = cache.analytics_store(&key).await;
//! if settings.is_empty() {
//!     println!("tenant has no analytics sink");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod crypto;
pub mod error;
pub mod key;
pub mod schema;

pub use cache::{ConfigCache, DECRYPT_FAILED_MARKER};
pub use crypto::SettingsCipher;
pub use error::{ConfigError, Result};
pub use key::CompositeKey;
pub use schema::{
    AnalyticsStoreSettings, IdentityProviderSettings, MarketingPlatformSettings, ResolvedConfig,
    SchemaKind,
};

/// App id for the identity-provider consumer (keys on market and locale).
pub const IDENTITY_PROVIDER_APP: &str = "identity-provider";

/// App id for the analytics store sink consumer.
pub const ANALYTICS_STORE_APP: &str = "analytics-store";

/// App id for the marketing platform sink consumer.
pub const MARKETING_PLATFORM_APP: &str = "marketing-platform";
