//! Process-wide configuration cache.
//!
//! An explicitly-owned, injected projection of the tenant config store.
//! Entries are populated only by `refresh` (process start or an
//! administrative trigger), never expire, and are replaced wholesale per
//! consumer application. Handlers share one instance behind an `Arc`; tests
//! construct as many independent instances as they need.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use database::{tenant_config, Database, Setting};

use crate::crypto::SettingsCipher;
use crate::error::Result;
use crate::key::CompositeKey;
use crate::schema::{
    AnalyticsStoreSettings, IdentityProviderSettings, MarketingPlatformSettings, ResolvedConfig,
    SchemaKind, SettingsSchema,
};

/// In-band value for a setting whose ciphertext could not be decrypted.
/// The rest of the resolve still proceeds.
pub const DECRYPT_FAILED_MARKER: &str = "[decryption failed]";

/// Cached, decryptable view of the tenant config store.
#[derive(Debug)]
pub struct ConfigCache {
    db: Database,
    cipher: SettingsCipher,
    entries: RwLock<HashMap<String, Vec<Setting>>>,
}

impl ConfigCache {
    /// Create an empty cache over a config store.
    pub fn new(db: Database, cipher: SettingsCipher) -> Self {
        Self {
            db,
            cipher,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Reload every config row for one consumer application.
    ///
    /// The full key set for that app is replaced wholesale. A store read
    /// failure is fatal to this call but leaves the previously cached data
    /// untouched: rows are fetched and keyed before the write lock is
    /// taken. Concurrent refreshes for different apps are independent;
    /// readers may observe stale or absent entries while a refresh is in
    /// flight.
    pub async fn refresh(&self, app_id: &str) -> Result<usize> {
        let rows = tenant_config::list_for_app(self.db.pool(), app_id).await?;

        let mut fresh: HashMap<String, Vec<Setting>> = HashMap::with_capacity(rows.len());
        for row in &rows {
            fresh.insert(CompositeKey::from_row(row).serialize(), row.settings_list());
        }
        let count = fresh.len();

        let mut entries = self.entries.write().await;
        entries.retain(|key, _| CompositeKey::app_of_serialized(key) != app_id);
        entries.extend(fresh);

        info!(app = %app_id, entries = count, "Refreshed config cache");
        Ok(count)
    }

    /// Decode the cached settings for a key against the given schema.
    ///
    /// Absent keys resolve to the schema's empty struct; "no config" is a
    /// checkable state, never an error.
    pub async fn resolve(&self, kind: SchemaKind, key: &CompositeKey) -> ResolvedConfig {
        match kind {
            SchemaKind::IdentityProvider => {
                ResolvedConfig::IdentityProvider(self.decode::<IdentityProviderSettings>(key).await)
            }
            SchemaKind::AnalyticsStore => {
                ResolvedConfig::AnalyticsStore(self.decode::<AnalyticsStoreSettings>(key).await)
            }
            SchemaKind::MarketingPlatform => {
                ResolvedConfig::MarketingPlatform(self.decode::<MarketingPlatformSettings>(key).await)
            }
        }
    }

    /// Typed resolve for the identity-provider schema.
    pub async fn identity_provider(&self, key: &CompositeKey) -> IdentityProviderSettings {
        self.decode(key).await
    }

    /// Typed resolve for the analytics store schema.
    pub async fn analytics_store(&self, key: &CompositeKey) -> AnalyticsStoreSettings {
        self.decode(key).await
    }

    /// Typed resolve for the marketing platform schema.
    pub async fn marketing_platform(&self, key: &CompositeKey) -> MarketingPlatformSettings {
        self.decode(key).await
    }

    async fn decode<S: SettingsSchema>(&self, key: &CompositeKey) -> S {
        let serialized = key.serialize();
        let mut out = S::default();

        let entries = self.entries.read().await;
        let Some(settings) = entries.get(&serialized) else {
            debug!(key = %serialized, "No cached config for key");
            return out;
        };

        for setting in settings {
            let value = match self.cipher.decrypt(&setting.value) {
                Ok(plaintext) => plaintext,
                Err(err) => {
                    warn!(
                        key = %serialized,
                        setting = %setting.name,
                        error = %err,
                        "Setting failed to decrypt"
                    );
                    DECRYPT_FAILED_MARKER.to_string()
                }
            };
            // Unrecognized names are dropped.
            out.assign(&setting.name, value);
        }

        out
    }
}
