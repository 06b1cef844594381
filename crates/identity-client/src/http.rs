//! HTTP client for the external identity provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use tenant_config::{CompositeKey, ConfigCache};

use crate::error::{ClientError, Result};
use crate::profile::{Profile, Tenant};
use crate::source::ProfileSource;

/// Locale used for config addressing when the caller supplies none.
const DEFAULT_LOCALE: &str = "en_US";

/// Identity provider client authenticated from the cached
/// identity-provider config for the tenant.
#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    http: Client,
    cache: Arc<ConfigCache>,
}

impl HttpIdentityClient {
    /// Create a client over a shared config cache.
    pub fn new(cache: Arc<ConfigCache>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { http, cache }
    }

    fn config_key(tenant: &Tenant) -> CompositeKey {
        // The identity-provider key shape needs market and locale; tenants
        // that do not split by market are keyed by their region.
        let market = tenant.market_id.as_deref().unwrap_or(&tenant.region_id);
        let locale = tenant.locale.as_deref().unwrap_or(DEFAULT_LOCALE);
        CompositeKey::identity_provider(&tenant.brand_id, &tenant.region_id, market, locale, None)
    }
}

#[async_trait]
impl ProfileSource for HttpIdentityClient {
    async fn get_profile(&self, account_uuid: &str, tenant: &Tenant) -> Result<Option<Profile>> {
        let settings = self.cache.identity_provider(&Self::config_key(tenant)).await;

        let (Some(website), Some(client_id), Some(client_secret)) =
            (&settings.website, &settings.client_id, &settings.client_secret)
        else {
            return Err(ClientError::Unconfigured {
                brand_id: tenant.brand_id.clone(),
                region_id: tenant.region_id.clone(),
            });
        };

        let url = format!("{}/accounts/{}", website.trim_end_matches('/'), account_uuid);
        debug!(uuid = %account_uuid, "Fetching identity provider profile");

        let response = self
            .http
            .get(&url)
            .basic_auth(client_id, Some(client_secret))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: Value = response.json().await?;
                Ok(Some(Profile::from_body(account_uuid, body)))
            }
            status => {
                warn!(
                    uuid = %account_uuid,
                    status = status.as_u16(),
                    "Identity provider returned unexpected status"
                );
                Err(ClientError::Status {
                    status: status.as_u16(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::Database;
    use tenant_config::SettingsCipher;

    #[tokio::test]
    async fn test_unconfigured_tenant_is_an_error() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let cache = Arc::new(ConfigCache::new(db, SettingsCipher::new(&[1u8; 32]).unwrap()));
        let client = HttpIdentityClient::new(cache);

        let err = client
            .get_profile("u1", &Tenant::new("CM", "NA"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Unconfigured { .. }));
    }
}
