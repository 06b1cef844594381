//! Best-effort push of unified profiles to downstream sinks.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use tenant_config::{CompositeKey, ConfigCache, ANALYTICS_STORE_APP, MARKETING_PLATFORM_APP};

use crate::error::SyncError;

/// Fields of a unified profile, as handed over by the aggregator.
pub type RecordFields = Map<String, Value>;

/// Regions whose tenants are onboarded to the marketing platform.
const MARKETING_REGIONS: &[&str] = &["EU", "UK"];

/// What kind of event triggered the sync; selects the sink config group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    /// A new account registration.
    Registration,
    /// A newsletter opt-in.
    Newsletter,
    /// An email address change.
    EmailChange,
}

impl SyncKind {
    /// Config group the analytics sink is keyed under for this kind.
    pub fn config_group(&self) -> &'static str {
        match self {
            SyncKind::Registration => "registration",
            SyncKind::Newsletter => "newsletter",
            SyncKind::EmailChange => "email-change",
        }
    }
}

/// Result of a sink push. Never an `Err` to the caller; fire-and-forget
/// call sites log and drop it.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The sink accepted the record.
    Delivered,
    /// No sink is configured for the tenant, or the record lacks the keys
    /// to address one. Expected and non-fatal.
    Skipped,
    /// The sink was configured but delivery failed.
    Failed(SyncError),
}

impl SyncOutcome {
    /// True when the record reached the sink.
    pub fn is_delivered(&self) -> bool {
        matches!(self, SyncOutcome::Delivered)
    }
}

/// Client-credentials settings for the analytics store's token endpoint.
///
/// Service-level configuration: the per-tenant analytics schema carries the
/// write key, but the bearer-token grant is one set of credentials for the
/// whole service.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Token endpoint URL.
    pub token_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Pushes unified profiles to the analytics store and marketing platform.
#[derive(Debug, Clone)]
pub struct AnalyticsSync {
    http: Client,
    cache: Arc<ConfigCache>,
    token: TokenConfig,
}

impl AnalyticsSync {
    /// Create a sync client over a shared config cache.
    pub fn new(cache: Arc<ConfigCache>, token: TokenConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { http, cache, token }
    }

    /// Push a unified record to the tenant's analytics store.
    ///
    /// The sink is addressed by `(brand, region, kind group)`. A tenant
    /// with no analytics config is skipped with a single log line; that is
    /// an expected state, not a failure.
    pub async fn push_to_analytics_store(
        &self,
        record: &RecordFields,
        kind: SyncKind,
    ) -> SyncOutcome {
        let (Some(brand), Some(region)) = (field_str(record, "brandId"), field_str(record, "regionId"))
        else {
            warn!("Record has no brand/region; cannot address analytics sink");
            return SyncOutcome::Skipped;
        };

        let key = CompositeKey::consumer(ANALYTICS_STORE_APP, brand, region, Some(kind.config_group()));
        let settings = self.cache.analytics_store(&key).await;
        let (Some(base_uri), Some(db_name), Some(table_name), Some(write_key)) = (
            &settings.base_uri,
            &settings.db_name,
            &settings.table_name,
            &settings.write_key,
        ) else {
            info!(
                brand = %brand,
                region = %region,
                kind = kind.config_group(),
                "No analytics sink configured for tenant; skipping push"
            );
            return SyncOutcome::Skipped;
        };

        // A fresh token for every push; the grant is not cached across
        // calls.
        let token = match self.fetch_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(brand = %brand, region = %region, error = %err, "Token fetch failed");
                return SyncOutcome::Failed(err);
            }
        };

        let url = format!(
            "{}/{}/{}",
            base_uri.trim_end_matches('/'),
            db_name,
            table_name
        );
        debug!(url = %url, kind = kind.config_group(), "Pushing record to analytics store");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header("x-write-key", write_key)
            .header("RegionId", region)
            .json(record)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => SyncOutcome::Delivered,
            Ok(resp) => {
                let status = resp.status().as_u16();
                warn!(url = %url, status, "Analytics store rejected record");
                SyncOutcome::Failed(SyncError::Status { status })
            }
            Err(err) => {
                warn!(url = %url, error = %err, "Analytics store push failed");
                SyncOutcome::Failed(SyncError::Http(err))
            }
        }
    }

    /// Push a unified record to the tenant's marketing platform.
    ///
    /// Only regions on the marketing allow-list are synced; everything
    /// else is skipped silently by policy, not by configuration.
    pub async fn push_to_marketing_platform(&self, record: &RecordFields) -> SyncOutcome {
        let (Some(brand), Some(region)) = (field_str(record, "brandId"), field_str(record, "regionId"))
        else {
            warn!("Record has no brand/region; cannot address marketing sink");
            return SyncOutcome::Skipped;
        };
        let Some(email) = field_str(record, "email") else {
            warn!(brand = %brand, region = %region, "Record has no email; skipping marketing push");
            return SyncOutcome::Skipped;
        };

        let normalized = normalize_region(region);
        if !MARKETING_REGIONS.contains(&normalized.as_str()) {
            debug!(region = %region, "Region not on marketing allow-list");
            return SyncOutcome::Skipped;
        }

        let key = CompositeKey::consumer(MARKETING_PLATFORM_APP, brand, &normalized, None);
        let settings = self.cache.marketing_platform(&key).await;
        let (Some(api_url), Some(api_key)) = (&settings.api_url, &settings.api_key) else {
            info!(
                brand = %brand,
                region = %normalized,
                "No marketing platform configured for tenant; skipping push"
            );
            return SyncOutcome::Skipped;
        };

        let envelope = json!({
            "eventName": "profileUpdated",
            "email": email,
            "dataFields": record,
        });
        debug!(url = %api_url, "Pushing event to marketing platform");

        let response = self
            .http
            .post(api_url)
            .header("Api-Key", api_key)
            .json(&envelope)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => SyncOutcome::Delivered,
            Ok(resp) => {
                let status = resp.status().as_u16();
                warn!(url = %api_url, status, "Marketing platform rejected event");
                SyncOutcome::Failed(SyncError::Status { status })
            }
            Err(err) => {
                warn!(url = %api_url, error = %err, "Marketing platform push failed");
                SyncOutcome::Failed(SyncError::Http(err))
            }
        }
    }

    /// Fetch a bearer token via client-credentials grant.
    async fn fetch_token(&self) -> Result<String, SyncError> {
        let response = self
            .http
            .post(&self.token.token_url)
            .basic_auth(&self.token.client_id, Some(&self.token.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::TokenStatus {
                status: response.status().as_u16(),
            });
        }

        let body: TokenResponse = response.json().await?;
        body.access_token.ok_or(SyncError::TokenMissing)
    }
}

/// Run both sink pushes in the background.
///
/// The triggering request never awaits this: outcomes only reach the log.
/// Cancellation is deliberately unsupported; a slow sink delays only this
/// task.
pub fn spawn_push(
    sync: Arc<AnalyticsSync>,
    record: RecordFields,
    kind: SyncKind,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = sync.push_to_analytics_store(&record, kind).await;
        if let SyncOutcome::Failed(err) = outcome {
            warn!(error = %err, "Background analytics push failed");
        }

        let outcome = sync.push_to_marketing_platform(&record).await;
        if let SyncOutcome::Failed(err) = outcome {
            warn!(error = %err, "Background marketing push failed");
        }
    })
}

fn field_str<'a>(record: &'a RecordFields, name: &str) -> Option<&'a str> {
    record.get(name).and_then(Value::as_str)
}

/// Normalize a region for marketing-platform addressing.
fn normalize_region(region: &str) -> String {
    let upper = region.to_ascii_uppercase();
    match upper.as_str() {
        "GB" => "UK".to_string(),
        _ => upper,
    }
}
