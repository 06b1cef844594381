//! Consumer-facing preference operations.
//!
//! Controllers and resolvers talk to [`PreferenceService`]; it coordinates
//! the companion local-account write, the preference write itself, and the
//! background sync trigger.

use analytics_sync::{RecordFields, SyncKind};
use database::{
    identity, local_account, preference, purge, AccountIdentity, EmailRecord, IdentitySelector,
    LocalAccount, LocalAccountUpsert, PreferenceRecord, PreferenceUpsert, PurgeSummary,
};
use tracing::debug;

use crate::builder::PreferenceAggregator;
use crate::error::Result;

/// A preference write plus everything needed to trigger its sync.
#[derive(Debug, Clone)]
pub struct PreferenceWrite {
    /// The preference state to record.
    pub preference: PreferenceUpsert,
    /// Companion local-account state for the same tenant.
    pub account: LocalAccountUpsert,
    /// Which sink event this write represents.
    pub sync_kind: SyncKind,
    /// Caller-supplied fields merged into the unified profile at the
    /// highest precedence.
    pub overrides: RecordFields,
}

impl PreferenceWrite {
    /// A write with no overrides.
    pub fn new(preference: PreferenceUpsert, account: LocalAccountUpsert, kind: SyncKind) -> Self {
        Self {
            preference,
            account,
            sync_kind: kind,
            overrides: RecordFields::new(),
        }
    }
}

/// The core's write/query surface.
#[derive(Clone)]
pub struct PreferenceService {
    aggregator: PreferenceAggregator,
}

impl PreferenceService {
    /// Create a service over an aggregator (which owns the store handle).
    pub fn new(aggregator: PreferenceAggregator) -> Self {
        Self { aggregator }
    }

    /// Resolve or mint the global identity owning an email.
    pub async fn get_or_create_identity(&self, email: &str) -> Result<String> {
        let muuid =
            identity::get_or_create_identity(self.aggregator.database().pool(), email).await?;
        Ok(muuid)
    }

    /// Append a new email to an identity's history, then re-sync every
    /// tenant the identity is bound to.
    ///
    /// The history append is the primary write and may fail; the per-tenant
    /// syncs run in the background and cannot.
    pub async fn change_email(&self, muuid: &str, new_email: &str) -> Result<()> {
        let pool = self.aggregator.database().pool();
        identity::change_email(pool, muuid, new_email).await?;

        let accounts = local_account::list_local_accounts(pool, muuid).await?;
        if accounts.is_empty() {
            return Ok(());
        }

        let aggregator = self.aggregator.clone();
        let selector = IdentitySelector::Muuid(muuid.to_string());
        tokio::spawn(async move {
            for account in accounts {
                aggregator
                    .sync_profile(
                        &selector,
                        &account.brand_id,
                        &account.region_id,
                        &RecordFields::new(),
                        SyncKind::EmailChange,
                        false,
                    )
                    .await;
            }
        });

        Ok(())
    }

    /// Look an identity-provider account uuid back up to its identity and
    /// current email. `Ok(None)` when nothing matches.
    pub async fn lookup_by_account_uuid(&self, uuid: &str) -> Result<Option<AccountIdentity>> {
        let found =
            identity::lookup_by_account_uuid(self.aggregator.database().pool(), uuid).await?;
        Ok(found)
    }

    /// Full email history for an identity, oldest first.
    pub async fn email_history(&self, muuid: &str) -> Result<Vec<EmailRecord>> {
        let history = identity::email_history(self.aggregator.database().pool(), muuid).await?;
        Ok(history)
    }

    /// Create or update a tenant binding on its own, outside a preference
    /// write.
    pub async fn upsert_local_account(&self, upsert: &LocalAccountUpsert) -> Result<LocalAccount> {
        let account =
            local_account::upsert_local_account(self.aggregator.database().pool(), upsert).await?;
        Ok(account)
    }

    /// Record a preference write for one tenant.
    ///
    /// The companion local-account upsert runs first; if it fails, the
    /// preference is not written (a tenant binding that silently failed to
    /// register must not look like success). The downstream sync is then
    /// started in the background; its outcome never reaches this caller.
    pub async fn record_preference(&self, write: PreferenceWrite) -> Result<PreferenceRecord> {
        let pool = self.aggregator.database().pool();

        local_account::upsert_local_account(pool, &write.account).await?;
        let record = preference::upsert_preference(pool, &write.preference).await?;

        let selector = match (&record.muuid, &record.uuid) {
            (Some(muuid), _) => IdentitySelector::Muuid(muuid.clone()),
            (None, Some(uuid)) => IdentitySelector::AccountUuid(uuid.clone()),
            (None, None) => {
                // upsert_preference enforces a selector; unreachable in
                // practice but not worth a panic in the write path.
                debug!("Preference record has no selector; skipping sync");
                return Ok(record);
            }
        };

        let aggregator = self.aggregator.clone();
        let brand_id = record.brand_id.clone();
        let region_id = record.region_id.clone();
        let overrides = write.overrides.clone();
        let from_identity_core = record.from_identity_core;
        let kind = write.sync_kind;
        tokio::spawn(async move {
            aggregator
                .sync_profile(
                    &selector,
                    &brand_id,
                    &region_id,
                    &overrides,
                    kind,
                    from_identity_core,
                )
                .await;
        });

        Ok(record)
    }

    /// Query preference records for an identity.
    pub async fn query_preferences(
        &self,
        selector: &IdentitySelector,
        brand_id: Option<&str>,
        region_id: Option<&str>,
        market_id: Option<&str>,
    ) -> Result<Vec<PreferenceRecord>> {
        let records = preference::query_preferences(
            self.aggregator.database().pool(),
            selector,
            brand_id,
            region_id,
            market_id,
        )
        .await?;
        Ok(records)
    }

    /// Hard-delete an identity's preference records, optionally scoped to
    /// one market.
    pub async fn purge_preferences(
        &self,
        selector: &IdentitySelector,
        market_id: Option<&str>,
    ) -> Result<u64> {
        let removed = preference::purge_preferences(
            self.aggregator.database().pool(),
            selector,
            market_id,
        )
        .await?;
        Ok(removed)
    }

    /// Remove everything stored for a global identity.
    pub async fn purge_identity(&self, muuid: &str) -> Result<PurgeSummary> {
        let summary = purge::purge_identity(self.aggregator.database().pool(), muuid).await?;
        Ok(summary)
    }

    /// The aggregator behind this service, for direct profile builds.
    pub fn aggregator(&self) -> &PreferenceAggregator {
        &self.aggregator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use analytics_sync::{AnalyticsSync, TokenConfig};
    use database::Database;
    use identity_client::{Profile, StaticProfiles};
    use serde_json::json;
    use tenant_config::{ConfigCache, SettingsCipher};

    async fn service() -> (PreferenceService, Arc<StaticProfiles>) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();

        let cache = Arc::new(ConfigCache::new(
            db.clone(),
            SettingsCipher::new(&[3u8; 32]).unwrap(),
        ));
        let sync = Arc::new(AnalyticsSync::new(
            cache,
            TokenConfig {
                token_url: "http://127.0.0.1:1/token".to_string(),
                client_id: "svc".to_string(),
                client_secret: "secret".to_string(),
            },
        ));
        let profiles = Arc::new(StaticProfiles::new());
        let aggregator = PreferenceAggregator::new(db, profiles.clone(), sync);
        (PreferenceService::new(aggregator), profiles)
    }

    fn tenant_write(muuid: &str, market: Option<&str>) -> PreferenceWrite {
        PreferenceWrite::new(
            PreferenceUpsert {
                muuid: Some(muuid.to_string()),
                brand_id: "CM".to_string(),
                region_id: "NA".to_string(),
                market_id: market.map(str::to_string),
                email_opt_in: Some(true),
                ..Default::default()
            },
            LocalAccountUpsert {
                muuid: Some(muuid.to_string()),
                brand_id: "CM".to_string(),
                region_id: "NA".to_string(),
                uuid: Some("acct-1".to_string()),
                ..Default::default()
            },
            SyncKind::Newsletter,
        )
    }

    #[tokio::test]
    async fn test_record_preference_writes_both_rows() {
        let (service, _profiles) = service().await;
        let muuid = service.get_or_create_identity("bob@example.com").await.unwrap();

        let record = service.record_preference(tenant_write(&muuid, Some("US"))).await.unwrap();
        assert_eq!(record.email_opt_in, Some(true));

        // The companion local account was registered too.
        let resolved = service.lookup_by_account_uuid("acct-1").await.unwrap().unwrap();
        assert_eq!(resolved.muuid, muuid);
    }

    #[tokio::test]
    async fn test_record_preference_is_idempotent() {
        let (service, _profiles) = service().await;
        let muuid = service.get_or_create_identity("bob@example.com").await.unwrap();

        service.record_preference(tenant_write(&muuid, Some("US"))).await.unwrap();
        service.record_preference(tenant_write(&muuid, Some("US"))).await.unwrap();

        let selector = IdentitySelector::Muuid(muuid);
        let records = service
            .query_preferences(&selector, Some("CM"), Some("NA"), Some("US"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_account_upsert_blocks_preference_write() {
        let (service, _profiles) = service().await;
        let muuid = service.get_or_create_identity("bob@example.com").await.unwrap();

        let mut write = tenant_write(&muuid, Some("US"));
        // An account with no selector cannot be registered.
        write.account.muuid = None;
        write.account.uuid = None;
        assert!(service.record_preference(write).await.is_err());

        // Fail fast: no preference row was written either.
        let selector = IdentitySelector::Muuid(muuid);
        let records = service
            .query_preferences(&selector, None, None, None)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_change_email_keeps_history_and_succeeds_without_accounts() {
        let (service, _profiles) = service().await;
        let muuid = service.get_or_create_identity("old@example.com").await.unwrap();

        service.change_email(&muuid, "new@example.com").await.unwrap();

        let history = service.email_history(&muuid).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].email, "new@example.com");
    }

    #[tokio::test]
    async fn test_purge_identity_round_trip() {
        let (service, profiles) = service().await;
        profiles
            .insert("acct-1", Profile::from_body("acct-1", json!({"email": "b@e.c"})))
            .await;
        let muuid = service.get_or_create_identity("bob@example.com").await.unwrap();
        service.record_preference(tenant_write(&muuid, Some("US"))).await.unwrap();

        let summary = service.purge_identity(&muuid).await.unwrap();
        assert_eq!(summary.preferences, 1);
        assert_eq!(summary.local_accounts, 1);
        assert_eq!(summary.email_records, 1);
    }
}
