//! Unified profile assembly.

use std::sync::Arc;

use analytics_sync::{spawn_push, AnalyticsSync, RecordFields, SyncKind};
use database::{local_account, preference, Database, IdentitySelector};
use identity_client::{ProfileSource, Tenant};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::merge::{apply_synonyms, market_entry, overlay, record_fields};

/// The downstream-shaped merge of identity provider profile, preference
/// state, and caller overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedProfile {
    /// Flat field map plus a `preferences` list with one entry per
    /// matching market-scoped record.
    pub fields: RecordFields,
}

impl UnifiedProfile {
    /// Read one root field as a string, if present.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// The per-market preference entries.
    pub fn market_entries(&self) -> &[Value] {
        self.fields
            .get("preferences")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Builds unified profiles and hands them to the downstream sinks.
#[derive(Clone)]
pub struct PreferenceAggregator {
    db: Database,
    profiles: Arc<dyn ProfileSource>,
    sync: Arc<AnalyticsSync>,
}

impl PreferenceAggregator {
    /// Create an aggregator over its three sources.
    pub fn new(db: Database, profiles: Arc<dyn ProfileSource>, sync: Arc<AnalyticsSync>) -> Self {
        Self { db, profiles, sync }
    }

    /// Build the unified profile for one identity in one tenant.
    ///
    /// Returns `Ok(None)` when the identity provider has no profile or no
    /// preference records match: aggregation is best-effort and an
    /// unresolvable input short-circuits silently rather than failing the
    /// write that triggered it.
    ///
    /// Merge precedence, lowest first: provider profile, representative
    /// preference record, caller overrides.
    pub async fn build_unified_profile(
        &self,
        selector: &IdentitySelector,
        brand_id: &str,
        region_id: &str,
        overrides: &RecordFields,
    ) -> Result<Option<UnifiedProfile>> {
        let pool = self.db.pool();

        let account = local_account::get_local_account(pool, selector, brand_id, region_id).await?;
        let account_uuid = match selector {
            IdentitySelector::AccountUuid(uuid) => Some(uuid.clone()),
            IdentitySelector::Muuid(_) => account.as_ref().and_then(|a| a.uuid.clone()),
        };
        let Some(account_uuid) = account_uuid else {
            warn!(
                selector = selector.value(),
                brand = %brand_id,
                region = %region_id,
                "No local account uuid for identity; skipping aggregation"
            );
            return Ok(None);
        };

        let tenant = Tenant::new(brand_id, region_id);
        let Some(profile) = self.profiles.get_profile(&account_uuid, &tenant).await? else {
            warn!(
                uuid = %account_uuid,
                brand = %brand_id,
                region = %region_id,
                "Identity provider has no profile for account; skipping aggregation"
            );
            return Ok(None);
        };

        let mut records =
            preference::query_preferences(pool, selector, Some(brand_id), Some(region_id), None)
                .await?;
        if records.is_empty() {
            warn!(
                uuid = %account_uuid,
                brand = %brand_id,
                region = %region_id,
                "No preference records for tenant; skipping aggregation"
            );
            return Ok(None);
        }

        // The store does not promise a row order for unpinned market
        // queries; promote the most recently updated record so the pick is
        // deterministic.
        records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        let representative = &records[0];

        let mut fields = profile.fields.clone();
        overlay(&mut fields, record_fields(representative, account.as_ref()));
        overlay(&mut fields, overrides.clone());
        apply_synonyms(&mut fields);

        let entries: Vec<Value> = records
            .iter()
            .map(|record| Value::Object(market_entry(record)))
            .collect();
        fields.insert("preferences".to_string(), Value::Array(entries));

        Ok(Some(UnifiedProfile { fields }))
    }

    /// Build and push a unified profile, swallowing every failure.
    ///
    /// This is the sync trigger run behind the preference write: errors are
    /// logged with the identifying keys and go no further. Writes flagged
    /// as originating from the identity-resolution side are not re-synced;
    /// that flag is what stops the two preference writers from re-
    /// triggering each other indefinitely.
    pub async fn sync_profile(
        &self,
        selector: &IdentitySelector,
        brand_id: &str,
        region_id: &str,
        overrides: &RecordFields,
        kind: SyncKind,
        from_identity_core: bool,
    ) {
        if from_identity_core {
            debug!(
                selector = selector.value(),
                brand = %brand_id,
                region = %region_id,
                "Write originated from identity core; sync suppressed"
            );
            return;
        }

        match self
            .build_unified_profile(selector, brand_id, region_id, overrides)
            .await
        {
            Ok(Some(profile)) => {
                spawn_push(self.sync.clone(), profile.fields, kind);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    selector = selector.value(),
                    brand = %brand_id,
                    region = %region_id,
                    error = %err,
                    "Unified profile sync failed"
                );
            }
        }
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }
}
