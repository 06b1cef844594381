//! Preference record storage, sharded by tenant and optionally market.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DatabaseError, Result};
use crate::models::{encode_string_list, IdentitySelector, PreferenceRecord, PreferenceUpsert};

const SELECT_COLUMNS: &str = "id, muuid, uuid, brand_id, region_id, market_id, email_opt_in, \
     sms_opt_in, email_opt_in_date, first_name, last_name, user_name, language, \
     demographic_trades, interests, from_identity_core, created_at, updated_at";

impl PreferenceUpsert {
    fn selector(&self) -> Result<IdentitySelector> {
        if let Some(muuid) = &self.muuid {
            return Ok(IdentitySelector::Muuid(muuid.clone()));
        }
        if let Some(uuid) = &self.uuid {
            return Ok(IdentitySelector::AccountUuid(uuid.clone()));
        }
        Err(DatabaseError::MissingSelector)
    }
}

/// Create or update the preference record for one
/// (identity, brand, region, market) tuple.
///
/// The filter uses the MUUID when present, the account uuid otherwise.
/// `updated_at` is restamped on every call. Normal updates never delete;
/// removal happens only through the purge operations.
pub async fn upsert_preference(
    pool: &SqlitePool,
    upsert: &PreferenceUpsert,
) -> Result<PreferenceRecord> {
    let selector = upsert.selector()?;
    let key_column = match &selector {
        IdentitySelector::Muuid(_) => "muuid",
        IdentitySelector::AccountUuid(_) => "uuid",
    };

    let update_sql = format!(
        "UPDATE preference_records SET \
             muuid = COALESCE(?, muuid), uuid = COALESCE(?, uuid), \
             email_opt_in = ?, sms_opt_in = ?, email_opt_in_date = ?, \
             first_name = ?, last_name = ?, user_name = ?, language = ?, \
             demographic_trades = ?, interests = ?, from_identity_core = ?, \
             updated_at = datetime('now') \
         WHERE {key_column} = ? AND brand_id = ? AND region_id = ? AND market_id IS ?"
    );

    let updated = sqlx::query(&update_sql)
        .bind(&upsert.muuid)
        .bind(&upsert.uuid)
        .bind(upsert.email_opt_in)
        .bind(upsert.sms_opt_in)
        .bind(&upsert.email_opt_in_date)
        .bind(&upsert.first_name)
        .bind(&upsert.last_name)
        .bind(&upsert.user_name)
        .bind(&upsert.language)
        .bind(encode_string_list(&upsert.demographic_trades))
        .bind(encode_string_list(&upsert.interests))
        .bind(upsert.from_identity_core)
        .bind(selector.value())
        .bind(&upsert.brand_id)
        .bind(&upsert.region_id)
        .bind(&upsert.market_id)
        .execute(pool)
        .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO preference_records
                (muuid, uuid, brand_id, region_id, market_id, email_opt_in,
                 sms_opt_in, email_opt_in_date, first_name, last_name,
                 user_name, language, demographic_trades, interests,
                 from_identity_core)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&upsert.muuid)
        .bind(&upsert.uuid)
        .bind(&upsert.brand_id)
        .bind(&upsert.region_id)
        .bind(&upsert.market_id)
        .bind(upsert.email_opt_in)
        .bind(upsert.sms_opt_in)
        .bind(&upsert.email_opt_in_date)
        .bind(&upsert.first_name)
        .bind(&upsert.last_name)
        .bind(&upsert.user_name)
        .bind(&upsert.language)
        .bind(encode_string_list(&upsert.demographic_trades))
        .bind(encode_string_list(&upsert.interests))
        .bind(upsert.from_identity_core)
        .execute(pool)
        .await?;

        debug!(
            brand = %upsert.brand_id,
            region = %upsert.region_id,
            market = ?upsert.market_id,
            "Created preference record"
        );
    }

    let fetch_sql = format!(
        "SELECT {SELECT_COLUMNS} FROM preference_records \
         WHERE {key_column} = ? AND brand_id = ? AND region_id = ? AND market_id IS ?"
    );

    sqlx::query_as::<_, PreferenceRecord>(&fetch_sql)
        .bind(selector.value())
        .bind(&upsert.brand_id)
        .bind(&upsert.region_id)
        .bind(&upsert.market_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "PreferenceRecord",
            id: selector.value().to_string(),
        })
}

/// Query preference records for an identity.
///
/// Any of brand/region/market may be left open; the result may then hold
/// multiple rows, with no ordering guaranteed.
pub async fn query_preferences(
    pool: &SqlitePool,
    selector: &IdentitySelector,
    brand_id: Option<&str>,
    region_id: Option<&str>,
    market_id: Option<&str>,
) -> Result<Vec<PreferenceRecord>> {
    let key_column = match selector {
        IdentitySelector::Muuid(_) => "muuid",
        IdentitySelector::AccountUuid(_) => "uuid",
    };

    let mut sql = format!(
        "SELECT {SELECT_COLUMNS} FROM preference_records WHERE {key_column} = ?"
    );
    if brand_id.is_some() {
        sql.push_str(" AND brand_id = ?");
    }
    if region_id.is_some() {
        sql.push_str(" AND region_id = ?");
    }
    if market_id.is_some() {
        sql.push_str(" AND market_id = ?");
    }

    let mut query = sqlx::query_as::<_, PreferenceRecord>(&sql).bind(selector.value());
    if let Some(brand) = brand_id {
        query = query.bind(brand);
    }
    if let Some(region) = region_id {
        query = query.bind(region);
    }
    if let Some(market) = market_id {
        query = query.bind(market);
    }

    let records = query.fetch_all(pool).await?;
    Ok(records)
}

/// Hard-delete an identity's preference records, optionally scoped to one
/// market. Deleting nothing is `NotFound`, not success.
pub async fn purge_preferences(
    pool: &SqlitePool,
    selector: &IdentitySelector,
    market_id: Option<&str>,
) -> Result<u64> {
    let key_column = match selector {
        IdentitySelector::Muuid(_) => "muuid",
        IdentitySelector::AccountUuid(_) => "uuid",
    };

    let mut sql = format!("DELETE FROM preference_records WHERE {key_column} = ?");
    if market_id.is_some() {
        sql.push_str(" AND market_id = ?");
    }

    let mut query = sqlx::query(&sql).bind(selector.value());
    if let Some(market) = market_id {
        query = query.bind(market);
    }

    let result = query.execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "PreferenceRecord",
            id: selector.value().to_string(),
        });
    }

    Ok(result.rows_affected())
}

/// Delete preference rows reachable from an identity, including rows keyed
/// only by an account uuid belonging to it. Only the global purge calls
/// this.
pub(crate) async fn purge_preferences_for_identity(
    pool: &SqlitePool,
    muuid: &str,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM preference_records
        WHERE muuid = ?
           OR uuid IN (SELECT uuid FROM local_accounts
                       WHERE muuid = ? AND uuid IS NOT NULL)
        "#,
    )
    .bind(muuid)
    .bind(muuid)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn sample_upsert(market: Option<&str>) -> PreferenceUpsert {
        PreferenceUpsert {
            muuid: Some("m1".to_string()),
            brand_id: "CM".to_string(),
            region_id: "NA".to_string(),
            market_id: market.map(str::to_string),
            email_opt_in: Some(true),
            first_name: Some("Bob".to_string()),
            demographic_trades: vec!["carpentry".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_on_key() {
        let db = test_db().await;

        let first = upsert_preference(db.pool(), &sample_upsert(Some("US"))).await.unwrap();
        let second = upsert_preference(db.pool(), &sample_upsert(Some("US"))).await.unwrap();
        assert_eq!(first.id, second.id);

        let selector = IdentitySelector::Muuid("m1".to_string());
        let all = query_preferences(db.pool(), &selector, None, None, None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_markets_produce_separate_rows() {
        let db = test_db().await;

        upsert_preference(db.pool(), &sample_upsert(Some("US"))).await.unwrap();
        upsert_preference(db.pool(), &sample_upsert(Some("CA"))).await.unwrap();
        upsert_preference(db.pool(), &sample_upsert(None)).await.unwrap();

        let selector = IdentitySelector::Muuid("m1".to_string());
        let all = query_preferences(db.pool(), &selector, Some("CM"), Some("NA"), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let us_only = query_preferences(db.pool(), &selector, Some("CM"), Some("NA"), Some("US"))
            .await
            .unwrap();
        assert_eq!(us_only.len(), 1);
    }

    #[tokio::test]
    async fn test_update_overwrites_mutable_fields() {
        let db = test_db().await;

        upsert_preference(db.pool(), &sample_upsert(Some("US"))).await.unwrap();
        let mut changed = sample_upsert(Some("US"));
        changed.email_opt_in = Some(false);
        changed.first_name = Some("Robert".to_string());
        let updated = upsert_preference(db.pool(), &changed).await.unwrap();

        assert_eq!(updated.email_opt_in, Some(false));
        assert_eq!(updated.first_name.as_deref(), Some("Robert"));
        assert_eq!(updated.demographic_trades_list(), vec!["carpentry"]);
    }

    #[tokio::test]
    async fn test_uuid_fallback_selector() {
        let db = test_db().await;

        let mut upsert = sample_upsert(Some("US"));
        upsert.muuid = None;
        upsert.uuid = Some("acct-9".to_string());
        upsert_preference(db.pool(), &upsert).await.unwrap();

        let selector = IdentitySelector::AccountUuid("acct-9".to_string());
        let rows = query_preferences(db.pool(), &selector, None, None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_purge_scoped_and_empty() {
        let db = test_db().await;

        upsert_preference(db.pool(), &sample_upsert(Some("US"))).await.unwrap();
        upsert_preference(db.pool(), &sample_upsert(Some("CA"))).await.unwrap();

        let selector = IdentitySelector::Muuid("m1".to_string());
        let removed = purge_preferences(db.pool(), &selector, Some("US")).await.unwrap();
        assert_eq!(removed, 1);

        // Zero-row delete is NotFound, not success.
        let err = purge_preferences(db.pool(), &selector, Some("US")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));

        let remaining = query_preferences(db.pool(), &selector, None, None, None).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
