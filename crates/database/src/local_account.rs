//! Local account storage: identity-provider accounts per tenant.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DatabaseError, Result};
use crate::identity::is_unique_violation;
use crate::models::{encode_string_list, IdentitySelector, LocalAccount, LocalAccountUpsert};

const SELECT_COLUMNS: &str = "id, muuid, brand_id, region_id, uuid, tool_usage, company, \
     source, account_type, shop, retailers, created_at, updated_at";

impl LocalAccountUpsert {
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

/// Get a tenant's local account for an identity.
pub async fn get_local_account(
    pool: &SqlitePool,
    selector: &IdentitySelector,
    brand_id: &str,
    region_id: &str,
) -> Result<Option<LocalAccount>> {
    let key_column = match selector {
        IdentitySelector::Muuid(_) => "muuid",
        IdentitySelector::AccountUuid(_) => "uuid",
    };
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM local_accounts \
         WHERE {key_column} = ? AND brand_id = ? AND region_id = ?"
    );

    let account = sqlx::query_as::<_, LocalAccount>(&sql)
        .bind(selector.value())
        .bind(brand_id)
        .bind(region_id)
        .fetch_optional(pool)
        .await?;

    Ok(account)
}

/// Create or update the local account for one (identity, brand, region).
///
/// Identity fields (`muuid`, `brand_id`, `region_id`) are set on insert and
/// never changed afterwards; the mutable field set is overwritten on every
/// call and `updated_at` restamped. Returns the resulting row. Any store
/// failure here is fatal to the calling operation.
pub async fn upsert_local_account(
    pool: &SqlitePool,
    upsert: &LocalAccountUpsert,
) -> Result<LocalAccount> {
    let selector = upsert.selector()?;

    let updated = update_existing(pool, upsert, &selector).await?;
    if updated == 0 {
        let inserted = sqlx::query(
            r#"
            INSERT INTO local_accounts
                (muuid, brand_id, region_id, uuid, tool_usage, company,
                 source, account_type, shop, retailers)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&upsert.muuid)
        .bind(&upsert.brand_id)
        .bind(&upsert.region_id)
        .bind(&upsert.uuid)
        .bind(encode_string_list(&upsert.tool_usage))
        .bind(&upsert.company)
        .bind(&upsert.source)
        .bind(&upsert.account_type)
        .bind(encode_string_list(&upsert.shop))
        .bind(encode_string_list(&upsert.retailers))
        .execute(pool)
        .await;

        match inserted {
            Ok(_) => {
                debug!(
                    brand = %upsert.brand_id,
                    region = %upsert.region_id,
                    "Created local account"
                );
            }
            Err(e) if is_unique_violation(&e) => {
                // Concurrent first write for the same tenant binding; take
                // the update path against the winner's row.
                update_existing(pool, upsert, &selector).await?;
            }
            Err(e) => return Err(DatabaseError::Sqlx(e)),
        }
    }

    get_local_account(pool, &selector, &upsert.brand_id, &upsert.region_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "LocalAccount",
            id: selector.value().to_string(),
        })
}

async fn update_existing(
    pool: &SqlitePool,
    upsert: &LocalAccountUpsert,
    selector: &IdentitySelector,
) -> Result<u64> {
    let key_column = match selector {
        IdentitySelector::Muuid(_) => "muuid",
        IdentitySelector::AccountUuid(_) => "uuid",
    };
    let sql = format!(
        "UPDATE local_accounts SET \
             uuid = ?, tool_usage = ?, company = ?, source = ?, \
             account_type = ?, shop = ?, retailers = ?, \
             updated_at = datetime('now') \
         WHERE {key_column} = ? AND brand_id = ? AND region_id = ?"
    );

    let result = sqlx::query(&sql)
        .bind(&upsert.uuid)
        .bind(encode_string_list(&upsert.tool_usage))
        .bind(&upsert.company)
        .bind(&upsert.source)
        .bind(&upsert.account_type)
        .bind(encode_string_list(&upsert.shop))
        .bind(encode_string_list(&upsert.retailers))
        .bind(selector.value())
        .bind(&upsert.brand_id)
        .bind(&upsert.region_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// List every local account for an identity across tenants.
pub async fn list_local_accounts(pool: &SqlitePool, muuid: &str) -> Result<Vec<LocalAccount>> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM local_accounts \
         WHERE muuid = ? ORDER BY brand_id, region_id"
    );

    let accounts = sqlx::query_as::<_, LocalAccount>(&sql)
        .bind(muuid)
        .fetch_all(pool)
        .await?;

    Ok(accounts)
}

/// Delete all of an identity's local accounts. Only the global purge calls
/// this.
pub(crate) async fn purge_local_accounts(pool: &SqlitePool, muuid: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM local_accounts
        WHERE muuid = ?
        "#,
    )
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

    fn sample_upsert() -> LocalAccountUpsert {
        LocalAccountUpsert {
            muuid: Some("m1".to_string()),
            brand_id: "CM".to_string(),
            region_id: "NA".to_string(),
            uuid: Some("acct-1".to_string()),
            tool_usage: vec!["drill".to_string()],
            company: Some("Acme Renovations".to_string()),
            source: Some("web".to_string()),
            account_type: Some("professional".to_string()),
            shop: vec!["hardware".to_string()],
            retailers: vec!["depot".to_string()],
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let db = test_db().await;

        let created = upsert_local_account(db.pool(), &sample_upsert()).await.unwrap();
        assert_eq!(created.tool_usage_list(), vec!["drill"]);

        let mut second = sample_upsert();
        second.tool_usage = vec!["drill".to_string(), "saw".to_string()];
        let updated = upsert_local_account(db.pool(), &second).await.unwrap();

        // One row, second call's mutable fields, frozen identity fields.
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.tool_usage_list(), vec!["drill", "saw"]);
        assert_eq!(updated.muuid.as_deref(), Some("m1"));
        assert_eq!(updated.brand_id, "CM");
        assert_eq!(updated.region_id, "NA");

        let accounts = list_local_accounts(db.pool(), "m1").await.unwrap();
        assert_eq!(accounts.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_falls_back_to_account_uuid() {
        let db = test_db().await;

        let mut upsert = sample_upsert();
        upsert.muuid = None;
        let created = upsert_local_account(db.pool(), &upsert).await.unwrap();
        assert!(created.muuid.is_none());

        let found = get_local_account(
            db.pool(),
            &IdentitySelector::AccountUuid("acct-1".to_string()),
            "CM",
            "NA",
        )
        .await
        .unwrap();
        assert_eq!(found.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_upsert_without_selector_fails() {
        let db = test_db().await;

        let mut upsert = sample_upsert();
        upsert.muuid = None;
        upsert.uuid = None;
        let err = upsert_local_account(db.pool(), &upsert).await.unwrap_err();
        assert!(matches!(err, DatabaseError::MissingSelector));
    }

    #[tokio::test]
    async fn test_tenants_are_independent() {
        let db = test_db().await;

        upsert_local_account(db.pool(), &sample_upsert()).await.unwrap();
        let mut eu = sample_upsert();
        eu.region_id = "EU".to_string();
        eu.uuid = Some("acct-2".to_string());
        upsert_local_account(db.pool(), &eu).await.unwrap();

        let accounts = list_local_accounts(db.pool(), "m1").await.unwrap();
        assert_eq!(accounts.len(), 2);
    }
}
