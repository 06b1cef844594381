//! Tenant configuration storage.
//!
//! One row per composite key; setting values are stored encrypted. The
//! config cache reads these rows in bulk and keeps its own decrypted
//! projection.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::models::{TenantConfigRow, TenantConfigUpsert};

const SELECT_COLUMNS: &str =
    "id, app_id, brand_id, region_id, market_id, locale, group_id, settings, updated_at";

/// Read every config row for one consumer application.
pub async fn list_for_app(pool: &SqlitePool, app_id: &str) -> Result<Vec<TenantConfigRow>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM tenant_configs WHERE app_id = ?");

    let rows = sqlx::query_as::<_, TenantConfigRow>(&sql)
        .bind(app_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Create or replace the config row for a composite key.
///
/// The settings list is replaced wholesale; there is no per-setting merge.
pub async fn upsert_config(pool: &SqlitePool, upsert: &TenantConfigUpsert) -> Result<()> {
    let settings = serde_json::to_string(&upsert.settings).unwrap_or_else(|_| "[]".to_string());

    let updated = sqlx::query(
        r#"
        UPDATE tenant_configs
        SET settings = ?, updated_at = datetime('now')
        WHERE app_id = ? AND brand_id = ? AND region_id = ?
          AND market_id IS ? AND locale IS ? AND group_id IS ?
        "#,
    )
    .bind(&settings)
    .bind(&upsert.app_id)
    .bind(&upsert.brand_id)
    .bind(&upsert.region_id)
    .bind(&upsert.market_id)
    .bind(&upsert.locale)
    .bind(&upsert.group_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO tenant_configs
                (app_id, brand_id, region_id, market_id, locale, group_id, settings)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&upsert.app_id)
        .bind(&upsert.brand_id)
        .bind(&upsert.region_id)
        .bind(&upsert.market_id)
        .bind(&upsert.locale)
        .bind(&upsert.group_id)
        .bind(&settings)
        .execute(pool)
        .await?;

        debug!(
            app = %upsert.app_id,
            brand = %upsert.brand_id,
            region = %upsert.region_id,
            "Created tenant config"
        );
    }

    Ok(())
}
