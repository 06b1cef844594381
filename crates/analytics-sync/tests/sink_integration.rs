//! Integration tests for analytics-sync against live sinks
//!
//! Run with: cargo test -p analytics-sync --test sink_integration -- --ignored --nocapture
//!
//! Required environment variables:
//! - ANALYTICS_BASE_URI: Base URI of the analytics store
//! - ANALYTICS_WRITE_KEY: Per-tenant write key
//! - TOKEN_URL: Client-credentials token endpoint
//! - TOKEN_CLIENT_ID / TOKEN_CLIENT_SECRET: Grant credentials
//!
//! Optional:
//! - ANALYTICS_DB_NAME: Target database (default: profiles)
//! - ANALYTICS_TABLE_NAME: Target table (default: registrations)
//! - MARKETING_API_URL / MARKETING_API_KEY: Marketing platform sink

use std::env;
use std::sync::Arc;

use analytics_sync::{AnalyticsSync, RecordFields, SyncKind, TokenConfig};
use database::{tenant_config as db_tenant_config, Database, Setting, TenantConfigUpsert};
use serde_json::Value;
use tenant_config::{
    ConfigCache, SettingsCipher, ANALYTICS_STORE_APP, MARKETING_PLATFORM_APP,
};

fn should_skip() -> bool {
    env::var("ANALYTICS_BASE_URI").is_err() || env::var("TOKEN_URL").is_err()
}

fn test_record() -> RecordFields {
    let mut fields = RecordFields::new();
    fields.insert("brandId".to_string(), Value::String("CM".to_string()));
    fields.insert("regionId".to_string(), Value::String("EU".to_string()));
    fields.insert(
        "email".to_string(),
        Value::String("integration-test@example.com".to_string()),
    );
    fields.insert("firstName".to_string(), Value::String("Test".to_string()));
    fields
}

/// Seed an in-memory config store from the environment and return a sync
/// client over it.
async fn live_sync() -> AnalyticsSync {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    let cipher = SettingsCipher::new(&[11u8; 32]).unwrap();

    let encrypted = |name: &str, plaintext: &str| Setting {
        name: name.to_string(),
        value: cipher.encrypt(plaintext).unwrap(),
    };

    db_tenant_config::upsert_config(
        db.pool(),
        &TenantConfigUpsert {
            app_id: ANALYTICS_STORE_APP.to_string(),
            brand_id: "CM".to_string(),
            region_id: "EU".to_string(),
            group_id: Some(SyncKind::Registration.config_group().to_string()),
            settings: vec![
                encrypted("baseUri", &env::var("ANALYTICS_BASE_URI").unwrap()),
                encrypted("writeKey", &env::var("ANALYTICS_WRITE_KEY").unwrap()),
                encrypted(
                    "dbName",
                    &env::var("ANALYTICS_DB_NAME").unwrap_or_else(|_| "profiles".to_string()),
                ),
                encrypted(
                    "tableName",
                    &env::var("ANALYTICS_TABLE_NAME")
                        .unwrap_or_else(|_| "registrations".to_string()),
                ),
            ],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    if let (Ok(api_url), Ok(api_key)) =
        (env::var("MARKETING_API_URL"), env::var("MARKETING_API_KEY"))
    {
        db_tenant_config::upsert_config(
            db.pool(),
            &TenantConfigUpsert {
                app_id: MARKETING_PLATFORM_APP.to_string(),
                brand_id: "CM".to_string(),
                region_id: "EU".to_string(),
                settings: vec![
                    encrypted("apiUrl", &api_url),
                    encrypted("apiKey", &api_key),
                ],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let cache = Arc::new(ConfigCache::new(db, cipher));
    cache.refresh(ANALYTICS_STORE_APP).await.unwrap();
    cache.refresh(MARKETING_PLATFORM_APP).await.unwrap();

    AnalyticsSync::new(
        cache,
        TokenConfig {
            token_url: env::var("TOKEN_URL").unwrap(),
            client_id: env::var("TOKEN_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("TOKEN_CLIENT_SECRET").unwrap_or_default(),
        },
    )
}

#[tokio::test]
#[ignore = "requires live analytics store credentials"]
async fn test_push_to_live_analytics_store() {
    if should_skip() {
        println!("Skipping test: ANALYTICS_BASE_URI or TOKEN_URL not set");
        return;
    }

    let sync = live_sync().await;
    let outcome = sync
        .push_to_analytics_store(&test_record(), SyncKind::Registration)
        .await;

    println!("analytics push outcome: {outcome:?}");
    assert!(outcome.is_delivered(), "push did not reach the sink");
}

#[tokio::test]
#[ignore = "requires live marketing platform credentials"]
async fn test_push_to_live_marketing_platform() {
    if should_skip() || env::var("MARKETING_API_URL").is_err() {
        println!("Skipping test: marketing platform env not set");
        return;
    }

    let sync = live_sync().await;
    let outcome = sync.push_to_marketing_platform(&test_record()).await;

    println!("marketing push outcome: {outcome:?}");
    assert!(outcome.is_delivered(), "push did not reach the sink");
}
