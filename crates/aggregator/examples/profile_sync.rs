//! End-to-end walk through the preference write path.
//!
//! Run with:
//! ```sh
//! DATABASE_URL="sqlite:meridian.db?mode=rwc" \
//! SETTINGS_KEY_B64="<base64 of a 32-byte key>" \
//! TOKEN_URL="https://auth.example.com/oauth/token" \
//! TOKEN_CLIENT_ID=svc TOKEN_CLIENT_SECRET=secret \
//! cargo run -p aggregator --example profile_sync
//! ```

use std::env;
use std::sync::Arc;

use aggregator::{
    AnalyticsSync, HttpIdentityClient, LocalAccountUpsert, PreferenceAggregator,
    PreferenceService, PreferenceUpsert, PreferenceWrite, SyncKind, TokenConfig,
};
use database::Database;
use tenant_config::{ConfigCache, SettingsCipher, ANALYTICS_STORE_APP, IDENTITY_PROVIDER_APP};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:meridian.db?mode=rwc".to_string());
    let db = Database::connect(&database_url).await?;
    db.migrate().await?;

    let cipher = SettingsCipher::from_base64_key(&env::var("SETTINGS_KEY_B64")?)?;
    let cache = Arc::new(ConfigCache::new(db.clone(), cipher));
    cache.refresh(IDENTITY_PROVIDER_APP).await?;
    cache.refresh(ANALYTICS_STORE_APP).await?;

    let sync = Arc::new(AnalyticsSync::new(
        cache.clone(),
        TokenConfig {
            token_url: env::var("TOKEN_URL")?,
            client_id: env::var("TOKEN_CLIENT_ID")?,
            client_secret: env::var("TOKEN_CLIENT_SECRET")?,
        },
    ));
    let profiles = Arc::new(HttpIdentityClient::new(cache));
    let service = PreferenceService::new(PreferenceAggregator::new(db, profiles, sync));

    // Resolve the global identity and record a newsletter opt-in for the
    // CM/NA tenant.
    let muuid = service.get_or_create_identity("bob@example.com").await?;
    let record = service
        .record_preference(PreferenceWrite::new(
            PreferenceUpsert {
                muuid: Some(muuid.clone()),
                brand_id: "CM".to_string(),
                region_id: "NA".to_string(),
                market_id: Some("US".to_string()),
                email_opt_in: Some(true),
                first_name: Some("Bob".to_string()),
                ..Default::default()
            },
            LocalAccountUpsert {
                muuid: Some(muuid.clone()),
                brand_id: "CM".to_string(),
                region_id: "NA".to_string(),
                uuid: Some("acct-demo-1".to_string()),
                tool_usage: vec!["drill".to_string()],
                ..Default::default()
            },
            SyncKind::Newsletter,
        ))
        .await?;

    println!("recorded preference {} for identity {muuid}", record.id);
    Ok(())
}
