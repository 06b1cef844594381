//! SQLite persistence layer for Meridian.
//!
//! This crate provides async database operations for the identity graph,
//! tenant-scoped local accounts, preference records, and tenant
//! configuration rows, using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{identity, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:meridian.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Resolve (or mint) the global identity for an email
//!     let muuid = identity::get_or_create_identity(db.pool(), "bob@example.com").await?;
//!     println!("global identity: {muuid}");
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod identity;
pub mod local_account;
pub mod models;
pub mod preference;
pub mod purge;
pub mod tenant_config;

pub use error::{DatabaseError, Result};
pub use models::{
    AccountIdentity, EmailRecord, IdentitySelector, LocalAccount, LocalAccountUpsert,
    PreferenceRecord, PreferenceUpsert, Setting, TenantConfigRow, TenantConfigUpsert,
};
pub use purge::PurgeSummary;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Set high enough to handle concurrent request handling with
    /// background sync reads.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/meridian.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_identity_to_account_round_trip() {
        let db = test_db().await;

        let muuid = identity::get_or_create_identity(db.pool(), "bob@example.com")
            .await
            .unwrap();
        local_account::upsert_local_account(
            db.pool(),
            &LocalAccountUpsert {
                muuid: Some(muuid.clone()),
                brand_id: "CM".to_string(),
                region_id: "NA".to_string(),
                uuid: Some("acct-1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let resolved = identity::lookup_by_account_uuid(db.pool(), "acct-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.muuid, muuid);
        assert_eq!(resolved.email, "bob@example.com");
        assert_eq!(resolved.brand_id, "CM");
        assert_eq!(resolved.region_id, "NA");

        // After an email change the lookup reflects the newest record.
        identity::change_email(db.pool(), &muuid, "bob@new.example.com")
            .await
            .unwrap();
        let resolved = identity::lookup_by_account_uuid(db.pool(), "acct-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.email, "bob@new.example.com");
    }
}
