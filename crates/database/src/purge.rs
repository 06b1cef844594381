//! Global purge: the only path that deletes local accounts or email
//! history.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DatabaseError, Result};
use crate::{identity, local_account, preference};

/// Rows removed per table by a global purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeSummary {
    /// Preference records removed.
    pub preferences: u64,
    /// Local accounts removed.
    pub local_accounts: u64,
    /// Email records removed.
    pub email_records: u64,
}

/// Remove everything stored for a global identity: preference records
/// (including rows keyed only by one of its account uuids), local accounts,
/// and the email history. Purging an unknown identity is `NotFound`.
pub async fn purge_identity(pool: &SqlitePool, muuid: &str) -> Result<PurgeSummary> {
    // Preferences first, while the local_accounts rows still exist to
    // resolve uuid-keyed preference rows.
    let preferences = preference::purge_preferences_for_identity(pool, muuid).await?;
    let local_accounts = local_account::purge_local_accounts(pool, muuid).await?;
    let email_records = identity::purge_email_records(pool, muuid).await?;

    let summary = PurgeSummary {
        preferences,
        local_accounts,
        email_records,
    };

    if preferences + local_accounts + email_records == 0 {
        return Err(DatabaseError::NotFound {
            entity: "GlobalIdentity",
            id: muuid.to_string(),
        });
    }

    info!(
        muuid = %muuid,
        preferences = summary.preferences,
        local_accounts = summary.local_accounts,
        email_records = summary.email_records,
        "Purged global identity"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocalAccountUpsert, PreferenceUpsert};
    use crate::{identity, local_account, preference, Database};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_purge_removes_all_traces() {
        let db = test_db().await;

        let muuid = identity::get_or_create_identity(db.pool(), "gone@example.com")
            .await
            .unwrap();
        local_account::upsert_local_account(
            db.pool(),
            &LocalAccountUpsert {
                muuid: Some(muuid.clone()),
                brand_id: "CM".to_string(),
                region_id: "NA".to_string(),
                uuid: Some("acct-7".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        // A preference row keyed only by the account uuid must go too.
        preference::upsert_preference(
            db.pool(),
            &PreferenceUpsert {
                uuid: Some("acct-7".to_string()),
                brand_id: "CM".to_string(),
                region_id: "NA".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let summary = purge_identity(db.pool(), &muuid).await.unwrap();
        assert_eq!(summary.preferences, 1);
        assert_eq!(summary.local_accounts, 1);
        assert_eq!(summary.email_records, 1);

        assert!(identity::latest_email(db.pool(), &muuid).await.unwrap().is_none());
        assert!(local_account::list_local_accounts(db.pool(), &muuid)
            .await
            .unwrap()
            .is_empty());

        // A second purge finds nothing.
        let err = purge_identity(db.pool(), &muuid).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
