//! Identity graph operations: global identities and their email history.
//!
//! A global identity (MUUID) owns an append-only, ordered email history.
//! Each email value belongs to at most one identity, enforced by the unique
//! constraint on `email_records.email` rather than application locking.

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{AccountIdentity, EmailRecord};

/// Find the MUUID that owns an email, if any.
pub async fn find_identity_by_email(pool: &SqlitePool, email: &str) -> Result<Option<String>> {
    let muuid = sqlx::query_scalar::<_, String>(
        r#"
        SELECT muuid
        FROM email_records
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(muuid)
}

/// Get or create the global identity owning an email.
///
/// Idempotent: repeated calls for the same email return the same MUUID.
/// A duplicate-key collision from a concurrent first-writer is resolved by
/// re-reading the winner, never surfaced as an error.
pub async fn get_or_create_identity(pool: &SqlitePool, email: &str) -> Result<String> {
    if let Some(existing) = find_identity_by_email(pool, email).await? {
        return Ok(existing);
    }

    let muuid = Uuid::new_v4().to_string();
    let inserted = sqlx::query(
        r#"
        INSERT INTO email_records (muuid, email, position)
        VALUES (?, ?, 1)
        "#,
    )
    .bind(&muuid)
    .bind(email)
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => {
            debug!(muuid = %muuid, "Created global identity");
            Ok(muuid)
        }
        Err(e) => {
            if is_unique_violation(&e) {
                // Lost the race; the winner owns the email now.
                if let Some(existing) = find_identity_by_email(pool, email).await? {
                    return Ok(existing);
                }
            }
            Err(DatabaseError::Sqlx(e))
        }
    }
}

/// Append a new email to an identity's history.
///
/// No-op when the identity already has this email. The prior records are
/// never touched; the new record gets position `count + 1`. An email owned
/// by a different identity is surfaced as `AlreadyExists`.
pub async fn change_email(pool: &SqlitePool, muuid: &str, new_email: &str) -> Result<()> {
    let already_linked = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM email_records
        WHERE muuid = ? AND email = ?
        "#,
    )
    .bind(muuid)
    .bind(new_email)
    .fetch_one(pool)
    .await?;

    if already_linked > 0 {
        return Ok(());
    }

    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM email_records
        WHERE muuid = ?
        "#,
    )
    .bind(muuid)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO email_records (muuid, email, position)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(muuid)
    .bind(new_email)
    .bind(count + 1)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            return DatabaseError::AlreadyExists {
                entity: "EmailRecord",
                id: new_email.to_string(),
            };
        }
        DatabaseError::Sqlx(e)
    })?;

    debug!(muuid = %muuid, position = count + 1, "Appended email record");
    Ok(())
}

/// Get the current email for an identity (highest history position).
pub async fn latest_email(pool: &SqlitePool, muuid: &str) -> Result<Option<String>> {
    let email = sqlx::query_scalar::<_, String>(
        r#"
        SELECT email
        FROM email_records
        WHERE muuid = ?
        ORDER BY position DESC
        LIMIT 1
        "#,
    )
    .bind(muuid)
    .fetch_optional(pool)
    .await?;

    Ok(email)
}

/// Full email history for an identity, oldest first.
pub async fn email_history(pool: &SqlitePool, muuid: &str) -> Result<Vec<EmailRecord>> {
    let records = sqlx::query_as::<_, EmailRecord>(
        r#"
        SELECT id, muuid, email, position, created_at
        FROM email_records
        WHERE muuid = ?
        ORDER BY position ASC
        "#,
    )
    .bind(muuid)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Resolve a local account uuid to its identity and current email.
///
/// Joins the account's MUUID to the most recent email record. Nothing found
/// is `Ok(None)`; the caller decides whether that is fatal.
pub async fn lookup_by_account_uuid(
    pool: &SqlitePool,
    uuid: &str,
) -> Result<Option<AccountIdentity>> {
    let identity = sqlx::query_as::<_, AccountIdentity>(
        r#"
        SELECT la.muuid AS muuid, er.email AS email,
               la.brand_id AS brand_id, la.region_id AS region_id
        FROM local_accounts la
        JOIN email_records er ON er.muuid = la.muuid
        WHERE la.uuid = ? AND la.muuid IS NOT NULL
        ORDER BY er.position DESC
        LIMIT 1
        "#,
    )
    .bind(uuid)
    .fetch_optional(pool)
    .await?;

    Ok(identity)
}

/// Delete an identity's entire email history. Only the global purge calls
/// this.
pub(crate) async fn purge_email_records(pool: &SqlitePool, muuid: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM email_records
        WHERE muuid = ?
        "#,
    )
    .bind(muuid)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        return db_err.is_unique_violation();
    }
    false
}
