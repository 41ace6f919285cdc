//! Login session database operations
//!
//! Sessions are persisted so logins survive a service restart; timestamps
//! are stored as RFC 3339 strings.

use chrono::{DateTime, Duration, Utc};
use pulsemap_common::credentials::generate_session_token;
use pulsemap_common::db::models::Session;
use pulsemap_common::Result;
use sqlx::{Row, SqlitePool};

/// Create a session for a user, valid for `ttl_seconds`
pub async fn create_session(
    pool: &SqlitePool,
    user_guid: &str,
    ttl_seconds: i64,
) -> Result<Session> {
    let now = Utc::now();
    let session = Session {
        token: generate_session_token(),
        user_guid: user_guid.to_string(),
        created_at: now,
        expires_at: now + Duration::seconds(ttl_seconds),
    };

    sqlx::query(
        "INSERT INTO sessions (token, user_guid, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&session.token)
    .bind(&session.user_guid)
    .bind(session.created_at.to_rfc3339())
    .bind(session.expires_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(session)
}

/// Load a session by token, dropping it when expired
///
/// Returns `None` for unknown tokens and for sessions past their expiry
/// (expired rows are deleted on touch).
pub async fn find_valid_session(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    let row = sqlx::query(
        "SELECT token, user_guid, created_at, expires_at FROM sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let session = Session {
        token: row.get("token"),
        user_guid: row.get("user_guid"),
        created_at: parse_timestamp(row.get("created_at"))?,
        expires_at: parse_timestamp(row.get("expires_at"))?,
    };

    if session.is_expired(Utc::now()) {
        delete_session(pool, &session.token).await?;
        return Ok(None);
    }

    Ok(Some(session))
}

/// Delete a session by token
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

/// Remove all expired sessions
///
/// Any session past its expiry when the service starts will never validate
/// again; sweep them so the table does not grow without bound.
pub async fn purge_expired(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() as usize)
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| pulsemap_common::Error::Internal(format!("Failed to parse timestamp: {}", e)))
}
