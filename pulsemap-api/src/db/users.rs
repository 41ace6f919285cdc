//! User account database operations

use pulsemap_common::credentials::{generate_salt, hash_password};
use pulsemap_common::db::models::User;
use pulsemap_common::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Look up a user by username
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT guid, username, password_hash, password_salt FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| User {
        guid: row.get("guid"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        password_salt: row.get("password_salt"),
    }))
}

/// Create a user, or rotate credentials if the username already exists
///
/// Used by the seeder to bootstrap the default account.
pub async fn upsert_user(pool: &SqlitePool, username: &str, password: &str) -> Result<User> {
    let salt = generate_salt();
    let hash = hash_password(password, &salt);
    let guid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO users (guid, username, password_hash, password_salt)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(username) DO UPDATE SET
            password_hash = excluded.password_hash,
            password_salt = excluded.password_salt,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&guid)
    .bind(username)
    .bind(&hash)
    .bind(&salt)
    .execute(pool)
    .await?;

    // Re-read: on conflict the original guid is kept
    let user = find_by_username(pool, username).await?;
    user.ok_or_else(|| {
        pulsemap_common::Error::Internal(format!("User '{}' missing after upsert", username))
    })
}
