//! Server-side sessions
//!
//! The browser holds a random token; the database holds its SHA-256 hash,
//! the user id and the serialized claims.

use chrono::{Duration, NaiveDateTime};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use stacks_common::Result;
use tracing::warn;
use uuid::Uuid;

use super::claims::Claims;

pub const SESSION_COOKIE: &str = "stacks_ops_session";

/// Signed-in sessions last a working day
pub const SESSION_LIFETIME_HOURS: i64 = 12;

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Persist a session and return the token for the cookie
pub async fn create(
    pool: &SqlitePool,
    user_id: i64,
    claims: &Claims,
    now: NaiveDateTime,
) -> Result<String> {
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

    sqlx::query(
        "INSERT INTO sessions (id_hash, user_id, claims, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(hash_token(&token))
    .bind(user_id)
    .bind(serde_json::to_string(claims)?)
    .bind(now)
    .bind(now + Duration::hours(SESSION_LIFETIME_HOURS))
    .execute(pool)
    .await?;

    Ok(token)
}

/// Claims for an unexpired session token
pub async fn find(pool: &SqlitePool, token: &str, now: NaiveDateTime) -> Result<Option<Claims>> {
    let raw: Option<String> =
        sqlx::query_scalar("SELECT claims FROM sessions WHERE id_hash = ? AND expires_at > ?")
            .bind(hash_token(token))
            .bind(now)
            .fetch_optional(pool)
            .await?;

    let Some(raw) = raw else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(claims) => Ok(Some(claims)),
        Err(e) => {
            warn!("Discarding unreadable session: {}", e);
            remove(pool, token).await?;
            Ok(None)
        }
    }
}

/// Sign out
pub async fn remove(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id_hash = ?")
        .bind(hash_token(token))
        .execute(pool)
        .await?;
    Ok(())
}

/// End every session belonging to a user
pub async fn remove_for_user(pool: &SqlitePool, user_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn purge_expired(pool: &SqlitePool, now: NaiveDateTime) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
