//! Read-only segment and language queries for public rendering

use sqlx::SqlitePool;
use stacks_common::db::{Segment, SegmentText, SegmentWrap};
use stacks_common::Result;

/// Segment record whether or not it is active
pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Segment>> {
    let segment = sqlx::query_as::<_, Segment>("SELECT * FROM segments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(segment)
}

pub async fn get_text(
    pool: &SqlitePool,
    segment_id: i64,
    language_id: i64,
) -> Result<Option<SegmentText>> {
    let text = sqlx::query_as::<_, SegmentText>(
        "SELECT * FROM segment_texts WHERE segment_id = ? AND language_id = ?",
    )
    .bind(segment_id)
    .bind(language_id)
    .fetch_optional(pool)
    .await?;
    Ok(text)
}

/// Active language id for a culture name such as `es-US`
pub async fn get_language_id(pool: &SqlitePool, name: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar(
        "SELECT id FROM languages WHERE name = ? COLLATE NOCASE AND is_active = 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

pub async fn get_default_language_id(pool: &SqlitePool) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM languages WHERE is_default = 1 ORDER BY id LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

pub async fn find_wrap(pool: &SqlitePool, id: i64) -> Result<Option<SegmentWrap>> {
    let wrap = sqlx::query_as::<_, SegmentWrap>(
        "SELECT * FROM segment_wraps WHERE id = ? AND is_deleted = 0",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(wrap)
}
