//! Languages and segment wraps

use sqlx::SqlitePool;
use stacks_common::db::{Language, SegmentWrap};
use stacks_common::Result;

/// Active languages, default first
pub async fn get_active(pool: &SqlitePool) -> Result<Vec<Language>> {
    let languages = sqlx::query_as::<_, Language>(
        "SELECT * FROM languages WHERE is_active = 1 ORDER BY is_default DESC, description",
    )
    .fetch_all(pool)
    .await?;
    Ok(languages)
}

pub async fn get_default(pool: &SqlitePool) -> Result<Option<Language>> {
    let language = sqlx::query_as::<_, Language>(
        "SELECT * FROM languages WHERE is_default = 1 ORDER BY id LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(language)
}

pub async fn get_active_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Language>> {
    let language = sqlx::query_as::<_, Language>(
        "SELECT * FROM languages WHERE id = ? AND is_active = 1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(language)
}

pub async fn get_active_wraps(pool: &SqlitePool) -> Result<Vec<SegmentWrap>> {
    let wraps = sqlx::query_as::<_, SegmentWrap>(
        "SELECT * FROM segment_wraps WHERE is_deleted = 0 ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(wraps)
}

pub async fn find_active_wrap(pool: &SqlitePool, id: i64) -> Result<Option<SegmentWrap>> {
    let wrap = sqlx::query_as::<_, SegmentWrap>(
        "SELECT * FROM segment_wraps WHERE id = ? AND is_deleted = 0",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(wrap)
}
