//! Segment and segment text administration

use sqlx::SqlitePool;
use stacks_common::db::{Segment, SegmentText};
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::Result;

pub async fn get_paginated(
    pool: &SqlitePool,
    filter: &BaseFilter,
) -> Result<CollectionWithCount<Segment>> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM segments")
        .fetch_one(pool)
        .await?;

    let data = sqlx::query_as::<_, Segment>(
        "SELECT * FROM segments ORDER BY name, id LIMIT ? OFFSET ?",
    )
    .bind(filter.take)
    .bind(filter.skip())
    .fetch_all(pool)
    .await?;

    Ok(CollectionWithCount { count, data })
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Segment>> {
    let segment = sqlx::query_as::<_, Segment>("SELECT * FROM segments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(segment)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Segment>> {
    let segment = sqlx::query_as::<_, Segment>(
        "SELECT * FROM segments WHERE name = ? COLLATE NOCASE ORDER BY id LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(segment)
}

/// Another segment already has this name
pub async fn is_duplicate_name(pool: &SqlitePool, segment: &Segment) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM segments WHERE name = ? COLLATE NOCASE AND id != ?",
    )
    .bind(segment.name.trim())
    .bind(segment.id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn add(pool: &SqlitePool, segment: &Segment) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO segments (name, is_active, start_date, end_date, segment_wrap_id, created_at, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&segment.name)
    .bind(segment.is_active)
    .bind(segment.start_date)
    .bind(segment.end_date)
    .bind(segment.segment_wrap_id)
    .bind(segment.created_at)
    .bind(segment.created_by)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, segment: &Segment) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE segments
        SET name = ?, is_active = ?, start_date = ?, end_date = ?, segment_wrap_id = ?,
            updated_at = ?, updated_by = ?
        WHERE id = ?
        "#,
    )
    .bind(&segment.name)
    .bind(segment.is_active)
    .bind(segment.start_date)
    .bind(segment.end_date)
    .bind(segment.segment_wrap_id)
    .bind(segment.updated_at)
    .bind(segment.updated_by)
    .bind(segment.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove a segment; its texts go with it
pub async fn remove(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM segments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Segment texts
// ============================================================================

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

pub async fn add_text(pool: &SqlitePool, text: &SegmentText) -> Result<()> {
    sqlx::query(
        "INSERT INTO segment_texts (segment_id, language_id, header, text) VALUES (?, ?, ?, ?)",
    )
    .bind(text.segment_id)
    .bind(text.language_id)
    .bind(&text.header)
    .bind(&text.text)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_text(pool: &SqlitePool, text: &SegmentText) -> Result<()> {
    sqlx::query(
        "UPDATE segment_texts SET header = ?, text = ? WHERE segment_id = ? AND language_id = ?",
    )
    .bind(&text.header)
    .bind(&text.text)
    .bind(text.segment_id)
    .bind(text.language_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove_text(pool: &SqlitePool, segment_id: i64, language_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM segment_texts WHERE segment_id = ? AND language_id = ?")
        .bind(segment_id)
        .bind(language_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Culture names (`en-US`) of the languages that have text for the segment,
/// default language first
pub async fn get_languages_with_text(pool: &SqlitePool, segment_id: i64) -> Result<Vec<String>> {
    let languages = sqlx::query_scalar(
        r#"
        SELECT l.name FROM segment_texts st
        JOIN languages l ON l.id = st.language_id
        WHERE st.segment_id = ?
        ORDER BY l.is_default DESC, l.name
        "#,
    )
    .bind(segment_id)
    .fetch_all(pool)
    .await?;
    Ok(languages)
}

// ============================================================================
// Usage by page layouts
// ============================================================================

/// Page layout that places the segment, if any
pub async fn get_page_layout_id(pool: &SqlitePool, segment_id: i64) -> Result<Option<i64>> {
    let id = sqlx::query_scalar(
        "SELECT page_layout_id FROM page_items WHERE segment_id = ? ORDER BY id LIMIT 1",
    )
    .bind(segment_id)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

/// Page header owning the layout that places the segment, if any
pub async fn get_page_header_id(pool: &SqlitePool, segment_id: i64) -> Result<Option<i64>> {
    let id = sqlx::query_scalar(
        r#"
        SELECT pl.page_header_id FROM page_items pi
        JOIN page_layouts pl ON pl.id = pi.page_layout_id
        WHERE pi.segment_id = ?
        ORDER BY pi.id
        LIMIT 1
        "#,
    )
    .bind(segment_id)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}
