//! Promenade page headers and their per-language pages

use sqlx::SqlitePool;
use stacks_common::db::{Page, PageHeader};
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::Result;

pub async fn get_paginated_headers(
    pool: &SqlitePool,
    filter: &BaseFilter,
) -> Result<CollectionWithCount<PageHeader>> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM page_headers")
        .fetch_one(pool)
        .await?;

    let data = sqlx::query_as::<_, PageHeader>(
        "SELECT * FROM page_headers ORDER BY page_name, id LIMIT ? OFFSET ?",
    )
    .bind(filter.take)
    .bind(filter.skip())
    .fetch_all(pool)
    .await?;

    Ok(CollectionWithCount { count, data })
}

pub async fn find_header(pool: &SqlitePool, id: i64) -> Result<Option<PageHeader>> {
    let header = sqlx::query_as::<_, PageHeader>("SELECT * FROM page_headers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(header)
}

/// Culture names with a page for the header
pub async fn get_header_languages(pool: &SqlitePool, header_id: i64) -> Result<Vec<String>> {
    let languages = sqlx::query_scalar(
        r#"
        SELECT l.name FROM pages p
        JOIN languages l ON l.id = p.language_id
        WHERE p.page_header_id = ?
        ORDER BY l.is_default DESC, l.name
        "#,
    )
    .bind(header_id)
    .fetch_all(pool)
    .await?;
    Ok(languages)
}

pub async fn add_header(pool: &SqlitePool, header: &PageHeader) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO page_headers (page_name, stub, page_type, is_layout, created_at, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&header.page_name)
    .bind(&header.stub)
    .bind(header.page_type)
    .bind(header.is_layout)
    .bind(header.created_at)
    .bind(header.created_by)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update_header(pool: &SqlitePool, header: &PageHeader) -> Result<()> {
    sqlx::query(
        "UPDATE page_headers SET page_name = ?, updated_at = ?, updated_by = ? WHERE id = ?",
    )
    .bind(&header.page_name)
    .bind(header.updated_at)
    .bind(header.updated_by)
    .bind(header.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove a header together with its pages and layouts
pub async fn remove_header(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM page_headers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Another header of the same type already uses the stub
pub async fn stub_in_use(pool: &SqlitePool, header: &PageHeader) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM page_headers WHERE stub = ? COLLATE NOCASE AND page_type = ? AND id != ?",
    )
    .bind(header.stub.trim())
    .bind(header.page_type)
    .bind(header.id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

// ============================================================================
// Pages
// ============================================================================

pub async fn get_page(pool: &SqlitePool, header_id: i64, language_id: i64) -> Result<Option<Page>> {
    let page = sqlx::query_as::<_, Page>(
        "SELECT * FROM pages WHERE page_header_id = ? AND language_id = ?",
    )
    .bind(header_id)
    .bind(language_id)
    .fetch_optional(pool)
    .await?;
    Ok(page)
}

pub async fn add_page(pool: &SqlitePool, page: &Page) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pages (page_header_id, language_id, title, content, is_published)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(page.page_header_id)
    .bind(page.language_id)
    .bind(&page.title)
    .bind(&page.content)
    .bind(page.is_published)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_page(pool: &SqlitePool, page: &Page) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE pages SET title = ?, content = ?, is_published = ?
        WHERE page_header_id = ? AND language_id = ?
        "#,
    )
    .bind(&page.title)
    .bind(&page.content)
    .bind(page.is_published)
    .bind(page.page_header_id)
    .bind(page.language_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove_page(pool: &SqlitePool, header_id: i64, language_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM pages WHERE page_header_id = ? AND language_id = ?")
        .bind(header_id)
        .bind(language_id)
        .execute(pool)
        .await?;
    Ok(())
}
