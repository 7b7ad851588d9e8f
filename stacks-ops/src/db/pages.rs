//! Intranet pages within a section

use sqlx::SqlitePool;
use stacks_common::db::IntranetPage;
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::Result;

/// Live pages in a section, most recently created first
pub async fn get_paginated_by_section(
    pool: &SqlitePool,
    section_id: i64,
    filter: &BaseFilter,
) -> Result<CollectionWithCount<IntranetPage>> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM intranet_pages WHERE section_id = ? AND is_deleted = 0",
    )
    .bind(section_id)
    .fetch_one(pool)
    .await?;

    let data = sqlx::query_as::<_, IntranetPage>(
        r#"
        SELECT * FROM intranet_pages
        WHERE section_id = ? AND is_deleted = 0
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(section_id)
    .bind(filter.take)
    .bind(filter.skip())
    .fetch_all(pool)
    .await?;

    Ok(CollectionWithCount { count, data })
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<IntranetPage>> {
    let page = sqlx::query_as::<_, IntranetPage>(
        "SELECT * FROM intranet_pages WHERE id = ? AND is_deleted = 0",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(page)
}

/// Another published page in the same section already uses the stub
pub async fn stub_in_use(pool: &SqlitePool, page: &IntranetPage) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM intranet_pages
        WHERE stub = ? COLLATE NOCASE AND section_id = ? AND id != ?
        AND is_draft = 0 AND is_deleted = 0
        "#,
    )
    .bind(&page.stub)
    .bind(page.section_id)
    .bind(page.id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn add(pool: &SqlitePool, page: &IntranetPage) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO intranet_pages (section_id, title, stub, content, is_draft, created_at, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(page.section_id)
    .bind(&page.title)
    .bind(&page.stub)
    .bind(&page.content)
    .bind(page.is_draft)
    .bind(page.created_at)
    .bind(page.created_by)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, page: &IntranetPage) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE intranet_pages
        SET title = ?, stub = ?, content = ?, is_draft = ?, updated_at = ?, updated_by = ?
        WHERE id = ?
        "#,
    )
    .bind(&page.title)
    .bind(&page.stub)
    .bind(&page.content)
    .bind(page.is_draft)
    .bind(page.updated_at)
    .bind(page.updated_by)
    .bind(page.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Soft delete
pub async fn remove(pool: &SqlitePool, page: &IntranetPage) -> Result<()> {
    sqlx::query("UPDATE intranet_pages SET is_deleted = 1, updated_at = ?, updated_by = ? WHERE id = ?")
        .bind(page.updated_at)
        .bind(page.updated_by)
        .bind(page.id)
        .execute(pool)
        .await?;
    Ok(())
}
