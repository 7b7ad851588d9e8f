//! Section blog posts

use sqlx::SqlitePool;
use stacks_common::db::Post;
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::Result;

/// Published posts in a section, newest first
pub async fn get_paginated_by_section(
    pool: &SqlitePool,
    section_id: i64,
    filter: &BaseFilter,
) -> Result<CollectionWithCount<Post>> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM posts WHERE section_id = ? AND is_draft = 0",
    )
    .bind(section_id)
    .fetch_one(pool)
    .await?;

    let data = sqlx::query_as::<_, Post>(
        r#"
        SELECT * FROM posts
        WHERE section_id = ? AND is_draft = 0
        ORDER BY COALESCE(published_at, created_at) DESC, id DESC
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
