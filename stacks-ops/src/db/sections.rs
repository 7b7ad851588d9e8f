//! Intranet sections

use sqlx::SqlitePool;
use stacks_common::db::Section;
use stacks_common::Result;

pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Section>> {
    let sections = sqlx::query_as::<_, Section>("SELECT * FROM sections ORDER BY sort_order, name")
        .fetch_all(pool)
        .await?;
    Ok(sections)
}

/// Section whose path matches, ignoring case
pub async fn get_by_path(pool: &SqlitePool, path: &str) -> Result<Option<Section>> {
    let section = sqlx::query_as::<_, Section>(
        "SELECT * FROM sections WHERE path = ? COLLATE NOCASE",
    )
    .bind(path)
    .fetch_optional(pool)
    .await?;
    Ok(section)
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Section>> {
    let section = sqlx::query_as::<_, Section>("SELECT * FROM sections WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(section)
}
