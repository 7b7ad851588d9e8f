use sqlx::SqlitePool;
use stacks_common::db::Navigation;
use stacks_common::Result;

/// Navigations that are not nested under another navigation
pub async fn get_top_level(pool: &SqlitePool) -> Result<Vec<Navigation>> {
    let navigations = sqlx::query_as::<_, Navigation>(
        "SELECT * FROM navigations WHERE navigation_id IS NULL ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(navigations)
}
