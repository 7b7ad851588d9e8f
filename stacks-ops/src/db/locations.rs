//! Location lookups used by Ops administration

use sqlx::SqlitePool;
use stacks_common::db::Location;
use stacks_common::Result;
use std::collections::HashMap;

pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Location>> {
    let locations = sqlx::query_as::<_, Location>(
        "SELECT * FROM locations WHERE is_deleted = 0 ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(locations)
}

/// Locations that show the segment in any of their segment slots
pub async fn get_using_segment(pool: &SqlitePool, segment_id: i64) -> Result<Vec<Location>> {
    let locations = sqlx::query_as::<_, Location>(
        r#"
        SELECT * FROM locations
        WHERE is_deleted = 0 AND (
            hours_segment_id = ?1 OR description_segment_id = ?1
            OR pre_feature_segment_id = ?1 OR post_feature_segment_id = ?1
        )
        ORDER BY name
        "#,
    )
    .bind(segment_id)
    .fetch_all(pool)
    .await?;
    Ok(locations)
}

/// Spreadsheet location label to location id for one product
pub async fn get_product_map(pool: &SqlitePool, product_id: i64) -> Result<HashMap<String, i64>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT import_location, location_id FROM location_product_maps WHERE product_id = ?",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(label, id)| (label.trim().to_string(), id))
        .collect())
}
