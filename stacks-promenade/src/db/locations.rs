//! Location, hours, feature and neighbor-group queries

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use stacks_common::db::{Location, LocationGroup, LocationHours, LocationHoursOverride, NeighborGroup};
use stacks_common::Result;

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Location>> {
    let location = sqlx::query_as::<_, Location>(
        "SELECT * FROM locations WHERE id = ? AND is_deleted = 0",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(location)
}

pub async fn get_id_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar(
        "SELECT id FROM locations WHERE stub = ? COLLATE NOCASE AND is_deleted = 0",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

pub async fn get_all_locations(pool: &SqlitePool) -> Result<Vec<Location>> {
    let locations = sqlx::query_as::<_, Location>(
        "SELECT * FROM locations WHERE is_deleted = 0 ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(locations)
}

// ============================================================================
// Weekly hours
// ============================================================================

pub async fn get_weekly_hours(pool: &SqlitePool, location_id: i64) -> Result<Vec<LocationHours>> {
    let hours = sqlx::query_as::<_, LocationHours>(
        "SELECT * FROM location_hours WHERE location_id = ? ORDER BY day_of_week",
    )
    .bind(location_id)
    .fetch_all(pool)
    .await?;
    Ok(hours)
}

pub async fn get_by_day_of_week(
    pool: &SqlitePool,
    location_id: i64,
    day_of_week: i64,
) -> Result<Option<LocationHours>> {
    let hours = sqlx::query_as::<_, LocationHours>(
        "SELECT * FROM location_hours WHERE location_id = ? AND day_of_week = ?",
    )
    .bind(location_id)
    .bind(day_of_week)
    .fetch_optional(pool)
    .await?;
    Ok(hours)
}

// ============================================================================
// Overrides
//
// An override with no location applies everywhere; a location-specific
// override for the same date wins.
// ============================================================================

pub async fn get_override_by_date(
    pool: &SqlitePool,
    location_id: i64,
    date: NaiveDate,
) -> Result<Option<LocationHoursOverride>> {
    let row = sqlx::query_as::<_, LocationHoursOverride>(
        r#"
        SELECT * FROM location_hours_overrides
        WHERE date = ? AND (location_id = ? OR location_id IS NULL)
        ORDER BY location_id IS NULL, id
        LIMIT 1
        "#,
    )
    .bind(date)
    .bind(location_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// One override per date in `[from, to]`, ordered by date
pub async fn get_overrides_between_dates(
    pool: &SqlitePool,
    location_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<LocationHoursOverride>> {
    let rows = sqlx::query_as::<_, LocationHoursOverride>(
        r#"
        SELECT * FROM location_hours_overrides
        WHERE date BETWEEN ? AND ? AND (location_id = ? OR location_id IS NULL)
        ORDER BY date, location_id IS NULL, id
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(location_id)
    .fetch_all(pool)
    .await?;

    let mut overrides: Vec<LocationHoursOverride> = Vec::with_capacity(rows.len());
    for row in rows {
        if overrides.last().map(|o| o.date) != Some(row.date) {
            overrides.push(row);
        }
    }
    Ok(overrides)
}

/// Reason given for a system-wide closure on `date`
pub async fn get_closure_reason(pool: &SqlitePool, date: NaiveDate) -> Result<Option<String>> {
    let reason: Option<Option<String>> = sqlx::query_scalar(
        r#"
        SELECT reason FROM location_hours_overrides
        WHERE date = ? AND location_id IS NULL AND open = 0
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(date)
    .fetch_optional(pool)
    .await?;
    Ok(reason.flatten())
}

// ============================================================================
// Features
// ============================================================================

/// Feature offered at a location, with the location-specific text
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationFeatureDetail {
    pub location_id: i64,
    pub feature_id: i64,
    pub name: String,
    pub stub: String,
    pub icon: Option<String>,
    pub body_text: Option<String>,
    pub sort_order: i64,
    pub text: Option<String>,
    pub redirect_url: Option<String>,
}

const FEATURE_DETAIL_SELECT: &str = r#"
    SELECT lf.location_id, lf.feature_id, f.name, f.stub, f.icon, f.body_text,
           f.sort_order, lf.text, lf.redirect_url
    FROM location_features lf
    JOIN features f ON f.id = lf.feature_id
"#;

pub async fn get_full_location_features(
    pool: &SqlitePool,
    location_id: i64,
) -> Result<Vec<LocationFeatureDetail>> {
    let sql = format!(
        "{} WHERE lf.location_id = ? ORDER BY f.sort_order, f.name",
        FEATURE_DETAIL_SELECT
    );
    let features = sqlx::query_as::<_, LocationFeatureDetail>(&sql)
        .bind(location_id)
        .fetch_all(pool)
        .await?;
    Ok(features)
}

pub async fn get_full_location_feature(
    pool: &SqlitePool,
    location_id: i64,
    feature_slug: &str,
) -> Result<Option<LocationFeatureDetail>> {
    let sql = format!(
        "{} WHERE lf.location_id = ? AND f.stub = ? COLLATE NOCASE",
        FEATURE_DETAIL_SELECT
    );
    let feature = sqlx::query_as::<_, LocationFeatureDetail>(&sql)
        .bind(location_id)
        .bind(feature_slug)
        .fetch_optional(pool)
        .await?;
    Ok(feature)
}

// ============================================================================
// Neighbor groups
// ============================================================================

pub async fn find_group(pool: &SqlitePool, id: i64) -> Result<Option<NeighborGroup>> {
    let group = sqlx::query_as::<_, NeighborGroup>("SELECT * FROM neighbor_groups WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(group)
}

pub async fn get_locations_by_group_id(
    pool: &SqlitePool,
    group_id: i64,
) -> Result<Vec<LocationGroup>> {
    let members = sqlx::query_as::<_, LocationGroup>(
        "SELECT * FROM location_groups WHERE group_id = ? ORDER BY display_order, location_id",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;
    Ok(members)
}
