//! Site settings stored in the `settings` table
//!
//! Values are stored as text and parsed on read. Missing or unparseable
//! values fall back to the caller's default.

use crate::Result;
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::warn;

/// Setting keys
pub mod keys {
    pub const ITEMS_PER_PAGE: &str = "ui_items_per_page";

    pub mod scheduling {
        pub const ENABLE: &str = "scheduling_enable";
        pub const ENABLED_SEGMENT: &str = "scheduling_enabled_segment";
        pub const DISABLED_SEGMENT: &str = "scheduling_disabled_segment";
        pub const SCHEDULED_SEGMENT: &str = "scheduling_scheduled_segment";
    }
}

const DEFAULTS: &[(&str, &str)] = &[
    (keys::ITEMS_PER_PAGE, "10"),
    (keys::scheduling::ENABLE, "false"),
    (keys::scheduling::ENABLED_SEGMENT, "-1"),
    (keys::scheduling::DISABLED_SEGMENT, "-1"),
    (keys::scheduling::SCHEDULED_SEGMENT, "-1"),
];

/// Seed any missing setting with its default; existing values are kept
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for (key, value) in DEFAULTS {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Raw text value of a setting
pub async fn get_setting_string(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value.flatten())
}

/// Parsed value of a setting, `None` when absent
pub async fn get_setting<T: FromStr>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    let Some(raw) = get_setting_string(pool, key).await? else {
        return Ok(None);
    };

    match raw.trim().parse::<T>() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            warn!("Setting {} has unparseable value '{}'", key, raw);
            Ok(None)
        }
    }
}

pub async fn get_setting_int(pool: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    Ok(get_setting::<i64>(pool, key).await?.unwrap_or(default))
}

pub async fn get_setting_bool(pool: &SqlitePool, key: &str, default: bool) -> Result<bool> {
    Ok(get_setting::<bool>(pool, key).await?.unwrap_or(default))
}

pub async fn set_setting<T: ToString>(pool: &SqlitePool, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(pool)
    .await?;
    Ok(())
}
