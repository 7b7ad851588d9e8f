//! Staff roster queries
//!
//! Deleted users are hidden from every lookup except the `*_include_deleted`
//! variants. Lookups by email or username also skip the system administrator
//! account so a directory login can never be matched to it.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use stacks_common::db::{User, UserNameUsername};
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::{Error, Result};

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ? AND is_deleted = 0")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_include_deleted(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE email = ? COLLATE NOCASE AND is_deleted = 0 AND is_sysadmin = 0
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE username = ? COLLATE NOCASE AND is_deleted = 0 AND is_sysadmin = 0
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_username_include_deleted(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE username = ? COLLATE NOCASE ORDER BY is_deleted, id LIMIT 1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn get_all(pool: &SqlitePool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE is_deleted = 0 AND is_sysadmin = 0 ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn get_direct_reports(pool: &SqlitePool, supervisor_id: i64) -> Result<Vec<UserNameUsername>> {
    let reports = sqlx::query_as::<_, UserNameUsername>(
        r#"
        SELECT id, name, username FROM users
        WHERE supervisor_id = ? AND is_deleted = 0
        ORDER BY name
        "#,
    )
    .bind(supervisor_id)
    .fetch_all(pool)
    .await?;
    Ok(reports)
}

/// Name and username for audit labels; deleted users are included with a
/// blank username
pub async fn get_name_username(pool: &SqlitePool, id: i64) -> Result<Option<UserNameUsername>> {
    let user = sqlx::query_as::<_, UserNameUsername>(
        r#"
        SELECT id, name, CASE WHEN is_deleted = 1 THEN NULL ELSE username END AS username
        FROM users WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn get_supervisor(pool: &SqlitePool, user_id: i64) -> Result<Option<User>> {
    let supervisor = sqlx::query_as::<_, User>(
        r#"
        SELECT s.* FROM users u
        JOIN users s ON s.id = u.supervisor_id
        WHERE u.id = ? AND s.is_deleted = 0
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(supervisor)
}

/// Another live user already has this email
pub async fn is_duplicate_email(pool: &SqlitePool, user: &User) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE email = ? COLLATE NOCASE AND id != ? AND is_deleted = 0",
    )
    .bind(&user.email)
    .bind(user.id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn is_duplicate_username(pool: &SqlitePool, user: &User) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE username = ? COLLATE NOCASE AND id != ? AND is_deleted = 0",
    )
    .bind(&user.username)
    .bind(user.id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

fn search_pattern(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", t))
}

/// Current-roster users whose name, email or username contains `text`
pub async fn search(
    pool: &SqlitePool,
    filter: &BaseFilter,
    text: Option<&str>,
) -> Result<CollectionWithCount<User>> {
    let pattern = search_pattern(text);

    const WHERE: &str = r#"
        WHERE is_in_latest_roster = 1 AND is_deleted = 0
        AND (?1 IS NULL OR name LIKE ?1 OR email LIKE ?1 OR username LIKE ?1)
    "#;

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users {}", WHERE))
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

    let data = sqlx::query_as::<_, User>(&format!(
        "SELECT * FROM users {} ORDER BY name LIMIT ?2 OFFSET ?3",
        WHERE
    ))
    .bind(&pattern)
    .bind(filter.take)
    .bind(filter.skip())
    .fetch_all(pool)
    .await?;

    Ok(CollectionWithCount { count, data })
}

/// Ids of live users matching `text`, roster membership ignored
pub async fn search_ids(pool: &SqlitePool, text: Option<&str>) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        r#"
        SELECT id FROM users
        WHERE is_deleted = 0
        AND (?1 IS NULL OR name LIKE ?1 OR email LIKE ?1 OR username LIKE ?1)
        ORDER BY id
        "#,
    )
    .bind(search_pattern(text))
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn update_supervisor(pool: &SqlitePool, user_id: i64, supervisor_id: i64) -> Result<()> {
    let result = sqlx::query("UPDATE users SET supervisor_id = ? WHERE id = ?")
        .bind(supervisor_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User id {} could not be found.", user_id)));
    }
    Ok(())
}

/// Some staff member at the location who supervises nobody
pub async fn get_non_supervisor(pool: &SqlitePool, location_id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users u
        WHERE u.associated_location = ? AND u.is_deleted = 0
        AND NOT EXISTS (SELECT 1 FROM users r WHERE r.supervisor_id = u.id AND r.is_deleted = 0)
        ORDER BY u.id
        LIMIT 1
        "#,
    )
    .bind(location_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn get_profile_picture_filename(pool: &SqlitePool, user_id: i64) -> Result<Option<String>> {
    let filename: Option<Option<String>> =
        sqlx::query_scalar("SELECT picture_filename FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(filename.flatten().filter(|f| !f.is_empty()))
}

pub async fn get_system_administrator(pool: &SqlitePool) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE is_sysadmin = 1 ORDER BY id LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Distinct non-empty job titles, sorted
pub async fn get_titles(pool: &SqlitePool) -> Result<Vec<String>> {
    let titles = sqlx::query_scalar(
        r#"
        SELECT DISTINCT title FROM users
        WHERE title IS NOT NULL AND TRIM(title) != '' AND is_deleted = 0
        ORDER BY title
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(titles)
}

pub async fn is_supervisor(pool: &SqlitePool, user_id: i64) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE supervisor_id = ? AND is_deleted = 0",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn mark_user_deleted(
    pool: &SqlitePool,
    username: &str,
    deleted_by: Option<i64>,
    now: NaiveDateTime,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users SET is_deleted = 1, deleted_at = ?, updated_at = ?, updated_by = ?
        WHERE username = ? COLLATE NOCASE AND is_deleted = 0
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(deleted_by)
    .bind(username)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Unable to find user with username {}", username)));
    }
    Ok(())
}

pub async fn add(pool: &SqlitePool, user: &User) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (
            username, name, nickname, email, title, phone, supervisor_id,
            associated_location, is_location_manual, picture_filename, is_sysadmin,
            is_in_latest_roster, reauthenticate_user, last_seen, last_ldap_update,
            last_roster_update, created_at, created_by
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.name)
    .bind(&user.nickname)
    .bind(&user.email)
    .bind(&user.title)
    .bind(&user.phone)
    .bind(user.supervisor_id)
    .bind(user.associated_location)
    .bind(user.is_location_manual)
    .bind(&user.picture_filename)
    .bind(user.is_sysadmin)
    .bind(user.is_in_latest_roster)
    .bind(user.reauthenticate_user)
    .bind(user.last_seen)
    .bind(user.last_ldap_update)
    .bind(user.last_roster_update)
    .bind(user.created_at)
    .bind(user.created_by)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            username = ?, name = ?, nickname = ?, email = ?, title = ?, phone = ?,
            supervisor_id = ?, associated_location = ?, is_location_manual = ?,
            picture_filename = ?, is_in_latest_roster = ?, reauthenticate_user = ?,
            last_seen = ?, last_ldap_update = ?, last_roster_update = ?,
            updated_at = ?, updated_by = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.name)
    .bind(&user.nickname)
    .bind(&user.email)
    .bind(&user.title)
    .bind(&user.phone)
    .bind(user.supervisor_id)
    .bind(user.associated_location)
    .bind(user.is_location_manual)
    .bind(&user.picture_filename)
    .bind(user.is_in_latest_roster)
    .bind(user.reauthenticate_user)
    .bind(user.last_seen)
    .bind(user.last_ldap_update)
    .bind(user.last_roster_update)
    .bind(user.updated_at)
    .bind(user.updated_by)
    .bind(user.id)
    .execute(pool)
    .await?;
    Ok(())
}
