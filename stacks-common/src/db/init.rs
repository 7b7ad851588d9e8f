//! Database initialization
//!
//! Both applications call `init_database` at startup. Table creation is
//! idempotent, so whichever binary starts first creates the schema.

use crate::db::settings;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database file and bring the schema up to date
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    prepare(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// One connection keeps every query on the same in-memory database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    prepare(&pool).await?;

    Ok(pool)
}

async fn prepare(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_schema_version_table(pool).await?;
    create_infrastructure_tables(pool).await?;
    create_staff_tables(pool).await?;
    create_content_tables(pool).await?;
    create_location_tables(pool).await?;
    create_product_tables(pool).await?;
    create_permission_tables(pool).await?;
    create_schedule_tables(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;
    settings::init_default_settings(pool).await?;

    Ok(())
}

async fn execute_all(pool: &SqlitePool, statements: &[&str]) -> Result<()> {
    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Settings, distributed cache and Ops sessions
async fn create_infrastructure_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at)",
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id_hash TEXT PRIMARY KEY,
                user_id INTEGER,
                claims TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                expires_at TIMESTAMP NOT NULL
            )
            "#,
        ],
    )
    .await
}

async fn create_staff_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT,
                name TEXT,
                nickname TEXT,
                email TEXT,
                title TEXT,
                phone TEXT,
                supervisor_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                associated_location INTEGER REFERENCES locations(id) ON DELETE SET NULL,
                is_location_manual INTEGER NOT NULL DEFAULT 0,
                picture_filename TEXT,
                is_sysadmin INTEGER NOT NULL DEFAULT 0,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                deleted_at TIMESTAMP,
                is_in_latest_roster INTEGER NOT NULL DEFAULT 0,
                reauthenticate_user INTEGER NOT NULL DEFAULT 0,
                last_seen TIMESTAMP,
                last_ldap_update TIMESTAMP,
                last_roster_update TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_by INTEGER,
                updated_at TIMESTAMP,
                updated_by INTEGER
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_users_username ON users(username)",
            "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
            r#"
            CREATE TABLE IF NOT EXISTS sections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                path TEXT NOT NULL UNIQUE,
                sort_order INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS intranet_pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                section_id INTEGER NOT NULL REFERENCES sections(id),
                title TEXT NOT NULL,
                stub TEXT,
                content TEXT,
                is_draft INTEGER NOT NULL DEFAULT 1,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_by INTEGER,
                updated_at TIMESTAMP,
                updated_by INTEGER
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                section_id INTEGER NOT NULL REFERENCES sections(id),
                title TEXT NOT NULL,
                stub TEXT,
                content TEXT,
                is_draft INTEGER NOT NULL DEFAULT 0,
                published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_by INTEGER
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS file_attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL REFERENCES intranet_pages(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                filename TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_by INTEGER
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS navigations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                navigation_id INTEGER REFERENCES navigations(id) ON DELETE CASCADE,
                sort_order INTEGER NOT NULL DEFAULT 0,
                icon TEXT,
                target_new_window INTEGER NOT NULL DEFAULT 0
            )
            "#,
        ],
    )
    .await
}

/// Languages, segments and Promenade pages
async fn create_content_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS languages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_default INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS segment_wraps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                prefix TEXT,
                suffix TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS segments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                start_date TIMESTAMP,
                end_date TIMESTAMP,
                segment_wrap_id INTEGER REFERENCES segment_wraps(id) ON DELETE SET NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_by INTEGER,
                updated_at TIMESTAMP,
                updated_by INTEGER
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS segment_texts (
                segment_id INTEGER NOT NULL REFERENCES segments(id) ON DELETE CASCADE,
                language_id INTEGER NOT NULL REFERENCES languages(id),
                header TEXT,
                text TEXT,
                PRIMARY KEY (segment_id, language_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS page_headers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_name TEXT NOT NULL,
                stub TEXT NOT NULL,
                page_type INTEGER NOT NULL DEFAULT 0,
                is_layout INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_by INTEGER,
                updated_at TIMESTAMP,
                updated_by INTEGER
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS pages (
                page_header_id INTEGER NOT NULL REFERENCES page_headers(id) ON DELETE CASCADE,
                language_id INTEGER NOT NULL REFERENCES languages(id),
                title TEXT NOT NULL,
                content TEXT,
                is_published INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (page_header_id, language_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS page_layouts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_header_id INTEGER NOT NULL REFERENCES page_headers(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                start_date TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS page_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_layout_id INTEGER NOT NULL REFERENCES page_layouts(id) ON DELETE CASCADE,
                segment_id INTEGER REFERENCES segments(id),
                sort_order INTEGER NOT NULL DEFAULT 0
            )
            "#,
        ],
    )
    .await
}

async fn create_location_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                stub TEXT NOT NULL UNIQUE,
                code TEXT,
                address TEXT,
                city TEXT,
                state TEXT,
                zip TEXT,
                phone TEXT,
                email TEXT,
                map_link TEXT,
                geo_location TEXT,
                is_always_open INTEGER NOT NULL DEFAULT 0,
                is_closed INTEGER NOT NULL DEFAULT 0,
                hours_segment_id INTEGER REFERENCES segments(id),
                description_segment_id INTEGER REFERENCES segments(id),
                pre_feature_segment_id INTEGER REFERENCES segments(id),
                post_feature_segment_id INTEGER REFERENCES segments(id),
                display_group_id INTEGER,
                is_deleted INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS location_hours (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
                day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
                open INTEGER NOT NULL DEFAULT 0,
                open_time TEXT,
                close_time TEXT,
                UNIQUE (location_id, day_of_week)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS location_hours_overrides (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location_id INTEGER REFERENCES locations(id) ON DELETE CASCADE,
                date TEXT NOT NULL,
                open INTEGER NOT NULL DEFAULT 0,
                open_time TEXT,
                close_time TEXT,
                reason TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_overrides_date ON location_hours_overrides(date)",
            r#"
            CREATE TABLE IF NOT EXISTS features (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                stub TEXT NOT NULL UNIQUE,
                icon TEXT,
                body_text TEXT,
                sort_order INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS location_features (
                location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
                feature_id INTEGER NOT NULL REFERENCES features(id) ON DELETE CASCADE,
                text TEXT,
                redirect_url TEXT,
                PRIMARY KEY (location_id, feature_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS neighbor_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_type TEXT NOT NULL,
                stub TEXT,
                subscription_url TEXT,
                is_location_region INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS location_groups (
                group_id INTEGER NOT NULL REFERENCES neighbor_groups(id) ON DELETE CASCADE,
                location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
                has_subscription INTEGER NOT NULL DEFAULT 0,
                display_order INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (group_id, location_id)
            )
            "#,
        ],
    )
    .await
}

async fn create_product_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_visible_to_public INTEGER NOT NULL DEFAULT 0,
                cache_inventory_minutes INTEGER NOT NULL DEFAULT 0,
                segment_id INTEGER REFERENCES segments(id) ON DELETE SET NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_by INTEGER,
                updated_at TIMESTAMP,
                updated_by INTEGER
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS product_location_inventories (
                product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
                item_count INTEGER,
                many_threshhold INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_by INTEGER,
                updated_at TIMESTAMP,
                updated_by INTEGER,
                threshhold_updated_at TIMESTAMP,
                threshhold_updated_by INTEGER,
                PRIMARY KEY (product_id, location_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS location_product_maps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                import_location TEXT NOT NULL,
                location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE
            )
            "#,
        ],
    )
    .await
}

async fn create_permission_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS claim_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                claim_type TEXT NOT NULL,
                group_name TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS permission_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                permission_group_name TEXT NOT NULL,
                group_name TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS permission_group_applications (
                permission_group_id INTEGER NOT NULL REFERENCES permission_groups(id) ON DELETE CASCADE,
                application_permission TEXT NOT NULL,
                PRIMARY KEY (permission_group_id, application_permission)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS permission_group_page_contents (
                permission_group_id INTEGER NOT NULL REFERENCES permission_groups(id) ON DELETE CASCADE,
                page_header_id INTEGER NOT NULL REFERENCES page_headers(id) ON DELETE CASCADE,
                PRIMARY KEY (permission_group_id, page_header_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS permission_group_product_managers (
                permission_group_id INTEGER NOT NULL REFERENCES permission_groups(id) ON DELETE CASCADE,
                product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                PRIMARY KEY (permission_group_id, product_id)
            )
            "#,
        ],
    )
    .await
}

async fn create_schedule_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS schedule_request_subjects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS schedule_request_telephones (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                phone TEXT NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS schedule_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                requested_time TIMESTAMP NOT NULL,
                name TEXT NOT NULL,
                email TEXT,
                notes TEXT,
                language TEXT,
                schedule_request_subject_id INTEGER NOT NULL REFERENCES schedule_request_subjects(id),
                schedule_request_telephone_id INTEGER NOT NULL REFERENCES schedule_request_telephones(id),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                is_claimed INTEGER NOT NULL DEFAULT 0,
                is_cancelled INTEGER NOT NULL DEFAULT 0
            )
            "#,
        ],
    )
    .await
}
