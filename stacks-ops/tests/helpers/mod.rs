//! Shared fixtures for stacks-ops integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{NaiveDate, NaiveDateTime};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use stacks_common::cache::{handshake, DistributedCache};
use stacks_common::clock::FixedClock;
use stacks_common::web::alerts::ALERT_COOKIE;
use stacks_ops::auth::sessions::SESSION_COOKIE;
use stacks_ops::auth::{AuthSettings, TomlDirectory, AUTH_ID_COOKIE};
use stacks_ops::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const HANDSHAKE_PREFIX: &str = "https://sso.library.test/auth?id=";

const DIRECTORY: &str = r#"
    [[users]]
    username = "jdoe"
    name = "Jane Doe"
    email = "jdoe@library.test"
    title = "Librarian"
    supervisor = "asmith"

    [[users]]
    username = "newhire"
    name = "New Hire"
    email = "newhire@library.test"
"#;

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub root: TempDir,
}

/// Wednesday 2024-05-15 at 09:00
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 15)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        redirect_url: Some(format!("{}{{0}}&app={{1}}", HANDSHAKE_PREFIX)),
        timeout_minutes: 2,
        domain_name: Some("LIBRARY".to_string()),
        cache_discriminator: "ops".to_string(),
    }
}

pub async fn test_app() -> TestApp {
    build_test_app(auth_settings()).await
}

/// Authentication switched off
pub async fn open_test_app() -> TestApp {
    build_test_app(AuthSettings::default()).await
}

async fn build_test_app(auth: AuthSettings) -> TestApp {
    let pool = stacks_common::db::init_memory_database().await.unwrap();
    seed(&pool).await;
    let root = tempfile::tempdir().unwrap();

    let state = AppState::new(
        pool.clone(),
        Arc::new(FixedClock(now())),
        auth,
        Arc::new(TomlDirectory::from_toml_str(DIRECTORY).unwrap()),
        root.path().to_path_buf(),
    );

    TestApp {
        router: build_router(state),
        pool,
        root,
    }
}

pub async fn exec(pool: &SqlitePool, sql: &str) {
    sqlx::query(sql).execute(pool).await.unwrap();
}

/// Staff, a section, content and a product managed by the "Kit Staff" group
async fn seed(pool: &SqlitePool) {
    for sql in [
        "INSERT INTO users (id, username, name, is_sysadmin) VALUES (1, 'sysadmin', 'System Administrator', 1)",
        "INSERT INTO users (id, username, name, email, is_in_latest_roster) VALUES (2, 'jdoe', 'Jane Doe', 'jdoe@library.test', 1)",
        "INSERT INTO users (id, username, name, email, is_in_latest_roster) VALUES (3, 'asmith', 'Alex Smith', 'asmith@library.test', 1)",
        "INSERT INTO users (id, name, email, is_in_latest_roster) VALUES (4, 'New Hire', 'newhire@library.test', 1)",
        "INSERT INTO sections (id, name, path) VALUES (1, 'Human Resources', 'hr')",
        "INSERT INTO languages (id, name, description, is_active, is_default) VALUES (1, 'en-US', 'English', 1, 1)",
        "INSERT INTO languages (id, name, description, is_active, is_default) VALUES (2, 'es-US', 'Spanish', 1, 0)",
        "INSERT INTO segment_wraps (id, name) VALUES (1, 'Callout')",
        "INSERT INTO segments (id, name, is_active) VALUES (1, 'Central description', 1)",
        "INSERT INTO segment_texts (segment_id, language_id, header, text) VALUES (1, 1, 'About', 'Welcome to Central')",
        "INSERT INTO segments (id, name, is_active) VALUES (2, 'Unused', 1)",
        "INSERT INTO locations (id, name, stub, description_segment_id) VALUES (1, 'Central', 'central', 1)",
        "INSERT INTO locations (id, name, stub) VALUES (2, 'Branch', 'branch')",
        "INSERT INTO products (id, name, slug, is_active) VALUES (1, 'Test Kits', 'test-kits', 1)",
        "INSERT INTO product_location_inventories (product_id, location_id, item_count) VALUES (1, 1, 5)",
        "INSERT INTO location_product_maps (product_id, import_location, location_id) VALUES (1, 'Branch Library', 2)",
        "INSERT INTO page_headers (id, page_name, stub) VALUES (1, 'About Us', 'about')",
        "INSERT INTO claim_groups (id, claim_type, group_name) VALUES (1, 'SiteManager', 'Web Admins')",
        "INSERT INTO permission_groups (id, permission_group_name, group_name) VALUES (1, 'Kit Managers', 'Kit Staff')",
        "INSERT INTO permission_groups (id, permission_group_name, group_name) VALUES (2, 'Page Editors', 'Web Editors')",
        "INSERT INTO permission_group_product_managers (permission_group_id, product_id) VALUES (1, 1)",
        "INSERT INTO permission_group_page_contents (permission_group_id, page_header_id) VALUES (2, 1)",
    ] {
        exec(pool, sql).await;
    }
}

/// `name=value` pairs from every Set-Cookie header
pub fn set_cookies(response: &Response) -> Vec<(String, String)> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

pub fn cookie_value(response: &Response, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn get(app: &TestApp, uri: &str, cookie: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_form(app: &TestApp, uri: &str, cookie: Option<&str>, body: &str) -> Response {
    post_body(app, uri, cookie, "application/x-www-form-urlencoded", body.as_bytes().to_vec()).await
}

pub async fn post_body(
    app: &TestApp,
    uri: &str,
    cookie: Option<&str>,
    content_type: &str,
    body: Vec<u8>,
) -> Response {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.router
        .clone()
        .oneshot(request.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Sign in through the directory handshake and return the session cookie
pub async fn login(app: &TestApp, username: &str, groups: &[&str]) -> String {
    let response = get(app, "/Profile", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with(HANDSHAKE_PREFIX));
    let id = cookie_value(&response, AUTH_ID_COOKIE).expect("handshake id cookie");

    let cache = DistributedCache::new(app.pool.clone());
    let groups: Vec<String> = groups.iter().map(|g| g.to_string()).collect();
    handshake::record_authentication(
        &cache,
        &id,
        &format!("LIBRARY\\{}", username),
        &groups,
        Duration::from_secs(120),
    )
    .await
    .unwrap();

    let response = get(app, "/Profile", Some(&format!("{}={}", AUTH_ID_COOKIE, id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = cookie_value(&response, SESSION_COOKIE).expect("session cookie");
    format!("{}={}", SESSION_COOKIE, token)
}

/// Follow a redirect carrying its alert, returning the rendered view
pub async fn follow(app: &TestApp, response: Response, session: &str) -> (StatusCode, Value) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let to = location(&response);
    let cookie = match cookie_value(&response, ALERT_COOKIE) {
        Some(alert) => format!("{}; {}={}", session, ALERT_COOKIE, alert),
        None => session.to_string(),
    };
    read_json(get(app, &to, Some(&cookie)).await).await
}

/// Alert message carried by a response's alert cookie
pub async fn alert_after(app: &TestApp, response: Response, session: &str) -> String {
    let (_, body) = follow(app, response, session).await;
    body["alert"]["message"].as_str().unwrap_or_default().to_string()
}
