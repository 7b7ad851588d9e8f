//! Shared fixtures for stacks-promenade integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, NaiveDateTime};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use stacks_common::clock::FixedClock;
use stacks_promenade::services::geocode::{GeocodeError, GeocodingClient};
use stacks_promenade::{build_router, AppState};
use std::sync::Arc;
use tower::ServiceExt;

pub const CENTRAL_COORDINATES: (f64, f64) = (33.4484, -112.0740);

/// Wednesday 2024-05-15 at the given time
pub fn wednesday_at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 15)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Knows one zip code
pub struct StubGeocoder;

#[async_trait]
impl GeocodingClient for StubGeocoder {
    async fn geocode_address(&self, address: &str) -> Result<Option<(f64, f64)>, GeocodeError> {
        Ok((address == "85004").then_some(CENTRAL_COORDINATES))
    }

    async fn get_zip_code(
        &self,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<Option<String>, GeocodeError> {
        Ok(Some("85004".to_string()))
    }
}

pub async fn test_app(now: NaiveDateTime) -> (Router, SqlitePool) {
    let pool = stacks_common::db::init_memory_database().await.unwrap();
    seed(&pool).await;
    (app_at(&pool, now), pool)
}

/// Another app over an existing database, cache included, with its own clock
pub fn app_at(pool: &SqlitePool, now: NaiveDateTime) -> Router {
    let state = AppState::new(pool.clone(), Arc::new(FixedClock(now)), Arc::new(StubGeocoder));
    build_router(state)
}

pub async fn exec(pool: &SqlitePool, sql: &str) {
    sqlx::query(sql).execute(pool).await.unwrap();
}

/// Three locations: Central with regular hours, Branch always open, Annex closed
async fn seed(pool: &SqlitePool) {
    for sql in [
        "INSERT INTO languages (id, name, description, is_active, is_default) VALUES (1, 'en-US', 'English', 1, 1)",
        "INSERT INTO languages (id, name, description, is_active, is_default) VALUES (2, 'es-US', 'Español', 1, 0)",
        "INSERT INTO segments (id, name, is_active) VALUES (1, 'Central description', 1)",
        "INSERT INTO segment_texts (segment_id, language_id, header, text) VALUES (1, 1, 'About', 'Welcome to Central')",
        "INSERT INTO segment_texts (segment_id, language_id, header, text) VALUES (1, 2, 'Acerca', 'Bienvenidos a Central')",
        r#"INSERT INTO locations (id, name, stub, geo_location, description_segment_id, display_group_id)
           VALUES (1, 'Central', 'central', '33.4484,-112.0740', 1, 1)"#,
        "INSERT INTO locations (id, name, stub, geo_location, is_always_open) VALUES (2, 'Branch', 'branch', '33.6000,-112.2000', 1)",
        "INSERT INTO locations (id, name, stub, is_closed) VALUES (3, 'Annex', 'annex', 1)",
        "INSERT INTO location_hours (location_id, day_of_week, open) VALUES (1, 0, 0)",
        "INSERT INTO location_hours (location_id, day_of_week, open, open_time, close_time) VALUES (1, 1, 1, '09:00:00', '17:00:00')",
        "INSERT INTO location_hours (location_id, day_of_week, open, open_time, close_time) VALUES (1, 2, 1, '09:00:00', '17:00:00')",
        "INSERT INTO location_hours (location_id, day_of_week, open, open_time, close_time) VALUES (1, 3, 1, '09:00:00', '17:00:00')",
        "INSERT INTO location_hours (location_id, day_of_week, open, open_time, close_time) VALUES (1, 4, 1, '09:00:00', '17:00:00')",
        "INSERT INTO location_hours (location_id, day_of_week, open, open_time, close_time) VALUES (1, 5, 1, '09:00:00', '17:00:00')",
        "INSERT INTO location_hours (location_id, day_of_week, open, open_time, close_time) VALUES (1, 6, 1, '10:00:00', '14:30:00')",
        "INSERT INTO features (id, name, stub, sort_order) VALUES (1, 'Study Rooms', 'study-rooms', 1)",
        "INSERT INTO location_features (location_id, feature_id, text) VALUES (1, 1, 'Book a room')",
        "INSERT INTO neighbor_groups (id, group_type, stub, is_location_region) VALUES (1, 'Region', 'downtown', 1)",
        "INSERT INTO location_groups (group_id, location_id, has_subscription, display_order) VALUES (1, 1, 1, 0)",
        "INSERT INTO location_groups (group_id, location_id, has_subscription, display_order) VALUES (1, 2, 0, 1)",
    ] {
        exec(pool, sql).await;
    }
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    get_json_with_language(app, uri, None).await
}

pub async fn get_json_with_language(
    app: &Router,
    uri: &str,
    language: Option<&str>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(language) = language {
        request = request.header(header::ACCEPT_LANGUAGE, language);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

pub async fn post_form(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
