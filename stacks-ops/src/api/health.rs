//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use stacks_common::db::migrations;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<i32>,
}

/// GET /health
///
/// Reports "degraded" when the shared database cannot be read.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let schema_version = match migrations::get_schema_version(&state.db).await {
        Ok(version) => Some(version),
        Err(e) => {
            warn!("Health check could not read the database: {}", e);
            None
        }
    };

    Json(HealthResponse {
        status: if schema_version.is_some() { "ok" } else { "degraded" },
        module: "stacks-ops",
        version: env!("CARGO_PKG_VERSION"),
        database: if schema_version.is_some() { "ok" } else { "unavailable" },
        schema_version,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
