//! stacks-promenade library interface
//!
//! The public library site: location hours and status, nearest-location
//! search, location features and reference appointment scheduling.

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use sqlx::SqlitePool;
use stacks_common::cache::DistributedCache;
use stacks_common::clock::SharedClock;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{GeocodingClient, LocationService, ScheduleService, SegmentService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub cache: DistributedCache,
    pub clock: SharedClock,
    pub locations: LocationService,
    pub segments: SegmentService,
    pub schedule: ScheduleService,
}

impl AppState {
    pub fn new(db: SqlitePool, clock: SharedClock, geocoder: Arc<dyn GeocodingClient>) -> Self {
        let cache = DistributedCache::new(db.clone());
        let segments = SegmentService::new(db.clone(), cache.clone(), clock.clone());
        let locations = LocationService::new(
            db.clone(),
            cache.clone(),
            clock.clone(),
            segments.clone(),
            geocoder,
        );
        let schedule = ScheduleService::new(db.clone(), clock.clone());

        Self {
            db,
            cache,
            clock,
            locations,
            segments,
            schedule,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::location_routes())
        .merge(api::help_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
