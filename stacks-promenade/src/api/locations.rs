//! Location pages: list, nearest-location search, detail and features

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stacks_common::db::{Location, LocationGroup, NeighborGroup};
use tracing::{debug, warn};

use super::{ForceReload, Language};
use crate::db::locations::LocationFeatureDetail;
use crate::error::{ApiError, ApiResult};
use crate::services::hours::{LocationDayGrouping, LocationHoursResult};
use crate::services::LocationStatus;
use crate::AppState;

// ============================================================================
// View models
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LocationsIndexViewModel {
    pub locations: Vec<LocationStatus>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationDetailViewModel {
    pub location: Location,
    pub current_status: LocationHoursResult,
    pub hours: Option<Vec<LocationDayGrouping>>,
    pub structured_hours: Option<Vec<LocationDayGrouping>>,
    pub features: Vec<LocationFeatureDetail>,
    pub neighbor_group: Option<NeighborGroup>,
    pub neighbors: Vec<LocationGroup>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyHoursViewModel {
    pub location_id: i64,
    pub name: String,
    pub weekly_hours: Vec<LocationHoursResult>,
}

#[derive(Debug, Serialize)]
pub struct FeatureViewModel {
    pub location: Location,
    pub feature: LocationFeatureDetail,
}

#[derive(Debug, Serialize)]
pub struct ClosureViewModel {
    pub date: NaiveDate,
    pub reason: Option<String>,
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CoordinateQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ZipQuery {
    pub zip: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClosureQuery {
    pub date: Option<NaiveDate>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /Locations
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> ApiResult<Json<LocationsIndexViewModel>> {
    let locations = state
        .locations
        .get_locations_status(query.latitude, query.longitude)
        .await?;

    let zip = match query.latitude.zip(query.longitude) {
        Some((latitude, longitude)) => state
            .locations
            .get_zip_code(latitude, longitude)
            .await
            .ok()
            .flatten(),
        None => None,
    };

    Ok(Json(LocationsIndexViewModel {
        locations,
        latitude: query.latitude,
        longitude: query.longitude,
        zip,
        warning: None,
    }))
}

/// GET /Locations/Find?zip=
///
/// Geocodes the zip code and lists locations nearest first. When the zip
/// code can't be placed the list falls back to name order with a warning.
pub async fn find(
    State(state): State<AppState>,
    Query(query): Query<ZipQuery>,
) -> ApiResult<Json<LocationsIndexViewModel>> {
    let zip = query.zip.as_deref().map(str::trim).unwrap_or_default();
    if zip.is_empty() {
        return Err(ApiError::BadRequest("Please enter a zip code.".to_string()));
    }

    let coordinates = match state.locations.geocode_address(zip).await {
        Ok(coordinates) => coordinates,
        Err(e) => {
            warn!(zip = %zip, "Unable to geocode zip code: {}", e);
            None
        }
    };

    let (latitude, longitude) = coordinates.unzip();
    let warning = coordinates
        .is_none()
        .then(|| format!("Unable to find a location for zip code {}.", zip));

    let locations = state
        .locations
        .get_locations_status(latitude, longitude)
        .await?;

    Ok(Json(LocationsIndexViewModel {
        locations,
        latitude,
        longitude,
        zip: Some(zip.to_string()),
        warning,
    }))
}

async fn location_id_for(state: &AppState, slug: &str, force: bool) -> ApiResult<i64> {
    state
        .locations
        .get_location_id(slug, force)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Unable to find location {}", slug)))
}

/// GET /Locations/:slug
pub async fn detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ForceReload(force): ForceReload,
    language: Language,
) -> ApiResult<Json<LocationDetailViewModel>> {
    let id = location_id_for(&state, &slug, force).await?;
    let service = &state.locations;

    let location = service
        .get_location(id, language.as_deref(), force)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Unable to find location {}", slug)))?;

    let current_status = service.get_current_status(id).await?;
    let hours = service.get_hours(id, force).await?;
    let structured_hours = service.get_structured_hours(id, force).await?;
    let features = service.get_full_location_features(id, force).await?;

    let (neighbor_group, neighbors) = match location.display_group_id {
        Some(group_id) => (
            service.get_locations_neighbor_group(group_id, force).await?,
            service
                .get_locations_neighbors(group_id, language.as_deref(), force)
                .await?,
        ),
        None => (None, Vec::new()),
    };

    debug!(location_id = id, "Rendering location detail");

    Ok(Json(LocationDetailViewModel {
        location,
        current_status,
        hours,
        structured_hours,
        features,
        neighbor_group,
        neighbors,
    }))
}

/// GET /Locations/:slug/Weekly
pub async fn weekly(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ForceReload(force): ForceReload,
) -> ApiResult<Json<WeeklyHoursViewModel>> {
    let id = location_id_for(&state, &slug, force).await?;
    let location = state
        .locations
        .get_location(id, None, force)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Unable to find location {}", slug)))?;

    Ok(Json(WeeklyHoursViewModel {
        location_id: id,
        name: location.name,
        weekly_hours: state.locations.get_weekly_hours(id).await?,
    }))
}

/// GET /Locations/:slug/:feature
pub async fn feature(
    State(state): State<AppState>,
    Path((slug, feature_slug)): Path<(String, String)>,
    ForceReload(force): ForceReload,
    language: Language,
) -> ApiResult<Json<FeatureViewModel>> {
    let id = location_id_for(&state, &slug, force).await?;

    let location = state
        .locations
        .get_location(id, language.as_deref(), force)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Unable to find location {}", slug)))?;

    let feature = state
        .locations
        .get_location_full_feature(id, &feature_slug.to_lowercase(), force)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Unable to find feature {} at location {}",
                feature_slug, slug
            ))
        })?;

    Ok(Json(FeatureViewModel { location, feature }))
}

/// GET /Closures?date=
pub async fn closures(
    State(state): State<AppState>,
    Query(query): Query<ClosureQuery>,
) -> ApiResult<Json<ClosureViewModel>> {
    let date = query.date.unwrap_or_else(|| state.clock.now().date());
    let reason = state.locations.get_closure_information(date).await?;
    Ok(Json(ClosureViewModel { date, reason }))
}

pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/Locations", get(index))
        .route("/Locations/Find", get(find))
        .route("/Locations/:slug", get(detail))
        .route("/Locations/:slug/Weekly", get(weekly))
        .route("/Locations/:slug/:feature", get(feature))
        .route("/Closures", get(closures))
}
