//! Location lookups, opening status and hours
//!
//! Status and weekly hours merge the regular weekly schedule with
//! date-specific overrides. Location records, schedules, features and
//! neighbor groups are cached; every cached read can be bypassed with
//! `force_reload`.

use crate::db::locations::{self, LocationFeatureDetail};
use crate::services::geocode::GeocodingClient;
use crate::services::hours::{
    compute_weekly_hours, days_until, format_status_time, next_day_label, start_of_week,
    LocationDayGrouping, LocationHoursResult,
};
use crate::services::segment_service::SegmentService;
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;
use sqlx::SqlitePool;
use stacks_common::cache::{keys, DistributedCache};
use stacks_common::clock::SharedClock;
use stacks_common::db::{
    day_number, weekday_from_number, Location, LocationGroup, LocationHours, NeighborGroup,
};
use stacks_common::i18n::{self, format_item};
use stacks_common::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

const DAYS_IN_WEEK: i64 = 7;
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Location with its current status and optional distance from the visitor
#[derive(Debug, Clone, Serialize)]
pub struct LocationStatus {
    #[serde(flatten)]
    pub location: Location,
    pub current_status: LocationHoursResult,
    /// Whole miles, rounded up
    pub distance: Option<f64>,
}

#[derive(Clone)]
pub struct LocationService {
    db: SqlitePool,
    cache: DistributedCache,
    clock: SharedClock,
    segments: SegmentService,
    geocoder: Arc<dyn GeocodingClient>,
}

impl LocationService {
    pub fn new(
        db: SqlitePool,
        cache: DistributedCache,
        clock: SharedClock,
        segments: SegmentService,
        geocoder: Arc<dyn GeocodingClient>,
    ) -> Self {
        Self {
            db,
            cache,
            clock,
            segments,
            geocoder,
        }
    }

    async fn find_location(&self, location_id: i64) -> Result<Location> {
        locations::find(&self.db, location_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Unable to find location id {}", location_id)))
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Whether a location is open right now and when that changes
    pub async fn get_current_status(&self, location_id: i64) -> Result<LocationHoursResult> {
        let location = self.find_location(location_id).await?;
        self.current_status_for(&location).await
    }

    async fn current_status_for(&self, location: &Location) -> Result<LocationHoursResult> {
        if location.is_always_open {
            return Ok(LocationHoursResult {
                open: true,
                is_currently_open: true,
                status_message: Some(i18n::LOCATION_OPEN.to_string()),
                ..Default::default()
            });
        }

        if location.hours_segment_id.is_some() {
            return Ok(LocationHoursResult {
                is_special_hours: true,
                status_message: Some(i18n::LOCATION_SPECIAL_HOURS.to_string()),
                ..Default::default()
            });
        }

        if location.is_closed {
            return Ok(LocationHoursResult {
                status_message: Some(i18n::LOCATION_CLOSED.to_string()),
                ..Default::default()
            });
        }

        let now = self.clock.now();
        let today = now.weekday();
        let mut result = LocationHoursResult {
            day_of_week: day_number(today),
            ..Default::default()
        };

        if let Some(today_override) =
            locations::get_override_by_date(&self.db, location.id, now.date()).await?
        {
            result.open = today_override.open;
            result.open_time = today_override.open_time;
            result.close_time = today_override.close_time;
            result.is_override = true;
        } else if let Some(today_hours) =
            locations::get_by_day_of_week(&self.db, location.id, day_number(today)).await?
        {
            result.open = today_hours.open;
            result.open_time = today_hours.open_time;
            result.close_time = today_hours.close_time;
        }

        let mut show_next_open = false;

        if result.open {
            match (result.open_time, result.close_time) {
                (Some(open_time), Some(close_time)) => {
                    if open_time > now.time() {
                        result.status_message = Some(format_item(
                            i18n::LOCATION_OPENS_AT_ITEM,
                            &[format_status_time(open_time).as_str()],
                        ));
                        result.next_status_change = Some(now.date().and_time(open_time));
                    } else if close_time > now.time() {
                        result.status_message = Some(format_item(
                            i18n::LOCATION_OPEN_UNTIL_ITEM,
                            &[format_status_time(close_time).as_str()],
                        ));
                        result.is_currently_open = true;
                        result.next_status_change = Some(now.date().and_time(close_time));
                    } else {
                        result.status_message = Some(i18n::LOCATION_CLOSED.to_string());
                        show_next_open = true;
                    }
                }
                _ => {
                    result.status_message = Some(i18n::LOCATION_OPEN.to_string());
                    result.is_currently_open = true;
                }
            }
        } else {
            result.status_message = Some(i18n::LOCATION_CLOSED_TODAY.to_string());
            show_next_open = true;
        }

        if show_next_open {
            if let Some((next_open, label)) = self.next_opening(location.id, now).await? {
                result.status_message = Some(format_item(
                    i18n::LOCATION_OPENS_NEXT_ITEM,
                    &[label.as_str(), format_status_time(next_open.time()).as_str()],
                ));
                result.next_status_change = Some(next_open);
                result.next_open_date_time = Some(next_open);
            }
        }

        Ok(result)
    }

    /// First opening within the next six days
    ///
    /// Overrides for those days replace the weekly schedule for their
    /// weekday; today's schedule is never considered.
    async fn next_opening(
        &self,
        location_id: i64,
        now: NaiveDateTime,
    ) -> Result<Option<(NaiveDateTime, String)>> {
        let today = now.weekday();
        let future_overrides = locations::get_overrides_between_dates(
            &self.db,
            location_id,
            now.date() + Duration::days(1),
            now.date() + Duration::days(DAYS_IN_WEEK - 1),
        )
        .await?;

        let override_days: HashSet<i64> = future_overrides
            .iter()
            .map(|o| day_number(o.date.weekday()))
            .collect();

        let mut candidates: Vec<(i64, bool, Option<NaiveTime>)> = future_overrides
            .iter()
            .map(|o| (day_number(o.date.weekday()), o.open, o.open_time))
            .collect();

        candidates.extend(
            locations::get_weekly_hours(&self.db, location_id)
                .await?
                .into_iter()
                .filter(|h| h.day_of_week != day_number(today) && !override_days.contains(&h.day_of_week))
                .map(|h| (h.day_of_week, h.open, h.open_time)),
        );

        let next = candidates
            .into_iter()
            .filter_map(|(day, open, open_time)| match (open, open_time) {
                (true, Some(time)) => Some((weekday_from_number(day), time)),
                _ => None,
            })
            .min_by_key(|(day, _)| days_until(today, *day));

        Ok(next.map(|(day, open_time)| {
            let date = now.date() + Duration::days(days_until(today, day));
            (date.and_time(open_time), next_day_label(today, day))
        }))
    }

    /// Every location with its status, nearest first when coordinates are given
    pub async fn get_locations_status(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Vec<LocationStatus>> {
        let all = locations::get_all_locations(&self.db).await?;
        let origin = latitude.zip(longitude);

        let mut statuses = Vec::with_capacity(all.len());
        for location in all {
            let current_status = self.current_status_for(&location).await?;
            let distance = origin
                .zip(location.coordinates())
                .map(|((lat, lon), (loc_lat, loc_lon))| {
                    haversine_miles(loc_lat, loc_lon, lat, lon).ceil()
                });
            statuses.push(LocationStatus {
                location,
                current_status,
                distance,
            });
        }

        if origin.is_some() {
            statuses.sort_by(|a, b| {
                let by_distance = match (a.distance, b.distance) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                };
                by_distance.then_with(|| a.location.name.cmp(&b.location.name))
            });
        } else {
            statuses.sort_by(|a, b| a.location.name.cmp(&b.location.name));
        }

        Ok(statuses)
    }

    // ========================================================================
    // Hours
    // ========================================================================

    /// Hours for each day of the current Sunday–Saturday week
    pub async fn get_weekly_hours(&self, location_id: i64) -> Result<Vec<LocationHoursResult>> {
        let location = self.find_location(location_id).await?;

        if location.is_always_open || location.is_closed {
            let open = location.is_always_open;
            return Ok((0..DAYS_IN_WEEK)
                .map(|day| LocationHoursResult {
                    day_of_week: day,
                    open,
                    is_currently_open: open,
                    ..Default::default()
                })
                .collect());
        }

        let now = self.clock.now();
        let first_day = start_of_week(now.date());
        let last_day = first_day + Duration::days(DAYS_IN_WEEK - 1);

        let mut results: Vec<LocationHoursResult> =
            locations::get_overrides_between_dates(&self.db, location_id, first_day, last_day)
                .await?
                .into_iter()
                .map(|o| LocationHoursResult {
                    day_of_week: day_number(o.date.weekday()),
                    open: o.open,
                    open_time: o.open_time,
                    close_time: o.close_time,
                    is_override: true,
                    ..Default::default()
                })
                .collect();

        if results.len() < DAYS_IN_WEEK as usize {
            let covered: HashSet<i64> = results.iter().map(|r| r.day_of_week).collect();
            let weekly = locations::get_weekly_hours(&self.db, location_id).await?;
            results.extend(
                weekly
                    .into_iter()
                    .filter(|h| !covered.contains(&h.day_of_week))
                    .map(|h| LocationHoursResult {
                        day_of_week: h.day_of_week,
                        open: h.open,
                        open_time: h.open_time,
                        close_time: h.close_time,
                        ..Default::default()
                    }),
            );
        }

        let today = day_number(now.weekday());
        for day in results.iter_mut() {
            if day.day_of_week == today && day.open {
                day.is_currently_open = match (day.open_time, day.close_time) {
                    (Some(open), Some(close)) => open <= now.time() && now.time() <= close,
                    _ => true,
                };
            }
        }

        results.sort_by_key(|r| r.day_of_week);
        Ok(results)
    }

    /// Grouped display hours; `None` for always-open or closed locations
    pub async fn get_hours(
        &self,
        location_id: i64,
        force_reload: bool,
    ) -> Result<Option<Vec<LocationDayGrouping>>> {
        self.grouped_hours(location_id, force_reload, false).await
    }

    /// Grouped hours in structured data form
    pub async fn get_structured_hours(
        &self,
        location_id: i64,
        force_reload: bool,
    ) -> Result<Option<Vec<LocationDayGrouping>>> {
        self.grouped_hours(location_id, force_reload, true).await
    }

    async fn grouped_hours(
        &self,
        location_id: i64,
        force_reload: bool,
        structured: bool,
    ) -> Result<Option<Vec<LocationDayGrouping>>> {
        let Some(location) = self.cached_location(location_id, force_reload).await? else {
            return Ok(None);
        };
        if location.is_always_open || location.is_closed {
            return Ok(None);
        }

        let schedule = self.get_schedule(location_id, force_reload).await?;
        Ok(Some(compute_weekly_hours(&schedule, structured)))
    }

    async fn get_schedule(&self, location_id: i64, force_reload: bool) -> Result<Vec<LocationHours>> {
        let cache_key = keys::location_hours(location_id);

        if !force_reload {
            if let Some(schedule) = self.cache.get_object(&cache_key).await? {
                return Ok(schedule);
            }
        }

        let schedule = locations::get_weekly_hours(&self.db, location_id).await?;
        self.cache
            .save_object(&cache_key, &schedule, keys::LOCATION_CACHE_TTL)
            .await?;
        Ok(schedule)
    }

    // ========================================================================
    // Location records
    // ========================================================================

    async fn cached_location(&self, id: i64, force_reload: bool) -> Result<Option<Location>> {
        let cache_key = keys::location(id);

        if !force_reload {
            if let Some(location) = self.cache.get_object::<Location>(&cache_key).await? {
                return Ok(Some(location));
            }
        }

        let location = locations::find(&self.db, id).await?;
        if let Some(location) = &location {
            self.cache
                .save_object(&cache_key, location, keys::LOCATION_CACHE_TTL)
                .await?;
        }
        Ok(location)
    }

    /// Location with its description, hours and feature segments in `language`
    pub async fn get_location(
        &self,
        id: i64,
        language: Option<&str>,
        force_reload: bool,
    ) -> Result<Option<Location>> {
        let Some(mut location) = self.cached_location(id, force_reload).await? else {
            return Ok(None);
        };

        if let Some(segment_id) = location.description_segment_id {
            location.description_segment = self
                .segments
                .get_segment_text_by_segment_id(segment_id, language, force_reload)
                .await?;
        }
        if let Some(segment_id) = location.hours_segment_id {
            location.hours_segment = self
                .segments
                .get_segment_text_by_segment_id(segment_id, language, force_reload)
                .await?;
        }
        if let Some(segment_id) = location.pre_feature_segment_id {
            location.pre_feature_segment = self
                .segments
                .get_segment_text_by_segment_id(segment_id, language, force_reload)
                .await?;
        }
        if let Some(segment_id) = location.post_feature_segment_id {
            location.post_feature_segment = self
                .segments
                .get_segment_text_by_segment_id(segment_id, language, force_reload)
                .await?;
        }

        Ok(Some(location))
    }

    pub async fn get_location_id(&self, slug: &str, force_reload: bool) -> Result<Option<i64>> {
        let slug = slug.trim().to_lowercase();
        let cache_key = keys::location_slug(&slug);

        if !force_reload {
            if let Some(id) = self.cache.get_int(&cache_key).await? {
                return Ok(Some(id));
            }
        }

        let id = locations::get_id_by_slug(&self.db, &slug).await?;
        if let Some(id) = id {
            self.cache
                .save_int(&cache_key, id, keys::LOCATION_SLUG_CACHE_TTL)
                .await?;
        }
        Ok(id)
    }

    pub async fn get_all_locations(&self) -> Result<Vec<Location>> {
        locations::get_all_locations(&self.db).await
    }

    // ========================================================================
    // Features and neighbors
    // ========================================================================

    pub async fn get_full_location_features(
        &self,
        location_id: i64,
        force_reload: bool,
    ) -> Result<Vec<LocationFeatureDetail>> {
        let cache_key = keys::location_features(location_id);

        if !force_reload {
            if let Some(features) = self.cache.get_object(&cache_key).await? {
                return Ok(features);
            }
        }

        let features = locations::get_full_location_features(&self.db, location_id).await?;
        self.cache
            .save_object(&cache_key, &features, keys::LOCATION_CACHE_TTL)
            .await?;
        Ok(features)
    }

    pub async fn get_location_full_feature(
        &self,
        location_id: i64,
        feature_slug: &str,
        force_reload: bool,
    ) -> Result<Option<LocationFeatureDetail>> {
        let cache_key = keys::location_feature(location_id, feature_slug);

        if !force_reload {
            if let Some(feature) = self.cache.get_object(&cache_key).await? {
                return Ok(Some(feature));
            }
        }

        let feature =
            locations::get_full_location_feature(&self.db, location_id, feature_slug).await?;
        if let Some(feature) = &feature {
            self.cache
                .save_object(&cache_key, feature, keys::LOCATION_CACHE_TTL)
                .await?;
        }
        Ok(feature)
    }

    pub async fn get_locations_neighbor_group(
        &self,
        group_id: i64,
        force_reload: bool,
    ) -> Result<Option<NeighborGroup>> {
        let cache_key = keys::location_neighbor_group(group_id);

        if !force_reload {
            if let Some(group) = self.cache.get_object(&cache_key).await? {
                return Ok(Some(group));
            }
        }

        let group = locations::find_group(&self.db, group_id).await?;
        if let Some(group) = &group {
            self.cache
                .save_object(&cache_key, group, keys::LOCATION_CACHE_TTL)
                .await?;
        }
        Ok(group)
    }

    /// Members of a neighbor group; subscribed members carry their location
    pub async fn get_locations_neighbors(
        &self,
        group_id: i64,
        language: Option<&str>,
        force_reload: bool,
    ) -> Result<Vec<LocationGroup>> {
        let cache_key = keys::location_group(group_id);

        let mut members: Option<Vec<LocationGroup>> = None;
        if !force_reload {
            members = self.cache.get_object(&cache_key).await?;
        }

        let mut members = match members {
            Some(members) => members,
            None => {
                let members = locations::get_locations_by_group_id(&self.db, group_id).await?;
                self.cache
                    .save_object(&cache_key, &members, keys::LOCATION_CACHE_TTL)
                    .await?;
                members
            }
        };

        for member in members.iter_mut().filter(|m| m.has_subscription) {
            member.location = self
                .get_location(member.location_id, language, force_reload)
                .await?;
        }

        Ok(members)
    }

    // ========================================================================
    // Closures and geocoding
    // ========================================================================

    pub async fn get_closure_information(&self, date: chrono::NaiveDate) -> Result<Option<String>> {
        locations::get_closure_reason(&self.db, date).await
    }

    pub async fn geocode_address(&self, address: &str) -> Result<Option<(f64, f64)>> {
        self.geocoder.geocode_address(address).await.map_err(|e| {
            warn!("Geocoding failed for address: {}", e);
            Error::External(e.to_string())
        })
    }

    pub async fn get_zip_code(&self, latitude: f64, longitude: f64) -> Result<Option<String>> {
        self.geocoder
            .get_zip_code(latitude, longitude)
            .await
            .map_err(|e| {
                warn!("Reverse geocoding failed: {}", e);
                Error::External(e.to_string())
            })
    }
}

/// Great-circle distance in miles
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().asin()
}
