//! Database models
//!
//! Rust representations of the shared Ops/Promenade tables. Columns that are
//! filled by joins or lookups rather than stored on the row are marked
//! `#[sqlx(skip)]`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Staff and sections
// ============================================================================

/// Staff member, sourced from the roster and enriched by the directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub supervisor_id: Option<i64>,
    pub associated_location: Option<i64>,
    pub is_location_manual: bool,
    pub picture_filename: Option<String>,
    pub is_sysadmin: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
    pub is_in_latest_roster: bool,
    pub reauthenticate_user: bool,
    pub last_seen: Option<NaiveDateTime>,
    pub last_ldap_update: Option<NaiveDateTime>,
    pub last_roster_update: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub created_by: Option<i64>,
    pub updated_at: Option<NaiveDateTime>,
    pub updated_by: Option<i64>,

    /// Supervisor's directory username, resolved to `supervisor_id` on save
    #[sqlx(skip)]
    #[serde(skip)]
    pub supervisor_username: Option<String>,
}

impl User {
    /// Nickname if set, otherwise the username
    pub fn display_name(&self) -> String {
        self.nickname
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.username.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

/// Lightweight user projection for lists and "updated by" labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserNameUsername {
    pub id: i64,
    pub name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Section {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub sort_order: i64,
}

/// Staff-only page within a section
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct IntranetPage {
    pub id: i64,
    pub section_id: i64,
    pub title: String,
    pub stub: Option<String>,
    pub content: Option<String>,
    pub is_draft: bool,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub created_by: Option<i64>,
    pub updated_at: Option<NaiveDateTime>,
    pub updated_by: Option<i64>,

    #[sqlx(skip)]
    pub created_by_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub section_id: i64,
    pub title: String,
    pub stub: Option<String>,
    pub content: Option<String>,
    pub is_draft: bool,
    pub published_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileAttachment {
    pub id: i64,
    pub page_id: i64,
    pub name: String,
    pub filename: String,
    pub created_at: NaiveDateTime,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Navigation {
    pub id: i64,
    pub name: String,
    pub navigation_id: Option<i64>,
    pub sort_order: i64,
    pub icon: Option<String>,
    pub target_new_window: bool,
}

// ============================================================================
// Content: languages, segments, Promenade pages
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Language {
    pub id: i64,
    /// Culture name, e.g. `en-US`
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub is_default: bool,
}

/// Markup placed around a segment's text when rendered
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SegmentWrap {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Segment {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub segment_wrap_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub created_by: Option<i64>,
    pub updated_at: Option<NaiveDateTime>,
    pub updated_by: Option<i64>,

    /// Culture names that have text for this segment
    #[sqlx(skip)]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SegmentText {
    pub segment_id: i64,
    pub language_id: i64,
    pub header: Option<String>,
    pub text: Option<String>,
}

/// Promenade page identity shared by every language version
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct PageHeader {
    pub id: i64,
    pub page_name: String,
    pub stub: String,
    pub page_type: i64,
    pub is_layout: bool,
    pub created_at: NaiveDateTime,
    pub created_by: Option<i64>,
    pub updated_at: Option<NaiveDateTime>,
    pub updated_by: Option<i64>,

    #[sqlx(skip)]
    pub languages: Vec<String>,
}

/// Promenade page content in one language
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Page {
    pub page_header_id: i64,
    pub language_id: i64,
    pub title: String,
    pub content: Option<String>,
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PageLayout {
    pub id: i64,
    pub page_header_id: i64,
    pub name: String,
    pub start_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PageItem {
    pub id: i64,
    pub page_layout_id: i64,
    pub segment_id: Option<i64>,
    pub sort_order: i64,
}

// ============================================================================
// Locations and hours
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub stub: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub map_link: Option<String>,
    /// "latitude,longitude"
    pub geo_location: Option<String>,
    pub is_always_open: bool,
    pub is_closed: bool,
    pub hours_segment_id: Option<i64>,
    pub description_segment_id: Option<i64>,
    pub pre_feature_segment_id: Option<i64>,
    pub post_feature_segment_id: Option<i64>,
    pub display_group_id: Option<i64>,
    pub is_deleted: bool,

    #[sqlx(skip)]
    pub description_segment: Option<SegmentText>,
    #[sqlx(skip)]
    pub hours_segment: Option<SegmentText>,
    #[sqlx(skip)]
    pub pre_feature_segment: Option<SegmentText>,
    #[sqlx(skip)]
    pub post_feature_segment: Option<SegmentText>,
}

impl Location {
    /// Parse `geo_location` into (latitude, longitude)
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let geo = self.geo_location.as_deref()?;
        let (lat, lon) = geo.split_once(',')?;
        Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
    }
}

/// Regular weekly hours for one day; `day_of_week` 0 = Sunday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LocationHours {
    pub id: i64,
    pub location_id: i64,
    pub day_of_week: i64,
    pub open: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
}

/// Date-specific hours; a null `location_id` applies to every location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LocationHoursOverride {
    pub id: i64,
    pub location_id: Option<i64>,
    pub date: NaiveDate,
    pub open: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feature {
    pub id: i64,
    pub name: String,
    pub stub: String,
    pub icon: Option<String>,
    pub body_text: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationFeature {
    pub location_id: i64,
    pub feature_id: i64,
    pub text: Option<String>,
    pub redirect_url: Option<String>,
}

/// Named set of neighboring locations
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NeighborGroup {
    pub id: i64,
    pub group_type: String,
    pub stub: Option<String>,
    pub subscription_url: Option<String>,
    pub is_location_region: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationGroup {
    pub group_id: i64,
    pub location_id: i64,
    pub has_subscription: bool,
    pub display_order: i64,

    #[sqlx(skip)]
    pub location: Option<Location>,
}

// ============================================================================
// Products and inventory
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub is_visible_to_public: bool,
    pub cache_inventory_minutes: i64,
    pub segment_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub created_by: Option<i64>,
    pub updated_at: Option<NaiveDateTime>,
    pub updated_by: Option<i64>,

    /// Permission groups allowed to manage this product
    #[sqlx(skip)]
    pub permission_group_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct ProductLocationInventory {
    pub product_id: i64,
    pub location_id: i64,
    pub item_count: Option<i64>,
    pub many_threshhold: Option<i64>,
    pub created_at: NaiveDateTime,
    pub created_by: Option<i64>,
    pub updated_at: Option<NaiveDateTime>,
    pub updated_by: Option<i64>,
    pub threshhold_updated_at: Option<NaiveDateTime>,
    pub threshhold_updated_by: Option<i64>,

    #[sqlx(skip)]
    pub location_name: Option<String>,
    #[sqlx(skip)]
    pub updated_by_name: Option<String>,
    #[sqlx(skip)]
    pub updated_by_username: Option<String>,
    #[sqlx(skip)]
    pub threshhold_updated_by_name: Option<String>,
    #[sqlx(skip)]
    pub threshhold_updated_by_username: Option<String>,
}

/// Spreadsheet location label mapped onto a location for one product
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationProductMap {
    pub id: i64,
    pub product_id: i64,
    pub import_location: String,
    pub location_id: i64,
}

// ============================================================================
// Authorization
// ============================================================================

/// Directory group granting a claim type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ClaimGroup {
    pub id: i64,
    pub claim_type: String,
    pub group_name: String,
}

/// Directory group granting membership in a permission group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PermissionGroup {
    pub id: i64,
    pub permission_group_name: String,
    pub group_name: String,
}

// ============================================================================
// Reference appointment scheduling
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduleRequestSubject {
    pub id: i64,
    pub subject: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduleRequestTelephone {
    pub id: i64,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct ScheduleRequest {
    pub id: i64,
    pub requested_time: NaiveDateTime,
    pub name: String,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub language: Option<String>,
    pub schedule_request_subject_id: i64,
    pub schedule_request_telephone_id: i64,
    pub created_at: NaiveDateTime,
    pub is_claimed: bool,
    pub is_cancelled: bool,
}

// ============================================================================
// Day of week encoding
// ============================================================================

/// Stored day number for a weekday (Sunday = 0)
pub fn day_number(day: Weekday) -> i64 {
    i64::from(day.num_days_from_sunday())
}

/// Weekday for a stored day number, wrapping out-of-range values
pub fn weekday_from_number(number: i64) -> Weekday {
    match number.rem_euclid(7) {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_number_round_trips_all_days() {
        for n in 0..7 {
            assert_eq!(day_number(weekday_from_number(n)), n);
        }
        assert_eq!(day_number(Weekday::Sun), 0);
        assert_eq!(day_number(Weekday::Sat), 6);
    }

    #[test]
    fn test_location_coordinates() {
        let location = Location {
            geo_location: Some("33.4484, -112.0740".to_string()),
            ..Default::default()
        };
        assert_eq!(location.coordinates(), Some((33.4484, -112.0740)));

        let location = Location {
            geo_location: Some("not a point".to_string()),
            ..Default::default()
        };
        assert!(location.coordinates().is_none());
    }

    #[test]
    fn test_display_name_prefers_nickname() {
        let mut user = User {
            username: Some("jdoe".to_string()),
            ..Default::default()
        };
        assert_eq!(user.display_name(), "jdoe");

        user.nickname = Some("Jo".to_string());
        assert_eq!(user.display_name(), "Jo");
    }
}
