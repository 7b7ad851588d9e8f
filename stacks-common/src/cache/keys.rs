//! Cache key formats

use std::time::Duration;

pub const LOCATION_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const LOCATION_SLUG_CACHE_TTL: Duration = Duration::from_secs(12 * 60 * 60);
pub const SEGMENT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

// Ops authentication handshake

pub fn ops_username(id: &str) -> String {
    format!("ops.auth.username.{}", id)
}

pub fn ops_return(id: &str) -> String {
    format!("ops.auth.return.{}", id)
}

/// `n` starts at 1
pub fn ops_group(id: &str, n: usize) -> String {
    format!("ops.auth.group.{}.{}", id, n)
}

// Promenade

pub fn location(id: i64) -> String {
    format!("prom.location.{}", id)
}

pub fn location_slug(slug: &str) -> String {
    format!("prom.location.slug.{}", slug)
}

pub fn location_hours(id: i64) -> String {
    format!("prom.location.hours.{}", id)
}

pub fn location_features(id: i64) -> String {
    format!("prom.location.features.{}", id)
}

pub fn location_feature(location_id: i64, feature_slug: &str) -> String {
    format!("prom.location.feature.{}.{}", location_id, feature_slug)
}

pub fn location_group(group_id: i64) -> String {
    format!("prom.location.group.{}", group_id)
}

pub fn location_neighbor_group(group_id: i64) -> String {
    format!("prom.location.neighborgroup.{}", group_id)
}

pub fn segment_text(segment_id: i64, language: &str) -> String {
    format!("prom.segment.{}.{}", segment_id, language)
}
