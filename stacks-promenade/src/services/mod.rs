//! Business logic for the public site

pub mod geocode;
pub mod hours;
pub mod location_service;
pub mod schedule_service;
pub mod segment_service;

pub use geocode::{DisabledGeocodingClient, GeocodingClient, GoogleGeocodingClient};
pub use location_service::{LocationService, LocationStatus};
pub use schedule_service::{ScheduleForm, ScheduleService};
pub use segment_service::SegmentService;
