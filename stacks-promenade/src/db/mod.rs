//! Database access for the public site
//!
//! Plain async functions over `&SqlitePool`; caching lives in the services.

pub mod locations;
pub mod schedule;
pub mod segments;
