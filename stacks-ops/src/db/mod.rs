//! Database access for Ops administration
//!
//! Plain async functions over `&SqlitePool`, one module per aggregate.
//! Audit values (who, when) are filled in by the services before calling.

pub mod files;
pub mod languages;
pub mod locations;
pub mod navigations;
pub mod pages;
pub mod permissions;
pub mod posts;
pub mod products;
pub mod sections;
pub mod segments;
pub mod site_pages;
pub mod users;
