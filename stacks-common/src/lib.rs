//! Shared library for the Stacks Ops and Promenade applications
//!
//! Holds everything both web applications need: the error type, bootstrap
//! configuration, the SQLite schema and models, the database-backed
//! distributed cache, paging helpers and a handful of web utilities.

pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod i18n;
pub mod logging;
pub mod pagination;
pub mod web;

pub use error::{Error, Result};
