//! Database schema, models and shared settings access

pub mod init;
pub mod migrations;
pub mod models;
pub mod settings;

pub use init::{init_database, init_memory_database};
pub use models::*;
