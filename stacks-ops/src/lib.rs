//! stacks-ops library interface
//!
//! The staff intranet: section posts and pages, Promenade content
//! administration, product inventory and staff profiles.

pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::{middleware, Router};
use sqlx::SqlitePool;
use stacks_common::cache::DistributedCache;
use stacks_common::clock::SharedClock;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthSettings, DirectoryService};
use crate::services::{
    AuthorizationService, PageService, PermissionGroupService, ProductService,
    PromenadePageService, SegmentService, UserService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub cache: DistributedCache,
    pub clock: SharedClock,
    pub auth: Arc<AuthSettings>,
    pub directory: Arc<dyn DirectoryService>,
    pub root_folder: PathBuf,
    pub users: UserService,
    pub products: ProductService,
    pub segments: SegmentService,
    pub pages: PageService,
    pub site_pages: PromenadePageService,
    pub authorization: AuthorizationService,
    pub permission_groups: PermissionGroupService,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        clock: SharedClock,
        auth: AuthSettings,
        directory: Arc<dyn DirectoryService>,
        root_folder: PathBuf,
    ) -> Self {
        let cache = DistributedCache::new(db.clone());
        let users = UserService::new(db.clone(), clock.clone(), root_folder.clone());
        let products = ProductService::new(db.clone(), clock.clone(), users.clone());

        Self {
            cache,
            auth: Arc::new(auth),
            directory,
            root_folder,
            products,
            segments: SegmentService::new(db.clone(), clock.clone()),
            pages: PageService::new(db.clone(), clock.clone()),
            site_pages: PromenadePageService::new(db.clone(), clock.clone()),
            authorization: AuthorizationService::new(db.clone()),
            permission_groups: PermissionGroupService::new(db.clone()),
            users,
            clock,
            db,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let protected = api::protected_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::authenticate,
    ));

    Router::new()
        .merge(protected)
        .merge(api::public_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
