//! HTTP handlers for the staff application
//!
//! Views are JSON view models; form posts answer with a redirect carrying a
//! flash alert, and script actions answer with a `JsonResponse`.

pub mod health;
pub mod navigations;
pub mod pages;
pub mod posts;
pub mod products;
pub mod profile;
pub mod segments;
pub mod site_pages;
pub mod users;

pub use health::health_routes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use stacks_common::db::settings::{self, keys};
use stacks_common::pagination::{BaseFilter, DEFAULT_TAKE};

use crate::error::ApiResult;
use crate::AppState;

/// Where requests without the needed rights are sent
pub const UNAUTHORIZED_PATH: &str = "/Unauthorized";

/// `?page=` on list views
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
}

/// Redirect to the unauthorized page
pub fn unauthorized() -> Response {
    Redirect::to(UNAUTHORIZED_PATH).into_response()
}

/// Page filter sized by the items-per-page setting
pub async fn list_filter(state: &AppState, page: Option<i64>) -> ApiResult<BaseFilter> {
    let take = settings::get_setting_int(&state.db, keys::ITEMS_PER_PAGE, DEFAULT_TAKE).await?;
    Ok(BaseFilter::new(page, take))
}

/// Minimal HTML escaping for text placed inside alert markup
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// GET /Unauthorized
pub async fn unauthorized_page() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": {
                "code": "UNAUTHORIZED",
                "message": "You do not have permission to view that page. \
                    If you believe this is an error, contact your supervisor or the site manager.",
            }
        })),
    )
}

/// Routes reachable without signing in
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .route(UNAUTHORIZED_PATH, get(unauthorized_page))
}

/// Routes behind the authentication middleware
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .merge(posts::routes())
        .merge(pages::routes())
        .merge(segments::routes())
        .merge(site_pages::routes())
        .merge(navigations::routes())
        .merge(users::routes())
        .merge(profile::routes())
        .merge(products::routes())
}
