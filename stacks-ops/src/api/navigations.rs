//! Site navigation administration

use axum::{extract::State, response::Response, routing::get, Router};
use serde::Serialize;
use stacks_common::db::Navigation;
use stacks_common::web::Flash;

use super::unauthorized;
use crate::auth::CurrentUser;
use crate::db::navigations;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NavigationsViewModel {
    pub navigations: Vec<Navigation>,
}

/// GET /SiteManagement/Navigations
pub async fn index(State(state): State<AppState>, user: CurrentUser, flash: Flash) -> ApiResult<Response> {
    if !user.is_site_manager() {
        return Ok(unauthorized());
    }

    let navigations = navigations::get_top_level(&state.db).await?;
    Ok(flash.view(NavigationsViewModel { navigations }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/SiteManagement/Navigations", get(index))
}
