//! Staff roster search

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use stacks_common::db::User;
use stacks_common::pagination::PaginateModel;
use stacks_common::web::Flash;

use super::list_filter;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UsersViewModel {
    pub search: Option<String>,
    pub users: Vec<User>,
    pub paginate: PaginateModel,
}

/// `/Users` link keeping the search text
pub fn users_path(search: Option<&str>, page: i64) -> String {
    match search {
        Some(search) => format!("/Users?search={}&page={}", urlencoding::encode(search), page),
        None => format!("/Users?page={}", page),
    }
}

/// GET /Users
pub async fn index(
    State(state): State<AppState>,
    _user: CurrentUser,
    flash: Flash,
    Query(query): Query<UsersQuery>,
) -> ApiResult<Response> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let filter = list_filter(&state, query.page).await?;
    let list = state.users.search(&filter, search.as_deref()).await?;
    let paginate = PaginateModel::new(list.count, &filter);

    if let Some(last) = paginate.last_page() {
        return Ok(Redirect::to(&users_path(search.as_deref(), last)).into_response());
    }

    Ok(flash.view(UsersViewModel {
        search,
        users: list.data,
        paginate,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/Users", get(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_path_encodes_search() {
        assert_eq!(users_path(Some("Ann Lee & co"), 3), "/Users?search=Ann%20Lee%20%26%20co&page=3");
        assert_eq!(users_path(None, 2), "/Users?page=2");
    }
}
