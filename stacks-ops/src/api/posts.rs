//! Section blog

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use stacks_common::db::Section;
use stacks_common::pagination::PaginateModel;
use stacks_common::web::{markdown_to_html, Flash};

use super::{list_filter, PageQuery};
use crate::auth::CurrentUser;
use crate::db::{posts, sections};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub stub: Option<String>,
    pub html: String,
    pub published_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct PostsViewModel {
    pub section: Section,
    pub posts: Vec<PostView>,
    pub paginate: PaginateModel,
}

pub(crate) async fn require_section(state: &AppState, path: &str) -> ApiResult<Section> {
    sections::get_by_path(&state.db, path)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Section {}", path)))
}

/// GET /:section/Posts
pub async fn index(
    State(state): State<AppState>,
    _user: CurrentUser,
    flash: Flash,
    Path(section): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Response> {
    let section = require_section(&state, &section).await?;
    let filter = list_filter(&state, query.page).await?;

    let list = posts::get_paginated_by_section(&state.db, section.id, &filter).await?;
    let paginate = PaginateModel::new(list.count, &filter);

    if let Some(last) = paginate.last_page() {
        return Ok(Redirect::to(&format!("/{}/Posts?page={}", section.path, last)).into_response());
    }

    let posts = list
        .data
        .into_iter()
        .map(|post| PostView {
            id: post.id,
            html: markdown_to_html(post.content.as_deref().unwrap_or_default()),
            title: post.title,
            stub: post.stub,
            published_at: post.published_at.unwrap_or(post.created_at),
        })
        .collect();

    Ok(flash.view(PostsViewModel {
        section,
        posts,
        paginate,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/:section/Posts", get(index))
}
