//! Intranet page administration within a section

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use stacks_common::db::{FileAttachment, IntranetPage};
use stacks_common::pagination::PaginateModel;
use stacks_common::web::{redirect_with_alert, Alert, Flash};
use stacks_common::Error;
use tracing::error;

use super::posts::require_section;
use super::{list_filter, PageQuery};
use crate::auth::CurrentUser;
use crate::db::sections;
use crate::error::{error_alert, user_message, ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PagesViewModel {
    pub section_id: i64,
    pub pages: Vec<IntranetPage>,
    pub paginate: PaginateModel,
}

#[derive(Debug, Serialize)]
pub struct PageDetailViewModel {
    pub section_id: i64,
    pub page: IntranetPage,
    pub is_draft: bool,
    pub attachments: Vec<FileAttachment>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePageForm {
    pub title: String,
    #[serde(default)]
    pub stub: Option<String>,
    pub section_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CreatePageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditPageForm {
    pub id: i64,
    pub section_id: i64,
    pub title: String,
    #[serde(default)]
    pub stub: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeletePageForm {
    pub id: i64,
    pub section_id: i64,
    #[serde(default)]
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StubForm {
    #[serde(default)]
    pub id: i64,
    pub section_id: i64,
    #[serde(default)]
    pub stub: Option<String>,
}

async fn index_path(state: &AppState, section_id: i64) -> ApiResult<String> {
    let section = sections::find(&state.db, section_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Section id {}", section_id)))?;
    Ok(format!("/{}/Admin/Pages", section.path))
}

/// GET /:section/Admin/Pages
pub async fn index(
    State(state): State<AppState>,
    _user: CurrentUser,
    flash: Flash,
    Path(section): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Response> {
    let section = require_section(&state, &section).await?;
    let filter = list_filter(&state, query.page).await?;

    let list = state.pages.get_paginated_by_section(section.id, &filter).await?;
    let paginate = PaginateModel::new(list.count, &filter);

    if let Some(last) = paginate.last_page() {
        return Ok(
            Redirect::to(&format!("/{}/Admin/Pages?page={}", section.path, last)).into_response(),
        );
    }

    Ok(flash.view(PagesViewModel {
        section_id: section.id,
        pages: list.data,
        paginate,
    }))
}

/// POST /Admin/Pages/Create
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CreatePageForm>,
) -> Json<CreatePageResponse> {
    let page = IntranetPage {
        section_id: form.section_id,
        title: form.title,
        stub: form.stub,
        is_draft: true,
        ..Default::default()
    };

    match state.pages.create(&user, page).await {
        Ok(page) => Json(CreatePageResponse {
            success: true,
            id: Some(page.id),
            message: None,
        }),
        Err(e) => {
            error!("Error adding page: {}", e);
            Json(CreatePageResponse {
                success: false,
                id: None,
                message: Some(user_message(&e)),
            })
        }
    }
}

/// GET /:section/Admin/Pages/Edit/:id
pub async fn edit(
    State(state): State<AppState>,
    _user: CurrentUser,
    flash: Flash,
    Path((section, id)): Path<(String, i64)>,
) -> ApiResult<Response> {
    let section = require_section(&state, &section).await?;

    let page = match state.pages.get_by_id(id).await? {
        Some(page) if page.section_id == section.id => page,
        _ => return Ok(Redirect::to(&format!("/{}/Admin/Pages", section.path)).into_response()),
    };

    let attachments = state.pages.get_attachments(page.id).await?;
    Ok(flash.view(PageDetailViewModel {
        section_id: page.section_id,
        is_draft: page.is_draft,
        page,
        attachments,
    }))
}

/// POST /Admin/Pages/Edit
pub async fn save(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<EditPageForm>,
) -> ApiResult<Response> {
    let index = index_path(&state, form.section_id).await?;
    let edit_path = format!("{}/Edit/{}", index, form.id);

    let page = IntranetPage {
        id: form.id,
        section_id: form.section_id,
        title: form.title,
        stub: form.stub,
        content: form.content,
        is_draft: form.is_draft,
        ..Default::default()
    };

    match state.pages.edit(&user, page).await {
        Ok(page) => Ok(redirect_with_alert(
            &index,
            Alert::success(format!("Updated page: {}", page.title)),
        )),
        Err(Error::Conflict(message)) => Ok(redirect_with_alert(&edit_path, Alert::danger(message))),
        Err(e) => {
            error!("Error editing page: {}", e);
            Ok(redirect_with_alert(&edit_path, error_alert("Unable to update page: ", &e)))
        }
    }
}

/// POST /Admin/Pages/Delete
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<DeletePageForm>,
) -> ApiResult<Response> {
    let index = index_path(&state, form.section_id).await?;
    let to = format!("{}?page={}", index, form.page.unwrap_or(1));

    let alert = match state.pages.delete(&user, form.id).await {
        Ok(()) => Alert::success("Page deleted successfully."),
        Err(e) => {
            error!("Error deleting page: {}", e);
            error_alert("Unable to delete page: ", &e)
        }
    };
    Ok(redirect_with_alert(&to, alert))
}

/// POST /Admin/Pages/StubInUse
pub async fn stub_in_use(
    State(state): State<AppState>,
    _user: CurrentUser,
    Form(form): Form<StubForm>,
) -> ApiResult<Json<bool>> {
    let page = IntranetPage {
        id: form.id,
        section_id: form.section_id,
        stub: form.stub,
        ..Default::default()
    };
    Ok(Json(state.pages.stub_in_use(&page).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:section/Admin/Pages", get(index))
        .route("/:section/Admin/Pages/Edit/:id", get(edit))
        .route("/Admin/Pages/Create", post(create))
        .route("/Admin/Pages/Edit", post(save))
        .route("/Admin/Pages/Delete", post(delete))
        .route("/Admin/Pages/StubInUse", post(stub_in_use))
}
