//! Promenade page administration
//!
//! Site managers maintain page headers (name and stub). Content for each
//! language can also be edited by permission groups granted that page.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use stacks_common::db::{Language, Page, PageHeader};
use stacks_common::pagination::PaginateModel;
use stacks_common::web::{redirect_with_alert, set_alert, Alert, Flash, JsonResponse};
use tracing::error;

use super::{list_filter, unauthorized, PageQuery};
use crate::auth::claims::application_permission;
use crate::auth::CurrentUser;
use crate::error::{error_alert, user_message, ApiResult};
use crate::AppState;

const INDEX_PATH: &str = "/SiteManagement/Pages";

fn detail_path(id: i64, language: Option<&str>) -> String {
    match language {
        Some(language) => format!("{}/Detail/{}?language={}", INDEX_PATH, id, language),
        None => format!("{}/Detail/{}", INDEX_PATH, id),
    }
}

async fn has_page_permission(state: &AppState, user: &CurrentUser, header_id: i64) -> ApiResult<bool> {
    if state
        .permission_groups
        .has_app_permission(user, application_permission::WEB_PAGE_CONTENT_MANAGEMENT)
        .await?
    {
        return Ok(true);
    }

    let permission_ids = user.permission_ids();
    if permission_ids.is_empty() {
        return Ok(false);
    }

    let allowed = state
        .permission_groups
        .get_page_content_permissions(header_id)
        .await?;
    Ok(permission_ids.iter().any(|id| allowed.contains(id)))
}

#[derive(Debug, Serialize)]
pub struct SitePagesViewModel {
    pub page_headers: Vec<PageHeader>,
    pub paginate: PaginateModel,
}

/// GET /SiteManagement/Pages
pub async fn index(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    Query(query): Query<PageQuery>,
) -> ApiResult<Response> {
    if !user.is_site_manager() {
        return Ok(unauthorized());
    }

    let filter = list_filter(&state, query.page).await?;
    let list = state.site_pages.get_paginated_header_list(&filter).await?;
    let paginate = PaginateModel::new(list.count, &filter);

    if let Some(last) = paginate.last_page() {
        return Ok(Redirect::to(&format!("{}?page={}", INDEX_PATH, last)).into_response());
    }

    Ok(flash.view(SitePagesViewModel {
        page_headers: list.data,
        paginate,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HeaderForm {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub page_name: String,
    #[serde(default)]
    pub stub: String,
}

impl HeaderForm {
    fn to_header(&self) -> PageHeader {
        PageHeader {
            id: self.id,
            page_name: self.page_name.clone(),
            stub: self.stub.clone(),
            ..Default::default()
        }
    }
}

/// POST /SiteManagement/Pages/Create
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<HeaderForm>,
) -> Response {
    if !user.is_site_manager() {
        return unauthorized();
    }

    match state.site_pages.create_header(form.to_header(), Some(user.id)).await {
        Ok(header) => {
            let mut response = Json(JsonResponse::ok(Some(detail_path(header.id, None)))).into_response();
            set_alert(&mut response, &Alert::success(format!("Created page: {}", header.page_name)));
            response
        }
        Err(e) => Json(JsonResponse::failed(user_message(&e))).into_response(),
    }
}

/// POST /SiteManagement/Pages/Edit
pub async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<HeaderForm>,
) -> Response {
    if !user.is_site_manager() {
        return unauthorized();
    }

    match state.site_pages.edit_header(&form.to_header(), Some(user.id)).await {
        Ok(header) => {
            let mut response = Json(JsonResponse::ok(None)).into_response();
            set_alert(&mut response, &Alert::success(format!("Updated page: {}", header.page_name)));
            response
        }
        Err(e) => Json(JsonResponse::failed(user_message(&e))).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteHeaderForm {
    pub id: i64,
    #[serde(default)]
    pub page_name: String,
    #[serde(default)]
    pub page: Option<i64>,
}

/// POST /SiteManagement/Pages/Delete
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<DeleteHeaderForm>,
) -> Response {
    if !user.is_site_manager() {
        return unauthorized();
    }

    let alert = match state.site_pages.delete_header(form.id).await {
        Ok(()) => Alert::success(format!("Deleted page: {}", form.page_name)),
        Err(e) => {
            error!("Error deleting page header {}: {}", form.id, e);
            error_alert("Unable to delete page: ", &e)
        }
    };

    let to = match form.page {
        Some(page) if page > 1 => format!("{}?page={}", INDEX_PATH, page),
        _ => INDEX_PATH.to_string(),
    };
    redirect_with_alert(&to, alert)
}

/// POST /SiteManagement/Pages/StubInUse
pub async fn stub_in_use(
    State(state): State<AppState>,
    _user: CurrentUser,
    Form(form): Form<HeaderForm>,
) -> ApiResult<Json<bool>> {
    Ok(Json(state.site_pages.stub_in_use(&form.to_header()).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SitePageDetailViewModel {
    pub page_header: PageHeader,
    pub language_id: i64,
    pub language_description: String,
    pub languages: Vec<Language>,
    pub page: Option<Page>,
    pub new_page: bool,
    pub stub_url: String,
}

/// GET /SiteManagement/Pages/Detail/:id
pub async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    Path(id): Path<i64>,
    Query(query): Query<DetailQuery>,
) -> ApiResult<Response> {
    if !has_page_permission(&state, &user, id).await? {
        return Ok(unauthorized());
    }

    let Some(header) = state.site_pages.get_header_by_id(id).await? else {
        return Ok(redirect_with_alert(
            INDEX_PATH,
            Alert::danger(format!("Could not find page with ID: {}", id)),
        ));
    };

    let languages = state.segments.get_active_languages().await?;
    let requested = query
        .language
        .as_deref()
        .and_then(|name| languages.iter().find(|l| l.name.eq_ignore_ascii_case(name)));
    let Some(language) = requested
        .or_else(|| languages.iter().find(|l| l.is_default))
        .or_else(|| languages.first())
        .cloned()
    else {
        return Ok(redirect_with_alert(INDEX_PATH, Alert::danger("No active languages are configured.")));
    };

    let page = state
        .site_pages
        .get_by_header_and_language(header.id, language.id)
        .await?;

    Ok(flash.view(SitePageDetailViewModel {
        stub_url: format!("/{}", header.stub),
        page_header: header,
        language_id: language.id,
        language_description: language.description,
        languages,
        new_page: page.is_none(),
        page,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PageContentForm {
    pub language_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

/// POST /SiteManagement/Pages/Detail/:id
pub async fn save_content(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<PageContentForm>,
) -> ApiResult<Response> {
    if !has_page_permission(&state, &user, id).await? {
        return Ok(unauthorized());
    }

    let Some(language) = state.segments.get_active_language(form.language_id).await? else {
        return Ok(redirect_with_alert(
            &detail_path(id, None),
            Alert::danger(format!("Unable to find language id {}", form.language_id)),
        ));
    };
    let to = detail_path(id, Some(&language.name));

    let page = Page {
        page_header_id: id,
        language_id: language.id,
        title: form.title,
        content: form.content,
        is_published: form.is_published,
    };

    let result = match state
        .site_pages
        .get_by_header_and_language(id, language.id)
        .await?
    {
        None => state.site_pages.create(page).await.map(|_| "Added page content!"),
        Some(_) => state.site_pages.edit(page).await.map(|_| "Updated page content!"),
    };

    let alert = match result {
        Ok(message) => Alert::success(message),
        Err(e) => error_alert("Unable to save page content: ", &e),
    };
    Ok(redirect_with_alert(&to, alert))
}

#[derive(Debug, Deserialize)]
pub struct DeleteContentForm {
    pub page_header_id: i64,
    pub language_id: i64,
}

/// POST /SiteManagement/Pages/DeleteContent
pub async fn delete_content(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<DeleteContentForm>,
) -> ApiResult<Response> {
    if !has_page_permission(&state, &user, form.page_header_id).await? {
        return Ok(unauthorized());
    }

    let Some(language) = state.segments.get_active_language(form.language_id).await? else {
        return Ok(redirect_with_alert(
            &detail_path(form.page_header_id, None),
            Alert::danger(format!("Unable to find language id {}", form.language_id)),
        ));
    };

    let page = Page {
        page_header_id: form.page_header_id,
        language_id: language.id,
        ..Default::default()
    };
    state.site_pages.delete(&page).await?;

    Ok(redirect_with_alert(
        &detail_path(form.page_header_id, Some(&language.name)),
        Alert::success(format!("Deleted page {} content!", language.description)),
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(INDEX_PATH, get(index))
        .route("/SiteManagement/Pages/Create", post(create))
        .route("/SiteManagement/Pages/Edit", post(edit))
        .route("/SiteManagement/Pages/Delete", post(delete))
        .route("/SiteManagement/Pages/StubInUse", post(stub_in_use))
        .route("/SiteManagement/Pages/DeleteContent", post(delete_content))
        .route(
            "/SiteManagement/Pages/Detail/:id",
            get(detail).post(save_content),
        )
}
