//! Segment administration

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use stacks_common::db::{Language, Segment, SegmentText};
use stacks_common::pagination::PaginateModel;
use stacks_common::web::{redirect_with_alert, set_alert, Alert, Flash, JsonResponse};
use stacks_common::Error;
use tracing::error;

use super::{escape_html, list_filter, unauthorized};
use crate::auth::claims::application_permission;
use crate::auth::CurrentUser;
use crate::error::{error_alert, user_message, ApiResult};
use crate::services::segment_service::START_AFTER_END_MESSAGE;
use crate::AppState;

const INDEX_PATH: &str = "/SiteManagement/Segments";

fn detail_path(id: i64, language: Option<&str>) -> String {
    match language {
        Some(language) => format!("{}/Detail/{}?language={}", INDEX_PATH, id, language),
        None => format!("{}/Detail/{}", INDEX_PATH, id),
    }
}

fn index_page_path(page: Option<i64>) -> String {
    match page {
        Some(page) if page > 1 => format!("{}/Index/{}", INDEX_PATH, page),
        _ => INDEX_PATH.to_string(),
    }
}

/// Combine separate date and time form fields; blank fields give `None`
pub fn combine_date_time(date: Option<&str>, time: Option<&str>) -> Result<Option<NaiveDateTime>, String> {
    let date = date.map(str::trim).filter(|d| !d.is_empty());
    let time = time.map(str::trim).filter(|t| !t.is_empty());

    let (Some(date), Some(time)) = (date, time) else {
        return Ok(None);
    };

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a valid date.", date))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .map_err(|_| format!("'{}' is not a valid time.", time))?;

    Ok(Some(date.and_time(time)))
}

/// Site managers and web content managers reach every segment; anyone else
/// only segments on Promenade pages their permission groups may edit
async fn has_segment_permission(state: &AppState, user: &CurrentUser, segment_id: i64) -> ApiResult<bool> {
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

    let Some(header_id) = state.segments.get_page_header_id(segment_id).await? else {
        return Ok(false);
    };

    let allowed = state
        .permission_groups
        .get_page_content_permissions(header_id)
        .await?;
    Ok(permission_ids.iter().any(|id| allowed.contains(id)))
}

#[derive(Debug, Serialize)]
pub struct SegmentsViewModel {
    pub segments: Vec<Segment>,
    pub paginate: PaginateModel,
    pub languages: Vec<Language>,
    pub default_language_id: Option<i64>,
    pub available_languages: Vec<String>,
}

async fn render_index(state: AppState, user: CurrentUser, flash: Flash, page: Option<i64>) -> ApiResult<Response> {
    if !user.is_site_manager() {
        return Ok(unauthorized());
    }

    let filter = list_filter(&state, page).await?;
    let list = state.segments.get_paginated_list(&filter).await?;
    let paginate = PaginateModel::new(list.count, &filter);

    if let Some(last) = paginate.last_page() {
        return Ok(Redirect::to(&index_page_path(Some(last))).into_response());
    }

    let languages = state.segments.get_active_languages().await?;
    Ok(flash.view(SegmentsViewModel {
        segments: list.data,
        paginate,
        default_language_id: languages.iter().find(|l| l.is_default).map(|l| l.id),
        available_languages: languages.iter().map(|l| l.name.clone()).collect(),
        languages,
    }))
}

/// GET /SiteManagement/Segments
pub async fn index(State(state): State<AppState>, user: CurrentUser, flash: Flash) -> ApiResult<Response> {
    render_index(state, user, flash, None).await
}

/// GET /SiteManagement/Segments/Index/:page
pub async fn index_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    Path(page): Path<i64>,
) -> ApiResult<Response> {
    render_index(state, user, flash, Some(page)).await
}

#[derive(Debug, Default, Deserialize)]
pub struct SegmentForm {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl SegmentForm {
    fn to_segment(&self) -> Result<Segment, String> {
        let start_date = combine_date_time(self.start_date.as_deref(), self.start_time.as_deref())?;
        let end_date = combine_date_time(self.end_date.as_deref(), self.end_time.as_deref())?;

        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(START_AFTER_END_MESSAGE.to_string());
            }
        }

        Ok(Segment {
            id: self.id,
            name: self.name.clone(),
            is_active: self.is_active,
            start_date,
            end_date,
            ..Default::default()
        })
    }
}

/// POST /SiteManagement/Segments/Create
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<SegmentForm>,
) -> Response {
    if !user.is_site_manager() {
        return unauthorized();
    }

    let segment = match form.to_segment() {
        Ok(segment) => segment,
        Err(message) => return Json(JsonResponse::failed(message)).into_response(),
    };

    match state.segments.create(segment, Some(user.id)).await {
        Ok(segment) => {
            let mut response = Json(JsonResponse::ok(Some(detail_path(segment.id, None)))).into_response();
            set_alert(&mut response, &Alert::success(format!("Created segment: {}", segment.name)));
            response
        }
        Err(e) => Json(JsonResponse::failed(user_message(&e))).into_response(),
    }
}

/// POST /SiteManagement/Segments/Edit
pub async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<SegmentForm>,
) -> Response {
    if !user.is_site_manager() {
        return unauthorized();
    }

    let segment = match form.to_segment() {
        Ok(segment) => segment,
        Err(message) => return Json(JsonResponse::failed(message)).into_response(),
    };

    match state.segments.edit(segment, Some(user.id)).await {
        Ok(segment) => {
            let mut response = Json(JsonResponse::ok(None)).into_response();
            set_alert(&mut response, &Alert::success(format!("Updated segment: {}", segment.name)));
            response
        }
        Err(e) => Json(JsonResponse::failed(user_message(&e))).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteSegmentForm {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub page: Option<i64>,
}

/// Alert text for a segment that could not be deleted; users of the segment
/// are listed as HTML
pub fn delete_failed_message(name: &str, err: &Error) -> String {
    let message = format!("Unable to delete segment \"{}\": {}", escape_html(name), user_message(err));

    match err {
        Error::InUse { used_by, .. } if !used_by.is_empty() => {
            let items: String = used_by
                .iter()
                .map(|item| format!("<li>{}</li>", escape_html(item)))
                .collect();
            format!("{} <ul>{}</ul>", message, items)
        }
        _ => message,
    }
}

/// POST /SiteManagement/Segments/Delete
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<DeleteSegmentForm>,
) -> Response {
    if !user.is_site_manager() {
        return unauthorized();
    }

    let alert = match state.segments.delete(form.id).await {
        Ok(()) => Alert::success(format!("Deleted segment: {}", form.name)),
        Err(e) => {
            if !e.is_user_facing() {
                error!("Error deleting segment: {}", e);
            }
            Alert::danger(delete_failed_message(&form.name, &e))
        }
    };

    redirect_with_alert(&index_page_path(form.page), alert)
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WrapOption {
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SegmentDetailViewModel {
    pub segment_id: i64,
    pub segment_name: String,
    pub segment_start_date: Option<NaiveDateTime>,
    pub segment_end_date: Option<NaiveDateTime>,
    pub segment_wrap_id: Option<i64>,
    pub language_id: i64,
    pub language_description: String,
    pub languages: Vec<Language>,
    pub segment_text: Option<SegmentText>,
    pub new_segment_text: bool,
    pub wraps: Vec<WrapOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

/// Requested language by culture name, falling back to the default
fn select_language<'a>(languages: &'a [Language], requested: Option<&str>) -> Option<&'a Language> {
    requested
        .and_then(|name| languages.iter().find(|l| l.name.eq_ignore_ascii_case(name)))
        .or_else(|| languages.iter().find(|l| l.is_default))
        .or_else(|| languages.first())
}

/// GET /SiteManagement/Segments/Detail/:id
pub async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    Path(id): Path<i64>,
    Query(query): Query<DetailQuery>,
) -> ApiResult<Response> {
    if !has_segment_permission(&state, &user, id).await? {
        return Ok(unauthorized());
    }

    let Some(segment) = state.segments.get_by_id(id).await? else {
        return Ok(redirect_with_alert(
            INDEX_PATH,
            Alert::danger(format!("Could not find Segment with ID: {}", id)),
        ));
    };

    let languages = state.segments.get_active_languages().await?;
    let Some(language) = select_language(&languages, query.language.as_deref()).cloned() else {
        return Ok(redirect_with_alert(INDEX_PATH, Alert::danger("No active languages are configured.")));
    };

    let segment_text = state.segments.get_text(segment.id, language.id).await?;

    let mut wraps: Vec<WrapOption> = state
        .segments
        .get_active_wraps()
        .await?
        .into_iter()
        .map(|w| WrapOption {
            id: Some(w.id),
            name: w.name,
        })
        .collect();
    if !wraps.is_empty() {
        wraps.insert(
            0,
            WrapOption {
                id: None,
                name: "No wrap".to_string(),
            },
        );
    }

    let relationship = state.segments.get_relationship(segment.id).await?;

    Ok(flash.view(SegmentDetailViewModel {
        segment_id: segment.id,
        segment_name: segment.name,
        segment_start_date: segment.start_date,
        segment_end_date: segment.end_date,
        segment_wrap_id: segment.segment_wrap_id,
        language_id: language.id,
        language_description: language.description,
        languages,
        new_segment_text: segment_text.is_none(),
        segment_text,
        wraps,
        relationship,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SegmentTextForm {
    pub language_id: i64,
    /// Blank clears the wrap
    #[serde(default)]
    pub segment_wrap_id: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// POST /SiteManagement/Segments/Detail/:id
pub async fn save_text(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<SegmentTextForm>,
) -> ApiResult<Response> {
    if !has_segment_permission(&state, &user, id).await? {
        return Ok(unauthorized());
    }

    let Some(language) = state.segments.get_active_language(form.language_id).await? else {
        return Ok(redirect_with_alert(
            &detail_path(id, None),
            Alert::danger(format!("Unable to find language id {}", form.language_id)),
        ));
    };
    let to = detail_path(id, Some(&language.name));

    let wrap_id = form
        .segment_wrap_id
        .as_deref()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .and_then(|w| w.parse::<i64>().ok());

    if let Some(segment) = state.segments.get_by_id(id).await? {
        if segment.segment_wrap_id != wrap_id {
            if let Err(e) = state.segments.update_wrap(id, wrap_id, Some(user.id)).await {
                return Ok(redirect_with_alert(&to, error_alert("Unable to update wrap: ", &e)));
            }
        }
    }

    let text = SegmentText {
        segment_id: id,
        language_id: language.id,
        header: form.header,
        text: form.text,
    };

    let result = match state.segments.get_text(id, language.id).await? {
        None => state.segments.create_text(text).await.map(|_| "Added segment text!"),
        Some(_) => state.segments.edit_text(text).await.map(|_| "Updated segment text!"),
    };

    let alert = match result {
        Ok(message) => Alert::success(message),
        Err(e) => error_alert("Unable to save segment text: ", &e),
    };
    Ok(redirect_with_alert(&to, alert))
}

#[derive(Debug, Deserialize)]
pub struct DeleteTextForm {
    pub segment_id: i64,
    pub language_id: i64,
}

/// POST /SiteManagement/Segments/DeleteText
pub async fn delete_text(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<DeleteTextForm>,
) -> ApiResult<Response> {
    if !has_segment_permission(&state, &user, form.segment_id).await? {
        return Ok(unauthorized());
    }

    let Some(language) = state.segments.get_active_language(form.language_id).await? else {
        return Ok(redirect_with_alert(
            &detail_path(form.segment_id, None),
            Alert::danger(format!("Unable to find language id {}", form.language_id)),
        ));
    };

    state
        .segments
        .delete_text(form.segment_id, language.id)
        .await?;

    Ok(redirect_with_alert(
        &detail_path(form.segment_id, Some(&language.name)),
        Alert::success(format!("Deleted Segment {} text!", language.description)),
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(INDEX_PATH, get(index))
        .route("/SiteManagement/Segments/Index/:page", get(index_page))
        .route("/SiteManagement/Segments/Create", post(create))
        .route("/SiteManagement/Segments/Edit", post(edit))
        .route("/SiteManagement/Segments/Delete", post(delete))
        .route("/SiteManagement/Segments/DeleteText", post(delete_text))
        .route(
            "/SiteManagement/Segments/Detail/:id",
            get(detail).post(save_text),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_date_time() {
        let combined = combine_date_time(Some("2024-05-01"), Some("09:30")).unwrap();
        assert_eq!(
            combined,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(9, 30, 0)
        );

        assert_eq!(combine_date_time(Some("2024-05-01"), Some("")).unwrap(), None);
        assert_eq!(combine_date_time(None, Some("09:30")).unwrap(), None);
        assert!(combine_date_time(Some("May 1"), Some("09:30")).is_err());
    }

    #[test]
    fn test_form_end_uses_end_time() {
        let form = SegmentForm {
            name: "Holiday".to_string(),
            start_date: Some("2024-12-24".to_string()),
            start_time: Some("17:00".to_string()),
            end_date: Some("2024-12-24".to_string()),
            end_time: Some("21:00".to_string()),
            ..Default::default()
        };
        let segment = form.to_segment().unwrap();
        assert_eq!(
            segment.end_date,
            NaiveDate::from_ymd_opt(2024, 12, 24).unwrap().and_hms_opt(21, 0, 0)
        );
    }

    #[test]
    fn test_form_rejects_start_after_end() {
        let form = SegmentForm {
            name: "Holiday".to_string(),
            start_date: Some("2024-12-25".to_string()),
            start_time: Some("09:00".to_string()),
            end_date: Some("2024-12-24".to_string()),
            end_time: Some("09:00".to_string()),
            ..Default::default()
        };
        assert_eq!(form.to_segment().unwrap_err(), START_AFTER_END_MESSAGE);
    }

    #[test]
    fn test_delete_failed_message_lists_users() {
        let err = Error::InUse {
            message: "the segment is still in use.".to_string(),
            used_by: vec!["Location: Central".to_string(), "Product: <Kits>".to_string()],
        };
        assert_eq!(
            delete_failed_message("Hours", &err),
            "Unable to delete segment \"Hours\": the segment is still in use. \
             <ul><li>Location: Central</li><li>Product: &lt;Kits&gt;</li></ul>"
        );
    }

    #[test]
    fn test_select_language_falls_back_to_default() {
        let languages = vec![
            Language {
                id: 1,
                name: "en-US".to_string(),
                description: "English".to_string(),
                is_active: true,
                is_default: true,
            },
            Language {
                id: 2,
                name: "es-US".to_string(),
                description: "Spanish".to_string(),
                is_active: true,
                is_default: false,
            },
        ];
        assert_eq!(select_language(&languages, Some("ES-us")).map(|l| l.id), Some(2));
        assert_eq!(select_language(&languages, Some("fr")).map(|l| l.id), Some(1));
        assert_eq!(select_language(&languages, None).map(|l| l.id), Some(1));
    }
}
