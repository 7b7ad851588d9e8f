//! Staff profiles
//!
//! Profiles are addressed by directory username. Only the owner edits their
//! nickname and location; pictures are managed by site managers and holders
//! of the UpdateProfilePictures permission.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use stacks_common::db::{Location, User, UserNameUsername};
use stacks_common::web::cookies::SetCookie;
use stacks_common::web::{redirect_with_alert, Alert, Flash};
use tracing::info;

use super::unauthorized;
use crate::auth::claims::{application_permission, claim_type};
use crate::auth::sessions::{self, SESSION_COOKIE};
use crate::auth::CurrentUser;
use crate::db::locations;
use crate::error::{error_alert, ApiResult};
use crate::AppState;

const PROFILE_PATH: &str = "/Profile";
const CROP_DIMENSION: u32 = 700;

fn profile_path(username: Option<&str>) -> String {
    match username.filter(|u| !u.is_empty()) {
        Some(username) => format!("{}/{}", PROFILE_PATH, username),
        None => PROFILE_PATH.to_string(),
    }
}

async fn can_update_pictures(state: &AppState, user: &CurrentUser) -> ApiResult<bool> {
    Ok(state
        .permission_groups
        .has_app_permission(user, application_permission::UPDATE_PROFILE_PICTURES)
        .await?)
}

#[derive(Debug, Serialize)]
pub struct ProfileViewModel {
    pub user: User,
    pub supervisor: Option<User>,
    pub direct_reports: Vec<UserNameUsername>,
    pub locations: Vec<Location>,
    pub picture_path: Option<String>,
    pub can_update_picture: bool,
    pub can_view_last_seen: bool,
    pub user_viewing_self: bool,
    pub can_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

async fn render_profile(
    state: AppState,
    current: CurrentUser,
    flash: Flash,
    id: Option<String>,
) -> ApiResult<Response> {
    let user_viewing_self = id
        .as_deref()
        .map_or(true, |id| id.is_empty() || id == current.username);

    let user = if user_viewing_self {
        state.users.get_by_id(current.id).await?
    } else {
        let username = id.as_deref().unwrap_or_default();
        match state.users.lookup_user(username).await? {
            Some(user) => Some(user),
            None => {
                return Ok(redirect_with_alert(
                    "/Users",
                    Alert::danger(format!("Could not find user with username: {}", username)),
                ))
            }
        }
    };
    let Some(user) = user else {
        return Ok(unauthorized());
    };

    let picture_path = user
        .picture_filename
        .as_ref()
        .map(|_| format!("{}/Picture/{}", PROFILE_PATH, user.username.as_deref().unwrap_or_default()));

    let supervisor = match user.supervisor_id {
        Some(supervisor_id) => state.users.get_by_id(supervisor_id).await?,
        None => None,
    };
    let direct_reports = state.users.get_direct_reports(user.id).await?;

    let (authenticated_at, permissions) = if user_viewing_self {
        let authenticated_at = current
            .claims
            .first(claim_type::AUTHENTICATED_AT)
            .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
            .map(|at| at.naive_utc());

        let mut permissions = Vec::new();
        if current.is_site_manager() {
            permissions.push("Site manager".to_string());
        }
        let ids = current.permission_ids();
        if !ids.is_empty() {
            let mut names: Vec<String> = state
                .permission_groups
                .get_groups_by_ids(&ids)
                .await?
                .into_iter()
                .map(|g| g.permission_group_name)
                .collect();
            names.sort();
            permissions.extend(names);
        }
        (authenticated_at, permissions)
    } else {
        (None, Vec::new())
    };

    Ok(flash.view(ProfileViewModel {
        can_edit: user.id == current.id,
        can_update_picture: can_update_pictures(&state, &current).await?,
        can_view_last_seen: current.is_site_manager(),
        locations: locations::get_all(&state.db).await?,
        user,
        supervisor,
        direct_reports,
        picture_path,
        user_viewing_self,
        authenticated_at,
        permissions,
    }))
}

/// GET /Profile
pub async fn index(State(state): State<AppState>, user: CurrentUser, flash: Flash) -> ApiResult<Response> {
    render_profile(state, user, flash, None).await
}

/// GET /Profile/:id
pub async fn show(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    render_profile(state, user, flash, Some(id)).await
}

#[derive(Debug, Deserialize)]
pub struct NicknameForm {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
}

/// POST /Profile/EditNickname
pub async fn edit_nickname(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<NicknameForm>,
) -> Response {
    if form.user_id != user.id {
        return unauthorized();
    }

    let alert = match state.users.edit_nickname(user.id, &form.nickname, user.id).await {
        Ok(updated) => Alert::success(format!(
            "Updated nickname: {}",
            updated.nickname.unwrap_or_default()
        )),
        Err(e) => error_alert("Unable to update nickname: ", &e),
    };
    redirect_with_alert(PROFILE_PATH, alert)
}

/// POST /Profile/Reauthenticate
///
/// Ends the user's sessions; the next request goes through the directory
/// handshake again and picks up fresh groups.
pub async fn reauthenticate(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Response> {
    let removed = sessions::remove_for_user(&state.db, user.id).await?;
    info!(user_id = user.id, sessions = removed, "Signed out to reauthenticate");

    let mut response = Redirect::to(PROFILE_PATH).into_response();
    if let Some(value) = SetCookie::expire(SESSION_COOKIE).to_header_value() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct UserIdForm {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// POST /Profile/UnsetManualLocation
pub async fn unset_manual_location(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<UserIdForm>,
) -> ApiResult<Response> {
    if form.user_id != user.id {
        return Ok(unauthorized());
    }

    state.users.unset_manual_location(user.id, user.id).await?;
    Ok(Redirect::to(PROFILE_PATH).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LocationForm {
    pub user_id: i64,
    pub location_id: i64,
}

/// POST /Profile/UpdateLocation
pub async fn update_location(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<LocationForm>,
) -> ApiResult<Response> {
    if form.user_id != user.id {
        return Ok(unauthorized());
    }

    state
        .users
        .update_location(user.id, form.location_id, user.id)
        .await?;
    Ok(Redirect::to(PROFILE_PATH).into_response())
}

/// POST /Profile/RemovePicture
pub async fn remove_picture(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<UserIdForm>,
) -> ApiResult<Response> {
    if !can_update_pictures(&state, &user).await? {
        return Ok(unauthorized());
    }

    state.users.remove_picture(form.user_id, user.id).await?;
    Ok(Redirect::to(&profile_path(form.username.as_deref())).into_response())
}

#[derive(Debug, Deserialize)]
pub struct UploadPictureForm {
    pub user_id: i64,
    /// Cropped image as a data URL
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// POST /Profile/UploadPicture
pub async fn upload_picture(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<UploadPictureForm>,
) -> ApiResult<Response> {
    if !can_update_pictures(&state, &user).await? {
        return Ok(unauthorized());
    }

    let Some(target) = state.users.get_by_id(form.user_id).await? else {
        return Ok(redirect_with_alert(PROFILE_PATH, Alert::danger("Unable to find that user.")));
    };
    let to = profile_path(target.username.as_deref());

    let picture = form
        .profile_picture
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let Some(picture) = picture else {
        return Ok(redirect_with_alert(
            &to,
            Alert::warning("You must upload a file to replace a profile image."),
        ));
    };

    match state.users.upload_picture(target.id, picture, user.id).await {
        Ok(_) => Ok(Redirect::to(&to).into_response()),
        Err(e) => Ok(redirect_with_alert(&to, error_alert("Problem with upload: ", &e))),
    }
}

/// GET /Profile/Picture/:id
pub async fn picture(State(state): State<AppState>, _user: CurrentUser, Path(id): Path<String>) -> ApiResult<Response> {
    let Some(owner) = state.users.lookup_user(&id).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let Some(picture) = state.users.get_profile_picture(owner.id).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let mut response = Response::new(Body::from(picture.bytes));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(picture.content_type));
    Ok(response)
}

#[derive(Debug, Serialize)]
pub struct UpdatePictureViewModel {
    pub user: User,
    pub crop_height: u32,
    pub crop_width: u32,
    pub display_dimension: u32,
}

/// GET /Profile/UpdatePicture/:id
pub async fn update_picture(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    if !can_update_pictures(&state, &user).await? {
        return Ok(unauthorized());
    }

    let Some(target) = state.users.get_by_id(id).await? else {
        return Ok(redirect_with_alert(PROFILE_PATH, Alert::danger("Unable to find that user.")));
    };

    Ok(flash.view(UpdatePictureViewModel {
        user: target,
        crop_height: CROP_DIMENSION,
        crop_width: CROP_DIMENSION,
        display_dimension: CROP_DIMENSION,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(PROFILE_PATH, get(index))
        .route("/Profile/:id", get(show))
        .route("/Profile/EditNickname", post(edit_nickname))
        .route("/Profile/Reauthenticate", post(reauthenticate))
        .route("/Profile/UnsetManualLocation", post(unset_manual_location))
        .route("/Profile/UpdateLocation", post(update_location))
        .route("/Profile/RemovePicture", post(remove_picture))
        .route("/Profile/UploadPicture", post(upload_picture))
        .route("/Profile/Picture/:id", get(picture))
        .route("/Profile/UpdatePicture/:id", get(update_picture))
}
