//! Authentication middleware
//!
//! With no directory redirect configured, requests continue without a signed-in
//! user. A request with a live session continues straight away. Anything else
//! goes through the directory handshake:
//!
//! 1. Ops gives the browser a handshake id cookie, stores the current URL
//!    under that id in the distributed cache and redirects to the directory.
//! 2. The directory authenticates the person and writes their username and
//!    group names under the same id, then sends the browser back.
//! 3. Ops finds the username, syncs the user record with the directory,
//!    builds claims from the groups and opens a session.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use stacks_common::cache::keys;
use stacks_common::db::{ClaimGroup, PermissionGroup, User};
use stacks_common::web::cookies::{get_cookie, SetCookie};
use std::time::Duration;
use tracing::{field, info, info_span, Instrument, Span};
use uuid::Uuid;

use super::claims::{claim_type, Claims, CurrentUser};
use super::sessions::{self, SESSION_COOKIE, SESSION_LIFETIME_HOURS};
use super::AUTH_ID_COOKIE;
use crate::error::ApiResult;
use crate::AppState;

pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let route = request.uri().path().to_string();
    let span = info_span!(
        "ops_request",
        route = %route,
        user_id = field::Empty,
        username = field::Empty
    );

    if !state.auth.is_enabled() {
        return Ok(next.run(request).instrument(span).await);
    }

    let now = state.clock.now();
    let mut cookies: Vec<SetCookie> = Vec::new();

    if let Some(token) = get_cookie(request.headers(), SESSION_COOKIE) {
        if let Some(current) = resume_session(&state, &token, now).await? {
            record_user(&span, &current);
            request.extensions_mut().insert(current);
            return Ok(next.run(request).instrument(span).await);
        }
        sessions::remove(&state.db, &token).await?;
        cookies.push(SetCookie::expire(SESSION_COOKIE));
    }

    let timeout_secs = state.auth.timeout_minutes * 60;
    let ttl = Duration::from_secs(u64::try_from(timeout_secs).unwrap_or(120));

    let id = match get_cookie(request.headers(), AUTH_ID_COOKIE) {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            cookies.push(SetCookie::new(AUTH_ID_COOKIE, id.clone()).max_age(timeout_secs));
            id
        }
    };

    let Some(directory_username) = state.cache.get_string(&keys::ops_username(&id)).await? else {
        let return_url = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| route.clone());
        state
            .cache
            .save_string(&keys::ops_return(&id), &return_url, ttl)
            .await?;

        let handshake = state.auth.handshake_url(&id).unwrap_or_default();
        info!(route = %route, "Redirecting to directory for authentication");
        return Ok(with_cookies(Redirect::to(&handshake).into_response(), &cookies));
    };

    state.cache.remove(&keys::ops_username(&id)).await?;
    let username = state.auth.strip_domain(&directory_username).to_string();

    let user = sync_user(&state, &username, now).await?;
    let groups = take_groups(&state, &id).await?;
    let claims = build_claims(&state, &user, &username, now, groups).await?;

    let token = sessions::create(&state.db, user.id, &claims, now).await?;
    cookies.push(SetCookie::new(SESSION_COOKIE, token).max_age(SESSION_LIFETIME_HOURS * 3600));

    state.cache.remove(&keys::ops_return(&id)).await?;
    cookies.push(SetCookie::expire(AUTH_ID_COOKIE));

    let current = CurrentUser {
        id: user.id,
        username,
        display_name: user.display_name(),
        claims,
    };
    info!(user_id = current.id, username = %current.username, "Signed in");
    record_user(&span, &current);
    request.extensions_mut().insert(current);

    let response = next.run(request).instrument(span).await;
    Ok(with_cookies(response, &cookies))
}

fn record_user(span: &Span, user: &CurrentUser) {
    span.record("user_id", user.id);
    span.record("username", user.username.as_str());
}

fn with_cookies(mut response: Response, cookies: &[SetCookie]) -> Response {
    for cookie in cookies {
        if let Some(value) = cookie.to_header_value() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// Session user, unless the user is gone or must sign in again
async fn resume_session(
    state: &AppState,
    token: &str,
    now: chrono::NaiveDateTime,
) -> ApiResult<Option<CurrentUser>> {
    let Some(claims) = sessions::find(&state.db, token, now).await? else {
        return Ok(None);
    };
    let Some(username) = claims.username().map(String::from) else {
        return Ok(None);
    };

    match state.users.lookup_user(&username).await? {
        Some(user) if !user.reauthenticate_user => Ok(Some(CurrentUser {
            id: user.id,
            display_name: user.display_name(),
            username,
            claims,
        })),
        _ => {
            info!(username = %username, "Session user must authenticate again");
            Ok(None)
        }
    }
}

/// Bring the local user record in line with the directory
async fn sync_user(state: &AppState, username: &str, now: chrono::NaiveDateTime) -> ApiResult<User> {
    let existing = state.users.lookup_user(username).await?;
    let is_new = existing.is_none();

    let user = existing.unwrap_or_else(|| User {
        username: Some(username.to_string()),
        last_seen: Some(now),
        ..Default::default()
    });
    let user = state.directory.lookup_by_username(user);

    if !is_new {
        return Ok(state.users.logged_in_update(user).await?);
    }

    match state.users.lookup_user_by_email(user.email.as_deref()).await? {
        Some(roster_user) => {
            info!(
                username = %username,
                email = ?user.email,
                "New user found in roster by email"
            );
            Ok(state.users.update_roster_user(roster_user.id, user).await?)
        }
        None => {
            info!(username = %username, "New user, adding to database");
            Ok(state.users.add_user(user).await?)
        }
    }
}

/// Directory groups for handshake `id`, removed from the cache as they are read
async fn take_groups(state: &AppState, id: &str) -> ApiResult<Vec<String>> {
    let mut groups = Vec::new();
    let mut n = 1;
    while let Some(group) = state.cache.get_string(&keys::ops_group(id, n)).await? {
        state.cache.remove(&keys::ops_group(id, n)).await?;
        groups.push(group);
        n += 1;
    }
    Ok(groups)
}

/// Rights collected from a user's directory groups
#[derive(Debug, Default, PartialEq, Eq)]
pub struct GroupRights {
    pub is_site_manager: bool,
    /// Claim type and the group that granted it, first group wins
    pub claimant_of: Vec<(String, String)>,
    pub permission_ids: Vec<i64>,
}

/// Walk the groups in order; once a group grants SiteManager the rest add
/// nothing further
pub fn collect_group_rights(
    groups: &[String],
    claim_groups: &[ClaimGroup],
    permission_groups: &[PermissionGroup],
) -> GroupRights {
    let mut rights = GroupRights::default();

    for group in groups {
        if rights.is_site_manager {
            break;
        }

        for claim in claim_groups.iter().filter(|c| &c.group_name == group) {
            if !rights.claimant_of.iter().any(|(t, _)| *t == claim.claim_type) {
                rights
                    .claimant_of
                    .push((claim.claim_type.clone(), group.clone()));
            }
        }

        rights.permission_ids.extend(
            permission_groups
                .iter()
                .filter(|p| &p.group_name == group)
                .map(|p| p.id),
        );

        rights.is_site_manager = rights
            .claimant_of
            .iter()
            .any(|(t, _)| t == claim_type::SITE_MANAGER);
    }

    rights
}

async fn build_claims(
    state: &AppState,
    user: &User,
    username: &str,
    now: chrono::NaiveDateTime,
    groups: Vec<String>,
) -> ApiResult<Claims> {
    let mut claims = Claims::new();
    claims.add(claim_type::USERNAME, username);
    claims.add(claim_type::USER_ID, user.id.to_string());
    claims.add(
        claim_type::AUTHENTICATED_AT,
        now.and_utc().to_rfc3339(),
    );

    for group in &groups {
        claims.add(claim_type::AD_GROUP, group.as_str());
    }

    let claim_groups = state.authorization.get_claim_groups().await?;
    let permission_groups = state.authorization.get_permission_groups().await?;
    let rights = collect_group_rights(&groups, &claim_groups, &permission_groups);

    if rights.is_site_manager {
        for claim in &claim_groups {
            claims.add(claim.claim_type.as_str(), claim_type::SITE_MANAGER);
        }
        for group in &permission_groups {
            claims.add(claim_type::PERMISSION_ID, group.id.to_string());
        }
        claims.add(claim_type::HAS_CONTENT_ADMIN_RIGHTS, claim_type::HAS_CONTENT_ADMIN_RIGHTS);
        claims.add(claim_type::HAS_SITE_ADMIN_RIGHTS, claim_type::HAS_SITE_ADMIN_RIGHTS);
    } else {
        for (claim, group) in &rights.claimant_of {
            claims.add(claim.as_str(), group.as_str());
        }
        for id in &rights.permission_ids {
            claims.add(claim_type::PERMISSION_ID, id.to_string());
        }
        for admin_claim in state
            .authorization
            .get_admin_claims(&rights.permission_ids)
            .await?
        {
            claims.add(admin_claim, admin_claim);
        }
    }

    Ok(claims)
}
