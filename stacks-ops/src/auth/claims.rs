//! Claims carried by an authenticated session
//!
//! A claim is a (type, value) pair. Directory groups grant claim types
//! through the `claim_groups` table; a SiteManager claim grants everything.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

/// Claim type names
pub mod claim_type {
    pub const USERNAME: &str = "Username";
    pub const USER_ID: &str = "UserId";
    pub const AUTHENTICATED_AT: &str = "AuthenticatedAt";
    pub const AD_GROUP: &str = "ADGroup";
    pub const PERMISSION_ID: &str = "PermissionId";
    pub const SITE_MANAGER: &str = "SiteManager";
    pub const HAS_CONTENT_ADMIN_RIGHTS: &str = "HasContentAdminRights";
    pub const HAS_SITE_ADMIN_RIGHTS: &str = "HasSiteAdminRights";
}

/// Application permissions granted to permission groups
pub mod application_permission {
    pub const UPDATE_PROFILE_PICTURES: &str = "UpdateProfilePictures";
    pub const WEB_PAGE_CONTENT_MANAGEMENT: &str = "WebPageContentManagement";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

/// Ordered set of claims
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Vec<Claim>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim unless the same (type, value) pair is already present
    pub fn add(&mut self, claim_type: impl Into<String>, value: impl Into<String>) {
        let claim = Claim {
            claim_type: claim_type.into(),
            value: value.into(),
        };
        if !self.0.contains(&claim) {
            self.0.push(claim);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self, claim_type: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    pub fn values<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    pub fn has(&self, claim_type: &str) -> bool {
        self.first(claim_type).is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.first(claim_type::USERNAME)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.first(claim_type::USER_ID)?.parse().ok()
    }

    pub fn is_site_manager(&self) -> bool {
        self.has(claim_type::SITE_MANAGER)
    }

    pub fn permission_ids(&self) -> Vec<i64> {
        self.values(claim_type::PERMISSION_ID)
            .filter_map(|v| v.parse().ok())
            .collect()
    }

    pub fn ad_groups(&self) -> Vec<String> {
        self.values(claim_type::AD_GROUP).map(String::from).collect()
    }
}

/// The signed-in staff member for this request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    /// Nickname when set, otherwise the username
    pub display_name: String,
    pub claims: Claims,
}

impl CurrentUser {
    pub fn is_site_manager(&self) -> bool {
        self.claims.is_site_manager()
    }

    pub fn permission_ids(&self) -> Vec<i64> {
        self.claims.permission_ids()
    }
}

/// Sends requests without a signed-in user to the unauthorized page
#[derive(Debug)]
pub struct NotSignedIn;

impl IntoResponse for NotSignedIn {
    fn into_response(self) -> Response {
        Redirect::to(crate::api::UNAUTHORIZED_PATH).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = NotSignedIn;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(NotSignedIn)
    }
}
