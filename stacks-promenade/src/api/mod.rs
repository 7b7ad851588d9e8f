//! HTTP handlers for the public site

pub mod health;
pub mod help;
pub mod locations;

pub use health::health_routes;
pub use help::help_routes;
pub use locations::location_routes;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use serde::Deserialize;
use std::convert::Infallible;

#[derive(Debug, Default, Deserialize)]
struct ForceReloadParams {
    #[serde(default, rename = "forceReload")]
    force_reload: Option<String>,
}

/// `?forceReload=true` bypasses cached reads for this request
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceReload(pub bool);

#[async_trait]
impl<S> FromRequestParts<S> for ForceReload
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let params = Query::<ForceReloadParams>::try_from_uri(&parts.uri)
            .map(|q| q.0)
            .unwrap_or_default();

        Ok(ForceReload(params.force_reload.is_some_and(|value| {
            value.eq_ignore_ascii_case("true") || value == "1"
        })))
    }
}

/// Visitor's preferred culture name from `Accept-Language`
#[derive(Debug, Clone, Default)]
pub struct Language(pub Option<String>);

impl Language {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// First tag of an `Accept-Language` value, ignoring quality weights
pub fn preferred_language(value: &str) -> Option<String> {
    value
        .split(',')
        .filter_map(|part| part.split(';').next())
        .map(str::trim)
        .find(|tag| !tag.is_empty() && *tag != "*")
        .map(String::from)
}

#[async_trait]
impl<S> FromRequestParts<S> for Language
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Language(
            parts
                .headers
                .get(header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok())
                .and_then(preferred_language),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_language() {
        assert_eq!(
            preferred_language("es-US,es;q=0.9,en;q=0.8").as_deref(),
            Some("es-US")
        );
        assert_eq!(preferred_language(" *;q=0.5, en-US").as_deref(), Some("en-US"));
        assert_eq!(preferred_language(""), None);
    }
}
