//! Flash alerts
//!
//! An alert set while handling a POST survives the redirect in a short-lived
//! cookie and is shown (then cleared) by the next page.

use super::cookies::{get_cookie, SetCookie};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{IntoResponse, Json, Redirect, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

pub const ALERT_COOKIE: &str = "stacks_alert";

const ALERT_MAX_AGE_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Warning,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Danger,
            message: message.into(),
        }
    }

    fn encode(&self) -> Option<String> {
        serde_json::to_vec(self)
            .ok()
            .map(|json| URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(value: &str) -> Option<Self> {
        let json = URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

/// Carry `alert` to the next page rendered after `response`
pub fn set_alert(response: &mut Response, alert: &Alert) {
    if let Some(value) = alert
        .encode()
        .and_then(|encoded| SetCookie::new(ALERT_COOKIE, encoded).max_age(ALERT_MAX_AGE_SECS).to_header_value())
    {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

/// Redirect to `to`, carrying `alert` to the next page
pub fn redirect_with_alert(to: &str, alert: Alert) -> Response {
    let mut response = Redirect::to(to).into_response();
    set_alert(&mut response, &alert);
    response
}

/// Expire the alert cookie on `response`
pub fn clear_alert_cookie(response: &mut Response) {
    if let Some(value) = SetCookie::expire(ALERT_COOKIE).to_header_value() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

/// Pending alert from the previous request, if any
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Option<Alert>);

#[async_trait]
impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flash(
            get_cookie(&parts.headers, ALERT_COOKIE).and_then(|value| Alert::decode(&value)),
        ))
    }
}

#[derive(Serialize)]
struct ViewBody<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    alert: Option<Alert>,
    #[serde(flatten)]
    model: T,
}

impl Flash {
    pub fn alert(&self) -> Option<&Alert> {
        self.0.as_ref()
    }

    /// Render a view model, attaching and then clearing any pending alert
    pub fn view<T: Serialize>(self, model: T) -> Response {
        let had_alert = self.0.is_some();
        let mut response = Json(ViewBody {
            alert: self.0,
            model,
        })
        .into_response();

        if had_alert {
            clear_alert_cookie(&mut response);
        }
        response
    }
}
