//! Web helpers shared by the Ops and Promenade routers

pub mod alerts;
pub mod cookies;
pub mod markdown;

use serde::Serialize;

pub use alerts::{clear_alert_cookie, redirect_with_alert, set_alert, Alert, AlertLevel, Flash};
pub use markdown::markdown_to_html;

/// Result of an action invoked from a script rather than a form post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl JsonResponse {
    pub fn ok(url: Option<String>) -> Self {
        Self {
            success: true,
            message: None,
            url,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            url: None,
        }
    }
}
