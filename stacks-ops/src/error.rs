//! Error types for stacks-ops

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stacks_common::web::Alert;
use thiserror::Error;
use tracing::error;

pub const GENERIC_MESSAGE: &str = "An error occurred while processing your request.";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Signed in but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// stacks-common error
    #[error(transparent)]
    Common(#[from] stacks_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use stacks_common::Error as E;

        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Common(E::NotFound(msg)) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Common(E::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(err) if err.is_user_facing() => {
                (StatusCode::CONFLICT, "CONFLICT", err.to_string())
            }
            ApiError::Common(err) => {
                error!("Request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    GENERIC_MESSAGE.to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Message safe to show the person who made the request; anything else is
/// logged and replaced
pub fn user_message(err: &stacks_common::Error) -> String {
    if err.is_user_facing() {
        err.to_string()
    } else {
        error!("Request failed: {}", err);
        GENERIC_MESSAGE.to_string()
    }
}

/// Danger alert for a failed form post, as `"{prefix}{message}"`
pub fn error_alert(prefix: &str, err: &stacks_common::Error) -> Alert {
    Alert::danger(format!("{}{}", prefix, user_message(err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let not_found: ApiError = stacks_common::Error::NotFound("gone".into()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let in_use: ApiError = stacks_common::Error::InUse {
            message: "busy".into(),
            used_by: vec![],
        }
        .into();
        assert_eq!(in_use.into_response().status(), StatusCode::CONFLICT);

        let forbidden = ApiError::Forbidden("no".into());
        assert_eq!(forbidden.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_error_alert_hides_internal_details() {
        let alert = error_alert(
            "Unable to update page: ",
            &stacks_common::Error::Internal("disk on fire".into()),
        );
        assert_eq!(alert.message, format!("Unable to update page: {}", GENERIC_MESSAGE));

        let alert = error_alert(
            "Unable to update page: ",
            &stacks_common::Error::Conflict("Stub taken".into()),
        );
        assert_eq!(alert.message, "Unable to update page: Stub taken");
    }
}
