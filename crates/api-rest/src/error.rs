//! HTTP error mapping.
//!
//! [`ApiError`] answers JSON endpoints with `{"error": ...}`; [`PageError`] answers
//! browser navigation with a rendered error page.

use api_shared::ErrorRes;
use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clinica_core::ClinicError;

use crate::pages;

/// Status code and client-facing message for a core error.
///
/// Internal errors are logged here and reported with a generic message.
fn status_and_message(err: &ClinicError) -> (StatusCode, String) {
    match err {
        ClinicError::Validation(msg) | ClinicError::Conflict(msg) => {
            (StatusCode::BAD_REQUEST, msg.clone())
        }
        ClinicError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        ClinicError::Unauthenticated | ClinicError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, err.to_string())
        }
        ClinicError::Forbidden | ClinicError::InactiveAccount => {
            (StatusCode::FORBIDDEN, err.to_string())
        }
        ClinicError::InvalidConfig(_)
        | ClinicError::Database(_)
        | ClinicError::Migration(_)
        | ClinicError::PasswordHash(_)
        | ClinicError::CorruptRecord(_) => {
            tracing::error!("Internal error: {:?}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Clinic(#[from] ClinicError),
    /// A request body, query string or path segment that could not be decoded.
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::Clinic(err) => status_and_message(err),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };
        (status, Json(ErrorRes { error })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Error type of HTML page handlers.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error(transparent)]
    Clinic(#[from] ClinicError),
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            PageError::Clinic(err) => status_and_message(err),
            PageError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };
        (status, pages::html(pages::error_page(status, &message))).into_response()
    }
}

impl From<QueryRejection> for PageError {
    fn from(rejection: QueryRejection) -> Self {
        PageError::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for PageError {
    fn from(rejection: FormRejection) -> Self {
        PageError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_http_statuses() {
        let cases = [
            (ClinicError::validation("x"), StatusCode::BAD_REQUEST),
            (ClinicError::conflict("x"), StatusCode::BAD_REQUEST),
            (ClinicError::not_found("x"), StatusCode::NOT_FOUND),
            (ClinicError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ClinicError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ClinicError::Forbidden, StatusCode::FORBIDDEN),
            (ClinicError::InactiveAccount, StatusCode::FORBIDDEN),
            (
                ClinicError::PasswordHash("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let (_, message) = status_and_message(&ClinicError::CorruptRecord("user 1".into()));
        assert_eq!(message, "Internal server error");
    }

    #[tokio::test]
    async fn unauthenticated_requests_get_a_json_message() {
        use http_body_util::BodyExt;

        let response = ApiError::from(ClinicError::Unauthenticated).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Authentication required");
    }
}
