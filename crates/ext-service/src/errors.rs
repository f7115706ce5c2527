//! Extension service error types.
//!
//! Every authentication failure collapses into a single generic 401 so that
//! callers cannot distinguish an expired token from a forged one. The
//! specific reason is logged server-side by the gate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Value of the `WWW-Authenticate` header on 401 responses.
pub const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"ext-api\"";

/// Extension service error type.
///
/// Maps to HTTP status codes:
/// - Unauthorized: 401 Unauthorized
/// - BadRequest: 400 Bad Request
#[derive(Debug, Error)]
pub enum ExtError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ExtError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ExtError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            ExtError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = WWW_AUTHENTICATE_VALUE.parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_response_is_generic() {
        let response = ExtError::Unauthorized.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("WWW-Authenticate").unwrap(),
            WWW_AUTHENTICATE_VALUE
        );

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_bad_request_carries_reason() {
        let response = ExtError::BadRequest("asset must be a number".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert_eq!(body["error"]["message"], "asset must be a number");
    }
}
