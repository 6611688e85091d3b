/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - TokenError / AuthFailure を統一的に変換
 * - 401 には bearer challenge (WWW-Authenticate) を付ける
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::access_token::TokenError;
use crate::services::auth::AuthFailure;

pub const BEARER_CHALLENGE: &str = r#"Bearer realm="access-tokens""#;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message),
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, "FORBIDDEN", message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
            AppError::Conflict(message) => (StatusCode::CONFLICT, "CONFLICT", message),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BEARER_CHALLENGE),
            );
        }
        response
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Validation { reason, .. } => {
                AppError::bad_request("VALIDATION_ERROR", reason)
            }
            e @ TokenError::Duplicate { .. } => AppError::Conflict(e.to_string()),
            e @ TokenError::NotFound { .. } => AppError::NotFound(e.to_string()),
            // Already logged where they happened.
            TokenError::Store(_) | TokenError::Entropy(_) => AppError::Internal,
        }
    }
}

impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        AppError::Unauthorized(failure.to_string())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn unauthorized_carries_bearer_challenge_and_message() -> TestResult {
        let response = AppError::from(AuthFailure::Expired).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE),
            Some(&HeaderValue::from_static(BEARER_CHALLENGE))
        );

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["error"]["message"], "Specified token is expired");

        Ok(())
    }

    #[test]
    fn token_errors_map_to_statuses() {
        let cases = [
            (TokenError::duplicate("a"), StatusCode::CONFLICT),
            (TokenError::not_found("a"), StatusCode::NOT_FOUND),
            (
                TokenError::validation(crate::services::access_token::error::TokenField::Name, "x"),
                StatusCode::BAD_REQUEST,
            ),
            (TokenError::Entropy("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
            assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        }
    }
}
