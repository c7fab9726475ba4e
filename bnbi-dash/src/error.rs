//! Error types for bnbi-dash

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bnbi_common::Error as CommonError;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// bnbi-common error; status depends on the variant
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Common(err) => match err {
                CommonError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                CommonError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                CommonError::MalformedPrice { .. }
                | CommonError::MissingColumn(_)
                | CommonError::UnmappedFlag { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "DATA_INTEGRITY"),
                CommonError::Source(_) | CommonError::Database(_) => (StatusCode::BAD_GATEWAY, "SOURCE_ERROR"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let bad: ApiError = CommonError::InvalidInput("x".into()).into();
        assert_eq!(bad.status_and_code().0, StatusCode::BAD_REQUEST);

        let integrity: ApiError = CommonError::MalformedPrice {
            row: 3,
            value: "abc".into(),
        }
        .into();
        assert_eq!(integrity.status_and_code(), (StatusCode::UNPROCESSABLE_ENTITY, "DATA_INTEGRITY"));

        let source: ApiError = CommonError::Source("down".into()).into();
        assert_eq!(source.status_and_code().0, StatusCode::BAD_GATEWAY);
    }
}
