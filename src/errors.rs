use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Precondition(String),

    #[error("payment gateway error: {0}")]
    Upstream(String),

    #[error("invalid notification signature")]
    InvalidSignature,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl AppError {
    /// Upstream and storage failures are operational; everything else is an
    /// expected outcome of a client request.
    pub fn is_operational(&self) -> bool {
        matches!(self, AppError::Upstream(_) | AppError::Database(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Precondition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidSignature => StatusCode::FORBIDDEN,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.is_operational() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("taken".into()), StatusCode::CONFLICT),
            (AppError::NotFound("court".into()), StatusCode::NOT_FOUND),
            (
                AppError::Precondition("not booked".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppError::Upstream("timeout".into()), StatusCode::BAD_GATEWAY),
            (AppError::InvalidSignature, StatusCode::FORBIDDEN),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_operational_kinds() {
        assert!(AppError::Upstream("down".into()).is_operational());
        assert!(AppError::Database(rusqlite::Error::QueryReturnedNoRows).is_operational());
        assert!(!AppError::Conflict("taken".into()).is_operational());
        assert!(!AppError::Precondition("not booked".into()).is_operational());
    }
}
