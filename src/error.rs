use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::services::platform::PlatformError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Security check failed")]
    SecurityCheckFailed,

    #[error("OAuth token exchange failed: {0}")]
    OAuthExchangeFailed(String),

    #[error("OAuth token response invalid: {0}")]
    OAuthResponseInvalid(String),

    #[error("Missing OAuth scopes: {0}")]
    MissingScopes(String),

    #[error("Invalid order data: {0}")]
    InvalidOrderData(String),

    #[error("Order is locked: {0}")]
    OrderLocked(String),

    #[error("Platform error: {0}")]
    Platform(PlatformError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Error::OrderLocked(msg) => (StatusCode::CONFLICT, msg),
            Error::SecurityCheckFailed => (
                StatusCode::FORBIDDEN,
                "Security check failed. Please reload the page and try again.".to_string(),
            ),
            Error::MissingScopes(message) => {
                let body = Json(json!({ "error": "MISSING_SCOPES", "message": message }));
                return (StatusCode::FORBIDDEN, body).into_response();
            }
            Error::OAuthExchangeFailed(msg) | Error::OAuthResponseInvalid(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Could not connect the store: {}. Please try connecting again.", msg),
            ),
            Error::InvalidOrderData(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Error::Platform(err) => (
                StatusCode::BAD_GATEWAY,
                format!("External service error: {}", err),
            ),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => {
                Error::Conflict(db.message().to_string())
            }
            other => Error::Database(other),
        }
    }
}

impl From<PlatformError> for Error {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::MissingScopes { message } => Error::MissingScopes(message),
            other => Error::Platform(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct PgFailure {
        code: &'static str,
        message: &'static str,
    }

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                "23505" => ErrorKind::UniqueViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(code: &'static str, message: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgFailure { code, message }))
    }

    #[test]
    fn unique_violation_becomes_conflict() {
        let err = Error::from(db_error(
            "23505",
            "duplicate key value violates unique constraint \"orders_platform_order_key\"",
        ));
        match err {
            Error::Conflict(msg) => assert!(msg.contains("orders_platform_order_key")),
            other => panic!("unexpected error: {:?}", other),
        }
        let response = Error::from(db_error("23505", "duplicate")).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn other_database_errors_stay_internal() {
        let err = Error::from(db_error("23503", "foreign key violation"));
        assert!(matches!(err, Error::Database(_)));
        assert!(matches!(
            Error::from(sqlx::Error::RowNotFound),
            Error::NotFound(_)
        ));
    }
}
