//! Error types for formkit.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

static EXPOSE_INTERNAL_DETAILS: AtomicBool = AtomicBool::new(false);

/// Controls whether server error responses carry the underlying message.
///
/// Off by default; the server turns it on in development.
pub fn expose_internal_details(enabled: bool) {
    EXPOSE_INTERNAL_DETAILS.store(enabled, Ordering::Relaxed);
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,

            // 5xx Server Errors
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code used in logs.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Message placed in the response body.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_server_error() && !EXPOSE_INTERNAL_DETAILS.load(Ordering::Relaxed) {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "statusCode": status.as_u16(),
            "message": self.public_message(),
            "error": status.canonical_reason().unwrap_or("Error"),
        }));

        (status, body).into_response()
    }
}

/// Picks the message of the first failing field.
///
/// Fields named in `order` are tried first, in that order; any others follow
/// alphabetically. Nested structs and lists are searched depth-first.
#[must_use]
pub fn first_validation_message(errors: &ValidationErrors, order: &[&str]) -> String {
    find_message(errors, order).unwrap_or_else(|| "Validation failed".to_string())
}

fn find_message(errors: &ValidationErrors, order: &[&str]) -> Option<String> {
    let map = errors.errors();
    let mut rest: Vec<&str> = map
        .keys()
        .map(AsRef::as_ref)
        .filter(|field| !order.contains(field))
        .collect();
    rest.sort_unstable();

    order
        .iter()
        .copied()
        .chain(rest)
        .filter_map(|field| map.get(field).map(|kind| (field, kind)))
        .find_map(|(field, kind)| match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|err| {
                err.message
                    .as_ref()
                    .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
            }),
            ValidationErrorsKind::Struct(inner) => find_message(inner, &[]),
            ValidationErrorsKind::List(items) => {
                items.values().find_map(|inner| find_message(inner, &[]))
            }
        })
}

// === From implementations ===

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        Self::Validation(first_validation_message(&err, &[]))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email(message = "Invalid email address"))]
        email: String,
        #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
        password: String,
    }

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_error_body() {
        let (status, body) = body_json(AppError::NotFound("Form with ID x not found".into())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["message"], "Form with ID x not found");
        assert_eq!(body["error"], "Not Found");
    }

    #[tokio::test]
    async fn test_server_error_hides_details() {
        let (status, body) = body_json(AppError::Database("connection reset".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Unauthorized("Invalid token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden(String::new()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict(String::new()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Validation(String::new()).status_code(), StatusCode::BAD_REQUEST);
        assert!(AppError::Config(String::new()).is_server_error());
    }

    #[test]
    fn test_first_validation_message_follows_order() {
        let input = Signup {
            email: "not-an-email".into(),
            password: "123".into(),
        };
        let errors = input.validate().unwrap_err();

        assert_eq!(
            first_validation_message(&errors, &["email", "password"]),
            "Invalid email address"
        );
        assert_eq!(
            first_validation_message(&errors, &["password", "email"]),
            "Password must be at least 6 characters"
        );
    }

    #[test]
    fn test_from_validation_errors() {
        let input = Signup {
            email: "a@b.co".into(),
            password: "123".into(),
        };
        let err: AppError = input.validate().unwrap_err().into();

        assert!(matches!(err, AppError::Validation(ref m) if m == "Password must be at least 6 characters"));
    }
}
