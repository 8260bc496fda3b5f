//! Client errors.

use thiserror::Error;

/// Result type for client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Error returned by [`crate::ApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response other than 401.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `message` field of the error body.
        message: String,
    },

    /// 401 response. The session and cache have been cleared.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Bad base URL or path.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// HTTP status of the failed call, if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    /// Whether this is a 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Whether this is a 400.
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(self, Self::Api { status: 400, .. })
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_of_api_errors() {
        let err = ClientError::Api {
            status: 404,
            message: "Form with ID x not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(!err.is_validation_error());
        assert_eq!(ClientError::Unauthorized("Token expired".into()).status(), Some(401));
        assert_eq!(ClientError::Decode("eof".into()).status(), None);
    }
}
