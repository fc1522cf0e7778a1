use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the rotation service
#[derive(Error, Debug)]
pub enum RotaError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database connection failed: {0}")]
    DatabaseConnection(String),

    // Account API errors
    #[error("Account authentication invalid: {0}")]
    AuthenticationInvalid(String),

    #[error("Account API error: {0}")]
    AccountApi(String),

    #[error("Missing account credential")]
    MissingCredential,

    #[error("Not found: {0}")]
    NotFound(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid filter token: {0}")]
    InvalidFilter(String),

    #[error("Operation timed out")]
    Timeout,

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for rotation operations
pub type Result<T> = std::result::Result<T, RotaError>;

impl RotaError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            RotaError::InvalidRequest(_)
            | RotaError::InvalidFilter(_)
            | RotaError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            RotaError::AuthenticationInvalid(_) | RotaError::MissingCredential => {
                StatusCode::UNAUTHORIZED
            }

            // 404 Not Found
            RotaError::NotFound(_) => StatusCode::NOT_FOUND,

            // 502 Bad Gateway
            RotaError::AccountApi(_) | RotaError::Http(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            RotaError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 504 Gateway Timeout
            RotaError::Timeout => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            RotaError::Database(_)
            | RotaError::Io(_)
            | RotaError::Serialization(_)
            | RotaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// Implement IntoResponse for API error responses
impl IntoResponse for RotaError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        }
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

// Convert from reqwest errors
impl From<reqwest::Error> for RotaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RotaError::Timeout
        } else {
            RotaError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_code_mapping() {
        assert_eq!(
            RotaError::InvalidRequest("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RotaError::InvalidFilter("older-than-x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RotaError::AuthenticationInvalid("token expired".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RotaError::NotFound("p1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RotaError::AccountApi("503".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(RotaError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_error_client_server_helpers() {
        assert!(RotaError::MissingCredential.is_client_error());
        assert!(!RotaError::MissingCredential.is_server_error());

        assert!(RotaError::Internal("boom".to_string()).is_server_error());
        assert!(!RotaError::Internal("boom".to_string()).is_client_error());
    }

    #[test]
    fn test_authentication_message_is_verbatim() {
        let err = RotaError::AuthenticationInvalid("Token has expired".to_string());
        assert_eq!(
            err.to_string(),
            "Account authentication invalid: Token has expired"
        );
    }
}
