//! Error types for the AgentSpace console server.

use agentspace_abstraction::RegistryError;
use agentspace_registry::AuthError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Startup and runtime errors of the server process.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configuration source could not be read or decoded
    #[error("Configuration error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// Address parsing errors
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry construction errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Credential and project discovery errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Same value as the HTTP status.
    pub status: u16,
}

/// Error returned by API handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed request input.
    #[error("{0}")]
    BadRequest(String),

    /// No project ID was configured or discovered at startup.
    #[error("Project ID is not configured")]
    ProjectNotConfigured,

    /// Error reported by the registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ApiError {
    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ProjectNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Registry(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Registry(e) => e.public_message(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "Request rejected");
        }

        (status, Json(ErrorBody { error: message, status: status.as_u16() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_status_passthrough() {
        let err = ApiError::from(RegistryError::Upstream { status: 403, message: "denied".into() });
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "denied");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ApiError::from(RegistryError::NotFound("Agent 7 not found.".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Agent 7 not found.");
    }

    #[test]
    fn test_auth_failure_is_500() {
        let err = ApiError::from(RegistryError::Auth("metadata server unreachable".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Authentication failed: metadata server unreachable");
    }

    #[test]
    fn test_bad_request() {
        let err = ApiError::BadRequest("Missing required field: app_id".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Missing required field: app_id");
    }

    #[test]
    fn test_project_not_configured() {
        assert_eq!(ApiError::ProjectNotConfigured.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_server_error_from_registry() {
        let err: ServerError = RegistryError::Request("boom".into()).into();
        assert!(matches!(err, ServerError::Registry(_)));
        assert_eq!(err.to_string(), "Registry error: Request failed: boom");
    }
}
