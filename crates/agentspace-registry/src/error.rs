//! Mapping of upstream HTTP failures onto `RegistryError`.

use agentspace_abstraction::RegistryError;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: String,
}

/// Maps a non-success upstream response onto `RegistryError::Upstream`,
/// keeping the upstream status and the `error.message` of Google's error body.
pub(crate) fn map_http_error(
    status: StatusCode,
    error_text: &str,
    operation: &str,
) -> RegistryError {
    let message = serde_json::from_str::<GoogleErrorBody>(error_text)
        .ok()
        .map(|body| body.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let text = error_text.trim();
            if text.is_empty() {
                format!(
                    "{} failed: {}",
                    operation,
                    status.canonical_reason().unwrap_or("unknown error")
                )
            } else {
                text.to_string()
            }
        });

    warn!(%status, operation, message = %message, "Upstream call failed");
    RegistryError::Upstream { status: status.as_u16(), message }
}

/// Passes a success response through, or consumes it into an error.
pub(crate) async fn check_status(
    response: Response,
    operation: &str,
) -> Result<Response, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(map_http_error(status, &error_text, operation))
}

/// Decodes a JSON body, reporting failures as serialization errors.
pub(crate) async fn decode<T: DeserializeOwned>(
    response: Response,
    operation: &str,
) -> Result<T, RegistryError> {
    response.json::<T>().await.map_err(|e| {
        RegistryError::Serialization(format!("Failed to parse {operation} response: {e}"))
    })
}

pub(crate) fn transport_error(operation: &str, err: &reqwest::Error) -> RegistryError {
    RegistryError::Request(format!("Failed to {operation}: {err}"))
}
