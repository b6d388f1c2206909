//! Vertex AI reasoning-engine listing.

use std::sync::Arc;

use agentspace_abstraction::{ReasoningEngine, RegistryError, short_id};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::auth::TokenProvider;
use crate::discovery::{PAGE_SIZE, next_page};
use crate::error::{check_status, decode, transport_error};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteReasoningEngine {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    create_time: Option<String>,
    #[serde(default)]
    update_time: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListReasoningEnginesResponse {
    #[serde(default)]
    reasoning_engines: Vec<RemoteReasoningEngine>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl From<RemoteReasoningEngine> for ReasoningEngine {
    fn from(remote: RemoteReasoningEngine) -> Self {
        Self {
            name: short_id(&remote.name).to_string(),
            resource_name: remote.name,
            display_name: remote.display_name,
            create_time: remote.create_time,
            update_time: remote.update_time,
        }
    }
}

/// Client for the Vertex AI `reasoningEngines` collection.
pub struct ReasoningEngineClient {
    http_client: Client,
    /// Overrides the regional endpoint when set.
    base_url: Option<String>,
    /// Region used when the caller does not name one.
    default_location: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ReasoningEngineClient {
    pub fn new(
        http_client: Client,
        default_location: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self { http_client, base_url: None, default_location: default_location.into(), tokens }
    }

    /// Sends every request to `base_url` instead of the regional endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Region used when none is requested.
    pub fn default_location(&self) -> &str {
        &self.default_location
    }

    fn endpoint(&self, location: &str) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{location}-aiplatform.googleapis.com/v1beta1"))
    }

    /// Lists the reasoning engines of `project_id` in `location`
    /// (or the default location), following pagination.
    pub async fn list(
        &self,
        project_id: &str,
        location: Option<&str>,
    ) -> Result<Vec<ReasoningEngine>, RegistryError> {
        let location = location.filter(|l| !l.is_empty()).unwrap_or(self.default_location.as_str());
        let url = format!(
            "{}/projects/{}/locations/{}/reasoningEngines",
            self.endpoint(location),
            project_id,
            location
        );
        debug!(%url, "Listing reasoning engines");

        let token = self.tokens.access_token().await?;
        let mut engines = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(next) = page_token.take() {
                query.push(("pageToken", next));
            }

            let response = self
                .http_client
                .get(&url)
                .query(&query)
                .bearer_auth(&token)
                .header("X-Goog-User-Project", project_id)
                .send()
                .await
                .map_err(|e| transport_error("list reasoning engines", &e))?;
            let response = check_status(response, "list reasoning engines").await?;
            let page: ListReasoningEnginesResponse =
                decode(response, "list reasoning engines").await?;

            engines.extend(page.reasoning_engines.into_iter().map(ReasoningEngine::from));

            match next_page(page.next_page_token) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(count = engines.len(), "Retrieved reasoning engine list");
        Ok(engines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;

    #[test]
    fn test_regional_endpoint() {
        let tokens = Arc::new(StaticTokenProvider::new("t"));
        let client = ReasoningEngineClient::new(Client::new(), "us-central1", tokens);
        assert_eq!(
            client.endpoint("europe-west4"),
            "https://europe-west4-aiplatform.googleapis.com/v1beta1"
        );

        let client = client.with_base_url("http://localhost:1234");
        assert_eq!(client.endpoint("europe-west4"), "http://localhost:1234");
    }

    #[test]
    fn test_remote_conversion() {
        let remote = RemoteReasoningEngine {
            name: "projects/123/locations/us-central1/reasoningEngines/987".into(),
            display_name: "travel-agent".into(),
            create_time: Some("2025-05-01T10:00:00Z".into()),
            update_time: None,
        };
        let engine = ReasoningEngine::from(remote);
        assert_eq!(engine.name, "987");
        assert_eq!(engine.resource_name, "projects/123/locations/us-central1/reasoningEngines/987");
        assert_eq!(engine.display_name, "travel-agent");
        assert_eq!(engine.update_time, None);
    }
}
