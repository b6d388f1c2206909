//! Discovery Engine REST client.
//!
//! Covers the engine (app) listing and the agent CRUD calls of the
//! `v1alpha` API. Every call carries a bearer token and the
//! `X-Goog-User-Project` header so quota is billed to the caller's project.

use std::sync::Arc;

use agentspace_abstraction::{Agent, App, AppRef, RegistryError, short_id};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::auth::TokenProvider;
use crate::error::{check_status, decode, transport_error};
use crate::payload::AgentPayload;

/// Page size requested from list endpoints.
pub(crate) const PAGE_SIZE: &str = "100";

/// Assistant every AgentSpace app exposes.
const DEFAULT_ASSISTANT: &str = "default_assistant";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteEngine {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    solution_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEnginesResponse {
    #[serde(default)]
    engines: Vec<RemoteEngine>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAgentsResponse {
    #[serde(default)]
    agents: Vec<Agent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Returns the next page token, treating an empty string as the last page.
pub(crate) fn next_page(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

/// Base URL for a Discovery Engine location.
pub fn endpoint_for_location(location: &str) -> String {
    if location == "global" {
        "https://discoveryengine.googleapis.com/v1alpha".to_string()
    } else {
        format!("https://{location}-discoveryengine.googleapis.com/v1alpha")
    }
}

/// Client for the Discovery Engine engine and agent APIs.
pub struct DiscoveryEngineClient {
    /// HTTP client for making requests.
    http_client: Client,
    /// Base URL, including the API version.
    base_url: String,
    /// Discovery location (e.g. `global`, `us`, `eu`).
    location: String,
    /// Collection holding the engines (usually `default_collection`).
    collection_id: String,
    tokens: Arc<dyn TokenProvider>,
}

impl DiscoveryEngineClient {
    /// Creates a client for `location` using the public endpoint.
    pub fn new(
        http_client: Client,
        location: impl Into<String>,
        collection_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let location = location.into();
        Self {
            http_client,
            base_url: endpoint_for_location(&location),
            location,
            collection_id: collection_id.into(),
            tokens,
        }
    }

    /// Points the client at a different base URL (used by tests and proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The discovery location this client targets.
    pub fn location(&self) -> &str {
        &self.location
    }

    fn collection_url(&self, project_id: &str) -> String {
        format!(
            "{}/projects/{}/locations/{}/collections/{}",
            self.base_url, project_id, self.location, self.collection_id
        )
    }

    fn agents_url(&self, app: &AppRef) -> String {
        format!(
            "{}/engines/{}/assistants/{}/agents",
            self.collection_url(&app.project_id),
            app.app_id,
            DEFAULT_ASSISTANT
        )
    }

    fn agent_url(&self, app: &AppRef, agent_id: &str) -> String {
        format!("{}/{}", self.agents_url(app), agent_id)
    }

    async fn send(
        &self,
        project_id: &str,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<Response, RegistryError> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .header("X-Goog-User-Project", project_id)
            .send()
            .await
            .map_err(|e| transport_error(operation, &e))?;
        check_status(response, operation).await
    }

    /// Lists every engine in the configured collection, following pagination.
    pub async fn list_engines(&self, project_id: &str) -> Result<Vec<App>, RegistryError> {
        let url = format!("{}/engines", self.collection_url(project_id));
        debug!(%url, "Listing engines");

        let mut apps = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let request = self.http_client.get(&url).query(&query);
            let response = self.send(project_id, request, "list engines").await?;
            let page: ListEnginesResponse = decode(response, "list engines").await?;

            apps.extend(page.engines.into_iter().map(|engine| App {
                app_id: short_id(&engine.name).to_string(),
                id: engine.name,
                app_name: engine.display_name,
                project_id: project_id.to_string(),
                solution_type: engine.solution_type,
            }));

            match next_page(page.next_page_token) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = apps.len(), "Retrieved engine list");
        Ok(apps)
    }

    /// Lists every agent of `app`, following pagination.
    pub async fn list_agents(&self, app: &AppRef) -> Result<Vec<Agent>, RegistryError> {
        let url = self.agents_url(app);
        debug!(%url, "Listing agents");

        let mut agents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let request = self.http_client.get(&url).query(&query);
            let response = self.send(&app.project_id, request, "list agents").await?;
            let page: ListAgentsResponse = decode(response, "list agents").await?;
            agents.extend(page.agents.into_iter().map(Agent::with_derived_id));

            match next_page(page.next_page_token) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = agents.len(), "Retrieved agent list");
        Ok(agents)
    }

    /// Fetches a single agent.
    pub async fn get_agent(&self, app: &AppRef, agent_id: &str) -> Result<Agent, RegistryError> {
        let url = self.agent_url(app, agent_id);
        debug!(%url, "Retrieving agent");

        let response = self.send(&app.project_id, self.http_client.get(&url), "get agent").await?;
        let agent: Agent = decode(response, "get agent").await?;
        Ok(agent.with_derived_id())
    }

    /// Creates an agent from a prepared payload.
    pub async fn create_agent(
        &self,
        app: &AppRef,
        payload: &AgentPayload,
    ) -> Result<Agent, RegistryError> {
        let url = self.agents_url(app);
        debug!(%url, display_name = ?payload.display_name, "Creating agent");

        let request = self.http_client.post(&url).json(payload);
        let response = self.send(&app.project_id, request, "create agent").await?;
        let agent: Agent = decode(response, "create agent").await?;

        debug!(agent = %agent.name, "Agent created");
        Ok(agent.with_derived_id())
    }

    /// Patches the fields named in `update_mask`.
    pub async fn patch_agent(
        &self,
        app: &AppRef,
        agent_id: &str,
        payload: &AgentPayload,
        update_mask: &[&str],
    ) -> Result<Agent, RegistryError> {
        let url = self.agent_url(app, agent_id);
        let mask = update_mask.join(",");
        debug!(%url, update_mask = %mask, "Updating agent");

        let request =
            self.http_client.patch(&url).query(&[("updateMask", mask.as_str())]).json(payload);
        let response = self.send(&app.project_id, request, "update agent").await?;
        let agent: Agent = decode(response, "update agent").await?;
        Ok(agent.with_derived_id())
    }

    /// Deletes an agent.
    pub async fn delete_agent(&self, app: &AppRef, agent_id: &str) -> Result<(), RegistryError> {
        let url = self.agent_url(app, agent_id);
        debug!(%url, "Deleting agent");

        self.send(&app.project_id, self.http_client.delete(&url), "delete agent").await?;
        debug!(agent_id, "Agent deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_for_location() {
        assert_eq!(
            endpoint_for_location("global"),
            "https://discoveryengine.googleapis.com/v1alpha"
        );
        assert_eq!(
            endpoint_for_location("eu"),
            "https://eu-discoveryengine.googleapis.com/v1alpha"
        );
    }

    #[test]
    fn test_next_page() {
        assert_eq!(next_page(None), None);
        assert_eq!(next_page(Some(String::new())), None);
        assert_eq!(next_page(Some("abc".into())), Some("abc".into()));
    }

    #[test]
    fn test_agent_urls() {
        let client = DiscoveryEngineClient::new(
            Client::new(),
            "global",
            "default_collection",
            Arc::new(crate::auth::StaticTokenProvider::new("t")),
        );
        let app = AppRef::new("proj", "support-app");
        assert_eq!(
            client.agent_url(&app, "77"),
            "https://discoveryengine.googleapis.com/v1alpha/projects/proj/locations/global/collections/default_collection/engines/support-app/assistants/default_assistant/agents/77"
        );
    }
}
