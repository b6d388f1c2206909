//! `AgentRegistry` backed by Google Cloud.

use std::sync::Arc;
use std::time::Duration;

use agentspace_abstraction::{
    Agent, AgentDraft, AgentPatch, AgentRegistry, App, AppRef, ReasoningEngine, RegistryError,
    RegistryResult,
};
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::auth::TokenProvider;
use crate::discovery::DiscoveryEngineClient;
use crate::payload::{AgentPayload, PayloadScope};
use crate::vertex::ReasoningEngineClient;

/// Locations, collection and endpoint overrides for the Google backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleSettings {
    /// Discovery Engine location (`global`, `us`, `eu`).
    pub discovery_location: String,
    /// Collection holding the engines.
    pub collection_id: String,
    /// Default Vertex AI region for reasoning engines.
    pub reasoning_engine_location: String,
    /// Replaces the Discovery Engine base URL.
    pub discovery_endpoint: Option<String>,
    /// Replaces the Vertex AI base URL.
    pub vertex_endpoint: Option<String>,
    /// Per-request timeout; reqwest's default (none) when unset.
    pub timeout: Option<Duration>,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            discovery_location: "global".to_string(),
            collection_id: "default_collection".to_string(),
            reasoning_engine_location: "us-central1".to_string(),
            discovery_endpoint: None,
            vertex_endpoint: None,
            timeout: None,
        }
    }
}

/// Discovery Engine + Vertex AI registry.
pub struct GoogleRegistry {
    discovery: DiscoveryEngineClient,
    reasoning_engines: ReasoningEngineClient,
}

impl GoogleRegistry {
    /// Builds both REST clients over one shared HTTP connection pool.
    pub fn new(settings: &GoogleSettings, tokens: Arc<dyn TokenProvider>) -> RegistryResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| RegistryError::Request(format!("Failed to build HTTP client: {e}")))?;

        let mut discovery = DiscoveryEngineClient::new(
            http_client.clone(),
            settings.discovery_location.clone(),
            settings.collection_id.clone(),
            Arc::clone(&tokens),
        );
        if let Some(endpoint) = &settings.discovery_endpoint {
            discovery = discovery.with_base_url(endpoint.clone());
        }

        let mut reasoning_engines = ReasoningEngineClient::new(
            http_client,
            settings.reasoning_engine_location.clone(),
            tokens,
        );
        if let Some(endpoint) = &settings.vertex_endpoint {
            reasoning_engines = reasoning_engines.with_base_url(endpoint.clone());
        }

        info!(
            discovery_location = %settings.discovery_location,
            collection_id = %settings.collection_id,
            reasoning_engine_location = %settings.reasoning_engine_location,
            "Google registry initialized"
        );

        Ok(Self { discovery, reasoning_engines })
    }

    fn scope<'a>(&'a self, project_id: &'a str) -> PayloadScope<'a> {
        PayloadScope {
            project_id,
            reasoning_engine_location: self.reasoning_engines.default_location(),
            authorization_location: self.discovery.location(),
        }
    }
}

#[async_trait]
impl AgentRegistry for GoogleRegistry {
    async fn list_apps(&self, project_id: &str) -> RegistryResult<Vec<App>> {
        self.discovery.list_engines(project_id).await
    }

    async fn list_agents(&self, app: &AppRef) -> RegistryResult<Vec<Agent>> {
        self.discovery.list_agents(app).await
    }

    async fn get_agent(&self, app: &AppRef, agent_id: &str) -> RegistryResult<Agent> {
        self.discovery.get_agent(app, agent_id).await
    }

    async fn create_agent(&self, app: &AppRef, draft: &AgentDraft) -> RegistryResult<Agent> {
        let payload = AgentPayload::for_create(draft, &self.scope(&app.project_id));
        self.discovery.create_agent(app, &payload).await
    }

    async fn update_agent(
        &self,
        app: &AppRef,
        agent_id: &str,
        patch: &AgentPatch,
    ) -> RegistryResult<Agent> {
        let (payload, mask) = AgentPayload::for_update(patch, &self.scope(&app.project_id));
        if mask.is_empty() {
            return Err(RegistryError::InvalidInput("No fields to update".to_string()));
        }
        self.discovery.patch_agent(app, agent_id, &payload, &mask).await
    }

    async fn delete_agent(&self, app: &AppRef, agent_id: &str) -> RegistryResult<()> {
        self.discovery.delete_agent(app, agent_id).await
    }

    async fn list_reasoning_engines(
        &self,
        project_id: &str,
        location: Option<&str>,
    ) -> RegistryResult<Vec<ReasoningEngine>> {
        self.reasoning_engines.list(project_id, location).await
    }
}
