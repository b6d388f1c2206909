//! In-process registry for tests and offline UI work.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use agentspace_abstraction::{
    Agent, AgentDraft, AgentPatch, AgentRegistry, App, AppRef, ReasoningEngine, RegistryError,
    RegistryResult,
};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::payload::{AgentPayload, PayloadScope};

const DISCOVERY_LOCATION: &str = "global";
const COLLECTION_ID: &str = "default_collection";
const REASONING_ENGINE_LOCATION: &str = "us-central1";

/// A registry that keeps agents in memory.
///
/// Every trait call is counted, so tests can check that rejected requests
/// never reached the registry.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    apps: Vec<App>,
    reasoning_engines: Vec<ReasoningEngine>,
    agents: RwLock<HashMap<AppRef, Vec<Agent>>>,
    next_id: AtomicU64,
    calls: AtomicUsize,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an app to the catalog.
    #[must_use]
    pub fn with_app(mut self, project_id: &str, app_id: &str, app_name: &str) -> Self {
        self.apps.push(App {
            id: format!(
                "projects/{project_id}/locations/{DISCOVERY_LOCATION}/collections/{COLLECTION_ID}/engines/{app_id}"
            ),
            app_name: app_name.to_string(),
            app_id: app_id.to_string(),
            project_id: project_id.to_string(),
            solution_type: Some("SOLUTION_TYPE_SEARCH".to_string()),
        });
        self
    }

    /// Adds a reasoning-engine deployment.
    #[must_use]
    pub fn with_reasoning_engine(
        mut self,
        project_id: &str,
        engine_id: &str,
        display_name: &str,
    ) -> Self {
        self.reasoning_engines.push(ReasoningEngine {
            name: engine_id.to_string(),
            resource_name: format!(
                "projects/{project_id}/locations/{REASONING_ENGINE_LOCATION}/reasoningEngines/{engine_id}"
            ),
            display_name: display_name.to_string(),
            create_time: None,
            update_time: None,
        });
        self
    }

    /// Number of registry calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, operation: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(operation, "In-memory registry call");
    }

    fn scope(project_id: &str) -> PayloadScope<'_> {
        PayloadScope {
            project_id,
            reasoning_engine_location: REASONING_ENGINE_LOCATION,
            authorization_location: DISCOVERY_LOCATION,
        }
    }

    fn not_found(agent_id: &str) -> RegistryError {
        RegistryError::NotFound(format!("Agent {agent_id} not found."))
    }
}

#[async_trait]
impl AgentRegistry for InMemoryRegistry {
    async fn list_apps(&self, project_id: &str) -> RegistryResult<Vec<App>> {
        self.record("list_apps");
        Ok(self.apps.iter().filter(|app| app.project_id == project_id).cloned().collect())
    }

    async fn list_agents(&self, app: &AppRef) -> RegistryResult<Vec<Agent>> {
        self.record("list_agents");
        Ok(self.agents.read().await.get(app).cloned().unwrap_or_default())
    }

    async fn get_agent(&self, app: &AppRef, agent_id: &str) -> RegistryResult<Agent> {
        self.record("get_agent");
        self.agents
            .read()
            .await
            .get(app)
            .and_then(|agents| agents.iter().find(|agent| agent.id == agent_id))
            .cloned()
            .ok_or_else(|| Self::not_found(agent_id))
    }

    async fn create_agent(&self, app: &AppRef, draft: &AgentDraft) -> RegistryResult<Agent> {
        self.record("create_agent");
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut agent = Agent {
            name: format!(
                "projects/{}/locations/{DISCOVERY_LOCATION}/collections/{COLLECTION_ID}/engines/{}/assistants/default_assistant/agents/{id}",
                app.project_id, app.app_id
            ),
            ..Agent::default()
        };
        AgentPayload::for_create(draft, &Self::scope(&app.project_id)).apply_to(&mut agent);
        let agent = agent.with_derived_id();

        self.agents.write().await.entry(app.clone()).or_default().push(agent.clone());
        Ok(agent)
    }

    async fn update_agent(
        &self,
        app: &AppRef,
        agent_id: &str,
        patch: &AgentPatch,
    ) -> RegistryResult<Agent> {
        self.record("update_agent");
        let (payload, mask) = AgentPayload::for_update(patch, &Self::scope(&app.project_id));
        if mask.is_empty() {
            return Err(RegistryError::InvalidInput("No fields to update".to_string()));
        }

        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(app)
            .and_then(|agents| agents.iter_mut().find(|agent| agent.id == agent_id))
            .ok_or_else(|| Self::not_found(agent_id))?;
        payload.apply_to(agent);
        Ok(agent.clone())
    }

    async fn delete_agent(&self, app: &AppRef, agent_id: &str) -> RegistryResult<()> {
        self.record("delete_agent");
        let mut agents = self.agents.write().await;
        let list = agents.get_mut(app).ok_or_else(|| Self::not_found(agent_id))?;
        let before = list.len();
        list.retain(|agent| agent.id != agent_id);
        if list.len() == before {
            return Err(Self::not_found(agent_id));
        }
        Ok(())
    }

    async fn list_reasoning_engines(
        &self,
        project_id: &str,
        _location: Option<&str>,
    ) -> RegistryResult<Vec<ReasoningEngine>> {
        self.record("list_reasoning_engines");
        let prefix = format!("projects/{project_id}/");
        Ok(self
            .reasoning_engines
            .iter()
            .filter(|engine| engine.resource_name.starts_with(&prefix))
            .cloned()
            .collect())
    }
}
