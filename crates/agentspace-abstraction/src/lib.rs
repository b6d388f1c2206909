//! Registry abstraction layer for the AgentSpace console.
//!
//! This crate defines the resource types mirrored from Discovery Engine and
//! Vertex AI, the error type shared by every registry implementation, and the
//! `AgentRegistry` trait the HTTP layer is written against.

pub mod names;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use names::{
    authorization_name, find_agent_by_display_name, reasoning_engine_name, short_id,
    validate_reference, validate_segment,
};
pub use types::{
    AdkAgentDefinition, Agent, AgentDraft, AgentIcon, AgentPatch, App, AppRef,
    ProvisionedReasoningEngine, ReasoningEngine, ToolSettings,
};

/// Represents an error that can occur when talking to the agent registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The caller supplied a missing or malformed value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Credentials could not be obtained for the upstream call.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The upstream call could not be completed (connection, TLS, timeout).
    #[error("Request failed: {0}")]
    Request(String),

    /// The upstream API answered with a non-success status.
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        /// HTTP status returned by the upstream API.
        status: u16,
        /// Error message extracted from the upstream body.
        message: String,
    },

    /// The upstream payload could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RegistryError {
    /// HTTP status code the browser should see for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Auth(_) => 500,
            Self::Request(_) | Self::Serialization(_) => 502,
            Self::Upstream { status, .. } if (400..=599).contains(status) => *status,
            Self::Upstream { .. } => 502,
        }
    }

    /// Message suitable for the `error` field of a JSON error body.
    ///
    /// Upstream errors surface the remote message unchanged.
    pub fn public_message(&self) -> String {
        match self {
            Self::Upstream { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// The discovery catalog and reasoning-engine registry, seen as one collaborator.
///
/// Implementations must be `Send + Sync`; a single instance is built at startup
/// and shared by every request handler.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Lists the apps (engines) of the configured collection in `project_id`.
    async fn list_apps(&self, project_id: &str) -> RegistryResult<Vec<App>>;

    /// Lists every agent attached to `app`.
    async fn list_agents(&self, app: &AppRef) -> RegistryResult<Vec<Agent>>;

    /// Fetches one agent by its short identifier.
    async fn get_agent(&self, app: &AppRef, agent_id: &str) -> RegistryResult<Agent>;

    /// Registers a new agent and returns the created resource.
    async fn create_agent(&self, app: &AppRef, draft: &AgentDraft) -> RegistryResult<Agent>;

    /// Changes only the fields present in `patch`.
    async fn update_agent(
        &self,
        app: &AppRef,
        agent_id: &str,
        patch: &AgentPatch,
    ) -> RegistryResult<Agent>;

    /// Removes an agent.
    async fn delete_agent(&self, app: &AppRef, agent_id: &str) -> RegistryResult<()>;

    /// Lists reasoning-engine deployments of `project_id`.
    ///
    /// `location` overrides the implementation's default region.
    async fn list_reasoning_engines(
        &self,
        project_id: &str,
        location: Option<&str>,
    ) -> RegistryResult<Vec<ReasoningEngine>>;

    /// Finds an agent by display name.
    ///
    /// The remote API has no server-side filter, so this lists the agents and
    /// scans them with [`find_agent_by_display_name`].
    async fn get_agent_by_display_name(
        &self,
        app: &AppRef,
        display_name: &str,
    ) -> RegistryResult<Agent> {
        let agents = self.list_agents(app).await?;
        find_agent_by_display_name(&agents, display_name).cloned().ok_or_else(|| {
            RegistryError::NotFound(format!("Agent with display name '{display_name}' not found."))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAgents(Vec<Agent>);

    #[async_trait]
    impl AgentRegistry for FixedAgents {
        async fn list_apps(&self, _project_id: &str) -> RegistryResult<Vec<App>> {
            Ok(Vec::new())
        }

        async fn list_agents(&self, _app: &AppRef) -> RegistryResult<Vec<Agent>> {
            Ok(self.0.clone())
        }

        async fn get_agent(&self, _app: &AppRef, agent_id: &str) -> RegistryResult<Agent> {
            Err(RegistryError::NotFound(agent_id.to_string()))
        }

        async fn create_agent(&self, _app: &AppRef, _draft: &AgentDraft) -> RegistryResult<Agent> {
            Err(RegistryError::InvalidInput("read-only".to_string()))
        }

        async fn update_agent(
            &self,
            _app: &AppRef,
            _agent_id: &str,
            _patch: &AgentPatch,
        ) -> RegistryResult<Agent> {
            Err(RegistryError::InvalidInput("read-only".to_string()))
        }

        async fn delete_agent(&self, _app: &AppRef, _agent_id: &str) -> RegistryResult<()> {
            Err(RegistryError::InvalidInput("read-only".to_string()))
        }

        async fn list_reasoning_engines(
            &self,
            _project_id: &str,
            _location: Option<&str>,
        ) -> RegistryResult<Vec<ReasoningEngine>> {
            Ok(Vec::new())
        }
    }

    fn agent(id: &str, display_name: &str) -> Agent {
        Agent {
            id: id.to_string(),
            name: format!(
                "projects/p/locations/global/collections/c/engines/e/assistants/default_assistant/agents/{id}"
            ),
            display_name: display_name.to_string(),
            ..Agent::default()
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RegistryError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(RegistryError::NotFound("x".into()).status_code(), 404);
        assert_eq!(RegistryError::Auth("x".into()).status_code(), 500);
        assert_eq!(RegistryError::Request("x".into()).status_code(), 502);
        assert_eq!(
            RegistryError::Upstream { status: 403, message: "denied".into() }.status_code(),
            403
        );
        // A success code in an error position is not a usable error status.
        assert_eq!(
            RegistryError::Upstream { status: 200, message: "odd".into() }.status_code(),
            502
        );
    }

    #[test]
    fn test_public_message_passes_upstream_text_through() {
        let err = RegistryError::Upstream { status: 400, message: "Invalid deployment".into() };
        assert_eq!(err.public_message(), "Invalid deployment");

        let err = RegistryError::Auth("no metadata server".into());
        assert_eq!(err.public_message(), "Authentication failed: no metadata server");
    }

    #[tokio::test]
    async fn test_get_agent_by_display_name_default_impl() {
        let registry = FixedAgents(vec![agent("1", "Alpha"), agent("2", "Beta")]);
        let app = AppRef::new("p", "e");

        let found = registry.get_agent_by_display_name(&app, "Beta").await.unwrap();
        assert_eq!(found.id, "2");

        let missing = registry.get_agent_by_display_name(&app, "Gamma").await.unwrap_err();
        assert_eq!(missing.status_code(), 404);
        assert!(missing.to_string().contains("Gamma"));
    }
}
