//! Resource types mirrored from the discovery catalog and reasoning-engine registry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::names::short_id;

/// Identifies one app (engine) inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppRef {
    /// Google Cloud project ID.
    pub project_id: String,
    /// Engine ID inside the collection.
    pub app_id: String,
}

impl AppRef {
    /// Creates a new `AppRef`.
    pub fn new(project_id: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self { project_id: project_id.into(), app_id: app_id.into() }
    }
}

/// A Discovery Engine app, as shown in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// Full engine resource name.
    pub id: String,
    /// Human-readable name.
    #[serde(rename = "appName")]
    pub app_name: String,
    /// Last segment of the resource name, used in agent calls.
    #[serde(rename = "appId")]
    pub app_id: String,
    /// Owning project.
    pub project_id: String,
    /// Solution type reported by the engine (e.g. `SOLUTION_TYPE_SEARCH`).
    #[serde(rename = "solutionType", default, skip_serializing_if = "Option::is_none")]
    pub solution_type: Option<String>,
}

/// Tool settings of an ADK agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSettings {
    /// Description the assistant uses to decide when to call the agent.
    #[serde(default)]
    pub tool_description: String,
}

/// Reference to the reasoning engine that runs an ADK agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedReasoningEngine {
    /// Full reasoning engine resource name.
    #[serde(default)]
    pub reasoning_engine: String,
}

/// The ADK-specific part of an agent resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdkAgentDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_settings: Option<ToolSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_reasoning_engine: Option<ProvisionedReasoningEngine>,
    /// Full authorization resource names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorizations: Option<Vec<String>>,
}

/// Icon shown next to the agent in the assistant UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIcon {
    /// Public URI of the icon image.
    #[serde(default)]
    pub uri: String,
}

/// An agent registered against an app.
///
/// Fields the console does not interpret (state, timestamps, ...) are kept in
/// `extra` so they reach the browser unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Short identifier, derived from `name`.
    #[serde(default)]
    pub id: String,
    /// Full resource name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adk_agent_definition: Option<AdkAgentDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<AgentIcon>,
    /// Remaining fields returned by the remote API.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Agent {
    /// Fills `id` from the last segment of `name`.
    #[must_use]
    pub fn with_derived_id(mut self) -> Self {
        if !self.name.is_empty() {
            self.id = short_id(&self.name).to_string();
        }
        self
    }

    /// The tool description, if the agent has one.
    pub fn tool_description(&self) -> Option<&str> {
        self.adk_agent_definition
            .as_ref()
            .and_then(|adk| adk.tool_settings.as_ref())
            .map(|tool| tool.tool_description.as_str())
    }

    /// The full name of the reasoning engine backing this agent.
    pub fn reasoning_engine(&self) -> Option<&str> {
        self.adk_agent_definition
            .as_ref()
            .and_then(|adk| adk.provisioned_reasoning_engine.as_ref())
            .map(|engine| engine.reasoning_engine.as_str())
    }
}

/// A deployed reasoning engine, listed for the deployment selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningEngine {
    /// Short identifier.
    pub name: String,
    /// Full resource name.
    pub resource_name: String,
    pub display_name: String,
    /// RFC 3339 creation timestamp, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// RFC 3339 update timestamp, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

/// Validated input for registering a new agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDraft {
    pub display_name: String,
    pub description: String,
    pub tool_description: String,
    /// Reasoning engine ID or full resource name.
    pub adk_deployment_id: String,
    /// Authorization ID or full resource name.
    pub auth_id: Option<String>,
    pub icon_uri: Option<String>,
}

/// Partial update of an agent. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentPatch {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub tool_description: Option<String>,
    pub adk_deployment_id: Option<String>,
    pub auth_id: Option<String>,
    pub icon_uri: Option<String>,
}

impl AgentPatch {
    /// Trims every value and drops blank ones, which the browser sends for
    /// untouched inputs.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn keep(value: Option<String>) -> Option<String> {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        Self {
            display_name: keep(self.display_name),
            description: keep(self.description),
            tool_description: keep(self.tool_description),
            adk_deployment_id: keep(self.adk_deployment_id),
            auth_id: keep(self.auth_id),
            icon_uri: keep(self.icon_uri),
        }
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.description.is_none()
            && self.tool_description.is_none()
            && self.adk_deployment_id.is_none()
            && self.auth_id.is_none()
            && self.icon_uri.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_deserialization_keeps_unknown_fields() {
        let json = r#"{
            "name": "projects/p/locations/global/collections/default_collection/engines/app/assistants/default_assistant/agents/123",
            "displayName": "Weather",
            "description": "Answers weather questions",
            "adkAgentDefinition": {
                "toolSettings": {"toolDescription": "Use for weather"},
                "provisionedReasoningEngine": {
                    "reasoningEngine": "projects/p/locations/us-central1/reasoningEngines/9"
                }
            },
            "state": "ENABLED"
        }"#;

        let agent: Agent = serde_json::from_str::<Agent>(json).unwrap().with_derived_id();
        assert_eq!(agent.id, "123");
        assert_eq!(agent.display_name, "Weather");
        assert_eq!(agent.tool_description(), Some("Use for weather"));
        assert_eq!(
            agent.reasoning_engine(),
            Some("projects/p/locations/us-central1/reasoningEngines/9")
        );
        assert_eq!(agent.extra.get("state"), Some(&Value::String("ENABLED".into())));

        let out = serde_json::to_value(&agent).unwrap();
        assert_eq!(out["id"], "123");
        assert_eq!(out["state"], "ENABLED");
        assert_eq!(out["adkAgentDefinition"]["toolSettings"]["toolDescription"], "Use for weather");
        assert!(out.get("icon").is_none());
    }

    #[test]
    fn test_app_serialization_field_names() {
        let app = App {
            id: "projects/p/locations/global/collections/default_collection/engines/support".into(),
            app_name: "Support".into(),
            app_id: "support".into(),
            project_id: "p".into(),
            solution_type: None,
        };
        let out = serde_json::to_value(&app).unwrap();
        assert_eq!(out["appName"], "Support");
        assert_eq!(out["appId"], "support");
        assert_eq!(out["project_id"], "p");
        assert!(out.get("solutionType").is_none());
    }

    #[test]
    fn test_patch_normalized_drops_blank_values() {
        let patch = AgentPatch {
            display_name: Some("  ".into()),
            description: Some("new".into()),
            icon_uri: Some(String::new()),
            ..AgentPatch::default()
        }
        .normalized();

        assert_eq!(patch.display_name, None);
        assert_eq!(patch.description.as_deref(), Some("new"));
        assert_eq!(patch.icon_uri, None);
        assert!(!patch.is_empty());
        assert!(AgentPatch::default().is_empty());
    }

    #[test]
    fn test_patch_normalized_trims_values() {
        let patch = AgentPatch {
            display_name: Some("  Renamed  ".into()),
            tool_description: Some("\tUse for travel\n".into()),
            ..AgentPatch::default()
        }
        .normalized();

        assert_eq!(patch.display_name.as_deref(), Some("Renamed"));
        assert_eq!(patch.tool_description.as_deref(), Some("Use for travel"));
    }

    #[test]
    fn test_reasoning_engine_omits_missing_timestamps() {
        let engine = ReasoningEngine {
            name: "555".into(),
            resource_name: "projects/p/locations/us-central1/reasoningEngines/555".into(),
            display_name: "travel-agent".into(),
            create_time: None,
            update_time: Some("2025-05-02T10:00:00Z".into()),
        };
        let out = serde_json::to_value(&engine).unwrap();
        assert!(out.get("create_time").is_none());
        assert_eq!(out["update_time"], "2025-05-02T10:00:00Z");

        let parsed: ReasoningEngine = serde_json::from_value(out).unwrap();
        assert_eq!(parsed, engine);
    }
}
