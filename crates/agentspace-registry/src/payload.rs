//! Request bodies for agent create and update calls.
//!
//! The browser sends flat snake_case fields; Discovery Engine expects the
//! nested agent resource. Building that resource is the only translation the
//! console performs, so it lives here as pure functions.

use agentspace_abstraction::{
    AdkAgentDefinition, Agent, AgentDraft, AgentIcon, AgentPatch, ProvisionedReasoningEngine,
    ToolSettings, authorization_name, reasoning_engine_name,
};
use serde::Serialize;

/// Update-mask paths, one per patchable field.
pub const MASK_DISPLAY_NAME: &str = "displayName";
pub const MASK_DESCRIPTION: &str = "description";
pub const MASK_TOOL_DESCRIPTION: &str = "adkAgentDefinition.toolSettings.toolDescription";
pub const MASK_REASONING_ENGINE: &str =
    "adkAgentDefinition.provisionedReasoningEngine.reasoningEngine";
pub const MASK_AUTHORIZATIONS: &str = "adkAgentDefinition.authorizations";
pub const MASK_ICON: &str = "icon";

/// Where short IDs are expanded into full resource names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadScope<'a> {
    pub project_id: &'a str,
    /// Location of reasoning engines (e.g. `us-central1`).
    pub reasoning_engine_location: &'a str,
    /// Location of authorizations, the discovery location.
    pub authorization_location: &'a str,
}

/// Agent resource body sent to Discovery Engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adk_agent_definition: Option<AdkAgentDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<AgentIcon>,
}

impl AgentPayload {
    /// Builds the body of a create call.
    pub fn for_create(draft: &AgentDraft, scope: &PayloadScope<'_>) -> Self {
        let authorizations = draft
            .auth_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| authorization_name(scope.project_id, scope.authorization_location, id))
            .into_iter()
            .collect();

        Self {
            display_name: Some(draft.display_name.clone()),
            description: Some(draft.description.clone()),
            adk_agent_definition: Some(AdkAgentDefinition {
                tool_settings: Some(ToolSettings {
                    tool_description: draft.tool_description.clone(),
                }),
                provisioned_reasoning_engine: Some(ProvisionedReasoningEngine {
                    reasoning_engine: reasoning_engine_name(
                        scope.project_id,
                        scope.reasoning_engine_location,
                        &draft.adk_deployment_id,
                    ),
                }),
                authorizations: Some(authorizations),
            }),
            icon: draft
                .icon_uri
                .as_deref()
                .filter(|uri| !uri.is_empty())
                .map(|uri| AgentIcon { uri: uri.to_string() }),
        }
    }

    /// Builds the body of a patch call together with its update mask.
    ///
    /// Only fields present in `patch` appear in either.
    pub fn for_update(patch: &AgentPatch, scope: &PayloadScope<'_>) -> (Self, Vec<&'static str>) {
        let mut payload = Self::default();
        let mut mask = Vec::new();
        let mut adk = AdkAgentDefinition::default();

        if let Some(display_name) = &patch.display_name {
            payload.display_name = Some(display_name.clone());
            mask.push(MASK_DISPLAY_NAME);
        }
        if let Some(description) = &patch.description {
            payload.description = Some(description.clone());
            mask.push(MASK_DESCRIPTION);
        }
        if let Some(tool_description) = &patch.tool_description {
            adk.tool_settings = Some(ToolSettings { tool_description: tool_description.clone() });
            mask.push(MASK_TOOL_DESCRIPTION);
        }
        if let Some(deployment) = &patch.adk_deployment_id {
            adk.provisioned_reasoning_engine = Some(ProvisionedReasoningEngine {
                reasoning_engine: reasoning_engine_name(
                    scope.project_id,
                    scope.reasoning_engine_location,
                    deployment,
                ),
            });
            mask.push(MASK_REASONING_ENGINE);
        }
        if let Some(auth_id) = &patch.auth_id {
            adk.authorizations = Some(vec![authorization_name(
                scope.project_id,
                scope.authorization_location,
                auth_id,
            )]);
            mask.push(MASK_AUTHORIZATIONS);
        }
        if let Some(uri) = &patch.icon_uri {
            payload.icon = Some(AgentIcon { uri: uri.clone() });
            mask.push(MASK_ICON);
        }

        if adk != AdkAgentDefinition::default() {
            payload.adk_agent_definition = Some(adk);
        }
        (payload, mask)
    }

    /// Writes every field present in the payload onto `agent`.
    pub fn apply_to(&self, agent: &mut Agent) {
        if let Some(display_name) = &self.display_name {
            agent.display_name.clone_from(display_name);
        }
        if let Some(description) = &self.description {
            agent.description.clone_from(description);
        }
        if let Some(icon) = &self.icon {
            agent.icon = Some(icon.clone());
        }
        if let Some(adk) = &self.adk_agent_definition {
            let current =
                agent.adk_agent_definition.get_or_insert_with(AdkAgentDefinition::default);
            if adk.tool_settings.is_some() {
                current.tool_settings.clone_from(&adk.tool_settings);
            }
            if adk.provisioned_reasoning_engine.is_some() {
                current.provisioned_reasoning_engine.clone_from(&adk.provisioned_reasoning_engine);
            }
            if adk.authorizations.is_some() {
                current.authorizations.clone_from(&adk.authorizations);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: PayloadScope<'static> = PayloadScope {
        project_id: "proj",
        reasoning_engine_location: "us-central1",
        authorization_location: "global",
    };

    fn draft() -> AgentDraft {
        AgentDraft {
            display_name: "Weather".into(),
            description: "Weather agent".into(),
            tool_description: "Use for forecasts".into(),
            adk_deployment_id: "4242".into(),
            auth_id: None,
            icon_uri: None,
        }
    }

    #[test]
    fn test_create_payload_shape() {
        let payload = AgentPayload::for_create(&draft(), &SCOPE);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "displayName": "Weather",
                "description": "Weather agent",
                "adkAgentDefinition": {
                    "toolSettings": {"toolDescription": "Use for forecasts"},
                    "provisionedReasoningEngine": {
                        "reasoningEngine": "projects/proj/locations/us-central1/reasoningEngines/4242"
                    },
                    "authorizations": []
                }
            })
        );
    }

    #[test]
    fn test_create_payload_with_auth_and_icon() {
        let mut draft = draft();
        draft.auth_id = Some("gmail".into());
        draft.icon_uri = Some("https://example.com/icon.png".into());

        let json = serde_json::to_value(AgentPayload::for_create(&draft, &SCOPE)).unwrap();
        assert_eq!(
            json["adkAgentDefinition"]["authorizations"],
            serde_json::json!(["projects/proj/locations/global/authorizations/gmail"])
        );
        assert_eq!(json["icon"]["uri"], "https://example.com/icon.png");
    }

    #[test]
    fn test_update_payload_only_supplied_fields() {
        let patch = AgentPatch {
            description: Some("Updated".into()),
            tool_description: Some("New tool text".into()),
            ..AgentPatch::default()
        };

        let (payload, mask) = AgentPayload::for_update(&patch, &SCOPE);
        assert_eq!(mask, vec![MASK_DESCRIPTION, MASK_TOOL_DESCRIPTION]);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "description": "Updated",
                "adkAgentDefinition": {"toolSettings": {"toolDescription": "New tool text"}}
            })
        );
    }

    #[test]
    fn test_update_payload_without_adk_fields() {
        let patch = AgentPatch { display_name: Some("Renamed".into()), ..AgentPatch::default() };
        let (payload, mask) = AgentPayload::for_update(&patch, &SCOPE);
        assert_eq!(mask, vec![MASK_DISPLAY_NAME]);
        assert!(payload.adk_agent_definition.is_none());
    }

    #[test]
    fn test_apply_to_merges_nested_fields() {
        let mut agent = Agent::default();
        AgentPayload::for_create(&draft(), &SCOPE).apply_to(&mut agent);

        let patch =
            AgentPatch { tool_description: Some("Changed".into()), ..AgentPatch::default() };
        let (payload, _) = AgentPayload::for_update(&patch, &SCOPE);
        payload.apply_to(&mut agent);

        assert_eq!(agent.display_name, "Weather");
        assert_eq!(agent.tool_description(), Some("Changed"));
        assert_eq!(
            agent.reasoning_engine(),
            Some("projects/proj/locations/us-central1/reasoningEngines/4242")
        );
    }
}
