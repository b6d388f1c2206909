//! Resource-name helpers and identifier validation.

use crate::RegistryError;
use crate::types::Agent;

/// Returns the last path segment of a resource name.
pub fn short_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn is_segment(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && value != "."
        && value != ".."
}

/// Checks that `value` can be placed in a URL path as a single segment.
pub fn validate_segment(field: &str, value: &str) -> Result<(), RegistryError> {
    if value.is_empty() {
        return Err(RegistryError::InvalidInput(format!("Missing required field: {field}")));
    }
    if !is_segment(value) {
        return Err(RegistryError::InvalidInput(format!("Malformed {field}: '{value}'")));
    }
    Ok(())
}

/// Checks an identifier that may also be a full `projects/...` resource name
/// inside `collection` (e.g. `reasoningEngines`).
pub fn validate_reference(field: &str, value: &str, collection: &str) -> Result<(), RegistryError> {
    if !value.starts_with("projects/") {
        return validate_segment(field, value);
    }

    let segments: Vec<&str> = value.split('/').collect();
    let well_formed = segments.len() == 6
        && segments[2] == "locations"
        && segments[4] == collection
        && segments.iter().all(|s| is_segment(s));
    if well_formed {
        Ok(())
    } else {
        Err(RegistryError::InvalidInput(format!("Malformed {field}: '{value}'")))
    }
}

fn qualify(project_id: &str, location: &str, collection: &str, id_or_name: &str) -> String {
    if id_or_name.starts_with("projects/") {
        id_or_name.to_string()
    } else {
        format!("projects/{project_id}/locations/{location}/{collection}/{id_or_name}")
    }
}

/// Full reasoning engine name for a deployment ID; full names pass through.
pub fn reasoning_engine_name(project_id: &str, location: &str, id_or_name: &str) -> String {
    qualify(project_id, location, "reasoningEngines", id_or_name)
}

/// Full authorization name for an authorization ID; full names pass through.
pub fn authorization_name(project_id: &str, location: &str, id_or_name: &str) -> String {
    qualify(project_id, location, "authorizations", id_or_name)
}

/// Linear scan for the first agent whose display name equals `display_name`.
pub fn find_agent_by_display_name<'a>(
    agents: &'a [Agent],
    display_name: &str,
) -> Option<&'a Agent> {
    agents.iter().find(|agent| agent.display_name == display_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(id: &str, display_name: &str) -> Agent {
        Agent { id: id.into(), display_name: display_name.into(), ..Agent::default() }
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("projects/p/locations/global/collections/c/engines/app-1"), "app-1");
        assert_eq!(short_id("plain"), "plain");
    }

    #[test]
    fn test_validate_segment() {
        assert!(validate_segment("app_id", "my-app_1.v2").is_ok());

        let err = validate_segment("app_id", "").unwrap_err();
        assert_eq!(err, RegistryError::InvalidInput("Missing required field: app_id".into()));

        assert!(validate_segment("agent_id", "../etc").is_err());
        assert!(validate_segment("agent_id", "a/b").is_err());
        assert!(validate_segment("agent_id", "a?b").is_err());
        assert!(validate_segment("agent_id", "..").is_err());
    }

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("adk_deployment_id", "123", "reasoningEngines").is_ok());
        assert!(validate_reference(
            "adk_deployment_id",
            "projects/p/locations/us-central1/reasoningEngines/123",
            "reasoningEngines"
        )
        .is_ok());
        assert!(validate_reference(
            "adk_deployment_id",
            "projects/p/locations/us-central1/authorizations/123",
            "reasoningEngines"
        )
        .is_err());
        assert!(validate_reference("adk_deployment_id", "projects/p", "reasoningEngines").is_err());
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(
            reasoning_engine_name("p", "us-central1", "42"),
            "projects/p/locations/us-central1/reasoningEngines/42"
        );
        assert_eq!(
            reasoning_engine_name(
                "p",
                "us-central1",
                "projects/q/locations/europe-west1/reasoningEngines/7"
            ),
            "projects/q/locations/europe-west1/reasoningEngines/7"
        );
        assert_eq!(
            authorization_name("p", "global", "gmail-auth"),
            "projects/p/locations/global/authorizations/gmail-auth"
        );
    }

    #[test]
    fn test_find_agent_by_display_name_is_order_independent() {
        let forward = vec![named("1", "Alpha"), named("2", "Beta")];
        let reversed: Vec<Agent> = forward.iter().rev().cloned().collect();

        assert_eq!(find_agent_by_display_name(&forward, "Beta").map(|a| a.id.as_str()), Some("2"));
        assert_eq!(find_agent_by_display_name(&reversed, "Beta").map(|a| a.id.as_str()), Some("2"));
        assert!(find_agent_by_display_name(&forward, "beta").is_none());
        assert!(find_agent_by_display_name(&[], "Alpha").is_none());
    }
}
