//! Handlers for the `/api/as-agents` endpoints.
//!
//! Each handler validates its input, makes one registry call and maps the
//! result to JSON. Invalid input is rejected before the registry is touched.

use agentspace_abstraction::{
    Agent, AgentDraft, AgentPatch, App, AppRef, ReasoningEngine, validate_reference,
    validate_segment,
};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use crate::error::ApiError;

type ApiResult<T> = Result<T, ApiError>;

/// Query of the endpoints addressing one app or agent.
#[derive(Debug, Default, Deserialize)]
pub struct AgentQuery {
    pub project_id: Option<String>,
    pub app_id: Option<String>,
    pub agent_id: Option<String>,
    pub display_name: Option<String>,
}

/// Query of `list-reasoning-engines`.
#[derive(Debug, Default, Deserialize)]
pub struct ReasoningEngineQuery {
    pub project_id: Option<String>,
    pub location_id: Option<String>,
}

/// Body of `add-agent`.
#[derive(Debug, Default, Deserialize)]
pub struct AddAgentRequest {
    pub project_id: Option<String>,
    pub app_id: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub tool_description: Option<String>,
    pub adk_deployment_id: Option<String>,
    pub auth_id: Option<String>,
    pub icon_uri: Option<String>,
}

/// Body of `update-agent`. Absent or blank fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAgentRequest {
    pub project_id: Option<String>,
    pub app_id: Option<String>,
    pub agent_id: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub tool_description: Option<String>,
    pub adk_deployment_id: Option<String>,
    pub auth_id: Option<String>,
    pub icon_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AgentList {
    pub agents: Vec<Agent>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Returns the trimmed value, or a "missing field" error when absent or blank.
fn required(field: &str, value: Option<String>) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing required field: {field}")))
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn segment(field: &str, value: Option<String>) -> ApiResult<String> {
    let value = required(field, value)?;
    validate_segment(field, &value)?;
    Ok(value)
}

fn app_ref(project_id: Option<String>, app_id: Option<String>) -> ApiResult<AppRef> {
    Ok(AppRef::new(segment("project_id", project_id)?, segment("app_id", app_id)?))
}

fn validate_links(adk_deployment_id: Option<&str>, auth_id: Option<&str>) -> ApiResult<()> {
    if let Some(id) = adk_deployment_id {
        validate_reference("adk_deployment_id", id, "reasoningEngines")?;
    }
    if let Some(id) = auth_id {
        validate_reference("auth_id", id, "authorizations")?;
    }
    Ok(())
}

/// `GET /healthz`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /api/as-agents`
pub async fn list_apps(State(state): State<AppState>) -> ApiResult<Json<Vec<App>>> {
    let project_id = state.project_id.as_deref().ok_or(ApiError::ProjectNotConfigured)?;
    let apps = state.registry.list_apps(project_id).await?;
    Ok(Json(apps))
}

/// `GET /api/as-agents/list-agents`
pub async fn list_agents(
    State(state): State<AppState>,
    query: Result<Query<AgentQuery>, QueryRejection>,
) -> ApiResult<Json<AgentList>> {
    let Query(query) = query?;
    let app = app_ref(query.project_id, query.app_id)?;

    let agents = state.registry.list_agents(&app).await?;
    Ok(Json(AgentList { agents }))
}

/// `POST /api/as-agents/add-agent`
pub async fn add_agent(
    State(state): State<AppState>,
    body: Result<Json<AddAgentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    let Json(body) = body?;
    let app = app_ref(body.project_id, body.app_id)?;
    let draft = AgentDraft {
        display_name: required("display_name", body.display_name)?,
        description: required("description", body.description)?,
        tool_description: required("tool_description", body.tool_description)?,
        adk_deployment_id: required("adk_deployment_id", body.adk_deployment_id)?,
        auth_id: optional(body.auth_id),
        icon_uri: optional(body.icon_uri),
    };
    validate_links(Some(&draft.adk_deployment_id), draft.auth_id.as_deref())?;

    let agent = state.registry.create_agent(&app, &draft).await?;
    info!(
        app_id = %app.app_id,
        agent_id = %agent.id,
        display_name = %agent.display_name,
        "Agent added"
    );
    Ok((StatusCode::CREATED, Json(agent)))
}

/// `GET /api/as-agents/get-agent`
pub async fn get_agent(
    State(state): State<AppState>,
    query: Result<Query<AgentQuery>, QueryRejection>,
) -> ApiResult<Json<Agent>> {
    let Query(query) = query?;
    let app = app_ref(query.project_id, query.app_id)?;
    let agent_id = segment("agent_id", query.agent_id)?;

    let agent = state.registry.get_agent(&app, &agent_id).await?;
    Ok(Json(agent))
}

/// `GET /api/as-agents/get-agent-by-name`
pub async fn get_agent_by_name(
    State(state): State<AppState>,
    query: Result<Query<AgentQuery>, QueryRejection>,
) -> ApiResult<Json<Agent>> {
    let Query(query) = query?;
    let app = app_ref(query.project_id, query.app_id)?;
    // Display names may contain any character; they never reach a URL path.
    let display_name = required("display_name", query.display_name)?;

    let agent = state.registry.get_agent_by_display_name(&app, &display_name).await?;
    Ok(Json(agent))
}

/// `PUT /api/as-agents/update-agent`
pub async fn update_agent(
    State(state): State<AppState>,
    body: Result<Json<UpdateAgentRequest>, JsonRejection>,
) -> ApiResult<Json<Agent>> {
    let Json(body) = body?;
    let app = app_ref(body.project_id, body.app_id)?;
    let agent_id = segment("agent_id", body.agent_id)?;
    let patch = AgentPatch {
        display_name: body.display_name,
        description: body.description,
        tool_description: body.tool_description,
        adk_deployment_id: body.adk_deployment_id,
        auth_id: body.auth_id,
        icon_uri: body.icon_uri,
    }
    .normalized();

    if patch.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    validate_links(patch.adk_deployment_id.as_deref(), patch.auth_id.as_deref())?;

    let agent = state.registry.update_agent(&app, &agent_id, &patch).await?;
    info!(app_id = %app.app_id, %agent_id, "Agent updated");
    Ok(Json(agent))
}

/// `DELETE /api/as-agents/delete-agent`
pub async fn delete_agent(
    State(state): State<AppState>,
    query: Result<Query<AgentQuery>, QueryRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Query(query) = query?;
    let app = app_ref(query.project_id, query.app_id)?;
    let agent_id = segment("agent_id", query.agent_id)?;

    state.registry.delete_agent(&app, &agent_id).await?;
    info!(app_id = %app.app_id, %agent_id, "Agent deleted");
    Ok(Json(MessageResponse { message: format!("Agent {agent_id} deleted successfully.") }))
}

/// `GET /api/as-agents/list-reasoning-engines`
pub async fn list_reasoning_engines(
    State(state): State<AppState>,
    query: Result<Query<ReasoningEngineQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ReasoningEngine>>> {
    let Query(query) = query?;
    let project_id = segment("project_id", query.project_id)?;
    let location = optional(query.location_id);
    if let Some(location) = &location {
        validate_segment("location_id", location)?;
    }

    let engines = state.registry.list_reasoning_engines(&project_id, location.as_deref()).await?;
    Ok(Json(engines))
}
