//! HTTP server for the AgentSpace console.
//!
//! Serves the browser page and the `/api/as-agents` JSON endpoints.

mod handlers;
pub mod logging;

use std::sync::Arc;

use agentspace_abstraction::AgentRegistry;
use agentspace_registry::{
    AdcTokenProvider, GcloudTokenProvider, GoogleRegistry, InMemoryRegistry,
    MetadataTokenProvider, StaticTokenProvider, TokenProvider, fetch_project_id,
};
use axum::Router;
use axum::response::Html;
use axum::routing::{delete, get, post, put};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::{AuthMode, Backend, Config};
use crate::error::Result;
use logging::RequestLoggerLayer;

pub use handlers::{AddAgentRequest, AgentQuery, ReasoningEngineQuery, UpdateAgentRequest};

/// Project used by the memory backend when none is configured.
const LOCAL_PROJECT_ID: &str = "local-project";

/// The browser page.
const INDEX_HTML: &str = include_str!("../../static/index.html");

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Registry built once at startup.
    pub registry: Arc<dyn AgentRegistry>,
    /// Project whose apps `GET /api/as-agents` lists.
    pub project_id: Option<String>,
}

impl AppState {
    pub fn new(registry: Arc<dyn AgentRegistry>, project_id: Option<String>) -> Self {
        Self { registry, project_id }
    }
}

/// Builds the registry selected by `config` and resolves the project ID.
///
/// With the Google backend an unconfigured project is taken from the
/// credentials, then asked from the metadata server; if both fail the server
/// still starts and the app listing reports the missing project.
pub async fn build_state(config: &Config) -> Result<AppState> {
    match config.backend {
        Backend::Memory => {
            let project_id =
                config.google.project_id.clone().unwrap_or_else(|| LOCAL_PROJECT_ID.to_string());
            let registry = InMemoryRegistry::new()
                .with_app(&project_id, "local-app", "Local App")
                .with_reasoning_engine(&project_id, "1000", "local-agent");
            info!(%project_id, "Using in-memory registry");
            Ok(AppState::new(Arc::new(registry), Some(project_id)))
        }
        Backend::Google => {
            let tokens = token_provider(config);
            let registry = GoogleRegistry::new(&config.google_settings(), tokens.clone())?;
            let project_id = match &config.google.project_id {
                Some(project_id) => Some(project_id.clone()),
                None => discover_project_id(config, tokens.as_ref()).await,
            };
            Ok(AppState::new(Arc::new(registry), project_id))
        }
    }
}

async fn discover_project_id(config: &Config, tokens: &dyn TokenProvider) -> Option<String> {
    if let Some(project_id) = tokens.project_id().await {
        info!(%project_id, "Using project ID from credentials");
        return Some(project_id);
    }
    match fetch_project_id(config.google.metadata_endpoint.as_deref()).await {
        Ok(project_id) => {
            info!(%project_id, "Discovered project ID from metadata server");
            Some(project_id)
        }
        Err(e) => {
            warn!(error = %e, "Could not determine project ID; set GOOGLE_CLOUD_PROJECT");
            None
        }
    }
}

fn token_provider(config: &Config) -> Arc<dyn TokenProvider> {
    match config.auth.mode {
        AuthMode::Adc => match &config.auth.key_file {
            Some(path) => Arc::new(AdcTokenProvider::with_key_file(path)),
            None => Arc::new(AdcTokenProvider::new()),
        },
        AuthMode::Metadata => match &config.google.metadata_endpoint {
            Some(endpoint) => Arc::new(MetadataTokenProvider::with_base_url(endpoint.clone())),
            None => Arc::new(MetadataTokenProvider::new()),
        },
        AuthMode::Gcloud => Arc::new(GcloudTokenProvider::new()),
        AuthMode::Static => {
            Arc::new(StaticTokenProvider::new(config.auth.token.clone().unwrap_or_default()))
        }
    }
}

/// Routes under `/api/as-agents`.
fn agent_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_apps))
        .route("/list-agents", get(handlers::list_agents))
        .route("/add-agent", post(handlers::add_agent))
        .route("/get-agent", get(handlers::get_agent))
        .route("/get-agent-by-name", get(handlers::get_agent_by_name))
        .route("/update-agent", put(handlers::update_agent))
        .route("/delete-agent", delete(handlers::delete_agent))
        .route("/list-reasoning-engines", get(handlers::list_reasoning_engines))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Html(INDEX_HTML) }))
        .route("/healthz", get(handlers::health))
        .nest("/api/as-agents", agent_routes())
        .layer(
            ServiceBuilder::new().layer(RequestLoggerLayer).layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Starts the server and runs until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address is invalid or the listener cannot be bound.
pub async fn run(config: &Config, state: AppState) -> Result<()> {
    let addr = config.server.address()?;
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, project_id = ?state.project_id, "AgentSpace console listening");

    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
