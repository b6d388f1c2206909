//! Registry implementations for the AgentSpace console.
//!
//! This crate provides concrete implementations of the `AgentRegistry` trait.
//!
//! # Backends
//!
//! - **Google**: Discovery Engine (apps, agents) and Vertex AI (reasoning
//!   engines) over REST, authenticated with OAuth2 access tokens
//! - **InMemory**: an in-process registry for tests and offline UI work

pub mod auth;
pub mod discovery;
mod error;
pub mod google;
pub mod memory;
pub mod payload;
pub mod vertex;

pub use auth::{
    AdcTokenProvider, AuthError, GcloudTokenProvider, MetadataTokenProvider, StaticTokenProvider,
    TokenProvider, fetch_project_id,
};
pub use discovery::DiscoveryEngineClient;
pub use google::{GoogleRegistry, GoogleSettings};
pub use memory::InMemoryRegistry;
pub use payload::{AgentPayload, PayloadScope};
pub use vertex::ReasoningEngineClient;
