//! AgentSpace console server.
//!
//! A thin HTTP layer between the browser page and the agent registry:
//! configuration loading, the axum router with its handlers, and the
//! error envelope every endpoint shares.

pub mod config;
pub mod error;
pub mod server;

pub use config::Config;
pub use error::{ApiError, Result, ServerError};
pub use server::{AppState, build_state, router};
