//! nbconvert-server: HTTP API exposing the exporters available to a notebook server
//!
//! This crate provides:
//! - `GET /api/nbconvert`, mapping each exporter name to its output media type
//! - A process-wide capability cache with a configurable policy
//! - Bearer-token authentication with `nbconvert:*` scopes
//!
//! # Architecture
//!
//! The server is built on Axum with a middleware stack for:
//! - Request tracing and logging
//! - CORS handling
//! - Request ID generation
//! - JSON error responses
//!
//! # Usage
//!
//! ```rust,ignore
//! use nbconvert_server::{build_app, config::ServerConfig, state::AppState};
//!
//! let config = ServerConfig::from_env()?;
//! let app = build_app(AppState::new(config));
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod cache;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;
use http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::request_id::{propagate_request_id, request_id_layer};

// Re-exports for convenience
pub use cache::{CachePolicy, CapabilityCache};
pub use capabilities::CapabilityService;
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

// Re-export dependent crates
pub use nbconvert_core;

/// Build the router with the full middleware stack.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config().cors_allowed_origins);

    routes::build_router(state)
        .layer(axum::middleware::from_fn(propagate_request_id))
        .layer(request_id_layer())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build CORS layer from configuration.
fn build_cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    // Parse comma-separated origins
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!(origin = %s, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
