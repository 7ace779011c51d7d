//! Exporter capability routes.
//!
//! - GET /api/nbconvert - Exporter name to `{ "output_mimetype": ... }`
//! - GET /api/nbconvert/cache - Capability cache status
//! - DELETE /api/nbconvert/cache - Drop the cached capabilities

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use nbconvert_core::CapabilityMap;

use crate::auth::{AUTH_RESOURCE, AuthenticatedUser, authorize};
use crate::cache::CacheStatus;
use crate::error::ApiResult;
use crate::state::AppState;

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/nbconvert - List available exporters.
///
/// # Response
///
/// - 200 OK: `{ "<exporter>": { "output_mimetype": "<type>" }, ... }`, possibly empty
/// - 401 Unauthorized / 403 Forbidden: failed the `nbconvert:read` gate
/// - 500 Internal Server Error: the exporter registry cannot be loaded
async fn list_exporters(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<CapabilityMap>> {
    authorize(&user, AUTH_RESOURCE, "read", state.config())?;

    let capabilities = state.capabilities().capabilities().await?;
    Ok(Json(capabilities.as_ref().clone()))
}

/// GET /api/nbconvert/cache - Report capability cache state.
async fn cache_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<CacheStatus>> {
    authorize(&user, AUTH_RESOURCE, "read", state.config())?;
    Ok(Json(state.capabilities().cache_status().await))
}

/// DELETE /api/nbconvert/cache - Force the next request to rediscover exporters.
async fn invalidate_cache(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<StatusCode> {
    authorize(&user, AUTH_RESOURCE, "write", state.config())?;

    state.capabilities().invalidate().await;
    tracing::info!(subject = %user.subject, "Capability cache cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// Build exporter capability routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/nbconvert", get(list_exporters))
        .route("/api/nbconvert/cache", get(cache_status).delete(invalidate_cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use nbconvert_core::{BuiltinRegistry, ExporterDescriptor};

    use crate::cache::CachePolicy;
    use crate::config::ServerConfig;
    use crate::error::ApiError;

    fn state(policy: CachePolicy) -> AppState {
        let config = ServerConfig {
            cache_policy: policy,
            ..ServerConfig::default()
        };
        let registry = BuiltinRegistry::from_descriptors([
            ExporterDescriptor::new("markdown", "text/markdown"),
            ExporterDescriptor::new("script", ""),
        ]);
        AppState::with_registry(config, Arc::new(registry))
    }

    fn reader() -> AuthenticatedUser {
        AuthenticatedUser {
            subject: "reader".to_string(),
            scopes: vec!["nbconvert:read".to_string()],
        }
    }

    #[tokio::test]
    async fn test_list_exporters() {
        let Json(body) = list_exporters(State(state(CachePolicy::Disabled)), reader())
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "markdown": { "output_mimetype": "text/markdown" },
                "script": { "output_mimetype": "" },
            })
        );
    }

    #[tokio::test]
    async fn test_list_exporters_requires_read_scope() {
        let user = AuthenticatedUser {
            subject: "nobody".to_string(),
            scopes: vec![],
        };
        let result = list_exporters(State(state(CachePolicy::Disabled)), user).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_invalidate_requires_write_scope() {
        let state = state(CachePolicy::ProcessLifetime);
        let result = invalidate_cache(State(state.clone()), reader()).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        let status = invalidate_cache(State(state), AuthenticatedUser::dev())
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_cache_status_after_listing() {
        let state = state(CachePolicy::ProcessLifetime);
        list_exporters(State(state.clone()), reader()).await.unwrap();

        let Json(status) = cache_status(State(state), reader()).await.unwrap();
        assert!(status.populated);
        assert_eq!(status.exporters, 2);
        assert_eq!(status.policy, CachePolicy::ProcessLifetime);
    }
}
