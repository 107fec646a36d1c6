//! Router assembly for the gateway's HTTP surface
//!
//! - GET /health, /healthz - liveness, no authentication
//! - ANY /{collection} - collection reads and creates
//! - ANY /{collection}/{id} - single-document reads, updates and deletes
//!
//! Methods outside a route's allow list are answered by the handlers with
//! 405 and an `Allow` header, so both resource routes accept any method.

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    routing::{any, get},
};
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::server::handlers::{AppState, collection_handler, document_handler};

/// Build the collection and document routes
pub fn build_resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/{collection}", any(collection_handler))
        .route("/{collection}/{id}", any(document_handler))
        .with_state(state)
}

/// Build health check routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

/// Health check endpoint handler
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "docgate"
    }))
}

/// CORS layer for the configured origins, `None` when none are configured
///
/// An origin of `*` allows any origin. Unparseable origins are skipped.
pub fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if config.allowed_origins.is_empty() {
        return None;
    }

    let allow_origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}

/// Full application router: health, custom routes, resources, layers
pub fn build_router(state: AppState, custom_routes: Vec<Router>) -> Router {
    let cors = cors_layer(&state.config.cors);

    let mut app = health_routes();
    for custom_router in custom_routes {
        app = app.merge(custom_router);
    }
    app = app.merge(build_resource_routes(state));

    let app = app.layer(TraceLayer::new_for_http());
    match cors {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_disabled_without_origins() {
        assert!(cors_layer(&CorsConfig::default()).is_none());
    }

    #[test]
    fn test_cors_enabled_with_origins() {
        let config = CorsConfig {
            allowed_origins: vec!["https://app.example.com".to_string()],
        };
        assert!(cors_layer(&config).is_some());

        let config = CorsConfig {
            allowed_origins: vec!["*".to_string()],
        };
        assert!(cors_layer(&config).is_some());
    }
}
