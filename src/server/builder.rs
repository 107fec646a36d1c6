//! ServerBuilder for fluent API to build the gateway's HTTP server

use super::handlers::AppState;
use super::router::build_router;
use crate::config::GatewayConfig;
use crate::core::auth::IdentityProvider;
use crate::core::store::DocumentStore;
use crate::identity::StaticTokenProvider;
use crate::storage::InMemoryDocumentStore;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for the gateway's HTTP server
///
/// Without explicit components the builder uses the default configuration,
/// an empty in-memory store and a static token provider with no tokens.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(GatewayConfig::from_yaml_file("docgate.yaml")?)
///     .with_store(InMemoryDocumentStore::new())
///     .with_identity_provider(StaticTokenProvider::default().with_token("t", "u-1"))
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: Option<GatewayConfig>,
    store: Option<Arc<dyn DocumentStore>>,
    provider: Option<Arc<dyn IdentityProvider>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            provider: None,
            custom_routes: Vec::new(),
        }
    }

    /// Set the gateway configuration
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document store
    pub fn with_store(self, store: impl DocumentStore + 'static) -> Self {
        self.with_shared_store(Arc::new(store))
    }

    /// Set an already shared document store
    pub fn with_shared_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the identity provider
    pub fn with_identity_provider(self, provider: impl IdentityProvider + 'static) -> Self {
        self.with_shared_identity_provider(Arc::new(provider))
    }

    /// Set an already shared identity provider
    pub fn with_shared_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Add custom routes to the server
    ///
    /// Custom routes are not authenticated by default; wrap them with
    /// [`require_role`](super::guard::require_role) using
    /// [`AppState::role_guard`] from [`ServerBuilder::build_state`].
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Validate the configuration and assemble the shared state
    pub fn build_state(&self) -> Result<AppState> {
        let config = self.config.clone().unwrap_or_default();
        config.validate().context("invalid gateway configuration")?;

        let store = self
            .store
            .clone()
            .unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));
        let provider = self
            .provider
            .clone()
            .unwrap_or_else(|| Arc::new(StaticTokenProvider::default()));

        Ok(AppState::new(Arc::new(config), store, provider))
    }

    /// Build the final router
    pub fn build(mut self) -> Result<Router> {
        let state = self.build_state()?;
        let custom_routes = std::mem::take(&mut self.custom_routes);
        Ok(build_router(state, custom_routes))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
