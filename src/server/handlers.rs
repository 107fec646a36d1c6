//! HTTP handlers for the collection and document routes
//!
//! Two handlers serve every collection. Each request goes through the same
//! checks, in this order, before the store is touched:
//!
//! 1. authentication (401)
//! 2. collection allow-set (404)
//! 3. method supported by the route shape (405 + `Allow`)
//! 4. configured route guard (403)
//! 5. query / body parsing (400)
//!
//! Store failures are logged with their context and answered with an opaque
//! 500.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::core::auth::{AccessPolicy, AuthVerifier, Identity, IdentityProvider, RoleGate};
use crate::core::error::{ClientInputError, GatewayError, GatewayResult};
use crate::core::operation::{CollectionMethod, DocumentMethod, Operation};
use crate::core::query::{QueryError, RawQueryParams, translate};
use crate::core::store::DocumentStore;

/// Field stamped with the creator's identity id
pub const CREATED_BY: &str = "createdBy";

/// Field stamped with the last writer's identity id
pub const UPDATED_BY: &str = "updatedBy";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub verifier: AuthVerifier,
    pub role_gate: RoleGate,
    pub policy: Arc<AccessPolicy>,
}

impl AppState {
    pub fn new(
        config: Arc<GatewayConfig>,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let verifier = AuthVerifier::new(provider, store.clone(), config.users_collection.clone());
        let role_gate = RoleGate::new(config.admin_role.clone());
        let policy = Arc::new(AccessPolicy::from_rules(&config.access));

        Self {
            config,
            store,
            verifier,
            role_gate,
            policy,
        }
    }

    /// Resolve the caller or fail with 401
    async fn authenticate(&self, headers: &HeaderMap) -> GatewayResult<Identity> {
        self.verifier
            .verify(headers)
            .await
            .ok_or_else(GatewayError::unauthorized)
    }

    fn ensure_collection(&self, collection: &str) -> GatewayResult<()> {
        if self.config.is_known_collection(collection) {
            Ok(())
        } else {
            Err(ClientInputError::UnknownCollection {
                collection: collection.to_string(),
            }
            .into())
        }
    }

    /// Apply the route guard configured for this collection and operation
    fn authorize(
        &self,
        identity: &Identity,
        collection: &str,
        operation: Operation,
    ) -> GatewayResult<()> {
        match self.policy.required_role(collection, operation) {
            Some(role) => self.role_gate.check(Some(identity), role),
            None => Ok(()),
        }
    }
}

/// Parse a write body; anything but a JSON object is a 400
fn parse_object(body: &Bytes) -> GatewayResult<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ClientInputError::InvalidBody {
            message: "expected a JSON object".to_string(),
        }
        .into()),
        Err(e) => Err(ClientInputError::InvalidBody {
            message: e.to_string(),
        }
        .into()),
    }
}

/// Log a store failure with its context and hide it behind a 500
fn store_failure(
    operation: Operation,
    collection: &str,
    id: Option<&str>,
) -> impl FnOnce(anyhow::Error) -> GatewayError {
    move |err| {
        tracing::error!(
            operation = %operation,
            collection = %collection,
            id = id.unwrap_or("-"),
            error = %format!("{:#}", err),
            "store call failed"
        );
        GatewayError::backend(operation.as_str(), err)
    }
}

/// `GET|POST /{collection}`
pub async fn collection_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    method: Method,
    headers: HeaderMap,
    query: Result<Query<RawQueryParams>, QueryRejection>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let identity = state.authenticate(&headers).await?;
    state.ensure_collection(&collection)?;

    let route_method = CollectionMethod::from_method(&method).ok_or_else(|| {
        GatewayError::unsupported_method(method.as_str(), CollectionMethod::ALLOWED)
    })?;
    let operation = route_method.operation();
    state.authorize(&identity, &collection, operation)?;

    match route_method {
        CollectionMethod::Get => {
            let Query(raw) = query.map_err(|e| QueryError::InvalidParameters {
                message: e.body_text(),
            })?;
            let spec = translate(&raw)?;

            let documents = state
                .store
                .find_many(&collection, &spec)
                .await
                .map_err(store_failure(operation, &collection, None))?;

            Ok((StatusCode::OK, Json(documents)).into_response())
        }
        CollectionMethod::Post => {
            let mut data = parse_object(&body)?;
            data.insert(CREATED_BY.to_string(), Value::String(identity.id.clone()));

            let created = state
                .store
                .create(&collection, data)
                .await
                .map_err(store_failure(operation, &collection, None))?;

            tracing::debug!(collection = %collection, id = %created.id, "document created");
            Ok((StatusCode::CREATED, Json(created)).into_response())
        }
    }
}

/// `GET|PUT|PATCH|DELETE /{collection}/{id}`
pub async fn document_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let identity = state.authenticate(&headers).await?;
    state.ensure_collection(&collection)?;

    let route_method = DocumentMethod::from_method(&method).ok_or_else(|| {
        GatewayError::unsupported_method(method.as_str(), DocumentMethod::ALLOWED)
    })?;
    let operation = route_method.operation();
    state.authorize(&identity, &collection, operation)?;

    match route_method {
        DocumentMethod::Get => {
            let document = state
                .store
                .find_by_id(&collection, &id)
                .await
                .map_err(store_failure(operation, &collection, Some(&id)))?
                .ok_or_else(|| GatewayError::not_found(&collection, &id))?;

            Ok((StatusCode::OK, Json(document)).into_response())
        }
        DocumentMethod::Put | DocumentMethod::Patch => {
            let mut data = parse_object(&body)?;
            data.insert(UPDATED_BY.to_string(), Value::String(identity.id.clone()));

            let merged = state
                .store
                .update(&collection, &id, data)
                .await
                .map_err(store_failure(operation, &collection, Some(&id)))?
                .ok_or_else(|| GatewayError::not_found(&collection, &id))?;

            Ok((StatusCode::OK, Json(merged)).into_response())
        }
        DocumentMethod::Delete => {
            state
                .store
                .delete(&collection, &id)
                .await
                .map_err(store_failure(operation, &collection, Some(&id)))?;

            tracing::debug!(collection = %collection, id = %id, "document deleted");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}
