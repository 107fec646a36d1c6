//! Shared test harness for HTTP tests
//!
//! Provides a recording store wrapper (to assert which store calls a request
//! made, and with what query), a store whose resource calls always fail, and
//! a `TestServer` wired with seeded users and static tokens.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::http::HeaderValue;
use axum_test::TestServer;
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};

use docgate::config::GatewayConfig;
use docgate::core::query::QuerySpec;
use docgate::core::store::{Document, DocumentStore};
use docgate::identity::StaticTokenProvider;
use docgate::server::ServerBuilder;
use docgate::storage::InMemoryDocumentStore;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const AGENT_TOKEN: &str = "agent-token";
pub const BUYER_TOKEN: &str = "buyer-token";
/// Valid token whose subject has no profile document
pub const ORPHAN_TOKEN: &str = "orphan-token";

pub const ADMIN_ID: &str = "u-admin";
pub const AGENT_ID: &str = "u-agent";
pub const BUYER_ID: &str = "u-buyer";

// ---------------------------------------------------------------------------
// Recording store
// ---------------------------------------------------------------------------

/// One call received by the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    FindById { collection: String, id: String },
    FindMany { collection: String, query: QuerySpec },
    Create { collection: String },
    Update { collection: String, id: String },
    Delete { collection: String, id: String },
}

/// Wraps an in-memory store and records every call
#[derive(Clone)]
pub struct RecordingStore {
    inner: InMemoryDocumentStore,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl RecordingStore {
    pub fn new(inner: InMemoryDocumentStore) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than the profile lookups made by authentication
    pub fn resource_calls(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                !matches!(call, StoreCall::FindById { collection, .. } if collection == "users")
            })
            .collect()
    }

    pub fn last_query(&self) -> Option<QuerySpec> {
        self.calls().into_iter().rev().find_map(|call| match call {
            StoreCall::FindMany { query, .. } => Some(query),
            _ => None,
        })
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.record(StoreCall::FindById {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self.inner.find_by_id(collection, id).await
    }

    async fn find_many(&self, collection: &str, query: &QuerySpec) -> Result<Vec<Document>> {
        self.record(StoreCall::FindMany {
            collection: collection.to_string(),
            query: query.clone(),
        });
        self.inner.find_many(collection, query).await
    }

    async fn create(&self, collection: &str, data: Map<String, Value>) -> Result<Document> {
        self.record(StoreCall::Create {
            collection: collection.to_string(),
        });
        self.inner.create(collection, data).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Document>> {
        self.record(StoreCall::Update {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self.inner.update(collection, id, data).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.record(StoreCall::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self.inner.delete(collection, id).await
    }
}

// ---------------------------------------------------------------------------
// Failing store
// ---------------------------------------------------------------------------

/// Serves profile lookups, fails every other call with a detailed error
#[derive(Clone)]
pub struct BrokenStore {
    profiles: InMemoryDocumentStore,
}

pub const BROKEN_STORE_DETAIL: &str = "connection reset by peer at 10.0.0.7:27017";

impl BrokenStore {
    pub fn new(profiles: InMemoryDocumentStore) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl DocumentStore for BrokenStore {
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        if collection == "users" {
            return self.profiles.find_by_id(collection, id).await;
        }
        Err(anyhow!(BROKEN_STORE_DETAIL))
    }

    async fn find_many(&self, _: &str, _: &QuerySpec) -> Result<Vec<Document>> {
        Err(anyhow!(BROKEN_STORE_DETAIL))
    }

    async fn create(&self, _: &str, _: Map<String, Value>) -> Result<Document> {
        Err(anyhow!(BROKEN_STORE_DETAIL))
    }

    async fn update(&self, _: &str, _: &str, _: Map<String, Value>) -> Result<Option<Document>> {
        Err(anyhow!(BROKEN_STORE_DETAIL))
    }

    async fn delete(&self, _: &str, _: &str) -> Result<()> {
        Err(anyhow!(BROKEN_STORE_DETAIL))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

/// Store holding the admin, agent and buyer profiles
pub fn seeded_store() -> InMemoryDocumentStore {
    let store = InMemoryDocumentStore::new();
    store
        .insert(
            "users",
            Document::new(ADMIN_ID, fields(json!({"role": "admin", "name": "Ada"}))),
        )
        .unwrap();
    store
        .insert(
            "users",
            Document::new(AGENT_ID, fields(json!({"role": "agent", "name": "Grace"}))),
        )
        .unwrap();
    store
        .insert(
            "users",
            Document::new(BUYER_ID, fields(json!({"role": "buyer", "name": "Linus"}))),
        )
        .unwrap();
    store
}

pub fn provider() -> StaticTokenProvider {
    StaticTokenProvider::default()
        .with_token(ADMIN_TOKEN, ADMIN_ID)
        .with_token(AGENT_TOKEN, AGENT_ID)
        .with_token(BUYER_TOKEN, BUYER_ID)
        .with_token(ORPHAN_TOKEN, "u-ghost")
}

pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

/// Test server over `store` with the default configuration
pub fn test_server(store: impl DocumentStore + 'static) -> TestServer {
    test_server_with_config(store, GatewayConfig::default_config())
}

pub fn test_server_with_config(
    store: impl DocumentStore + 'static,
    config: GatewayConfig,
) -> TestServer {
    let app = ServerBuilder::new()
        .with_config(config)
        .with_store(store)
        .with_identity_provider(provider())
        .build()
        .expect("Failed to build app");

    TestServer::new(app).expect("Failed to create test server")
}

/// Recording server over the seeded store
pub fn recording_server() -> (TestServer, RecordingStore, InMemoryDocumentStore) {
    let inner = seeded_store();
    let store = RecordingStore::new(inner.clone());
    (test_server(store.clone()), store, inner)
}
