//! # docgate
//!
//! A collection-oriented REST gateway over a schemaless document store.
//!
//! ## Features
//!
//! - **Generic CRUD**: `/{collection}` and `/{collection}/{id}` for every collection in a fixed allow-set
//! - **Bearer Authentication**: tokens verified by a pluggable identity provider, resolved to a user profile
//! - **Role Gate**: configurable route guards with an administrative override
//! - **Query Language**: `where` filters, `orderBy`, `limit` and opaque `startAfter` cursors
//! - **Validation Gate**: pre-flight checks for automated administrative operations
//! - **Pluggable Storage**: in-memory store by default, MongoDB behind `mongodb_backend`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docgate::prelude::*;
//!
//! let store = InMemoryDocumentStore::new();
//! store.insert("users", Document::new("u-1", profile))?;
//!
//! ServerBuilder::new()
//!     .with_config(GatewayConfig::default_config())
//!     .with_store(store)
//!     .with_identity_provider(StaticTokenProvider::default().with_token("secret", "u-1"))
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```
//!
//! ```text
//! curl -H 'Authorization: Bearer secret' \
//!   'http://127.0.0.1:3000/properties?where=[["price","<",500000]]&limit=10'
//! ```

pub mod config;
pub mod core;
pub mod identity;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{
            AccessPolicy, AuthFailure, AuthVerifier, Identity, IdentityProvider, ProviderError,
            RoleGate, VerifiedToken, authorize,
        },
        error::{ClientInputError, GatewayError, GatewayResult},
        operation::{CollectionMethod, DocumentMethod, Operation},
        query::{Cursor, Direction, Filter, FilterOp, OrderBy, QueryError, QuerySpec, translate},
        store::{Document, DocumentStore},
        validation::{OperationRequest, ValidatedRequest, ValidationRejection, validate},
    };

    // === Identity providers ===
    #[cfg(feature = "remote-auth")]
    pub use crate::identity::IdentityToolkitProvider;
    pub use crate::identity::StaticTokenProvider;

    // === Storage ===
    pub use crate::storage::InMemoryDocumentStore;
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoDocumentStore;

    // === Config ===
    pub use crate::config::{AccessRule, GatewayConfig, IdentityConfig, StorageConfig};

    // === Server ===
    pub use crate::server::{AppState, RoleGuard, ServerBuilder, require_role};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
}
