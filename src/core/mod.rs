//! Core module containing the gateway's contracts and pure logic

pub mod auth;
pub mod error;
pub mod operation;
pub mod query;
pub mod store;
pub mod validation;

pub use auth::{AccessPolicy, AuthVerifier, Identity, IdentityProvider, RoleGate, authorize};
pub use error::{GatewayError, GatewayResult};
pub use operation::Operation;
pub use query::{QuerySpec, translate};
pub use store::{Document, DocumentStore};
pub use validation::{OperationRequest, ValidationRejection, validate};
