//! HTTP server for the gateway
//!
//! This module provides:
//! - `ServerBuilder`, which assembles state and routes and serves them
//! - the collection and document handlers
//! - the `require_role` guard for custom routes

pub mod builder;
pub mod guard;
pub mod handlers;
pub mod router;

pub use builder::ServerBuilder;
pub use guard::{RoleGuard, require_role};
pub use handlers::AppState;
