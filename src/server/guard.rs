//! Role guard middleware for custom routes
//!
//! Wraps any router so that only callers holding a role (or the admin role)
//! reach it. On success the resolved [`Identity`] is placed in the request
//! extensions, where handlers read it with `Extension<Identity>`.
//!
//! ```rust,ignore
//! let reports = Router::new()
//!     .route("/reports", get(reports_handler))
//!     .route_layer(middleware::from_fn_with_state(
//!         state.role_guard("auditor"),
//!         require_role,
//!     ));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::core::auth::{AuthVerifier, RoleGate};
use crate::core::error::GatewayError;
use crate::server::handlers::AppState;

/// What [`require_role`] checks
#[derive(Clone)]
pub struct RoleGuard {
    verifier: AuthVerifier,
    gate: RoleGate,
    role: String,
}

impl RoleGuard {
    pub fn new(verifier: AuthVerifier, gate: RoleGate, role: impl Into<String>) -> Self {
        Self {
            verifier,
            gate,
            role: role.into(),
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

impl AppState {
    /// Guard admitting `role` and the admin role
    pub fn role_guard(&self, role: impl Into<String>) -> RoleGuard {
        RoleGuard::new(self.verifier.clone(), self.role_gate.clone(), role)
    }
}

/// 401 without identity, 403 with the wrong role, otherwise delegate
pub async fn require_role(
    State(guard): State<RoleGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let identity = guard.verifier.verify(request.headers()).await;
    guard.gate.check(identity.as_ref(), &guard.role)?;

    if let Some(identity) = identity {
        request.extensions_mut().insert(identity);
    }

    Ok(next.run(request).await)
}
