//! Authentication and authorization for the gateway
//!
//! - [`AuthVerifier`] turns an `Authorization: Bearer` header into an
//!   [`Identity`], or `None`. It never fails past its own boundary: every
//!   failure is classified as an [`AuthFailure`], logged, and degraded to
//!   "unauthenticated".
//! - [`RoleGate`] decides admit/deny for a required role, with the
//!   administrative role admitted everywhere.
//! - [`AccessPolicy`] holds the configured route guards.

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AccessRule;
use crate::core::error::GatewayError;
use crate::core::operation::Operation;
use crate::core::store::{Document, DocumentStore};

/// Longest `Authorization` header value considered
pub const MAX_AUTHORIZATION_LEN: usize = 8 * 1024;

// =============================================================================
// Identity
// =============================================================================

/// A resolved, authenticated user
///
/// Serializes as `{"id": ..., "role": ..., <profile fields>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl Identity {
    /// Combine a verified subject with its profile document
    ///
    /// The subject wins over any `id` stored in the profile. A `role` field
    /// that is not a non-empty string counts as no role.
    pub fn from_profile(subject: impl Into<String>, profile: Document) -> Self {
        let mut fields = profile.fields;
        fields.remove("id");
        let role = match fields.remove("role") {
            Some(Value::String(role)) if !role.trim().is_empty() => Some(role),
            _ => None,
        };

        Self {
            id: subject.into(),
            role,
            profile: fields,
        }
    }

    /// Identity with a role and no profile fields
    pub fn with_role(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Some(role.into()),
            profile: Map::new(),
        }
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

// =============================================================================
// Identity provider seam
// =============================================================================

/// What the identity provider asserts about a valid token
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    /// Provider-asserted subject id, the key of the profile document
    pub subject: String,
    /// Any extra claims the provider returned
    pub claims: Map<String, Value>,
}

impl VerifiedToken {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            claims: Map::new(),
        }
    }
}

/// Failure reported by an identity provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Token is expired, malformed, revoked or unknown
    #[error("token rejected: {reason}")]
    Rejected { reason: String },

    /// Provider could not be reached or answered unexpectedly
    #[error("identity provider unavailable: {message}")]
    Unavailable { message: String },
}

/// Verifies bearer tokens against an external identity service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<VerifiedToken, ProviderError>;
}

// =============================================================================
// Auth Verifier
// =============================================================================

/// Why a request ended up unauthenticated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("authorization header missing")]
    MissingHeader,

    #[error("authorization header is not valid text or is too long")]
    MalformedHeader,

    #[error("authorization scheme is not bearer")]
    UnsupportedScheme,

    #[error("bearer token is empty")]
    EmptyToken,

    #[error("identity provider rejected the token: {reason}")]
    TokenRejected { reason: String },

    #[error("identity provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    #[error("no profile document for subject '{subject}'")]
    ProfileNotFound { subject: String },

    #[error("profile lookup failed: {message}")]
    ProfileLookupFailed { message: String },
}

impl AuthFailure {
    /// Stable label for structured logs
    pub fn label(&self) -> &'static str {
        match self {
            AuthFailure::MissingHeader => "missing_header",
            AuthFailure::MalformedHeader => "malformed_header",
            AuthFailure::UnsupportedScheme => "unsupported_scheme",
            AuthFailure::EmptyToken => "empty_token",
            AuthFailure::TokenRejected { .. } => "token_rejected",
            AuthFailure::ProviderUnavailable { .. } => "provider_unavailable",
            AuthFailure::ProfileNotFound { .. } => "profile_not_found",
            AuthFailure::ProfileLookupFailed { .. } => "profile_lookup_failed",
        }
    }

    /// Failures caused by infrastructure rather than the caller
    pub fn is_backend_fault(&self) -> bool {
        matches!(
            self,
            AuthFailure::ProviderUnavailable { .. } | AuthFailure::ProfileLookupFailed { .. }
        )
    }
}

impl From<ProviderError> for AuthFailure {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected { reason } => AuthFailure::TokenRejected { reason },
            ProviderError::Unavailable { message } => AuthFailure::ProviderUnavailable { message },
        }
    }
}

/// Extract the bearer token from request headers
///
/// The scheme is matched case-insensitively. No remote call is made here.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthFailure::MissingHeader)?;

    if value.len() > MAX_AUTHORIZATION_LEN {
        return Err(AuthFailure::MalformedHeader);
    }

    let value = value
        .to_str()
        .map_err(|_| AuthFailure::MalformedHeader)?
        .trim();

    let (scheme, token) = value
        .split_once(char::is_whitespace)
        .unwrap_or((value, ""));

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthFailure::UnsupportedScheme);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthFailure::EmptyToken);
    }

    Ok(token)
}

/// Resolves bearer credentials to identities
#[derive(Clone)]
pub struct AuthVerifier {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    users_collection: String,
}

impl AuthVerifier {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        users_collection: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            users_collection: users_collection.into(),
        }
    }

    /// Resolve the request's identity, `None` when unauthenticated
    pub async fn verify(&self, headers: &HeaderMap) -> Option<Identity> {
        match self.verify_detailed(headers).await {
            Ok(identity) => Some(identity),
            Err(failure) => {
                if failure.is_backend_fault() {
                    tracing::warn!(reason = failure.label(), error = %failure, "authentication failed");
                } else {
                    tracing::debug!(reason = failure.label(), error = %failure, "authentication failed");
                }
                None
            }
        }
    }

    /// Resolve the request's identity, keeping the failure cause
    pub async fn verify_detailed(&self, headers: &HeaderMap) -> Result<Identity, AuthFailure> {
        let token = bearer_token(headers)?;

        let verified = self.provider.verify_token(token).await?;

        let profile = self
            .store
            .find_by_id(&self.users_collection, &verified.subject)
            .await
            .map_err(|e| AuthFailure::ProfileLookupFailed {
                message: format!("{:#}", e),
            })?
            .ok_or_else(|| AuthFailure::ProfileNotFound {
                subject: verified.subject.clone(),
            })?;

        Ok(Identity::from_profile(verified.subject, profile))
    }
}

// =============================================================================
// Role Gate
// =============================================================================

/// Admit/deny decision for a required role
///
/// No hierarchy beyond the administrative override.
pub fn authorize(identity: Option<&Identity>, required_role: &str, admin_role: &str) -> bool {
    let Some(role) = identity.and_then(Identity::role) else {
        return false;
    };
    role == admin_role || role == required_role
}

/// Role Gate bound to the configured administrative role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    admin_role: String,
}

impl RoleGate {
    pub fn new(admin_role: impl Into<String>) -> Self {
        Self {
            admin_role: admin_role.into(),
        }
    }

    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    pub fn authorize(&self, identity: Option<&Identity>, required_role: &str) -> bool {
        authorize(identity, required_role, &self.admin_role)
    }

    /// Like [`RoleGate::authorize`], with the denial classified
    ///
    /// No identity is a 401, a wrong role a 403.
    pub fn check(
        &self,
        identity: Option<&Identity>,
        required_role: &str,
    ) -> Result<(), GatewayError> {
        if self.authorize(identity, required_role) {
            return Ok(());
        }
        match identity {
            None => Err(GatewayError::unauthorized()),
            Some(_) => Err(GatewayError::forbidden(required_role)),
        }
    }
}

impl Default for RoleGate {
    fn default() -> Self {
        Self::new("admin")
    }
}

// =============================================================================
// Access Policy
// =============================================================================

/// Configured route guards, keyed by collection and operation
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: HashMap<(String, Operation), String>,
}

impl AccessPolicy {
    /// Build from config rules; the first rule for a pair wins
    pub fn from_rules(rules: &[AccessRule]) -> Self {
        let mut map = HashMap::new();
        for rule in rules {
            for op in &rule.operations {
                map.entry((rule.collection.clone(), *op))
                    .or_insert_with(|| rule.role.clone());
            }
        }
        Self { rules: map }
    }

    /// Role required for `operation` on `collection`, if any
    pub fn required_role(&self, collection: &str, operation: Operation) -> Option<&str> {
        self.rules
            .get(&(collection.to_string(), operation))
            .map(String::as_str)
    }
}
