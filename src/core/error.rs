//! Typed error handling for the gateway
//!
//! Every failure that can reach an HTTP caller is funnelled into
//! [`GatewayError`] at the handler boundary. Each variant maps to exactly one
//! status code, and [`GatewayError::Backend`] never leaks its detail: the
//! detail is logged server-side and the caller sees an opaque 500.
//!
//! # Error Categories
//!
//! - [`GatewayError::ClientInput`]: malformed or unknown input (400 / 404)
//! - [`GatewayError::Authentication`]: missing or invalid credential (401)
//! - [`GatewayError::Authorization`]: authenticated but insufficient role (403)
//! - [`GatewayError::NotFound`]: single-document lookup miss (404)
//! - [`GatewayError::UnsupportedMethod`]: method not served by the route (405)
//! - [`GatewayError::Backend`]: store or identity provider failure (500)
//!
//! # Example
//!
//! ```rust,ignore
//! let doc = store
//!     .find_by_id(&collection, &id)
//!     .await
//!     .map_err(|e| GatewayError::backend("read", e))?
//!     .ok_or_else(|| GatewayError::not_found(&collection, &id))?;
//! ```

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

use crate::core::query::QueryError;

/// Body returned for every backend failure
pub const GENERIC_BACKEND_MESSAGE: &str = "Internal server error";

/// The main error type for the gateway
#[derive(Debug)]
pub enum GatewayError {
    /// Malformed, unknown or incomplete caller input
    ClientInput(ClientInputError),

    /// Missing, invalid or expired credential
    Authentication {
        message: String,
    },

    /// Authenticated identity lacks the role the route requires
    Authorization {
        required_role: String,
    },

    /// A single-document lookup missed
    NotFound {
        collection: String,
        id: String,
    },

    /// The route exists but does not serve this method
    UnsupportedMethod {
        method: String,
        allow: &'static [&'static str],
    },

    /// Store or identity provider failure, detail withheld from the caller
    Backend {
        operation: String,
        source: anyhow::Error,
    },
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::ClientInput(e) => write!(f, "{}", e),
            GatewayError::Authentication { message } => write!(f, "Unauthorized: {}", message),
            GatewayError::Authorization { required_role } => {
                write!(f, "Forbidden: role '{}' required", required_role)
            }
            GatewayError::NotFound { collection, id } => {
                write!(f, "Document '{}' not found in '{}'", id, collection)
            }
            GatewayError::UnsupportedMethod { method, .. } => {
                write!(f, "Method {} Not Allowed", method)
            }
            GatewayError::Backend { operation, source } => {
                write!(f, "Backend failure during {}: {}", operation, source)
            }
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::ClientInput(e) => Some(e),
            GatewayError::Backend { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message, safe to show to the caller
    pub error: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl GatewayError {
    /// Unauthenticated caller
    pub fn unauthorized() -> Self {
        GatewayError::Authentication {
            message: "missing or invalid credential".to_string(),
        }
    }

    pub fn forbidden(required_role: impl Into<String>) -> Self {
        GatewayError::Authorization {
            required_role: required_role.into(),
        }
    }

    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        GatewayError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn unsupported_method(method: impl Into<String>, allow: &'static [&'static str]) -> Self {
        GatewayError::UnsupportedMethod {
            method: method.into(),
            allow,
        }
    }

    /// Wrap a store or provider failure
    pub fn backend(operation: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        GatewayError::Backend {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::ClientInput(e) => e.status_code(),
            GatewayError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::Authorization { .. } => StatusCode::FORBIDDEN,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::UnsupportedMethod { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::ClientInput(e) => e.error_code(),
            GatewayError::Authentication { .. } => "UNAUTHORIZED",
            GatewayError::Authorization { .. } => "FORBIDDEN",
            GatewayError::NotFound { .. } => "DOCUMENT_NOT_FOUND",
            GatewayError::UnsupportedMethod { .. } => "METHOD_NOT_ALLOWED",
            GatewayError::Backend { .. } => "INTERNAL_ERROR",
        }
    }

    /// Message shown to the caller
    ///
    /// Backend detail is never included.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::Backend { .. } => GENERIC_BACKEND_MESSAGE.to_string(),
            GatewayError::Authentication { .. } => "Unauthorized".to_string(),
            GatewayError::Authorization { .. } => "Forbidden".to_string(),
            GatewayError::NotFound { .. } => "Document not found".to_string(),
            other => other.to_string(),
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.public_message(),
            code: self.error_code().to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        let mut response = (status, body).into_response();

        if let GatewayError::UnsupportedMethod { allow, .. } = &self
            && let Ok(value) = HeaderValue::from_str(&allow.join(", "))
        {
            response.headers_mut().insert(header::ALLOW, value);
        }

        response
    }
}

// =============================================================================
// Client Input Errors
// =============================================================================

/// Errors caused by the caller's input
#[derive(Debug)]
pub enum ClientInputError {
    /// Collection is not part of the configured allow-set
    UnknownCollection {
        collection: String,
    },

    /// Query parameters could not be translated
    InvalidQuery(QueryError),

    /// Request body is not a JSON object
    InvalidBody {
        message: String,
    },
}

impl fmt::Display for ClientInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientInputError::UnknownCollection { collection } => {
                write!(f, "Invalid collection: {}", collection)
            }
            ClientInputError::InvalidQuery(e) => write!(f, "Invalid query: {}", e),
            ClientInputError::InvalidBody { message } => {
                write!(f, "Invalid request body: {}", message)
            }
        }
    }
}

impl std::error::Error for ClientInputError {}

impl ClientInputError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClientInputError::UnknownCollection { .. } => StatusCode::NOT_FOUND,
            ClientInputError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ClientInputError::InvalidBody { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ClientInputError::UnknownCollection { .. } => "UNKNOWN_COLLECTION",
            ClientInputError::InvalidQuery(_) => "INVALID_QUERY",
            ClientInputError::InvalidBody { .. } => "INVALID_BODY",
        }
    }
}

impl From<ClientInputError> for GatewayError {
    fn from(err: ClientInputError) -> Self {
        GatewayError::ClientInput(err)
    }
}

impl From<QueryError> for GatewayError {
    fn from(err: QueryError) -> Self {
        GatewayError::ClientInput(ClientInputError::InvalidQuery(err))
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for handler code
pub type GatewayResult<T> = Result<T, GatewayError>;
