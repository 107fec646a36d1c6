//! Operation-request validation gate
//!
//! Fronts the automation pipeline (CI-triggered administrative operations).
//! A request names an operation and a collection as text and carries an
//! optional serialized `query` and `data`; [`validate`] either returns the
//! parsed request or the first rule it breaks. Rules are checked in a fixed
//! order and the first failure short-circuits the rest:
//!
//! 1. the operation is one of `read`, `create`, `update`, `delete`
//! 2. the collection is in the configured allow-set
//! 3. `read` / `update` / `delete` carry a query
//! 4. `create` / `update` carry data
//! 5. any query or data present parses as JSON
//!
//! Empty and whitespace-only inputs count as absent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::operation::Operation;

/// Line printed when a request passes every rule
pub const SUCCESS_MESSAGE: &str = "Request validation successful";

/// An operation request as received from the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub operation: Option<String>,
    pub collection: Option<String>,
    pub query: Option<String>,
    pub data: Option<String>,
}

impl OperationRequest {
    pub fn new(operation: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            collection: Some(collection.into()),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// A request that passed the gate
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub operation: Operation,
    pub collection: String,
    pub query: Option<Value>,
    pub data: Option<Value>,
}

/// The rule a rejected request broke
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationRejection {
    #[error("Invalid operation: {operation}")]
    UnknownOperation { operation: String },

    #[error("Invalid collection: {collection}")]
    UnknownCollection { collection: String },

    #[error("Query required for read/update/delete operations")]
    MissingQuery { operation: Operation },

    #[error("Data required for create/update operations")]
    MissingData { operation: Operation },

    #[error("Invalid JSON in {field}: {message}")]
    MalformedPayload { field: &'static str, message: String },
}

impl ValidationRejection {
    /// Stable label for logs and tests
    pub fn label(&self) -> &'static str {
        match self {
            ValidationRejection::UnknownOperation { .. } => "unknown_operation",
            ValidationRejection::UnknownCollection { .. } => "unknown_collection",
            ValidationRejection::MissingQuery { .. } => "missing_query",
            ValidationRejection::MissingData { .. } => "missing_data",
            ValidationRejection::MalformedPayload { .. } => "malformed_payload",
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_payload(field: &'static str, text: &str) -> Result<Value, ValidationRejection> {
    serde_json::from_str(text).map_err(|e| ValidationRejection::MalformedPayload {
        field,
        message: e.to_string(),
    })
}

/// Check an operation request against the collection allow-set
pub fn validate(
    request: &OperationRequest,
    allowed_collections: &[String],
) -> Result<ValidatedRequest, ValidationRejection> {
    let operation_text = present(request.operation.as_deref()).unwrap_or_default();
    let operation: Operation =
        operation_text
            .parse()
            .map_err(|_| ValidationRejection::UnknownOperation {
                operation: operation_text.to_string(),
            })?;

    let collection = present(request.collection.as_deref()).unwrap_or_default();
    if !allowed_collections.iter().any(|c| c == collection) {
        return Err(ValidationRejection::UnknownCollection {
            collection: collection.to_string(),
        });
    }

    let query = present(request.query.as_deref());
    if operation.requires_query() && query.is_none() {
        return Err(ValidationRejection::MissingQuery { operation });
    }

    let data = present(request.data.as_deref());
    if operation.requires_data() && data.is_none() {
        return Err(ValidationRejection::MissingData { operation });
    }

    let query = query.map(|q| parse_payload("query", q)).transpose()?;
    let data = data.map(|d| parse_payload("data", d)).transpose()?;

    Ok(ValidatedRequest {
        operation,
        collection: collection.to_string(),
        query,
        data,
    })
}
