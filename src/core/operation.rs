//! Closed operation grammar shared by the validation gate and the HTTP surface
//!
//! The automation pipeline names operations as text (`read`, `create`, ...);
//! the HTTP surface names them with methods. Both are parsed into the closed
//! variants below so that every dispatch is an exhaustive `match`.

use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A storage operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Every operation, in declaration order
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Whether the operation must carry a `query`
    pub fn requires_query(&self) -> bool {
        matches!(
            self,
            Operation::Read | Operation::Update | Operation::Delete
        )
    }

    /// Whether the operation must carry a `data` payload
    pub fn requires_data(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when text does not name a known operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl fmt::Display for UnknownOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid operation: {}", self.0)
    }
}

impl std::error::Error for UnknownOperation {}

impl FromStr for Operation {
    type Err = UnknownOperation;

    /// Operation names are matched exactly (lowercase)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Operation::Read),
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

/// Methods accepted on a collection route (`/{collection}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMethod {
    Get,
    Post,
}

impl CollectionMethod {
    /// Value of the `Allow` header for collection routes
    pub const ALLOWED: &'static [&'static str] = &["GET", "POST"];

    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(CollectionMethod::Get),
            Method::POST => Some(CollectionMethod::Post),
            _ => None,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            CollectionMethod::Get => Operation::Read,
            CollectionMethod::Post => Operation::Create,
        }
    }
}

/// Methods accepted on a single-document route (`/{collection}/{id}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentMethod {
    Get,
    Put,
    Patch,
    Delete,
}

impl DocumentMethod {
    /// Value of the `Allow` header for document routes
    pub const ALLOWED: &'static [&'static str] = &["GET", "PUT", "PATCH", "DELETE"];

    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(DocumentMethod::Get),
            Method::PUT => Some(DocumentMethod::Put),
            Method::PATCH => Some(DocumentMethod::Patch),
            Method::DELETE => Some(DocumentMethod::Delete),
            _ => None,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            DocumentMethod::Get => Operation::Read,
            DocumentMethod::Put | DocumentMethod::Patch => Operation::Update,
            DocumentMethod::Delete => Operation::Delete,
        }
    }
}
