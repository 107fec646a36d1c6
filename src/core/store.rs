//! Store Adapter contract
//!
//! The gateway never interprets document fields beyond what queries need; it
//! hands documents to a [`DocumentStore`] and passes the returned state back to
//! the caller. Conflict resolution between concurrent writes to the same id
//! belongs to the store: nothing here locks, compares-and-swaps or retries.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::core::query::QuerySpec;

/// Query path naming the document id
pub const ID_FIELD: &str = "id";

/// Field stamped by the store when a document is created
pub const CREATED_AT: &str = "createdAt";

/// Field stamped by the store on every write
pub const UPDATED_AT: &str = "updatedAt";

/// A stored document: a store-assigned id plus arbitrary JSON fields
///
/// Serializes flat, `{"id": "...", "field": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Build a document; an `id` key inside `fields` is dropped in favour of `id`
    pub fn new(id: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove(ID_FIELD);
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Value a query sees at `path`
    ///
    /// The path `id` names the document's own id; everything else is looked
    /// up in the fields with [`Document::get_path`].
    pub fn query_value(&self, path: &str) -> Option<Cow<'_, Value>> {
        if path == ID_FIELD {
            return Some(Cow::Owned(Value::String(self.id.clone())));
        }
        self.get_path(path).map(Cow::Borrowed)
    }

    /// Look up a dot-separated path in the fields (`address.city`)
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.fields.get(first)?, |value, segment| {
            value.as_object()?.get(segment)
        })
    }
}

/// Current time in the format stores stamp into documents
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Document database behind the gateway
///
/// Implementations must be safe to call from many requests at once.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get a document by id, `Ok(None)` when absent
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Filtered, ordered, paginated scan
    ///
    /// An unmatched query yields an empty list, never an error.
    async fn find_many(&self, collection: &str, query: &QuerySpec) -> Result<Vec<Document>>;

    /// Insert a document, assigning its id
    async fn create(&self, collection: &str, data: Map<String, Value>) -> Result<Document>;

    /// Merge `data` into an existing document and return the merged state
    ///
    /// Returns `Ok(None)` when no document has this id.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Document>>;

    /// Delete a document; deleting an absent id succeeds
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}
