//! In-memory implementation of DocumentStore for testing and development

use crate::core::query::{Direction, Filter, FilterOp, QuerySpec};
use crate::core::store::{CREATED_AT, Document, DocumentStore, UPDATED_AT, timestamp_now};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// In-memory document store
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Documents are kept ordered by id, which is also the default scan order.
/// Pagination cursors are the id of the last document of the previous page.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryDocumentStore {
    /// Create a new in-memory document store
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a document under its own id, replacing any previous one
    ///
    /// Used to seed fixtures (user profiles, test data) with known ids.
    pub fn insert(&self, collection: &str, document: Document) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        collections
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document);

        Ok(())
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> Result<usize> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(collections.get(collection).map_or(0, BTreeMap::len))
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn find_many(&self, collection: &str, query: &QuerySpec) -> Result<Vec<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Document> = docs
            .values()
            .filter(|doc| query.filters().iter().all(|f| matches_filter(doc, f)))
            .collect();

        if let Some(order) = &query.order_by {
            // Documents without the sort field drop out of ordered results
            matched.retain(|doc| doc.query_value(&order.field).is_some());
            matched.sort_by(|a, b| {
                let ordering = match (a.query_value(&order.field), b.query_value(&order.field)) {
                    (Some(x), Some(y)) => total_cmp(&x, &y),
                    _ => Ordering::Equal,
                };
                let ordering = match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
                ordering.then_with(|| a.id.cmp(&b.id))
            });
        }

        let start = match &query.cursor {
            Some(cursor) => match matched.iter().position(|doc| doc.id == cursor.as_str()) {
                Some(index) => index + 1,
                None => matched.len(),
            },
            None => 0,
        };

        let limit = query
            .limit
            .map_or(usize::MAX, |n| usize::try_from(n.get()).unwrap_or(usize::MAX));

        Ok(matched
            .into_iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create(&self, collection: &str, mut data: Map<String, Value>) -> Result<Document> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let now = Value::String(timestamp_now());
        data.insert(CREATED_AT.to_string(), now.clone());
        data.insert(UPDATED_AT.to_string(), now);

        let document = Document::new(Uuid::new_v4().to_string(), data);

        collections
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document.clone());

        Ok(document)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Document>> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let Some(document) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Ok(None);
        };

        for (key, value) in data {
            if key == "id" || key == CREATED_AT {
                continue;
            }
            document.fields.insert(key, value);
        }
        document
            .fields
            .insert(UPDATED_AT.to_string(), Value::String(timestamp_now()));

        Ok(Some(document.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }

        Ok(())
    }
}

// =============================================================================
// Filter evaluation
// =============================================================================

/// Evaluate one filter; a document missing the field never matches
fn matches_filter(doc: &Document, filter: &Filter) -> bool {
    let Some(actual) = doc.query_value(&filter.field) else {
        return false;
    };
    let actual = actual.as_ref();
    let expected = &filter.value;

    match filter.op {
        FilterOp::Eq => values_equal(actual, expected),
        FilterOp::Ne => !values_equal(actual, expected),
        FilterOp::Lt => comparable_cmp(actual, expected) == Some(Ordering::Less),
        FilterOp::Lte => matches!(
            comparable_cmp(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::Gt => comparable_cmp(actual, expected) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(
            comparable_cmp(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::In => expected
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| values_equal(actual, c))),
        FilterOp::NotIn => expected
            .as_array()
            .is_some_and(|candidates| !candidates.iter().any(|c| values_equal(actual, c))),
        FilterOp::ArrayContains => actual
            .as_array()
            .is_some_and(|items| items.iter().any(|item| values_equal(item, expected))),
        FilterOp::ArrayContainsAny => match (actual.as_array(), expected.as_array()) {
            (Some(items), Some(candidates)) => items
                .iter()
                .any(|item| candidates.iter().any(|c| values_equal(item, c))),
            _ => false,
        },
    }
}

/// Equality that treats `1` and `1.0` as the same number
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering between two values of the same scalar kind, `None` otherwise
fn comparable_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order used for sorting mixed-type fields
fn total_cmp(a: &Value, b: &Value) -> Ordering {
    type_rank(a)
        .cmp(&type_rank(b))
        .then_with(|| comparable_cmp(a, b).unwrap_or(Ordering::Equal))
}
