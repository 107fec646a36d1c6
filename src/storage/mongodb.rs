//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides `MongoDocumentStore`, a `DocumentStore` backed by a
//! `mongodb::Database`.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag:
//! ```toml
//! [dependencies]
//! docgate = { version = "0.1", features = ["mongodb_backend"] }
//! ```
//!
//! # Storage model
//!
//! Each gateway collection maps to the MongoDB collection of the same name.
//! Document ids are UUID strings stored in `_id`.
//!
//! # Query translation
//!
//! Filters become `$and` clauses over native operators. `!=` and `not-in`
//! also require the field to exist, matching the in-memory store. Results
//! are sorted by the order field then `_id`. The pagination cursor is the id
//! of the last document of the previous page; the store looks that document
//! up and continues from its keyset position.

use crate::core::query::{Direction, Filter, FilterOp, QuerySpec};
use crate::core::store::{
    CREATED_AT, Document, DocumentStore, ID_FIELD, UPDATED_AT, timestamp_now,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::bson::{Bson, Document as BsonDocument, doc};
use mongodb::options::ReturnDocument;
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a JSON value into BSON.
fn json_to_bson(value: &Value) -> Result<Bson> {
    mongodb::bson::to_bson(value).map_err(|e| anyhow!("Failed to convert JSON to BSON: {}", e))
}

/// Convert document fields into a BSON document, dropping any `id` key.
fn fields_to_bson(fields: Map<String, Value>) -> Result<BsonDocument> {
    match json_to_bson(&Value::Object(fields))? {
        Bson::Document(mut doc) => {
            doc.remove("id");
            Ok(doc)
        }
        _ => Err(anyhow!("Expected BSON document, got non-object")),
    }
}

/// Convert a BSON document back into a gateway document,
/// renaming `_id` → `id`.
fn bson_to_document(mut doc: BsonDocument) -> Result<Document> {
    let id = match doc.remove("_id") {
        Some(Bson::String(s)) => s,
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => other.to_string(),
        None => return Err(anyhow!("Stored document has no _id")),
    };

    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(fields) => Ok(Document::new(id, fields)),
        _ => Err(anyhow!("Stored document is not an object")),
    }
}

/// MongoDB field for a query path; the document id lives in `_id`.
fn bson_path(path: &str) -> &str {
    if path == ID_FIELD { "_id" } else { path }
}

/// Translate one filter into a MongoDB condition.
fn filter_to_bson(filter: &Filter) -> Result<BsonDocument> {
    let field = bson_path(&filter.field);
    let value = json_to_bson(&filter.value)?;

    let condition = match filter.op {
        FilterOp::Eq => doc! { field: { "$eq": value } },
        FilterOp::Ne => doc! { field: { "$exists": true, "$ne": value } },
        FilterOp::Lt => doc! { field: { "$lt": value } },
        FilterOp::Lte => doc! { field: { "$lte": value } },
        FilterOp::Gt => doc! { field: { "$gt": value } },
        FilterOp::Gte => doc! { field: { "$gte": value } },
        FilterOp::In => doc! { field: { "$in": value } },
        FilterOp::NotIn => doc! { field: { "$exists": true, "$nin": value } },
        FilterOp::ArrayContains => doc! { field: { "$elemMatch": { "$eq": value } } },
        FilterOp::ArrayContainsAny => doc! { field: { "$elemMatch": { "$in": value } } },
    };

    Ok(condition)
}

// ---------------------------------------------------------------------------
// MongoDocumentStore
// ---------------------------------------------------------------------------

/// Document store backed by MongoDB.
///
/// # Example
///
/// ```rust,ignore
/// use mongodb::Client;
/// use docgate::storage::MongoDocumentStore;
///
/// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
/// let store = MongoDocumentStore::new(client.database("docgate"));
/// ```
#[derive(Clone, Debug)]
pub struct MongoDocumentStore {
    database: Database,
}

impl MongoDocumentStore {
    /// Create a new `MongoDocumentStore` with the given database handle.
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Connect to `uri` and use `database`.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = mongodb::Client::with_uri_str(uri)
            .await
            .map_err(|e| anyhow!("Failed to connect to MongoDB: {}", e))?;
        Ok(Self::new(client.database(database)))
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &str) -> mongodb::Collection<BsonDocument> {
        self.database.collection(name)
    }

    /// Keyset condition continuing after the document with id `cursor`.
    ///
    /// `None` when that document no longer exists.
    async fn cursor_condition(
        &self,
        collection: &str,
        query: &QuerySpec,
        cursor: &str,
    ) -> Result<Option<BsonDocument>> {
        let Some(order) = &query.order_by else {
            return Ok(Some(doc! { "_id": { "$gt": cursor } }));
        };

        let past = match order.direction {
            Direction::Asc => "$gt",
            Direction::Desc => "$lt",
        };
        let field = bson_path(&order.field);

        let Some(anchor) = self.find_by_id(collection, cursor).await? else {
            return Ok(None);
        };
        if field == "_id" {
            return Ok(Some(doc! { "_id": { past: cursor } }));
        }
        let Some(anchor_value) = anchor.get_path(field) else {
            return Ok(None);
        };
        let anchor_value = json_to_bson(anchor_value)?;

        Ok(Some(doc! {
            "$or": [
                { field: { past: anchor_value.clone() } },
                { field: anchor_value, "_id": { "$gt": cursor } },
            ]
        }))
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let doc = self
            .collection(collection)
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| anyhow!("Failed to get document: {}", e))?;

        doc.map(bson_to_document).transpose()
    }

    async fn find_many(&self, collection: &str, query: &QuerySpec) -> Result<Vec<Document>> {
        let mut clauses: Vec<BsonDocument> = query
            .filters()
            .iter()
            .map(filter_to_bson)
            .collect::<Result<_>>()?;

        let mut sort = BsonDocument::new();
        if let Some(order) = &query.order_by {
            let field = bson_path(&order.field);
            clauses.push(doc! { field: { "$exists": true } });
            let direction = match order.direction {
                Direction::Asc => 1,
                Direction::Desc => -1,
            };
            sort.insert(field, direction);
        }
        if !sort.contains_key("_id") {
            sort.insert("_id", 1);
        }

        if let Some(cursor) = &query.cursor {
            match self.cursor_condition(collection, query, cursor.as_str()).await? {
                Some(condition) => clauses.push(condition),
                None => return Ok(Vec::new()),
            }
        }

        let filter = if clauses.is_empty() {
            doc! {}
        } else {
            doc! { "$and": clauses }
        };

        let mut find = self.collection(collection).find(filter).sort(sort);
        if let Some(limit) = query.limit {
            find = find.limit(i64::from(limit.get()));
        }

        let docs: Vec<BsonDocument> = find
            .await
            .map_err(|e| anyhow!("Failed to query documents: {}", e))?
            .try_collect()
            .await
            .map_err(|e| anyhow!("Failed to collect documents: {}", e))?;

        docs.into_iter().map(bson_to_document).collect()
    }

    async fn create(&self, collection: &str, data: Map<String, Value>) -> Result<Document> {
        let id = Uuid::new_v4().to_string();
        let now = timestamp_now();

        let mut doc = fields_to_bson(data)?;
        doc.insert("_id", id.as_str());
        doc.insert(CREATED_AT, now.as_str());
        doc.insert(UPDATED_AT, now.as_str());

        self.collection(collection)
            .insert_one(doc.clone())
            .await
            .map_err(|e| anyhow!("Failed to create document: {}", e))?;

        bson_to_document(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Document>> {
        let mut changes = fields_to_bson(data)?;
        changes.remove(CREATED_AT);
        changes.insert(UPDATED_AT, timestamp_now());

        let updated = self
            .collection(collection)
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": changes })
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| anyhow!("Failed to update document: {}", e))?;

        updated.map(bson_to_document).transpose()
    }

    /// Silently succeeds if the document does not exist (idempotent).
    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.collection(collection)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(|e| anyhow!("Failed to delete document: {}", e))?;

        Ok(())
    }
}
