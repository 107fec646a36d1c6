//! Shared test harness for document store backends
//!
//! Provides fixture helpers and the `document_store_tests!` macro, which
//! generates the conformance suite every `DocumentStore` must pass.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod store_harness;
//! use store_harness::*;
//!
//! document_store_tests!(InMemoryDocumentStore::new());
//! ```

#![allow(dead_code)]

#[macro_use]
mod document_store_tests;

use serde_json::{Map, Value, json};

use docgate::core::store::{Document, DocumentStore};

/// Collection used by the conformance suite
pub const LISTINGS: &str = "listings";

pub fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

/// A listing with a price, a nested city and a list of tags
pub fn listing(address: &str, price: i64, city: &str, tags: &[&str]) -> Map<String, Value> {
    fields(json!({
        "address": address,
        "price": price,
        "location": { "city": city },
        "tags": tags,
    }))
}

/// Create the standard five listings and return them in creation order
pub async fn seed_listings(store: &impl DocumentStore) -> Vec<Document> {
    let rows = [
        ("1 Main St", 450_000, "Lyon", &["garden"][..]),
        ("2 Oak Ave", 120_000, "Paris", &["studio", "metro"][..]),
        ("3 Pine Rd", 900_000, "Lyon", &["garden", "pool"][..]),
        ("4 Elm Ct", 300_000, "Nantes", &[][..]),
        ("5 Bay Rd", 650_000, "Paris", &["metro"][..]),
    ];

    let mut created = Vec::new();
    for (address, price, city, tags) in rows {
        let doc = store
            .create(LISTINGS, listing(address, price, city, tags))
            .await
            .unwrap();
        created.push(doc);
    }
    created
}

/// `address` of each document, in result order
pub fn addresses(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .map(|d| d.fields["address"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Sorted `address` values, for order-insensitive comparisons
pub fn sorted_addresses(docs: &[Document]) -> Vec<String> {
    let mut out = addresses(docs);
    out.sort();
    out
}
