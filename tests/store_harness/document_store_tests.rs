//! Macro-generated conformance suite for `DocumentStore` implementations
//!
//! # Generated Tests
//!
//! ## CRUD
//! - `test_create_assigns_id_and_timestamps`
//! - `test_create_ignores_client_id`
//! - `test_find_by_id_roundtrip` / `test_find_by_id_missing`
//! - `test_update_merges_shallowly` / `test_update_missing_returns_none`
//! - `test_delete_removes` / `test_delete_missing_is_ok`
//!
//! ## Queries
//! - equality, range, inequality, membership and array operators
//! - nested field paths
//! - ordering, limits and `startAfter` pagination
//! - filtering, ordering and paging on the document `id`
//!
//! ## Edge Cases
//! - `test_collections_are_isolated`
//! - `test_concurrent_creates`

/// Generate the `DocumentStore` conformance suite.
///
/// `$factory` must evaluate to a fresh, empty store implementing
/// `DocumentStore + Clone + 'static`. It is re-evaluated for each test.
macro_rules! document_store_tests {
    ($factory:expr) => {
        mod document_store_contract_tests {
            use super::*;
            use docgate::core::query::{Cursor, Direction, Filter, FilterOp, QuerySpec};
            use docgate::core::store::{CREATED_AT, DocumentStore, UPDATED_AT};
            use serde_json::json;
            use std::num::NonZeroU32;

            // ==================================================================
            // CRUD
            // ==================================================================

            #[tokio::test]
            async fn test_create_assigns_id_and_timestamps() {
                let store = $factory;
                let created = store
                    .create(LISTINGS, listing("1 Main St", 450_000, "Lyon", &[]))
                    .await
                    .unwrap();

                assert!(!created.id.is_empty());
                assert_eq!(created.fields["address"], "1 Main St");
                assert!(created.fields[CREATED_AT].is_string());
                assert!(created.fields[UPDATED_AT].is_string());
                assert!(!created.fields.contains_key("id"));
            }

            #[tokio::test]
            async fn test_create_ignores_client_id() {
                let store = $factory;
                let created = store
                    .create(LISTINGS, fields(json!({"id": "chosen", "address": "x"})))
                    .await
                    .unwrap();

                assert_ne!(created.id, "chosen");
                assert!(store.find_by_id(LISTINGS, "chosen").await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_find_by_id_roundtrip() {
                let store = $factory;
                let created = store
                    .create(LISTINGS, listing("2 Oak Ave", 120_000, "Paris", &["metro"]))
                    .await
                    .unwrap();

                let found = store.find_by_id(LISTINGS, &created.id).await.unwrap();
                assert_eq!(found, Some(created));
            }

            #[tokio::test]
            async fn test_find_by_id_missing() {
                let store = $factory;
                let found = store.find_by_id(LISTINGS, "does-not-exist").await.unwrap();
                assert!(found.is_none());
            }

            #[tokio::test]
            async fn test_update_merges_shallowly() {
                let store = $factory;
                let created = store
                    .create(LISTINGS, listing("3 Pine Rd", 900_000, "Lyon", &["pool"]))
                    .await
                    .unwrap();

                let updated = store
                    .update(
                        LISTINGS,
                        &created.id,
                        fields(json!({"price": 850_000, "location": {"zip": "69001"}})),
                    )
                    .await
                    .unwrap()
                    .expect("document should exist");

                assert_eq!(updated.id, created.id);
                assert_eq!(updated.fields["address"], "3 Pine Rd");
                assert_eq!(updated.fields["price"], 850_000);
                // top-level fields are replaced, not deep-merged
                assert_eq!(updated.fields["location"], json!({"zip": "69001"}));
                assert_eq!(updated.fields[CREATED_AT], created.fields[CREATED_AT]);

                let stored = store.find_by_id(LISTINGS, &created.id).await.unwrap();
                assert_eq!(stored, Some(updated));
            }

            #[tokio::test]
            async fn test_update_missing_returns_none() {
                let store = $factory;
                let updated = store
                    .update(LISTINGS, "does-not-exist", fields(json!({"price": 1})))
                    .await
                    .unwrap();

                assert!(updated.is_none());
                assert!(
                    store
                        .find_many(LISTINGS, &QuerySpec::new())
                        .await
                        .unwrap()
                        .is_empty()
                );
            }

            #[tokio::test]
            async fn test_delete_removes() {
                let store = $factory;
                let created = store
                    .create(LISTINGS, listing("4 Elm Ct", 300_000, "Nantes", &[]))
                    .await
                    .unwrap();

                store.delete(LISTINGS, &created.id).await.unwrap();
                assert!(store.find_by_id(LISTINGS, &created.id).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_delete_missing_is_ok() {
                let store = $factory;
                assert!(store.delete(LISTINGS, "does-not-exist").await.is_ok());
            }

            // ==================================================================
            // Queries
            // ==================================================================

            #[tokio::test]
            async fn test_find_many_empty_collection() {
                let store = $factory;
                let docs = store.find_many(LISTINGS, &QuerySpec::new()).await.unwrap();
                assert!(docs.is_empty());
            }

            #[tokio::test]
            async fn test_find_many_without_query_returns_all() {
                let store = $factory;
                seed_listings(&store).await;

                let docs = store.find_many(LISTINGS, &QuerySpec::new()).await.unwrap();
                assert_eq!(docs.len(), 5);
            }

            #[tokio::test]
            async fn test_filter_equality() {
                let store = $factory;
                seed_listings(&store).await;

                let query = QuerySpec::new()
                    .with_filter(Filter::new("location.city", FilterOp::Eq, json!("Lyon")));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();

                assert_eq!(sorted_addresses(&docs), vec!["1 Main St", "3 Pine Rd"]);
            }

            #[tokio::test]
            async fn test_filter_range() {
                let store = $factory;
                seed_listings(&store).await;

                let query = QuerySpec::new()
                    .with_filter(Filter::new("price", FilterOp::Lt, json!(500_000)));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert_eq!(
                    sorted_addresses(&docs),
                    vec!["1 Main St", "2 Oak Ave", "4 Elm Ct"]
                );

                let query = QuerySpec::new()
                    .with_filter(Filter::new("price", FilterOp::Gte, json!(300_000)))
                    .with_filter(Filter::new("price", FilterOp::Lte, json!(650_000)));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert_eq!(
                    sorted_addresses(&docs),
                    vec!["1 Main St", "4 Elm Ct", "5 Bay Rd"]
                );
            }

            #[tokio::test]
            async fn test_filter_not_equal() {
                let store = $factory;
                seed_listings(&store).await;

                let query = QuerySpec::new()
                    .with_filter(Filter::new("location.city", FilterOp::Ne, json!("Paris")));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();

                assert_eq!(
                    sorted_addresses(&docs),
                    vec!["1 Main St", "3 Pine Rd", "4 Elm Ct"]
                );
            }

            #[tokio::test]
            async fn test_filter_membership() {
                let store = $factory;
                seed_listings(&store).await;

                let query = QuerySpec::new().with_filter(Filter::new(
                    "location.city",
                    FilterOp::In,
                    json!(["Nantes", "Paris"]),
                ));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert_eq!(
                    sorted_addresses(&docs),
                    vec!["2 Oak Ave", "4 Elm Ct", "5 Bay Rd"]
                );

                let query = QuerySpec::new().with_filter(Filter::new(
                    "location.city",
                    FilterOp::NotIn,
                    json!(["Nantes", "Paris"]),
                ));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert_eq!(sorted_addresses(&docs), vec!["1 Main St", "3 Pine Rd"]);
            }

            #[tokio::test]
            async fn test_filter_array_operators() {
                let store = $factory;
                seed_listings(&store).await;

                let query = QuerySpec::new().with_filter(Filter::new(
                    "tags",
                    FilterOp::ArrayContains,
                    json!("garden"),
                ));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert_eq!(sorted_addresses(&docs), vec!["1 Main St", "3 Pine Rd"]);

                let query = QuerySpec::new().with_filter(Filter::new(
                    "tags",
                    FilterOp::ArrayContainsAny,
                    json!(["pool", "metro"]),
                ));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert_eq!(
                    sorted_addresses(&docs),
                    vec!["2 Oak Ave", "3 Pine Rd", "5 Bay Rd"]
                );
            }

            #[tokio::test]
            async fn test_filter_on_missing_field_matches_nothing() {
                let store = $factory;
                seed_listings(&store).await;

                let query = QuerySpec::new()
                    .with_filter(Filter::new("bedrooms", FilterOp::Gt, json!(0)));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert!(docs.is_empty());
            }

            #[tokio::test]
            async fn test_order_by_and_limit() {
                let store = $factory;
                seed_listings(&store).await;

                let query = QuerySpec::new().with_order_by("price", Direction::Asc);
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert_eq!(
                    addresses(&docs),
                    vec!["2 Oak Ave", "4 Elm Ct", "1 Main St", "5 Bay Rd", "3 Pine Rd"]
                );

                let query = QuerySpec::new()
                    .with_order_by("price", Direction::Desc)
                    .with_limit(NonZeroU32::new(2).unwrap());
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert_eq!(addresses(&docs), vec!["3 Pine Rd", "5 Bay Rd"]);
            }

            #[tokio::test]
            async fn test_filter_order_and_limit_combined() {
                let store = $factory;
                seed_listings(&store).await;

                let query = QuerySpec::new()
                    .with_filter(Filter::new("price", FilterOp::Lt, json!(500_000)))
                    .with_order_by("price", Direction::Desc)
                    .with_limit(NonZeroU32::new(2).unwrap());
                let docs = store.find_many(LISTINGS, &query).await.unwrap();

                assert_eq!(addresses(&docs), vec!["1 Main St", "4 Elm Ct"]);
            }

            #[tokio::test]
            async fn test_pagination_without_order_visits_every_document_once() {
                let store = $factory;
                seed_listings(&store).await;

                let limit = NonZeroU32::new(2).unwrap();
                let mut seen = Vec::new();
                let mut cursor: Option<String> = None;
                loop {
                    let mut query = QuerySpec::new().with_limit(limit);
                    if let Some(cursor) = &cursor {
                        query = query.with_cursor(Cursor::new(cursor.clone()));
                    }
                    let page = store.find_many(LISTINGS, &query).await.unwrap();
                    if page.is_empty() {
                        break;
                    }
                    assert!(page.len() <= 2);
                    cursor = page.last().map(|d| d.id.clone());
                    seen.extend(addresses(&page));
                }

                seen.sort();
                assert_eq!(
                    seen,
                    vec!["1 Main St", "2 Oak Ave", "3 Pine Rd", "4 Elm Ct", "5 Bay Rd"]
                );
            }

            #[tokio::test]
            async fn test_pagination_follows_order() {
                let store = $factory;
                seed_listings(&store).await;

                let first = QuerySpec::new()
                    .with_order_by("price", Direction::Asc)
                    .with_limit(NonZeroU32::new(2).unwrap());
                let page = store.find_many(LISTINGS, &first).await.unwrap();
                assert_eq!(addresses(&page), vec!["2 Oak Ave", "4 Elm Ct"]);

                let next = first.clone().with_cursor(Cursor::new(page[1].id.clone()));
                let page = store.find_many(LISTINGS, &next).await.unwrap();
                assert_eq!(addresses(&page), vec!["1 Main St", "5 Bay Rd"]);
            }

            #[tokio::test]
            async fn test_filter_on_id() {
                let store = $factory;
                let created = seed_listings(&store).await;
                let target = &created[2];

                let query = QuerySpec::new()
                    .with_filter(Filter::new("id", FilterOp::Eq, json!(target.id)));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert_eq!(docs, vec![target.clone()]);

                let query = QuerySpec::new().with_filter(Filter::new(
                    "id",
                    FilterOp::In,
                    json!([created[0].id, created[4].id, "does-not-exist"]),
                ));
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                assert_eq!(sorted_addresses(&docs), vec!["1 Main St", "5 Bay Rd"]);
            }

            #[tokio::test]
            async fn test_order_and_page_by_id() {
                let store = $factory;
                let created = seed_listings(&store).await;
                let mut expected: Vec<String> = created.iter().map(|d| d.id.clone()).collect();
                expected.sort();
                expected.reverse();

                let query = QuerySpec::new().with_order_by("id", Direction::Desc);
                let docs = store.find_many(LISTINGS, &query).await.unwrap();
                let ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
                assert_eq!(ids, expected);

                let next = query
                    .with_limit(NonZeroU32::new(2).unwrap())
                    .with_cursor(Cursor::new(expected[1].clone()));
                let docs = store.find_many(LISTINGS, &next).await.unwrap();
                let ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
                assert_eq!(ids, expected[2..4].to_vec());
            }

            // ==================================================================
            // Edge cases
            // ==================================================================

            #[tokio::test]
            async fn test_collections_are_isolated() {
                let store = $factory;
                let created = store
                    .create(LISTINGS, listing("1 Main St", 1, "Lyon", &[]))
                    .await
                    .unwrap();

                assert!(store.find_by_id("offers", &created.id).await.unwrap().is_none());
                assert!(
                    store
                        .find_many("offers", &QuerySpec::new())
                        .await
                        .unwrap()
                        .is_empty()
                );
            }

            #[tokio::test]
            async fn test_concurrent_creates() {
                let store = $factory;

                let mut handles = Vec::new();
                for i in 0..10 {
                    let store = store.clone();
                    handles.push(tokio::spawn(async move {
                        store
                            .create(LISTINGS, fields(json!({"address": format!("{} Loop", i)})))
                            .await
                            .unwrap()
                    }));
                }

                let mut ids = Vec::new();
                for handle in handles {
                    ids.push(handle.await.unwrap().id);
                }
                ids.sort();
                ids.dedup();
                assert_eq!(ids.len(), 10);

                let docs = store.find_many(LISTINGS, &QuerySpec::new()).await.unwrap();
                assert_eq!(docs.len(), 10);
            }
        }
    };
}
