//! A conformance suite for [`DocumentStore`] implementations.
//!
//! Implement [`StorageTestFixture`] for your store and call
//! [`run_document_store_tests`] from a test:
//!
//! ```rust,no_run
//! use grainstore::store::{InMemoryDocumentStore, testing::StorageTestFixture};
//!
//! struct Fixture(InMemoryDocumentStore);
//!
//! impl StorageTestFixture for Fixture {
//!     type Store = InMemoryDocumentStore;
//!
//!     async fn setup() -> Self {
//!         Fixture(InMemoryDocumentStore::new())
//!     }
//!
//!     fn store(&self) -> &Self::Store {
//!         &self.0
//!     }
//! }
//!
//! # async fn run() {
//! grainstore::store::testing::run_document_store_tests::<Fixture>().await;
//! # }
//! ```

use grainstore_core::{ActorReference, PersistedDocument, PrimaryKey, Revision, key_mapper};
use serde_json::json;

use crate::store::{DocumentStore, StoreError};

pub trait StorageTestFixture: Sized {
    type Store: DocumentStore;

    fn setup() -> impl Future<Output = Self>;

    fn store(&self) -> &Self::Store;

    /// The collection name to use for `base`. Stores which outlive a test
    /// run should make this unique.
    fn collection(&self, base: &str) -> String {
        base.to_string()
    }
}

pub async fn run_document_store_tests<F: StorageTestFixture>() {
    creating_a_collection_twice_fails::<F>().await;
    missing_documents_are_none::<F>().await;
    inserted_documents_can_be_fetched::<F>().await;
    inserting_a_taken_key_fails::<F>().await;
    updates_require_the_current_revision::<F>().await;
    updating_a_missing_document_fails::<F>().await;
    removed_documents_are_gone::<F>().await;
    escaped_keys_are_accepted::<F>().await;
}

async fn setup_with_collection<F: StorageTestFixture>(base: &str) -> (F, String) {
    let fixture = F::setup().await;
    let collection = fixture.collection(base);
    fixture
        .store()
        .create_collection(&collection, true)
        .await
        .expect("failed to create collection");
    (fixture, collection)
}

fn document(key: &str, state: serde_json::Value) -> PersistedDocument {
    PersistedDocument::new(key.to_string(), None, state)
}

async fn creating_a_collection_twice_fails<F: StorageTestFixture>() {
    let (fixture, collection) = setup_with_collection::<F>("Twice").await;
    let store = fixture.store();

    let listed = store.list_collections().await.unwrap();
    assert!(
        listed.contains(&collection),
        "{collection} missing from {listed:?}"
    );

    let second = store.create_collection(&collection, true).await;
    assert_eq!(second, Err(StoreError::DuplicateName(collection)));
}

async fn missing_documents_are_none<F: StorageTestFixture>() {
    let (fixture, collection) = setup_with_collection::<F>("Missing").await;
    let found = fixture.store().document(&collection, "nope").await.unwrap();
    assert_eq!(found, None);
}

async fn inserted_documents_can_be_fetched<F: StorageTestFixture>() {
    let (fixture, collection) = setup_with_collection::<F>("Inserted").await;
    let store = fixture.store();

    let state = json!({ "name": "ada", "level": 3, "nested": { "list": [1, 2] } });
    let revision = store
        .insert(&collection, &document("ada", state.clone()))
        .await
        .unwrap();
    assert!(!revision.is_blank());

    let fetched = store.document(&collection, "ada").await.unwrap().unwrap();
    assert_eq!(fetched.id, "ada");
    assert_eq!(fetched.revision, Some(revision));
    assert_eq!(fetched.state, state);
}

async fn inserting_a_taken_key_fails<F: StorageTestFixture>() {
    let (fixture, collection) = setup_with_collection::<F>("Taken").await;
    let store = fixture.store();

    store
        .insert(&collection, &document("k", json!({ "v": 1 })))
        .await
        .unwrap();
    let err = store
        .insert(&collection, &document("k", json!({ "v": 2 })))
        .await
        .unwrap_err();
    assert!(
        matches!(err, StoreError::UniqueConstraint { .. }),
        "unexpected error {err:?}"
    );

    let fetched = store.document(&collection, "k").await.unwrap().unwrap();
    assert_eq!(fetched.state, json!({ "v": 1 }));
}

async fn updates_require_the_current_revision<F: StorageTestFixture>() {
    let (fixture, collection) = setup_with_collection::<F>("Updated").await;
    let store = fixture.store();

    let first = store
        .insert(&collection, &document("k", json!({ "v": 1, "gone": true })))
        .await
        .unwrap();
    let second = store
        .update(&collection, "k", &document("k", json!({ "v": 2 })), &first)
        .await
        .unwrap();
    assert_ne!(first, second);

    let fetched = store.document(&collection, "k").await.unwrap().unwrap();
    assert_eq!(fetched.revision, Some(second.clone()));
    // The state is replaced, not merged
    assert_eq!(fetched.state, json!({ "v": 2 }));

    let err = store
        .update(&collection, "k", &document("k", json!({ "v": 3 })), &first)
        .await
        .unwrap_err();
    assert!(
        matches!(err, StoreError::Conflict { .. }),
        "unexpected error {err:?}"
    );

    let fetched = store.document(&collection, "k").await.unwrap().unwrap();
    assert_eq!(fetched.revision, Some(second));
}

async fn updating_a_missing_document_fails<F: StorageTestFixture>() {
    let (fixture, collection) = setup_with_collection::<F>("UpdateMissing").await;
    let err = fixture
        .store()
        .update(
            &collection,
            "nope",
            &document("nope", json!({})),
            &Revision::from("_x"),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, StoreError::DocumentNotFound { .. }),
        "unexpected error {err:?}"
    );
}

async fn removed_documents_are_gone<F: StorageTestFixture>() {
    let (fixture, collection) = setup_with_collection::<F>("Removed").await;
    let store = fixture.store();

    store
        .insert(&collection, &document("k", json!({ "v": 1 })))
        .await
        .unwrap();
    store.remove(&collection, "k").await.unwrap();
    assert_eq!(store.document(&collection, "k").await.unwrap(), None);

    let err = store.remove(&collection, "k").await.unwrap_err();
    assert!(
        matches!(err, StoreError::DocumentNotFound { .. }),
        "unexpected error {err:?}"
    );
}

async fn escaped_keys_are_accepted<F: StorageTestFixture>() {
    let (fixture, collection) = setup_with_collection::<F>("Escaped").await;
    let store = fixture.store();

    let reference = ActorReference::new(
        "Room",
        PrimaryKey::IntegerCompound(5, "lobby/1 %+ü".to_string()),
    )
    .unwrap();
    let key = key_mapper::document_key(&reference);

    store
        .insert(&collection, &document(&key, json!({ "open": true })))
        .await
        .unwrap();
    let fetched = store.document(&collection, &key).await.unwrap().unwrap();
    assert_eq!(fetched.id, key);
}
