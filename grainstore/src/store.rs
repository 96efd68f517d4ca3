use grainstore_core::{FailureKind, PersistedDocument, Revision};

mod in_memory;
pub use in_memory::InMemoryDocumentStore;

#[cfg(feature = "arango")]
mod arango;
#[cfg(feature = "arango")]
pub use arango::ArangoDocumentStore;

pub mod testing;

/// The document store a [`StorageAdapter`](crate::StorageAdapter) persists
/// actor state into.
///
/// Implementations own their connection. Clones share it, which is how the
/// adapter hands the store to concurrent operations.
pub trait DocumentStore: Send + Sync + Clone + 'static {
    /// The names of all non-system collections
    fn list_collections(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Create a collection, failing with [`StoreError::DuplicateName`] if it
    /// already exists
    fn create_collection(
        &self,
        name: &str,
        wait_for_sync: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch a document, `None` if there is no document with this key
    fn document(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<PersistedDocument>, StoreError>> + Send;

    /// Insert a new document keyed by `document.id`, returning its revision.
    ///
    /// Fails with [`StoreError::UniqueConstraint`] if the key is taken.
    fn insert(
        &self,
        collection: &str,
        document: &PersistedDocument,
    ) -> impl Future<Output = Result<Revision, StoreError>> + Send;

    /// Replace the state of an existing document, returning its new revision.
    ///
    /// Fails with [`StoreError::Conflict`] unless the stored document still
    /// has the revision `expected`.
    fn update(
        &self,
        collection: &str,
        key: &str,
        document: &PersistedDocument,
        expected: &Revision,
    ) -> impl Future<Output = Result<Revision, StoreError>> + Send;

    /// Remove a document, failing with [`StoreError::DocumentNotFound`] if
    /// there is no such document
    fn remove(&self, collection: &str, key: &str)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Release the connection. Operations after closing fail.
    fn close(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("collection {0} already exists")]
    DuplicateName(String),
    #[error("collection {0} not found")]
    CollectionNotFound(String),
    #[error("document {key} already exists in {collection}")]
    UniqueConstraint { collection: String, key: String },
    #[error("document {key} in {collection} does not have revision {expected}")]
    Conflict {
        collection: String,
        key: String,
        expected: Revision,
    },
    #[error("document {key} not found in {collection}")]
    DocumentNotFound { collection: String, key: String },
    #[error("error talking to the store: {0}")]
    Transport(String),
    #[error("store error {code} ({error_num}): {message}")]
    Server {
        code: u16,
        error_num: u32,
        message: String,
    },
    #[error("malformed response from the store: {0}")]
    Malformed(String),
}

impl StoreError {
    /// How this error is reported to the runtime
    pub fn kind(&self) -> FailureKind {
        match self {
            StoreError::DuplicateName(_) | StoreError::CollectionNotFound(_) => {
                FailureKind::CollectionUnavailable
            }
            StoreError::UniqueConstraint { .. } => FailureKind::DuplicateKey,
            StoreError::Conflict { .. } => FailureKind::ConcurrencyConflict,
            StoreError::DocumentNotFound { .. } => FailureKind::NotFound,
            StoreError::Transport(_) | StoreError::Server { .. } | StoreError::Malformed(_) => {
                FailureKind::TransportFailure
            }
        }
    }
}
