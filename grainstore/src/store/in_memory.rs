use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use grainstore_core::{PersistedDocument, Revision};

use crate::store::{DocumentStore, StoreError};

/// A [`DocumentStore`] which keeps documents in memory.
///
/// Documents are held as serialized JSON, the same way a real store keeps
/// them, so everything written goes through the document serialization
/// pipeline. Revisions come from a counter shared by the whole store and are
/// never reused, including after a document is removed and inserted again.
///
/// Besides being a store in its own right this is the store the tests use, so
/// it also counts collection creation attempts, can be switched offline and
/// can be told to refuse new collections.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore(Arc<Mutex<Inner>>);

#[derive(Default)]
struct Inner {
    collections: HashMap<String, HashMap<String, Vec<u8>>>,
    last_revision: u64,
    create_collection_calls: usize,
    offline: bool,
    reject_creates: bool,
    closed: bool,
}

impl Inner {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Transport("connection closed".to_string()));
        }
        if self.offline {
            return Err(StoreError::Transport("store is offline".to_string()));
        }
        Ok(())
    }

    fn collection_mut(
        &mut self,
        collection: &str,
    ) -> Result<&mut HashMap<String, Vec<u8>>, StoreError> {
        self.collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))
    }

    fn next_revision(&mut self) -> Revision {
        self.last_revision += 1;
        Revision::new(format!("_{:x}", self.last_revision))
    }

    fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        Ok(self.collections.keys().cloned().collect())
    }

    fn create_collection(&mut self, name: &str) -> Result<(), StoreError> {
        self.create_collection_calls += 1;
        self.check_available()?;
        if self.reject_creates {
            return Err(StoreError::Server {
                code: 403,
                error_num: 11,
                message: format!("not allowed to create collection {name}"),
            });
        }
        if self.collections.contains_key(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        self.collections.insert(name.to_string(), HashMap::new());
        Ok(())
    }

    fn document(
        &mut self,
        collection: &str,
        key: &str,
    ) -> Result<Option<PersistedDocument>, StoreError> {
        self.check_available()?;
        match self.collection_mut(collection)?.get(key) {
            Some(bytes) => decode(bytes).map(Some),
            None => Ok(None),
        }
    }

    fn insert(
        &mut self,
        collection: &str,
        document: &PersistedDocument,
    ) -> Result<Revision, StoreError> {
        self.check_available()?;
        if self.collection_mut(collection)?.contains_key(&document.id) {
            return Err(StoreError::UniqueConstraint {
                collection: collection.to_string(),
                key: document.id.clone(),
            });
        }
        self.store(collection, &document.id, &document.state)
    }

    fn update(
        &mut self,
        collection: &str,
        key: &str,
        document: &PersistedDocument,
        expected: &Revision,
    ) -> Result<Revision, StoreError> {
        self.check_available()?;
        let Some(bytes) = self.collection_mut(collection)?.get(key) else {
            return Err(StoreError::DocumentNotFound {
                collection: collection.to_string(),
                key: key.to_string(),
            });
        };
        if decode(bytes)?.revision.as_ref() != Some(expected) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                key: key.to_string(),
                expected: expected.clone(),
            });
        }
        self.store(collection, key, &document.state)
    }

    fn remove(&mut self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        match self.collection_mut(collection)?.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::DocumentNotFound {
                collection: collection.to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Write `state` under `key` with a fresh revision
    fn store(
        &mut self,
        collection: &str,
        key: &str,
        state: &serde_json::Value,
    ) -> Result<Revision, StoreError> {
        let revision = self.next_revision();
        let stored = PersistedDocument::new(key.to_string(), Some(revision.clone()), state.clone());
        let bytes = serde_json::to_vec(&stored).map_err(|e| StoreError::Malformed(e.to_string()))?;
        self.collection_mut(collection)?
            .insert(key.to_string(), bytes);
        Ok(revision)
    }
}

fn decode(bytes: &[u8]) -> Result<PersistedDocument, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Malformed(e.to_string()))
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store which already contains the given (empty) collections
    pub fn with_collections<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut inner = store.0.lock().unwrap();
            for name in names {
                inner.collections.insert(name.into(), HashMap::new());
            }
        }
        store
    }

    /// How many times `create_collection` has been called, successful or not
    pub fn create_collection_calls(&self) -> usize {
        self.0.lock().unwrap().create_collection_calls
    }

    /// While offline every operation fails with [`StoreError::Transport`]
    pub fn set_offline(&self, offline: bool) {
        self.0.lock().unwrap().offline = offline;
    }

    /// While set, `create_collection` fails with [`StoreError::Server`] and
    /// every other operation works as normal
    pub fn set_reject_creates(&self, reject: bool) {
        self.0.lock().unwrap().reject_creates = reject;
    }

    pub fn is_closed(&self) -> bool {
        self.0.lock().unwrap().closed
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// The stored JSON of a document, exactly as it was written
    pub fn raw_document(&self, collection: &str, key: &str) -> Option<serde_json::Value> {
        let inner = self.0.lock().unwrap();
        let bytes = inner.collections.get(collection)?.get(key)?;
        serde_json::from_slice(bytes).ok()
    }

    /// Store arbitrary JSON under `key`, bypassing all checks. The collection
    /// is created if needed.
    pub fn put_raw_document(&self, collection: &str, key: &str, document: serde_json::Value) {
        let bytes = document.to_string().into_bytes();
        self.0
            .lock()
            .unwrap()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), bytes);
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn list_collections(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send {
        futures::future::ready(self.0.lock().unwrap().list_collections())
    }

    fn create_collection(
        &self,
        name: &str,
        _wait_for_sync: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        futures::future::ready(self.0.lock().unwrap().create_collection(name))
    }

    fn document(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<PersistedDocument>, StoreError>> + Send {
        futures::future::ready(self.0.lock().unwrap().document(collection, key))
    }

    fn insert(
        &self,
        collection: &str,
        document: &PersistedDocument,
    ) -> impl Future<Output = Result<Revision, StoreError>> + Send {
        futures::future::ready(self.0.lock().unwrap().insert(collection, document))
    }

    fn update(
        &self,
        collection: &str,
        key: &str,
        document: &PersistedDocument,
        expected: &Revision,
    ) -> impl Future<Output = Result<Revision, StoreError>> + Send {
        futures::future::ready(
            self.0
                .lock()
                .unwrap()
                .update(collection, key, document, expected),
        )
    }

    fn remove(
        &self,
        collection: &str,
        key: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        futures::future::ready(self.0.lock().unwrap().remove(collection, key))
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        self.0.lock().unwrap().closed = true;
        futures::future::ready(())
    }
}
