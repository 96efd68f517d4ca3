use std::{fmt, sync::Arc};

use grainstore_core::{
    ActorReference, FailureKind, Operation, PersistedDocument, StateSlot, StorageFailure,
    key_mapper,
};

use crate::{
    builder::AdapterBuilder,
    collection_registry::CollectionRegistry,
    store::{DocumentStore, InMemoryDocumentStore, StoreError},
};

/// Persists actor state as documents in a [`DocumentStore`].
///
/// Each actor type maps to a collection named after the last segment of the
/// type name, and each actor to a document whose key is derived from its
/// [`ActorReference`]. Writes are conditioned on the revision the caller
/// last saw, which is carried in the slot's etag.
///
/// The adapter is cheap to clone; clones share the store connection and
/// the collection cache.
#[derive(Clone)]
pub struct StorageAdapter<S> {
    name: Arc<str>,
    store: S,
    registry: Arc<CollectionRegistry>,
}

impl<S> fmt::Debug for StorageAdapter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl StorageAdapter<InMemoryDocumentStore> {
    /// Start building an adapter called `name`.
    ///
    /// The builder uses an [`InMemoryDocumentStore`] until another store is
    /// provided with [`AdapterBuilder::with_store`].
    pub fn builder<N: Into<String>>(name: N) -> AdapterBuilder<InMemoryDocumentStore> {
        AdapterBuilder::new(name)
    }
}

#[cfg(feature = "arango")]
impl StorageAdapter<crate::store::ArangoDocumentStore> {
    /// Connect to the ArangoDB server described by `config`
    pub async fn connect<N: Into<String>>(
        name: N,
        config: &crate::StorageConfig,
    ) -> Result<Self, StorageFailure> {
        AdapterBuilder::new(name).with_config(config)?.init().await
    }
}

impl<S: DocumentStore> StorageAdapter<S> {
    /// Start the adapter, loading the names of the collections which already
    /// exist in `store`.
    #[tracing::instrument(skip(name, store), fields(provider = tracing::field::Empty))]
    pub async fn init<N: Into<String>>(
        name: N,
        store: S,
        wait_for_sync: bool,
    ) -> Result<Self, StorageFailure> {
        let name: Arc<str> = name.into().into();
        tracing::Span::current().record("provider", &*name);
        let registry = CollectionRegistry::load(&store, wait_for_sync)
            .await
            .map_err(|e| report(&name, Operation::Init, e.kind(), e))?;
        tracing::debug!("storage adapter initialised");
        Ok(Self {
            name,
            store,
            registry: Arc::new(registry),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the state of `reference` into `slot`.
    ///
    /// If the actor has never been written `slot` keeps its state and its
    /// etag is cleared.
    #[tracing::instrument(
        skip(self, reference, slot),
        fields(provider = %self.name, key = tracing::field::Empty)
    )]
    pub async fn read_state(
        &self,
        actor_type: &str,
        reference: &ActorReference,
        slot: &mut dyn StateSlot,
    ) -> Result<(), StorageFailure> {
        let (collection, key) = self.locate(actor_type, reference).await;

        let found = self
            .store
            .document(collection, &key)
            .await
            .map_err(|e| self.fail(Operation::Read, e.kind(), e))?;

        match found {
            None => {
                tracing::trace!("no stored state");
                slot.set_etag(None);
            }
            Some(document) => {
                slot.reify(document.state)
                    .map_err(|e| self.fail(Operation::Read, FailureKind::Serialization, e))?;
                tracing::trace!(revision = ?document.revision, "read state");
                slot.set_etag(document.revision);
            }
        }
        Ok(())
    }

    /// Store the state held in `slot`.
    ///
    /// A slot without an etag is inserted as a new document; otherwise the
    /// stored document is replaced only if it still has the slot's revision.
    /// On success the slot's etag is the new revision, on failure the slot
    /// is untouched.
    #[tracing::instrument(
        skip(self, reference, slot),
        fields(provider = %self.name, key = tracing::field::Empty)
    )]
    pub async fn write_state(
        &self,
        actor_type: &str,
        reference: &ActorReference,
        slot: &mut dyn StateSlot,
    ) -> Result<(), StorageFailure> {
        let (collection, key) = self.locate(actor_type, reference).await;

        let state = slot
            .state_value()
            .map_err(|e| self.fail(Operation::Write, FailureKind::Serialization, e))?;
        let expected = slot.etag().filter(|etag| !etag.is_blank()).cloned();
        let document = PersistedDocument::new(key.clone(), expected.clone(), state);

        let written = match &expected {
            None => self.store.insert(collection, &document).await,
            Some(expected) => self
                .store
                .update(collection, &key, &document, expected)
                .await
                .map_err(|e| match e {
                    // Removed since the slot read it, so its revision is stale
                    StoreError::DocumentNotFound { collection, key } => StoreError::Conflict {
                        collection,
                        key,
                        expected: expected.clone(),
                    },
                    other => other,
                }),
        };
        let revision = written.map_err(|e| self.fail(Operation::Write, e.kind(), e))?;

        tracing::trace!(previous = ?expected, %revision, "wrote state");
        slot.set_etag(Some(revision));
        Ok(())
    }

    /// Remove the stored state of `reference` and clear the slot's etag.
    ///
    /// Clearing an actor with no stored state fails with
    /// [`FailureKind::NotFound`].
    #[tracing::instrument(
        skip(self, reference, slot),
        fields(provider = %self.name, key = tracing::field::Empty)
    )]
    pub async fn clear_state(
        &self,
        actor_type: &str,
        reference: &ActorReference,
        slot: &mut dyn StateSlot,
    ) -> Result<(), StorageFailure> {
        let (collection, key) = self.locate(actor_type, reference).await;

        self.store
            .remove(collection, &key)
            .await
            .map_err(|e| self.fail(Operation::Clear, e.kind(), e))?;

        tracing::trace!("cleared state");
        slot.set_etag(None);
        Ok(())
    }

    /// Release the store connection
    pub async fn close(&self) {
        self.store.close().await;
        tracing::debug!(provider = %self.name, "storage adapter closed");
    }

    /// The collection and document key for an actor, making sure the
    /// collection exists
    async fn locate<'a>(&self, actor_type: &'a str, reference: &ActorReference) -> (&'a str, String) {
        let collection = key_mapper::collection_name(actor_type);
        let key = key_mapper::document_key(reference);
        tracing::Span::current().record("key", key.as_str());
        self.registry.ensure_collection(&self.store, collection).await;
        (collection, key)
    }

    fn fail<E: fmt::Display>(&self, operation: Operation, kind: FailureKind, err: E) -> StorageFailure {
        report(&self.name, operation, kind, err)
    }
}

fn report<E: fmt::Display>(
    provider: &str,
    operation: Operation,
    kind: FailureKind,
    err: E,
) -> StorageFailure {
    let failure = StorageFailure::new(kind, operation, err.to_string());
    tracing::error!(provider, err = ?failure, "storage operation failed");
    failure
}
