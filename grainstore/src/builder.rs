use grainstore_core::StorageFailure;

use crate::{
    StorageAdapter,
    store::{DocumentStore, InMemoryDocumentStore},
};

pub struct AdapterBuilder<S> {
    pub(crate) name: String,
    pub(crate) store: S,
    pub(crate) wait_for_sync: bool,
}

impl<S> AdapterBuilder<S> {
    pub fn with_store<S2: DocumentStore>(self, store: S2) -> AdapterBuilder<S2> {
        AdapterBuilder {
            store,
            name: self.name,
            wait_for_sync: self.wait_for_sync,
        }
    }

    /// Whether collections are created with `waitForSync`. Defaults to true.
    pub fn with_wait_for_sync(mut self, wait_for_sync: bool) -> Self {
        self.wait_for_sync = wait_for_sync;
        self
    }
}

impl AdapterBuilder<InMemoryDocumentStore> {
    pub fn new<N: Into<String>>(name: N) -> AdapterBuilder<InMemoryDocumentStore> {
        AdapterBuilder {
            name: name.into(),
            store: InMemoryDocumentStore::new(),
            wait_for_sync: true,
        }
    }
}

#[cfg(feature = "arango")]
impl<S> AdapterBuilder<S> {
    /// Use an ArangoDB store configured by `config`
    pub fn with_config(
        self,
        config: &crate::StorageConfig,
    ) -> Result<AdapterBuilder<crate::store::ArangoDocumentStore>, StorageFailure> {
        let store = crate::store::ArangoDocumentStore::new(config).map_err(|e| {
            configuration_failure(&self.name, e)
        })?;
        Ok(self
            .with_store(store)
            .with_wait_for_sync(config.wait_for_sync))
    }

    /// Use an ArangoDB store configured by provider options, see
    /// [`StorageConfig::from_properties`](crate::StorageConfig::from_properties)
    pub fn with_properties(
        self,
        properties: &std::collections::HashMap<String, String>,
    ) -> Result<AdapterBuilder<crate::store::ArangoDocumentStore>, StorageFailure> {
        let config = crate::StorageConfig::from_properties(properties)
            .map_err(|e| configuration_failure(&self.name, e))?;
        self.with_config(&config)
    }
}

#[cfg(feature = "arango")]
fn configuration_failure<E: std::fmt::Display>(provider: &str, err: E) -> StorageFailure {
    let failure = StorageFailure::new(
        grainstore_core::FailureKind::Configuration,
        grainstore_core::Operation::Init,
        err.to_string(),
    );
    tracing::error!(provider, err = ?failure, "invalid storage configuration");
    failure
}

impl<S: DocumentStore> AdapterBuilder<S> {
    pub async fn init(self) -> Result<StorageAdapter<S>, StorageFailure> {
        StorageAdapter::init(self.name, self.store, self.wait_for_sync).await
    }
}
