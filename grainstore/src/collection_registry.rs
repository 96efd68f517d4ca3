use std::{collections::HashSet, sync::Mutex};

use crate::store::{DocumentStore, StoreError};

/// The collections an adapter knows to exist.
///
/// Filled once from the store when the adapter starts and extended as
/// collections are created. Creation failures are never returned: the
/// document operation which follows reports anything that is really wrong.
#[derive(Debug)]
pub struct CollectionRegistry {
    known: Mutex<HashSet<String>>,
    wait_for_sync: bool,
}

impl CollectionRegistry {
    /// Build a registry from the collections which currently exist in `store`
    #[tracing::instrument(skip(store), level = "debug")]
    pub async fn load<S: DocumentStore>(
        store: &S,
        wait_for_sync: bool,
    ) -> Result<Self, StoreError> {
        let existing = store.list_collections().await?;
        tracing::debug!(count = existing.len(), "loaded existing collections");
        Ok(Self {
            known: Mutex::new(existing.into_iter().collect()),
            wait_for_sync,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    /// Make sure `name` exists, creating it on first use.
    pub async fn ensure_collection<S: DocumentStore>(&self, store: &S, name: &str) {
        if self.contains(name) {
            return;
        }
        match store.create_collection(name, self.wait_for_sync).await {
            Ok(()) => {
                tracing::debug!(collection = name, "created collection");
                self.lock().insert(name.to_string());
            }
            Err(StoreError::DuplicateName(_)) => {
                // Someone else created it first
                tracing::debug!(collection = name, "collection already exists");
                self.lock().insert(name.to_string());
            }
            Err(e) => {
                tracing::info!(collection = name, err = %e, "unable to create collection");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // The set is always valid, even if a holder panicked
        self.known
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
