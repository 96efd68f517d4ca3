//! Persist virtual actor state in a schemaless document store.
//!
//! A [`StorageAdapter`] reads, writes and clears the state of individual
//! actors. State is kept one document per actor, one collection per actor
//! type, and every write is conditioned on the revision the actor last saw so
//! that concurrent activations cannot silently overwrite each other.
//!
//! ```rust,no_run
//! use grainstore::{ActorReference, ActorState, PrimaryKey, StorageAdapter};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = StorageAdapter::builder("default").init().await?;
//!
//! let counter = ActorReference::new("Counter", PrimaryKey::Integer(1))?;
//! let mut slot = ActorState::new(0_u64);
//! adapter.read_state("app::Counter", &counter, &mut slot).await?;
//! slot.state += 1;
//! adapter.write_state("app::Counter", &counter, &mut slot).await?;
//! # Ok(())
//! # }
//! ```
//!
//! With the `arango` feature enabled, [`StorageAdapter::connect`] connects to
//! an ArangoDB server.

pub use grainstore_core::{
    ActorHandle, ActorReference, ActorState, Addressable, BadActorReference, FailureKind,
    Operation, PersistedDocument, PrimaryKey, Revision, StateSlot, StorageFailure, key_mapper,
    reference_codec,
};

mod adapter;
pub use adapter::StorageAdapter;
mod builder;
pub use builder::AdapterBuilder;
mod collection_registry;
pub use collection_registry::CollectionRegistry;
mod config;
pub use config::{ConfigError, StorageConfig};
mod provider;
pub use provider::StorageProvider;
pub mod store;
