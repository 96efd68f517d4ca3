//! Types shared by the grainstore actor state storage adapter.
//!
//! Nothing in this crate performs IO. It defines how actors are identified
//! ([`ActorReference`]), where their state lives ([`key_mapper`]), what a
//! stored document looks like ([`PersistedDocument`]), how the runtime hands
//! state to the adapter ([`StateSlot`]), how handles to other actors are
//! persisted ([`reference_codec`]) and how failures are reported
//! ([`StorageFailure`]).

mod actor_reference;
pub use actor_reference::{ActorReference, BadActorReference, PrimaryKey};
mod document;
pub use document::{PersistedDocument, Revision};
mod failure;
pub use failure::{FailureKind, Operation, StorageFailure};
pub mod key_mapper;
pub mod reference_codec;
pub use reference_codec::{ActorHandle, Addressable};
mod state_slot;
pub use state_slot::{ActorState, StateSlot};
