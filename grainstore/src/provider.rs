use grainstore_core::{ActorReference, StateSlot, StorageFailure};

use crate::{StorageAdapter, store::DocumentStore};

/// What an actor host needs from a state storage provider.
///
/// `actor_type` is the full type name of the actor whose state is stored,
/// e.g. `std::any::type_name::<A>()`.
pub trait StorageProvider: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn read_state(
        &self,
        actor_type: &str,
        reference: &ActorReference,
        slot: &mut dyn StateSlot,
    ) -> impl Future<Output = Result<(), StorageFailure>> + Send;

    fn write_state(
        &self,
        actor_type: &str,
        reference: &ActorReference,
        slot: &mut dyn StateSlot,
    ) -> impl Future<Output = Result<(), StorageFailure>> + Send;

    fn clear_state(
        &self,
        actor_type: &str,
        reference: &ActorReference,
        slot: &mut dyn StateSlot,
    ) -> impl Future<Output = Result<(), StorageFailure>> + Send;

    fn close(&self) -> impl Future<Output = ()> + Send;
}

impl<S: DocumentStore> StorageProvider for StorageAdapter<S> {
    fn name(&self) -> &str {
        StorageAdapter::name(self)
    }

    fn read_state(
        &self,
        actor_type: &str,
        reference: &ActorReference,
        slot: &mut dyn StateSlot,
    ) -> impl Future<Output = Result<(), StorageFailure>> + Send {
        StorageAdapter::read_state(self, actor_type, reference, slot)
    }

    fn write_state(
        &self,
        actor_type: &str,
        reference: &ActorReference,
        slot: &mut dyn StateSlot,
    ) -> impl Future<Output = Result<(), StorageFailure>> + Send {
        StorageAdapter::write_state(self, actor_type, reference, slot)
    }

    fn clear_state(
        &self,
        actor_type: &str,
        reference: &ActorReference,
        slot: &mut dyn StateSlot,
    ) -> impl Future<Output = Result<(), StorageFailure>> + Send {
        StorageAdapter::clear_state(self, actor_type, reference, slot)
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        StorageAdapter::close(self)
    }
}
