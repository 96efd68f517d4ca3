//! A miniature actor host for exercising storage providers.
//!
//! [`Host`] activates actors over any [`StorageProvider`]. An [`Activation`]
//! owns the actor's [`ActorState`] and reads, writes and clears it the way a
//! virtual actor runtime does. [`sample`] contains the actors used by the
//! tests.

use std::marker::PhantomData;

use grainstore::{ActorHandle, ActorReference, ActorState, StorageFailure, StorageProvider};
use serde::{Serialize, de::DeserializeOwned};

pub mod sample;

/// An actor type with persistent state
pub trait Actor: Send + 'static {
    type State: Serialize + DeserializeOwned + Default + Send;

    /// The type name reported to the storage provider
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[derive(Clone)]
pub struct Host<P> {
    provider: P,
}

impl<P: StorageProvider + Clone> Host<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Activate `reference`, loading its persisted state
    pub async fn activate<A: Actor>(
        &self,
        reference: ActorReference,
    ) -> Result<Activation<A, P>, StorageFailure> {
        let mut activation = Activation {
            reference,
            state: ActorState::default(),
            provider: self.provider.clone(),
            _actor: PhantomData,
        };
        activation.read_state().await?;
        tracing::debug!(
            provider = self.provider.name(),
            actor = %activation.reference,
            "activated"
        );
        Ok(activation)
    }

    /// Activate the actor a handle points at
    pub async fn activate_handle<A: Actor>(
        &self,
        handle: &ActorHandle<A>,
    ) -> Result<Activation<A, P>, StorageFailure> {
        self.activate(handle.reference().clone()).await
    }

    pub async fn shutdown(self) {
        self.provider.close().await;
    }
}

/// A live actor and its state
pub struct Activation<A: Actor, P> {
    reference: ActorReference,
    state: ActorState<A::State>,
    provider: P,
    _actor: PhantomData<fn() -> A>,
}

impl<A: Actor, P: StorageProvider> Activation<A, P> {
    pub fn reference(&self) -> &ActorReference {
        &self.reference
    }

    pub fn handle(&self) -> ActorHandle<A> {
        ActorHandle::new(self.reference.clone())
    }

    pub fn state(&self) -> &A::State {
        &self.state.state
    }

    pub fn state_mut(&mut self) -> &mut A::State {
        &mut self.state.state
    }

    pub fn slot(&self) -> &ActorState<A::State> {
        &self.state
    }

    pub fn slot_mut(&mut self) -> &mut ActorState<A::State> {
        &mut self.state
    }

    pub async fn read_state(&mut self) -> Result<(), StorageFailure> {
        self.provider
            .read_state(A::type_name(), &self.reference, &mut self.state)
            .await
    }

    pub async fn write_state(&mut self) -> Result<(), StorageFailure> {
        self.provider
            .write_state(A::type_name(), &self.reference, &mut self.state)
            .await
    }

    /// Remove the persisted state. The in-memory state is reset to its
    /// default once the store has removed it.
    pub async fn clear_state(&mut self) -> Result<(), StorageFailure> {
        self.provider
            .clear_state(A::type_name(), &self.reference, &mut self.state)
            .await?;
        self.state.state = A::State::default();
        Ok(())
    }
}
