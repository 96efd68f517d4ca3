use chrono::{DateTime, Utc};
use grainstore::{ActorHandle, StorageFailure, StorageProvider, reference_codec};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Activation, Actor};

/// An actor holding one value of each interesting kind
pub struct SampleActor;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleState {
    pub string_value: String,
    pub int_value: i32,
    pub date_time_value: DateTime<Utc>,
    pub guid_value: Uuid,
}

impl Actor for SampleActor {
    type State = SampleState;
}

impl<P: StorageProvider> Activation<SampleActor, P> {
    /// Replace every value and persist the result
    pub async fn set(
        &mut self,
        string_value: impl Into<String>,
        int_value: i32,
        date_time_value: DateTime<Utc>,
        guid_value: Uuid,
    ) -> Result<(), StorageFailure> {
        *self.state_mut() = SampleState {
            string_value: string_value.into(),
            int_value,
            date_time_value,
            guid_value,
        };
        self.write_state().await
    }

    pub fn get(&self) -> &SampleState {
        self.state()
    }

    pub async fn clear(&mut self) -> Result<(), StorageFailure> {
        self.clear_state().await
    }
}

/// An actor whose state refers to other actors
pub struct RosterActor;

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterState {
    pub title: String,
    #[serde(default, with = "reference_codec::option")]
    pub owner: Option<ActorHandle<SampleActor>>,
    #[serde(default)]
    pub members: Vec<ActorHandle<SampleActor>>,
}

impl Actor for RosterActor {
    type State = RosterState;
}

impl<P: StorageProvider> Activation<RosterActor, P> {
    pub async fn set_owner(&mut self, owner: ActorHandle<SampleActor>) -> Result<(), StorageFailure> {
        self.state_mut().owner = Some(owner);
        self.write_state().await
    }

    pub async fn add_member(
        &mut self,
        member: ActorHandle<SampleActor>,
    ) -> Result<(), StorageFailure> {
        if !self.state().members.contains(&member) {
            self.state_mut().members.push(member);
        }
        self.write_state().await
    }
}
