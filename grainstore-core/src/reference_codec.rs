//! Persisting handles to other actors inside actor state.
//!
//! A field holding an [`Addressable`] handle is written as
//!
//! ```json
//! { "key": "ActorReference=Counter/int:42", "data": "{\"type\":\"Counter\",\"key\":{\"integer\":42}}" }
//! ```
//!
//! `key` is the canonical reference string, readable by people and queries.
//! `data` is the runtime's own serialized form of the reference and is what
//! decoding trusts. If `data` is missing the handle is rebuilt from `key`.
//!
//! The same [`Serialize`]/[`Deserialize`] implementations are used when the
//! state is turned into a structured value and reified again, and when the
//! store serializes whole documents, so a handle written by one path can
//! always be read by the other.
//!
//! [`ActorHandle`] uses this encoding directly. Other handle types opt in
//! with `#[serde(with = "grainstore_core::reference_codec")]`, or
//! `reference_codec::option` for `Option` fields.

use std::{fmt, hash::Hash, marker::PhantomData};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _, ser::Error as _};

use crate::ActorReference;

/// A value which addresses an actor and can be rebuilt from its reference.
pub trait Addressable: Sized {
    fn actor_reference(&self) -> &ActorReference;

    fn from_actor_reference(reference: ActorReference) -> Self;
}

/// A handle to an actor implementing the interface `I`.
///
/// `I` is only a marker; the handle itself is just an [`ActorReference`]
/// which the runtime resolves when a call is made through it.
pub struct ActorHandle<I: ?Sized> {
    reference: ActorReference,
    _interface: PhantomData<fn() -> Box<I>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ReferenceEnvelope {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

impl ReferenceEnvelope {
    fn encode(reference: &ActorReference) -> Result<Self, serde_json::Error> {
        Ok(Self {
            key: reference.to_key_string(),
            data: Some(serde_json::to_string(reference)?),
        })
    }

    fn decode(self) -> Result<ActorReference, String> {
        match self.data {
            Some(data) => serde_json::from_str(&data)
                .map_err(|e| format!("invalid actor reference data {data:?}: {e}")),
            None => ActorReference::from_key_string(&self.key)
                .map_err(|e| format!("invalid actor reference key {:?}: {e}", self.key)),
        }
    }
}

pub fn serialize<H, S>(handle: &H, serializer: S) -> Result<S::Ok, S::Error>
where
    H: Addressable,
    S: Serializer,
{
    ReferenceEnvelope::encode(handle.actor_reference())
        .map_err(S::Error::custom)?
        .serialize(serializer)
}

pub fn deserialize<'de, H, D>(deserializer: D) -> Result<H, D::Error>
where
    H: Addressable,
    D: Deserializer<'de>,
{
    let envelope = ReferenceEnvelope::deserialize(deserializer)?;
    let reference = envelope.decode().map_err(D::Error::custom)?;
    Ok(H::from_actor_reference(reference))
}

/// The same encoding for `Option<H>` fields, with `None` written as `null`
pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Addressable, ReferenceEnvelope};

    pub fn serialize<H, S>(handle: &Option<H>, serializer: S) -> Result<S::Ok, S::Error>
    where
        H: Addressable,
        S: Serializer,
    {
        match handle {
            Some(handle) => super::serialize(handle, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, H, D>(deserializer: D) -> Result<Option<H>, D::Error>
    where
        H: Addressable,
        D: Deserializer<'de>,
    {
        let Some(envelope) = Option::<ReferenceEnvelope>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let reference = envelope.decode().map_err(serde::de::Error::custom)?;
        Ok(Some(H::from_actor_reference(reference)))
    }
}

impl<I: ?Sized> ActorHandle<I> {
    pub fn new(reference: ActorReference) -> Self {
        Self {
            reference,
            _interface: PhantomData,
        }
    }

    pub fn reference(&self) -> &ActorReference {
        &self.reference
    }

    pub fn into_reference(self) -> ActorReference {
        self.reference
    }
}

impl<I: ?Sized> Addressable for ActorHandle<I> {
    fn actor_reference(&self) -> &ActorReference {
        &self.reference
    }

    fn from_actor_reference(reference: ActorReference) -> Self {
        Self::new(reference)
    }
}

impl<I: ?Sized> Clone for ActorHandle<I> {
    fn clone(&self) -> Self {
        Self::new(self.reference.clone())
    }
}

impl<I: ?Sized> PartialEq for ActorHandle<I> {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}

impl<I: ?Sized> Eq for ActorHandle<I> {}

impl<I: ?Sized> Hash for ActorHandle<I> {
    fn hash<Hs: std::hash::Hasher>(&self, state: &mut Hs) {
        self.reference.hash(state)
    }
}

impl<I: ?Sized> fmt::Debug for ActorHandle<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActorHandle").field(&self.reference).finish()
    }
}

impl<I: ?Sized> Serialize for ActorHandle<I> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize(self, serializer)
    }
}

impl<'de, I: ?Sized> Deserialize<'de> for ActorHandle<I> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize(deserializer)
    }
}
