use serde::{Serialize, de::DeserializeOwned};

use crate::Revision;

/// The runtime-owned container for one actor's state and its ETag.
///
/// The storage adapter never knows the concrete type of the state. It only
/// asks the slot for a structured value to write, and asks it to reify a
/// structured value it has read. [`ActorState`] implements this for any
/// serde type.
pub trait StateSlot: Send {
    /// The current state as a structured value
    fn state_value(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Replace the current state with the contents of `value`.
    ///
    /// Implementations should be tolerant: attributes the state type does
    /// not know are ignored and attributes missing from `value` take their
    /// default value. Nothing of the current state survives, so after a
    /// successful reify the state matches the stored document. A `null`
    /// value resets the state to its default.
    fn reify(&mut self, value: serde_json::Value) -> Result<(), serde_json::Error>;

    /// The revision of the document this slot was last synchronized with
    fn etag(&self) -> Option<&Revision>;

    fn set_etag(&mut self, etag: Option<Revision>);
}

/// A [`StateSlot`] holding a `T`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorState<T> {
    pub state: T,
    pub etag: Option<Revision>,
}

impl<T> ActorState<T> {
    pub fn new(state: T) -> Self {
        Self { state, etag: None }
    }
}

impl<T> StateSlot for ActorState<T>
where
    T: Serialize + DeserializeOwned + Default + Send,
{
    fn state_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.state)
    }

    fn reify(&mut self, value: serde_json::Value) -> Result<(), serde_json::Error> {
        if value.is_null() {
            tracing::trace!("persisted state is null, resetting to default");
            self.state = T::default();
            return Ok(());
        }
        let base = serde_json::to_value(T::default())?;
        self.state = serde_json::from_value(overlay(base, value))?;
        Ok(())
    }

    fn etag(&self) -> Option<&Revision> {
        self.etag.as_ref()
    }

    fn set_etag(&mut self, etag: Option<Revision>) {
        self.etag = etag;
    }
}

/// Lay the top level attributes of `incoming` over those of `base`.
///
/// Only the top level is merged; nested values are taken from `incoming`
/// whole so that entries removed from a persisted map stay removed.
fn overlay(base: serde_json::Value, incoming: serde_json::Value) -> serde_json::Value {
    match (base, incoming) {
        (serde_json::Value::Object(mut base), serde_json::Value::Object(incoming)) => {
            base.extend(incoming);
            serde_json::Value::Object(base)
        }
        (_, incoming) => incoming,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        level: u32,
        tags: HashMap<String, u32>,
    }

    impl Default for Profile {
        fn default() -> Self {
            Self {
                name: "anonymous".to_string(),
                level: 1,
                tags: HashMap::new(),
            }
        }
    }

    #[test]
    fn unknown_attributes_are_ignored() {
        let mut slot = ActorState::<Profile>::default();
        slot.reify(json!({ "name": "ada", "level": 3, "tags": {}, "retired": true }))
            .unwrap();
        assert_eq!(slot.state.name, "ada");
        assert_eq!(slot.state.level, 3);
    }

    #[test]
    fn missing_attributes_keep_the_default() {
        // Profile has no #[serde(default)], the overlay supplies the missing fields
        let mut slot = ActorState::<Profile>::default();
        slot.reify(json!({ "name": "ada" })).unwrap();
        assert_eq!(slot.state.name, "ada");
        assert_eq!(slot.state.level, 1);
    }

    #[test]
    fn unsaved_values_do_not_survive_a_reload() {
        let mut slot = ActorState::new(Profile {
            name: "ada".to_string(),
            level: 99,
            ..Profile::default()
        });
        slot.reify(json!({ "name": "grace" })).unwrap();
        assert_eq!(slot.state.name, "grace");
        assert_eq!(slot.state.level, Profile::default().level);
    }

    #[test]
    fn nested_values_are_replaced_not_merged() {
        let mut slot = ActorState::new(Profile {
            tags: HashMap::from([("stale".to_string(), 1)]),
            ..Profile::default()
        });
        slot.reify(json!({ "tags": { "fresh": 2 } })).unwrap();
        assert_eq!(slot.state.tags, HashMap::from([("fresh".to_string(), 2)]));
    }

    #[test]
    fn null_resets_to_default() {
        let mut slot = ActorState::new(Profile {
            name: "ada".to_string(),
            ..Profile::default()
        });
        slot.reify(serde_json::Value::Null).unwrap();
        assert_eq!(slot.state, Profile::default());
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let mut slot = ActorState::<Profile>::default();
        assert!(slot.reify(json!({ "level": "high" })).is_err());
    }

    #[test]
    fn non_object_states_are_replaced() {
        let mut slot = ActorState::new(5u64);
        slot.reify(json!(9)).unwrap();
        assert_eq!(slot.state, 9);
    }
}
