use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque token the store assigns to a document on every successful write.
///
/// The runtime keeps the last revision it saw in the state slot's ETag and
/// hands it back on the next write, which the store only accepts if the
/// document still has that revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new<S: Into<String>>(revision: S) -> Self {
        Revision(revision.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this revision carries no token at all
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Revision {
    fn from(revision: String) -> Self {
        Revision(revision)
    }
}

impl From<&str> for Revision {
    fn from(revision: &str) -> Self {
        Revision(revision.to_string())
    }
}

/// The shape actor state takes in the document store.
///
/// ```json
/// { "_key": "AR:Counter%2Fint:42", "_rev": "_hR3kX--_", "state": { "count": 3 } }
/// ```
///
/// Any other attributes the store adds (such as `_id`) are ignored when
/// reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDocument {
    #[serde(rename = "_key")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,
    #[serde(default)]
    pub state: serde_json::Value,
}

impl PersistedDocument {
    pub fn new(id: String, revision: Option<Revision>, state: serde_json::Value) -> Self {
        Self {
            id,
            revision,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn uses_store_attribute_names() {
        let doc = PersistedDocument::new(
            "AR:Counter%2Fint:1".to_string(),
            Some(Revision::from("_abc")),
            json!({ "count": 1 }),
        );
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({ "_key": "AR:Counter%2Fint:1", "_rev": "_abc", "state": { "count": 1 } })
        );
    }

    #[test]
    fn missing_revision_is_not_written() {
        let doc = PersistedDocument::new("k".to_string(), None, json!(null));
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({ "_key": "k", "state": null })
        );
    }

    #[test]
    fn extra_store_attributes_are_ignored() {
        let doc: PersistedDocument = serde_json::from_value(json!({
            "_key": "k",
            "_id": "Counter/k",
            "_rev": "_r1",
            "state": { "count": 2 },
        }))
        .unwrap();
        assert_eq!(doc.revision, Some(Revision::from("_r1")));
        assert_eq!(doc.state, json!({ "count": 2 }));
    }

    #[test]
    fn blank_revisions() {
        assert!(Revision::from("").is_blank());
        assert!(Revision::from("  ").is_blank());
        assert!(!Revision::from("_r").is_blank());
    }
}
