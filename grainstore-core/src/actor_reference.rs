use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker every canonical reference string starts with.
pub(crate) const CANONICAL_MARKER: &str = "ActorReference=";

/// The identity of an actor: the key of its type plus its primary key.
///
/// `ActorReference` is immutable. Its canonical string form (see
/// [`ActorReference::to_key_string`]) is used as a map key by the runtime, as
/// the `key` half of an embedded handle, and as the input to document key
/// derivation.
///
/// ## Canonical form
///
/// ```text
/// ActorReference=<type_key>/<primary_key>
/// ```
///
/// where `<primary_key>` is one of `int:<i64>`, `str:<text>`, `guid:<uuid>`,
/// `int:<i64>+<extension>` or `guid:<uuid>+<extension>`.
///
/// ```rust
/// use grainstore_core::{ActorReference, PrimaryKey};
///
/// let reference = ActorReference::new("Counter", PrimaryKey::Integer(42)).unwrap();
/// assert_eq!(reference.to_key_string(), "ActorReference=Counter/int:42");
///
/// let parsed: ActorReference = "ActorReference=Counter/int:42".parse().unwrap();
/// assert_eq!(parsed, reference);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorReference {
    #[serde(rename = "type")]
    type_key: String,
    key: PrimaryKey,
}

/// The primary key half of an [`ActorReference`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKey {
    Integer(i64),
    String(String),
    Guid(Uuid),
    /// An integer key qualified by a string extension
    IntegerCompound(i64, String),
    /// A UUID key qualified by a string extension
    GuidCompound(Uuid, String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BadActorReference {
    #[error("actor type key must not be empty")]
    EmptyTypeKey,
    #[error("actor type key {0:?} must not contain '/'")]
    InvalidTypeKey(String),
    #[error("missing the {CANONICAL_MARKER:?} marker")]
    MissingMarker,
    #[error("missing the '/' between type key and primary key")]
    MissingSeparator,
    #[error("unknown primary key kind {0:?}")]
    UnknownKeyKind(String),
    #[error("invalid integer key {0:?}")]
    InvalidInteger(String),
    #[error("invalid guid key {0:?}")]
    InvalidGuid(String),
}

impl ActorReference {
    pub fn new<S: Into<String>>(type_key: S, key: PrimaryKey) -> Result<Self, BadActorReference> {
        let type_key = type_key.into();
        if type_key.is_empty() {
            return Err(BadActorReference::EmptyTypeKey);
        }
        if type_key.contains('/') {
            return Err(BadActorReference::InvalidTypeKey(type_key));
        }
        Ok(Self { type_key, key })
    }

    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    pub fn primary_key(&self) -> &PrimaryKey {
        &self.key
    }

    /// The canonical string form of this reference
    pub fn to_key_string(&self) -> String {
        format!("{CANONICAL_MARKER}{}/{}", self.type_key, self.key)
    }

    /// Parse a string produced by [`ActorReference::to_key_string`]
    pub fn from_key_string(s: &str) -> Result<Self, BadActorReference> {
        let rest = s
            .strip_prefix(CANONICAL_MARKER)
            .ok_or(BadActorReference::MissingMarker)?;
        let (type_key, key) = rest
            .split_once('/')
            .ok_or(BadActorReference::MissingSeparator)?;
        Self::new(type_key, key.parse()?)
    }
}

impl fmt::Display for ActorReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CANONICAL_MARKER}{}/{}", self.type_key, self.key)
    }
}

impl FromStr for ActorReference {
    type Err = BadActorReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key_string(s)
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Integer(i) => write!(f, "int:{i}"),
            PrimaryKey::String(s) => write!(f, "str:{s}"),
            PrimaryKey::Guid(g) => write!(f, "guid:{}", g.hyphenated()),
            PrimaryKey::IntegerCompound(i, ext) => write!(f, "int:{i}+{ext}"),
            PrimaryKey::GuidCompound(g, ext) => write!(f, "guid:{}+{ext}", g.hyphenated()),
        }
    }
}

impl FromStr for PrimaryKey {
    type Err = BadActorReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| BadActorReference::UnknownKeyKind(s.to_string()))?;
        match kind {
            "str" => Ok(PrimaryKey::String(value.to_string())),
            "int" => {
                // An i64 never contains '+', so the first one starts the extension
                let (number, ext) = match value.split_once('+') {
                    Some((number, ext)) => (number, Some(ext)),
                    None => (value, None),
                };
                let number = number
                    .parse::<i64>()
                    .map_err(|_| BadActorReference::InvalidInteger(number.to_string()))?;
                Ok(match ext {
                    Some(ext) => PrimaryKey::IntegerCompound(number, ext.to_string()),
                    None => PrimaryKey::Integer(number),
                })
            }
            "guid" => {
                let (guid, ext) = match value.split_once('+') {
                    Some((guid, ext)) => (guid, Some(ext)),
                    None => (value, None),
                };
                let guid = Uuid::try_parse(guid)
                    .map_err(|_| BadActorReference::InvalidGuid(guid.to_string()))?;
                Ok(match ext {
                    Some(ext) => PrimaryKey::GuidCompound(guid, ext.to_string()),
                    None => PrimaryKey::Guid(guid),
                })
            }
            other => Err(BadActorReference::UnknownKeyKind(other.to_string())),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(value: i64) -> Self {
        PrimaryKey::Integer(value)
    }
}

impl From<Uuid> for PrimaryKey {
    fn from(value: Uuid) -> Self {
        PrimaryKey::Guid(value)
    }
}

impl From<&str> for PrimaryKey {
    fn from(value: &str) -> Self {
        PrimaryKey::String(value.to_string())
    }
}

impl From<String> for PrimaryKey {
    fn from(value: String) -> Self {
        PrimaryKey::String(value)
    }
}
