//! Mapping of actor types and identities onto collections and document keys.
//!
//! Both functions are pure and deterministic. A document key is derived from
//! the canonical form of an [`ActorReference`]:
//!
//! * the `ActorReference=` marker is rewritten to `AR:`
//! * every byte outside the store's key alphabet, `%` included, is written as
//!   `%XX`
//!
//! Percent escaping is injective and the prefix rewrite is a bijection, so two
//! different references never share a key. Keys that would exceed
//! [`MAX_DOCUMENT_KEY_LEN`] are replaced with `H:` followed by the hex SHA-256
//! of the canonical form, which can never collide with an `AR:` key.

use sha2::{Digest, Sha256};

use crate::{ActorReference, actor_reference::CANONICAL_MARKER};

/// Longest document key the store accepts
pub const MAX_DOCUMENT_KEY_LEN: usize = 254;

const SHORT_PREFIX: &str = "AR:";
const HASHED_PREFIX: &str = "H:";

/// The collection an actor type is stored in.
///
/// This is the last segment of the type name, where segments are separated
/// by `.` or `::`. Generic arguments (`Wrapper<app::Foo>`) are dropped first,
/// so every instantiation of a generic actor shares one collection. Type
/// names which only differ before their last segment share a collection.
///
/// ```rust
/// use grainstore_core::key_mapper::collection_name;
///
/// assert_eq!(collection_name("MyApp.Grains.Counter"), "Counter");
/// assert_eq!(collection_name("my_app::grains::Counter"), "Counter");
/// assert_eq!(collection_name("my_app::Wrapper<my_app::Counter>"), "Wrapper");
/// assert_eq!(collection_name("Counter"), "Counter");
/// ```
pub fn collection_name(type_name: &str) -> &str {
    let path = type_name
        .split_once('<')
        .map_or(type_name, |(path, _arguments)| path);
    path.rsplit(['.', ':']).next().unwrap_or(path)
}

/// The key of the document holding the state of `reference`
///
/// ```rust
/// use grainstore_core::{ActorReference, PrimaryKey, key_mapper::document_key};
///
/// let reference = ActorReference::new("Counter", PrimaryKey::IntegerCompound(7, "a b".into())).unwrap();
/// assert_eq!(document_key(&reference), "AR:Counter%2Fint:7%2Ba%20b");
/// ```
pub fn document_key(reference: &ActorReference) -> String {
    let canonical = reference.to_key_string();
    let body = canonical
        .strip_prefix(CANONICAL_MARKER)
        .unwrap_or(canonical.as_str());

    let mut key = String::with_capacity(SHORT_PREFIX.len() + body.len());
    key.push_str(SHORT_PREFIX);
    for byte in body.bytes() {
        if is_key_char(byte) {
            key.push(byte as char);
        } else {
            key.push('%');
            key.push_str(&hex::encode_upper([byte]));
        }
    }

    if key.len() > MAX_DOCUMENT_KEY_LEN {
        let digest = Sha256::digest(canonical.as_bytes());
        return format!("{HASHED_PREFIX}{}", hex::encode(digest));
    }
    key
}

fn is_key_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'_' | b'-' | b':' | b'.' | b'@' | b'(' | b')' | b'=' | b',' | b';' | b'$' | b'!'
                | b'*' | b'\''
        )
}
