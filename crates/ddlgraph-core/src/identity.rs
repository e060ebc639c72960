//! SHA-256 content addressing for schema entities.
//!
//! Every entity's identifier is the hex digest of a canonical string
//! (`hashed_from`). For named structures that string is the concatenated
//! ancestor-name path, so renaming or re-parenting a node changes its id
//! and the id of everything below it.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::EntityError;

/// Hash arbitrary bytes with SHA-256 and return the lowercase hex digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hex-encoded SHA-256 digest identifying an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity of an entity: its id and the string the id was computed over.
///
/// Equality and hashing consider only `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    id: EntityId,
    hashed_from: String,
}

impl Identity {
    /// Compute an identity over `to_hash`.
    pub fn compute(to_hash: impl Into<String>) -> Self {
        let hashed_from = to_hash.into();
        let id = EntityId(sha256_hex(hashed_from.as_bytes()));
        Self { id, hashed_from }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn hashed_from(&self) -> &str {
        &self.hashed_from
    }

    /// Identity of a child named `name` below this one.
    ///
    /// The parent's canonical string and the child name are joined without
    /// a separator, so `"AB" + "C"` and `"A" + "BC"` collide. Persisted
    /// graphs depend on this exact form.
    pub fn child(&self, name: &str) -> Self {
        Self::compute(format!("{}{}", self.hashed_from, name))
    }

    /// `base_uri + id`, failing when the tree has no base.
    pub fn uri(&self, base_uri: Option<&str>) -> Result<String, EntityError> {
        entity_uri(base_uri, &self.id)
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Build an entity URI by appending its id to the shared base.
pub fn entity_uri(base_uri: Option<&str>, id: &EntityId) -> Result<String, EntityError> {
    match base_uri {
        Some(base) if !base.is_empty() => Ok(format!("{base}{id}")),
        _ => Err(EntityError::MissingBaseUri { id: id.to_string() }),
    }
}

/// Anything that can produce the canonical string its identity is hashed from.
pub trait Hashable {
    fn compute_hash(&self) -> String;

    fn compute_id(&self) -> Identity {
        Identity::compute(self.compute_hash())
    }
}
