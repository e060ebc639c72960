//! ddlgraph-changelog: records of identity changes made to a schema graph.
//!
//! Every edit the manipulator applies produces one [`Change`] per entity
//! whose IRI changed. A [`ChangeLog`] groups the changes of one editing
//! session under the intent that motivated it, and is content-hashed with
//! BLAKE3 once finalized so later tampering is detectable.

pub mod hash;
pub mod session;
pub mod store;

pub use session::ChangeSession;
pub use store::{graph_key, ChangeLogStore, FileChangeLogStore, StoreError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Core Types ───────────────────────────────────────────────────

/// Unique identifier for a change log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChangeLogId(pub Uuid);

impl ChangeLogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChangeLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChangeLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entity IRI changing to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    /// The entity's IRI changed because it, or an ancestor, got a new parent
    /// or an ancestor was renamed.
    Move { from: String, to: String },
    /// The entity itself was renamed.
    Rename { from: String, to: String },
}

impl Change {
    /// IRI before the change.
    pub fn old_uri(&self) -> &str {
        match self {
            Change::Move { from, .. } | Change::Rename { from, .. } => from,
        }
    }

    /// IRI after the change.
    pub fn new_uri(&self) -> &str {
        match self {
            Change::Move { to, .. } | Change::Rename { to, .. } => to,
        }
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Move { from, to } => write!(f, "MOVE({from},{to})"),
            Change::Rename { from, to } => write!(f, "RENAME({from},{to})"),
        }
    }
}

/// The changes of one editing session, in the order they were applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeLog {
    pub id: ChangeLogId,
    /// Base URI of the graph that was edited.
    pub base_uri: String,
    /// Why the edits were made.
    pub intent: String,
    pub changes: Vec<Change>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// BLAKE3 content hash (hex), set on finalization.
    pub content_hash: Option<String>,
}

impl ChangeLog {
    /// BLAKE3 hash over every field except `content_hash`.
    pub fn compute_hash(&self) -> String {
        hash::compute_changelog_hash(self)
    }

    /// Whether the stored hash matches the content. Unfinalized logs never
    /// verify.
    pub fn verify_integrity(&self) -> bool {
        match &self.content_hash {
            Some(stored) => stored == &self.compute_hash(),
            None => false,
        }
    }

    /// The changes rendered as `MOVE(a,b)` / `RENAME(a,b)` strings.
    pub fn change_strings(&self) -> Vec<String> {
        self.changes.iter().map(ToString::to_string).collect()
    }

    /// Where `uri` ended up after this log's changes. An IRI the log never
    /// touched maps to itself.
    pub fn follow(&self, uri: &str) -> String {
        self.changes
            .iter()
            .fold(uri.to_string(), |current, change| {
                if change.old_uri() == current {
                    change.new_uri().to_string()
                } else {
                    current
                }
            })
    }
}

/// Follow `uri` through `logs`, applied in order.
pub fn follow_history(logs: &[ChangeLog], uri: &str) -> String {
    logs.iter().fold(uri.to_string(), |current, log| log.follow(&current))
}
