//! BLAKE3 content hashing for tamper evidence.
//!
//! The hash covers a change log's canonical JSON without its
//! `content_hash`, so editing any recorded change invalidates it.

use serde::Serialize;

use crate::{Change, ChangeLog, ChangeLogId};

#[derive(Serialize)]
struct HashableChangeLog<'a> {
    id: &'a ChangeLogId,
    base_uri: &'a str,
    intent: &'a str,
    changes: &'a [Change],
    started_at: &'a chrono::DateTime<chrono::Utc>,
    completed_at: &'a Option<chrono::DateTime<chrono::Utc>>,
}

/// Hex-encoded BLAKE3 hash of a change log's content.
pub fn compute_changelog_hash(log: &ChangeLog) -> String {
    let hashable = HashableChangeLog {
        id: &log.id,
        base_uri: &log.base_uri,
        intent: &log.intent,
        changes: &log.changes,
        started_at: &log.started_at,
        completed_at: &log.completed_at,
    };

    let json = serde_json::to_vec(&hashable).expect("ChangeLog serialization should not fail");
    blake3::hash(&json).to_hex().to_string()
}
