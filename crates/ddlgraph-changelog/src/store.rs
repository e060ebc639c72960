//! Change log storage, grouped by the graph each log edited.
//!
//! Every graph (identified by its base URI) gets its own directory, and its
//! logs together form the graph's edit history. Replaying that history in
//! order maps any IRI a consumer once held to the one the graph uses now.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{ChangeLog, ChangeLogId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No change log {id} for graph {base_uri}")]
    NotFound { base_uri: String, id: ChangeLogId },

    #[error("Integrity check failed for change log {0}: stored hash does not match content")]
    IntegrityViolation(ChangeLogId),

    #[error("Change log {id} edits {found}, but is stored under {expected}")]
    GraphMismatch {
        id: ChangeLogId,
        expected: String,
        found: String,
    },

    #[error("Change log has no content hash (not finalized)")]
    NotFinalized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait ChangeLogStore {
    /// Store a finalized log under its graph. Unfinalized logs are rejected.
    fn save(&self, log: &ChangeLog) -> Result<PathBuf, StoreError>;

    /// Load one log of the graph at `base_uri`, verifying its content hash.
    fn get(&self, base_uri: &str, id: ChangeLogId) -> Result<ChangeLog, StoreError>;

    /// Every log of the graph at `base_uri`, oldest first. Each one is
    /// verified; a single tampered log fails the whole history.
    fn history(&self, base_uri: &str) -> Result<Vec<ChangeLog>, StoreError>;
}

/// Directory name for the graph at `base_uri`: the first 16 hex digits of
/// its BLAKE3 hash.
pub fn graph_key(base_uri: &str) -> String {
    blake3::hash(base_uri.as_bytes()).to_hex().as_str()[..16].to_string()
}

/// File-system backed store.
///
/// ```text
/// {root}/
///   {graph_key}/
///     {changelog_id}.json
/// ```
pub struct FileChangeLogStore {
    root: PathBuf,
}

impl FileChangeLogStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn graph_dir(&self, base_uri: &str) -> PathBuf {
        self.root.join(graph_key(base_uri))
    }

    fn read(&self, base_uri: &str, path: &Path) -> Result<ChangeLog, StoreError> {
        let log: ChangeLog = serde_json::from_str(&fs::read_to_string(path)?)?;
        if !log.verify_integrity() {
            tracing::warn!(changelog_id = %log.id, path = %path.display(), "Change log tampered");
            return Err(StoreError::IntegrityViolation(log.id));
        }
        if log.base_uri != base_uri {
            return Err(StoreError::GraphMismatch {
                id: log.id,
                expected: base_uri.to_string(),
                found: log.base_uri,
            });
        }
        Ok(log)
    }
}

impl ChangeLogStore for FileChangeLogStore {
    fn save(&self, log: &ChangeLog) -> Result<PathBuf, StoreError> {
        if log.content_hash.is_none() {
            return Err(StoreError::NotFinalized);
        }

        let dir = self.graph_dir(&log.base_uri);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", log.id));
        fs::write(&path, serde_json::to_string_pretty(log)?)?;

        tracing::debug!(
            changelog_id = %log.id,
            base_uri = %log.base_uri,
            changes = log.changes.len(),
            path = %path.display(),
            "Change log saved"
        );
        Ok(path)
    }

    fn get(&self, base_uri: &str, id: ChangeLogId) -> Result<ChangeLog, StoreError> {
        let path = self.graph_dir(base_uri).join(format!("{id}.json"));
        if !path.is_file() {
            return Err(StoreError::NotFound {
                base_uri: base_uri.to_string(),
                id,
            });
        }
        self.read(base_uri, &path)
    }

    fn history(&self, base_uri: &str) -> Result<Vec<ChangeLog>, StoreError> {
        let dir = self.graph_dir(base_uri);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut logs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                logs.push(self.read(base_uri, &path)?);
            }
        }
        logs.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then(a.completed_at.cmp(&b.completed_at))
        });
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{follow_history, Change, ChangeSession};

    fn moved(base_uri: &str, from: &str, to: &str) -> ChangeLog {
        let mut session = ChangeSession::new(base_uri, "Move Users into archive");
        session.record(Change::Move {
            from: format!("{base_uri}{from}"),
            to: format!("{base_uri}{to}"),
        });
        session.finalize()
    }

    #[test]
    fn save_and_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChangeLogStore::new(dir.path()).unwrap();
        let log = moved("http://test.com/", "a", "b");

        let path = store.save(&log).unwrap();
        assert_eq!(
            path,
            dir.path()
                .join(graph_key("http://test.com/"))
                .join(format!("{}.json", log.id))
        );

        let retrieved = store.get("http://test.com/", log.id).unwrap();
        assert_eq!(retrieved, log);
        assert!(retrieved.verify_integrity());
    }

    #[test]
    fn get_from_other_graph_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChangeLogStore::new(dir.path()).unwrap();
        let log = moved("http://a.com/", "a", "b");
        store.save(&log).unwrap();

        let result = store.get("http://b.com/", log.id);
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn integrity_violation_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChangeLogStore::new(dir.path()).unwrap();
        let log = moved("http://test.com/", "a", "b");
        let path = store.save(&log).unwrap();

        let mut tampered = log.clone();
        tampered.changes.clear();
        fs::write(&path, serde_json::to_string_pretty(&tampered).unwrap()).unwrap();

        let result = store.get("http://test.com/", log.id);
        assert!(matches!(result, Err(StoreError::IntegrityViolation(_))));
        assert!(store.history("http://test.com/").is_err());
    }

    #[test]
    fn log_filed_under_wrong_graph_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChangeLogStore::new(dir.path()).unwrap();
        let log = moved("http://a.com/", "a", "b");
        let path = store.save(&log).unwrap();

        let other = dir.path().join(graph_key("http://b.com/"));
        fs::create_dir_all(&other).unwrap();
        fs::copy(&path, other.join(format!("{}.json", log.id))).unwrap();

        let result = store.get("http://b.com/", log.id);
        assert!(matches!(result, Err(StoreError::GraphMismatch { .. })));
    }

    #[test]
    fn save_rejects_unfinalized() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChangeLogStore::new(dir.path()).unwrap();

        let mut log = moved("http://test.com/", "a", "b");
        log.content_hash = None;

        let result = store.save(&log);
        assert!(matches!(result, Err(StoreError::NotFinalized)));
    }

    #[test]
    fn history_is_per_graph_and_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileChangeLogStore::new(dir.path()).unwrap();

        let first = moved("http://a.com/", "main/Users", "archive/Users");
        let unrelated = moved("http://b.com/", "x", "y");
        let mut second = moved("http://a.com/", "archive/Users", "archive/People");
        second.started_at = first.started_at + chrono::Duration::seconds(1);
        second.content_hash = Some(second.compute_hash());

        store.save(&second).unwrap();
        store.save(&unrelated).unwrap();
        store.save(&first).unwrap();

        let history = store.history("http://a.com/").unwrap();
        assert_eq!(history, vec![first, second]);
        assert_eq!(
            follow_history(&history, "http://a.com/main/Users"),
            "http://a.com/archive/People"
        );
        assert!(store.history("http://c.com/").unwrap().is_empty());
    }
}
