//! Builder-pattern recorder for change logs.
//!
//! ```no_run
//! # use ddlgraph_changelog::{Change, ChangeSession};
//! let mut session = ChangeSession::new("http://test.com/", "Move Users into archive");
//! session.record(Change::Move {
//!     from: "http://test.com/a1".to_string(),
//!     to: "http://test.com/b2".to_string(),
//! });
//! let log = session.finalize();
//! assert!(log.verify_integrity());
//! ```

use chrono::Utc;

use crate::{Change, ChangeLog, ChangeLogId};

/// Records changes incrementally and seals them into a [`ChangeLog`].
#[derive(Debug, Clone)]
pub struct ChangeSession {
    log: ChangeLog,
}

impl ChangeSession {
    pub fn new(base_uri: &str, intent: &str) -> Self {
        Self {
            log: ChangeLog {
                id: ChangeLogId::new(),
                base_uri: base_uri.to_string(),
                intent: intent.to_string(),
                changes: Vec::new(),
                started_at: Utc::now(),
                completed_at: None,
                content_hash: None,
            },
        }
    }

    pub fn record(&mut self, change: Change) {
        tracing::trace!(%change, "Recorded change");
        self.log.changes.push(change);
    }

    pub fn extend(&mut self, changes: impl IntoIterator<Item = Change>) {
        for change in changes {
            self.record(change);
        }
    }

    /// Changes recorded so far.
    pub fn changes(&self) -> &[Change] {
        &self.log.changes
    }

    /// Available before finalization.
    pub fn id(&self) -> ChangeLogId {
        self.log.id
    }

    /// Stamp `completed_at` and compute the content hash.
    pub fn finalize(mut self) -> ChangeLog {
        self.log.completed_at = Some(Utc::now());
        let hash = self.log.compute_hash();
        self.log.content_hash = Some(hash);
        self.log
    }
}
