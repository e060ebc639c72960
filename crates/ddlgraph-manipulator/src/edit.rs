//! Path-addressed edits, as given on the command line.
//!
//! Paths are slash-separated names below the database: `main/Users/id`.

use std::fmt;

use ddlgraph_core::{Database, NodeIndex};

use crate::error::{ManipulatorError, Result};
use crate::manipulator::Manipulator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Re-parent the structure at `from` so it ends up at `to`.
    Move { from: Vec<String>, to: Vec<String> },
    /// Give the structure at `path` a new name.
    Rename { path: Vec<String>, name: String },
}

impl Edit {
    /// Parse `FROM=TO`, e.g. `main/Users=archive/Users`.
    pub fn parse_move(raw: &str) -> Result<Self> {
        let (from, to) = split_pair(raw)?;
        let to = split_path(to);
        if to.is_empty() {
            return Err(ManipulatorError::InvalidEdit {
                edit: raw.to_string(),
            });
        }
        Ok(Edit::Move {
            from: split_path(from),
            to,
        })
    }

    /// Parse `PATH=NAME`, e.g. `main/Users=Customers`.
    pub fn parse_rename(raw: &str) -> Result<Self> {
        let (path, name) = split_pair(raw)?;
        let name = name.trim();
        if name.is_empty() || name.contains('/') {
            return Err(ManipulatorError::InvalidEdit {
                edit: raw.to_string(),
            });
        }
        Ok(Edit::Rename {
            path: split_path(path),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edit::Move { from, to } => write!(f, "move {} -> {}", from.join("/"), to.join("/")),
            Edit::Rename { path, name } => write!(f, "rename {} -> {}", path.join("/"), name),
        }
    }
}

fn split_pair(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .ok_or_else(|| ManipulatorError::InvalidEdit {
            edit: raw.to_string(),
        })
}

fn split_path(raw: &str) -> Vec<String> {
    raw.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn find(database: &Database, path: &[String]) -> Result<NodeIndex> {
    database
        .find_path(path)
        .ok_or_else(|| ManipulatorError::UnknownPath {
            path: path.join("/"),
        })
}

impl Manipulator {
    /// Apply one path-addressed edit against the current graph. Returns the
    /// number of changes it recorded.
    pub fn apply(&mut self, edit: &Edit) -> Result<usize> {
        let before = self.changes().len();
        let persisted = self.snapshot()?;
        let mut edited = persisted.clone();

        match edit {
            Edit::Move { from, to } => {
                let node = find(&persisted, from)?;
                let (name, parent_path) = to.split_last().ok_or_else(|| {
                    ManipulatorError::InvalidEdit {
                        edit: edit.to_string(),
                    }
                })?;
                let parent = find(&edited, parent_path)?;
                if node == NodeIndex::ROOT {
                    return Err(ManipulatorError::RootMutation {
                        uri: persisted.root().uri()?,
                    });
                }
                if parent == node || persisted.descendants(node).contains(&parent) {
                    return Err(ManipulatorError::InvalidEdit {
                        edit: edit.to_string(),
                    });
                }
                if edited.structure(node).name() != name {
                    edited.update_name(node, name.as_str());
                }
                if !edited.add_structure(parent, node) {
                    match edited.find_child(parent, name) {
                        Some(occupant) if occupant != node => {
                            return Err(ManipulatorError::TargetExists {
                                uri: edited.structure(occupant).uri()?,
                            });
                        }
                        _ => tracing::debug!(%edit, "Edit leaves the parent unchanged"),
                    }
                }
                self.move_structure(persisted.structure(node), edited.structure(node))?;
            }
            Edit::Rename { path, name } => {
                let node = find(&persisted, path)?;
                edited.update_name(node, name.as_str());
                self.rename(persisted.structure(node), edited.structure(node))?;
            }
        }

        Ok(self.changes().len() - before)
    }
}
