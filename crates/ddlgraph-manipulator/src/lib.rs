//! ddlgraph-manipulator: identity-preserving edits of persisted schema graphs.
//!
//! Moves and renames structures in an RDF schema graph, re-pointing every
//! triple at the entities' new content-addressed IRIs and recording a
//! tamper-evident change log of every IRI that changed.

pub mod edit;
pub mod error;
pub mod manipulator;
pub mod run;

pub use edit::Edit;
pub use error::{ManipulatorError, Result};
pub use manipulator::Manipulator;
pub use run::{follow, history, run, RunOptions};
