//! Error types for the ddlgraph-manipulator crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManipulatorError {
    #[error("The database root cannot be moved or renamed: {uri}")]
    RootMutation { uri: String },

    #[error("Structure {uri} is not in the graph")]
    UnknownTarget { uri: String },

    #[error("New parent of {uri} is not in the graph")]
    UnknownParent { uri: String },

    #[error("Move of {from} to {to} also changes its name ({old_name} -> {new_name})")]
    IntentConflict {
        from: String,
        to: String,
        old_name: String,
        new_name: String,
    },

    #[error("Rename of {from} to {to} also changes its parent")]
    ParentMismatch { from: String, to: String },

    #[error("{uri} already exists in the graph")]
    TargetExists { uri: String },

    #[error("No structure at path '{path}'")]
    UnknownPath { path: String },

    #[error("Invalid edit '{edit}'")]
    InvalidEdit { edit: String },

    #[error("Invalid IRI {iri}: {reason}")]
    InvalidIri { iri: String, reason: String },

    #[error("RDF error: {0}")]
    Rdf(#[from] ddlgraph_rdf::DataGraphError),

    #[error("Graph error: {0}")]
    Graph(#[from] ddlgraph_rdf::GraphBasedError),

    #[error("Ontology error: {0}")]
    Ontology(#[from] ddlgraph_rdf::OntologyError),

    #[error(transparent)]
    Entity(#[from] ddlgraph_core::EntityError),

    #[error("Change log store error: {0}")]
    Store(#[from] ddlgraph_changelog::StoreError),
}

pub type Result<T> = std::result::Result<T, ManipulatorError>;
