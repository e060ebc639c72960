//! Error types for the ddlgraph-rdf crate.

use ddlgraph_core::{EntityError, ForeignKeyError};
use thiserror::Error;

use crate::shacl::Violation;

/// Errors from loading or writing raw RDF.
#[derive(Error, Debug)]
pub enum GraphBasedError {
    #[error("Knowledge graph requires a base URI")]
    MissingBaseUri,

    #[error("Invalid IRI {iri}: {reason}")]
    InvalidIri { iri: String, reason: String },

    #[error("RDF parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from serializing a database tree to triples.
#[derive(Error, Debug)]
pub enum DatabaseToGraphError {
    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error("Invalid IRI {iri}: {reason}")]
    InvalidIri { iri: String, reason: String },
}

/// Errors from ontology and shape graphs.
#[derive(Error, Debug)]
pub enum OntologyError {
    #[error("Ontology does not define {iri}")]
    MissingDefinition { iri: String },

    #[error("Invalid shape {shape}: {reason}")]
    InvalidShape { shape: String, reason: String },

    #[error(transparent)]
    Graph(#[from] GraphBasedError),
}

/// Errors from instance data graphs: reconstruction and validation.
#[derive(Error, Debug)]
pub enum DataGraphError {
    #[error("Data graph does not conform to its shapes: {} violation(s)", .0.len())]
    Validation(Vec<Violation>),

    #[error("Data graph contains no database")]
    NoDatabase,

    #[error("Data graph contains {count} databases; expected exactly one")]
    MultipleDatabases { count: usize },

    #[error("Structure {iri} has no name")]
    MissingName { iri: String },

    #[error("Structure {iri} has no known ddl type")]
    UnknownKind { iri: String },

    #[error("Structure {iri} is reachable more than once")]
    SharedStructure { iri: String },

    #[error("{subject} refers to {object}, which is not a structure of this database")]
    DanglingReference { subject: String, object: String },

    #[error("{subject} has a non-IRI value for {predicate}")]
    UnexpectedTerm { subject: String, predicate: String },

    #[error("Identity mismatch: recomputed {expected} but graph has {found}")]
    IdentityMismatch { expected: String, found: String },

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error("Foreign key error: {0}")]
    ForeignKey(#[from] ForeignKeyError),

    #[error(transparent)]
    Graph(#[from] GraphBasedError),
}
