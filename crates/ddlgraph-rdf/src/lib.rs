//! ddlgraph-rdf: the RDF side of ddlgraph.
//!
//! This crate is the single conversion point between schema trees and RDF.
//! Trees are serialized with [`to_graph`] and rebuilt with [`construct`];
//! graphs enter and leave through [`KnowledgeGraph`], and data graphs are
//! checked against the bundled ontology and SHACL shapes.

pub mod construct;
pub mod emit;
pub mod error;
pub mod knowledge;
pub mod shacl;
pub mod vocab;

pub use construct::construct;
pub use emit::{foreign_key_iri, structure_to_graph, to_graph};
pub use error::{DataGraphError, DatabaseToGraphError, GraphBasedError, OntologyError};
pub use knowledge::{format_for_path, DataGraph, KnowledgeGraph, Ontology};
pub use shacl::{Shapes, Violation};
pub use vocab::DDL_NS;
