//! Loading and saving RDF graphs, plus the ontology and data-graph views.
//!
//! Every graph that enters or leaves ddlgraph goes through
//! [`KnowledgeGraph`], which pins the base URI relative IRIs resolve against.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ddlgraph_core::Database;
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::vocab::{rdf, rdfs};
use oxigraph::model::{Graph, GraphNameRef, NamedNodeRef, Triple, TripleRef};

use crate::construct::construct;
use crate::error::{DataGraphError, GraphBasedError, OntologyError};
use crate::shacl::Shapes;
use crate::vocab::{ddl, owl, DDL_NS};

const DDL_ONTOLOGY: &str = include_str!("../resources/ddl.ttl");

/// RDF format for a file path, by extension. Turtle when unknown.
pub fn format_for_path(path: &Path) -> RdfFormat {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(RdfFormat::from_extension)
        .unwrap_or(RdfFormat::Turtle)
}

/// An in-memory RDF graph tied to a base URI.
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    base_uri: String,
    graph: Graph,
}

impl KnowledgeGraph {
    pub fn new(base_uri: impl Into<String>, graph: Graph) -> Result<Self, GraphBasedError> {
        let base_uri = base_uri.into();
        if base_uri.is_empty() {
            return Err(GraphBasedError::MissingBaseUri);
        }
        Ok(Self { base_uri, graph })
    }

    /// Parse a graph from `reader`. Quads in named graphs are folded into
    /// the default graph.
    pub fn from_reader(
        reader: impl Read,
        format: RdfFormat,
        base_uri: &str,
    ) -> Result<Self, GraphBasedError> {
        if base_uri.is_empty() {
            return Err(GraphBasedError::MissingBaseUri);
        }

        let parser = RdfParser::from_format(format)
            .with_base_iri(base_uri)
            .map_err(|e| GraphBasedError::InvalidIri {
                iri: base_uri.to_string(),
                reason: e.to_string(),
            })?;

        let mut graph = Graph::new();
        for quad in parser.for_reader(reader) {
            let quad = quad.map_err(|e| GraphBasedError::Parse(e.to_string()))?;
            graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
        }

        tracing::debug!(base_uri, triples = graph.len(), "Parsed graph");
        Self::new(base_uri, graph)
    }

    /// Load a graph from a file, picking the format by extension.
    pub fn from_path(path: impl AsRef<Path>, base_uri: &str) -> Result<Self, GraphBasedError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let graph = Self::from_reader(BufReader::new(file), format_for_path(path), base_uri)?;
        tracing::info!(path = %path.display(), triples = graph.len(), "Loaded graph");
        Ok(graph)
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Serialize the graph. Triples are written sorted so output is stable
    /// between runs.
    pub fn write_to<W: Write>(&self, writer: W, format: RdfFormat) -> Result<W, GraphBasedError> {
        let mut serializer = RdfSerializer::from_format(format)
            .with_prefix("ddl", DDL_NS)
            .map_err(|e| GraphBasedError::InvalidIri {
                iri: DDL_NS.to_string(),
                reason: e.to_string(),
            })?
            .for_writer(writer);

        let mut triples: Vec<TripleRef<'_>> = self.graph.iter().collect();
        triples.sort_by_cached_key(|t| t.to_string());
        for triple in triples {
            serializer.serialize_quad(triple.in_graph(GraphNameRef::DefaultGraph))?;
        }
        Ok(serializer.finish()?)
    }

    /// Write the graph to a file, picking the format by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GraphBasedError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        let mut writer = self.write_to(BufWriter::new(file), format_for_path(path))?;
        writer.flush()?;
        tracing::info!(path = %path.display(), triples = self.len(), "Saved graph");
        Ok(())
    }
}

/// A graph of class and property definitions.
#[derive(Debug, Clone)]
pub struct Ontology {
    graph: KnowledgeGraph,
}

impl Ontology {
    /// The bundled ddl ontology.
    pub fn ddl() -> Result<Self, OntologyError> {
        let graph = KnowledgeGraph::from_reader(DDL_ONTOLOGY.as_bytes(), RdfFormat::Turtle, DDL_NS)?;
        Ok(Self { graph })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OntologyError> {
        Ok(Self {
            graph: KnowledgeGraph::from_path(path, DDL_NS)?,
        })
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn defines_class(&self, class: NamedNodeRef<'_>) -> bool {
        self.has_type(class, owl::CLASS) || self.has_type(class, rdfs::CLASS)
    }

    pub fn defines_property(&self, property: NamedNodeRef<'_>) -> bool {
        self.has_type(property, owl::OBJECT_PROPERTY)
            || self.has_type(property, owl::DATATYPE_PROPERTY)
            || self.has_type(property, rdf::PROPERTY)
    }

    pub fn require_class(&self, class: NamedNodeRef<'_>) -> Result<(), OntologyError> {
        if self.defines_class(class) {
            Ok(())
        } else {
            Err(OntologyError::MissingDefinition {
                iri: class.as_str().to_string(),
            })
        }
    }

    pub fn require_property(&self, property: NamedNodeRef<'_>) -> Result<(), OntologyError> {
        if self.defines_property(property) {
            Ok(())
        } else {
            Err(OntologyError::MissingDefinition {
                iri: property.as_str().to_string(),
            })
        }
    }

    /// Check that every class and predicate the codec emits is defined.
    pub fn check_vocabulary(&self) -> Result<(), OntologyError> {
        for class in ddl::STRUCTURE_CLASSES {
            self.require_class(class)?;
        }
        self.require_class(ddl::FOREIGN_KEY_CLASS)?;
        for property in ddl::PROPERTIES {
            self.require_property(property)?;
        }
        Ok(())
    }

    fn has_type(&self, subject: NamedNodeRef<'_>, class: NamedNodeRef<'_>) -> bool {
        self.graph
            .graph()
            .contains(TripleRef::new(subject, rdf::TYPE, class))
    }
}

/// A graph of instance data describing one database.
#[derive(Debug, Clone)]
pub struct DataGraph {
    graph: KnowledgeGraph,
}

impl DataGraph {
    pub fn new(graph: KnowledgeGraph) -> Self {
        Self { graph }
    }

    pub fn from_path(path: impl AsRef<Path>, base_uri: &str) -> Result<Self, DataGraphError> {
        Ok(Self::new(KnowledgeGraph::from_path(path, base_uri)?))
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph.into_graph()
    }

    /// Fail with every violation when the graph does not conform to `shapes`.
    pub fn validate(&self, shapes: &Shapes) -> Result<(), DataGraphError> {
        let violations = shapes.validate(self.graph.graph());
        if violations.is_empty() {
            tracing::debug!(triples = self.graph.len(), "Data graph conforms");
            Ok(())
        } else {
            for violation in &violations {
                tracing::warn!(%violation, "Shape violation");
            }
            Err(DataGraphError::Validation(violations))
        }
    }

    /// Rebuild the database tree this graph describes.
    pub fn construct(&self) -> Result<Database, DataGraphError> {
        construct(self.graph.graph())
    }
}
