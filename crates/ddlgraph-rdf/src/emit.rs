//! Serialization of a schema tree into RDF triples.
//!
//! Every structure becomes a subject at `base_uri + id`. Foreign keys get a
//! node of their own, addressed by the hash of both column paths.

use ddlgraph_core::{Database, ForeignKey, Identity, NodeKind, StructureRef};
use oxigraph::model::vocab::{rdf, xsd};
use oxigraph::model::{Graph, Literal, NamedNode, NamedNodeRef, TripleRef};

use crate::error::DatabaseToGraphError;
use crate::vocab::{action_iri, class_of, ddl};

/// Serialize a whole database tree.
pub fn to_graph(database: &Database) -> Result<Graph, DatabaseToGraphError> {
    structure_to_graph(database.root())
}

/// Serialize `node` and its whole subtree into one graph.
pub fn structure_to_graph(node: StructureRef<'_>) -> Result<Graph, DatabaseToGraphError> {
    let mut graph = Graph::new();
    emit_structure(&mut graph, node)?;
    for descendant in node.descendants() {
        emit_structure(&mut graph, descendant)?;
    }

    tracing::debug!(
        root = %node.name(),
        kind = node.kind().label(),
        triples = graph.len(),
        "Serialized structure to graph"
    );
    Ok(graph)
}

/// IRI of the node describing a foreign key.
pub fn foreign_key_iri(
    database: &Database,
    key: &ForeignKey,
) -> Result<String, DatabaseToGraphError> {
    let from = database.structure(key.from());
    let to = database.structure(key.to());
    let identity = Identity::compute(format!("{}{}", from.hashed_from(), to.hashed_from()));
    Ok(identity.uri(database.base_uri())?)
}

fn named(iri: String) -> Result<NamedNode, DatabaseToGraphError> {
    NamedNode::new(iri.clone()).map_err(|e| DatabaseToGraphError::InvalidIri {
        iri,
        reason: e.to_string(),
    })
}

fn structure_node(node: StructureRef<'_>) -> Result<NamedNode, DatabaseToGraphError> {
    named(node.uri()?)
}

fn emit_structure(graph: &mut Graph, node: StructureRef<'_>) -> Result<(), DatabaseToGraphError> {
    let database = node.database();
    let subject = structure_node(node)?;
    let name = Literal::new_simple_literal(node.name());

    graph.insert(TripleRef::new(&subject, rdf::TYPE, class_of(node.kind())));
    graph.insert(TripleRef::new(&subject, ddl::HAS_NAME, &name));

    for child in node.children() {
        let child = structure_node(child)?;
        graph.insert(TripleRef::new(&subject, ddl::HAS_STRUCTURE, &child));
    }

    if !node.is_root() {
        let root = structure_node(database.root())?;
        graph.insert(TripleRef::new(&subject, ddl::HAS_DATABASE, &root));
    }

    match node.kind() {
        NodeKind::Table(data) => {
            for &column in data.primary_keys() {
                let column = structure_node(database.structure(column))?;
                graph.insert(TripleRef::new(&subject, ddl::PRIMARY_KEY, &column));
            }
            for key in data.foreign_keys() {
                emit_foreign_key(graph, &subject, database, key)?;
            }
        }
        NodeKind::Column(data) => {
            let data_type = Literal::new_simple_literal(&data.data_type);
            let not_null = Literal::new_typed_literal(data.is_not_null.to_string(), xsd::BOOLEAN);
            graph.insert(TripleRef::new(&subject, ddl::DATA_TYPE, &data_type));
            graph.insert(TripleRef::new(&subject, ddl::IS_NOT_NULL, &not_null));
            if !data.options.is_empty() {
                let options = Literal::new_simple_literal(&data.options);
                graph.insert(TripleRef::new(&subject, ddl::OPTIONS, &options));
            }
        }
        NodeKind::Database | NodeKind::Schema => {}
    }

    Ok(())
}

fn emit_foreign_key(
    graph: &mut Graph,
    table: &NamedNode,
    database: &Database,
    key: &ForeignKey,
) -> Result<(), DatabaseToGraphError> {
    let fk = named(foreign_key_iri(database, key)?)?;
    let from = structure_node(database.structure(key.from()))?;
    let to = structure_node(database.structure(key.to()))?;
    let on_delete: NamedNodeRef<'static> = action_iri(key.on_delete());
    let on_update: NamedNodeRef<'static> = action_iri(key.on_update());

    graph.insert(TripleRef::new(table, ddl::FOREIGN_KEY, &fk));
    graph.insert(TripleRef::new(&fk, rdf::TYPE, ddl::FOREIGN_KEY_CLASS));
    graph.insert(TripleRef::new(&fk, ddl::FROM_COLUMN, &from));
    graph.insert(TripleRef::new(&fk, ddl::TO_COLUMN, &to));
    graph.insert(TripleRef::new(&fk, ddl::ON_DELETE, on_delete));
    graph.insert(TripleRef::new(&fk, ddl::ON_UPDATE, on_update));
    Ok(())
}
