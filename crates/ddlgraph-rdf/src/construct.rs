//! Reconstruction of a schema tree from RDF triples.
//!
//! The graph must hold exactly one `ddl:Database`. Its base URI is whatever
//! precedes the recomputed root id in its IRI; every other structure's IRI
//! is then checked against the identity the rebuilt tree gives it.

use std::collections::HashMap;

use ddlgraph_core::{ColumnData, ColumnKey, Database, NodeIndex, TableKey};
use oxigraph::model::vocab::rdf;
use oxigraph::model::{Graph, NamedNode, NamedNodeRef, TermRef};

use crate::error::DataGraphError;
use crate::vocab::{action_from_iri, ddl};

/// Rebuild the database tree described by `graph`.
pub fn construct(graph: &Graph) -> Result<Database, DataGraphError> {
    let root_iri = find_database(graph)?;
    let mut database = Database::new(name_of(graph, root_iri.as_ref())?);

    let root_id = database.root().id().to_string();
    let base = root_iri
        .as_str()
        .strip_suffix(root_id.as_str())
        .ok_or_else(|| DataGraphError::IdentityMismatch {
            expected: root_id.clone(),
            found: root_iri.as_str().to_string(),
        })?
        .to_string();
    database.update_base_uri(base);

    let mut indices: HashMap<NamedNode, NodeIndex> = HashMap::new();
    indices.insert(root_iri.clone(), NodeIndex::ROOT);

    let mut pending = vec![(NodeIndex::ROOT, root_iri)];
    while let Some((parent, parent_iri)) = pending.pop() {
        let mut children = Vec::new();
        for child_iri in named_objects(graph, parent_iri.as_ref(), ddl::HAS_STRUCTURE)? {
            let name = name_of(graph, child_iri.as_ref())?;
            children.push((name, child_iri));
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, child_iri) in children {
            if indices.contains_key(&child_iri) {
                return Err(DataGraphError::SharedStructure {
                    iri: child_iri.into_string(),
                });
            }

            let child = create_node(&mut database, graph, child_iri.as_ref(), name)?;
            database.add_structure(parent, child);

            let expected = database.structure(child).uri()?;
            if expected != child_iri.as_str() {
                return Err(DataGraphError::IdentityMismatch {
                    expected,
                    found: child_iri.into_string(),
                });
            }

            indices.insert(child_iri.clone(), child);
            pending.push((child, child_iri));
        }
    }

    let mut tables: Vec<(TableKey, NamedNode)> = indices
        .iter()
        .filter_map(|(iri, &index)| database.as_table(index).map(|t| (t, iri.clone())))
        .collect();
    tables.sort_by(|a, b| a.1.as_str().cmp(b.1.as_str()));

    for (table, table_iri) in tables {
        attach_primary_keys(&mut database, graph, &indices, table, table_iri.as_ref())?;
        attach_foreign_keys(&mut database, graph, &indices, table, table_iri.as_ref())?;
    }

    tracing::debug!(
        database = %database.name(),
        structures = database.len(),
        "Constructed database from graph"
    );
    Ok(database)
}

fn find_database(graph: &Graph) -> Result<NamedNode, DataGraphError> {
    let mut databases = Vec::new();
    for subject in graph.subjects_for_predicate_object(rdf::TYPE, ddl::DATABASE) {
        match subject {
            oxigraph::model::SubjectRef::NamedNode(n) => databases.push(n.into_owned()),
            other => {
                return Err(DataGraphError::UnexpectedTerm {
                    subject: other.to_string(),
                    predicate: rdf::TYPE.to_string(),
                })
            }
        }
    }

    match databases.len() {
        0 => Err(DataGraphError::NoDatabase),
        1 => Ok(databases.remove(0)),
        count => Err(DataGraphError::MultipleDatabases { count }),
    }
}

fn name_of(graph: &Graph, iri: NamedNodeRef<'_>) -> Result<String, DataGraphError> {
    match graph.object_for_subject_predicate(iri, ddl::HAS_NAME) {
        Some(TermRef::Literal(literal)) => Ok(literal.value().to_string()),
        _ => Err(DataGraphError::MissingName {
            iri: iri.as_str().to_string(),
        }),
    }
}

fn literal_of(graph: &Graph, iri: NamedNodeRef<'_>, predicate: NamedNodeRef<'_>) -> Option<String> {
    match graph.object_for_subject_predicate(iri, predicate) {
        Some(TermRef::Literal(literal)) => Some(literal.value().to_string()),
        _ => None,
    }
}

fn named_objects(
    graph: &Graph,
    subject: NamedNodeRef<'_>,
    predicate: NamedNodeRef<'_>,
) -> Result<Vec<NamedNode>, DataGraphError> {
    graph
        .objects_for_subject_predicate(subject, predicate)
        .map(|term| match term {
            TermRef::NamedNode(n) => Ok(n.into_owned()),
            _ => Err(DataGraphError::UnexpectedTerm {
                subject: subject.as_str().to_string(),
                predicate: predicate.as_str().to_string(),
            }),
        })
        .collect()
}

fn create_node(
    database: &mut Database,
    graph: &Graph,
    iri: NamedNodeRef<'_>,
    name: String,
) -> Result<NodeIndex, DataGraphError> {
    let types = named_objects(graph, iri, rdf::TYPE)?;
    let has = |class: NamedNodeRef<'_>| types.iter().any(|t| t.as_ref() == class);

    if has(ddl::SCHEMA) {
        Ok(database.create_schema(name).into())
    } else if has(ddl::TABLE) {
        Ok(database.create_table(name).into())
    } else if has(ddl::COLUMN) {
        let data = ColumnData {
            data_type: literal_of(graph, iri, ddl::DATA_TYPE).unwrap_or_default(),
            is_not_null: literal_of(graph, iri, ddl::IS_NOT_NULL)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            options: literal_of(graph, iri, ddl::OPTIONS).unwrap_or_default(),
        };
        Ok(database.create_column_with(name, data).into())
    } else {
        Err(DataGraphError::UnknownKind {
            iri: iri.as_str().to_string(),
        })
    }
}

fn resolve_column(
    database: &Database,
    indices: &HashMap<NamedNode, NodeIndex>,
    subject: NamedNodeRef<'_>,
    column: &NamedNode,
) -> Result<ColumnKey, DataGraphError> {
    indices
        .get(column)
        .and_then(|&index| database.as_column(index))
        .ok_or_else(|| DataGraphError::DanglingReference {
            subject: subject.as_str().to_string(),
            object: column.as_str().to_string(),
        })
}

fn attach_primary_keys(
    database: &mut Database,
    graph: &Graph,
    indices: &HashMap<NamedNode, NodeIndex>,
    table: TableKey,
    table_iri: NamedNodeRef<'_>,
) -> Result<(), DataGraphError> {
    let mut columns = Vec::new();
    for column_iri in named_objects(graph, table_iri, ddl::PRIMARY_KEY)? {
        columns.push(resolve_column(database, indices, table_iri, &column_iri)?);
    }

    // Key order follows column order within the table.
    let order: Vec<NodeIndex> = database.structure(table).children().map(|c| c.index()).collect();
    columns.sort_by_key(|c| order.iter().position(|&i| i == NodeIndex::from(*c)));

    for column in columns {
        database.add_primary_key(table, column);
    }
    Ok(())
}

fn attach_foreign_keys(
    database: &mut Database,
    graph: &Graph,
    indices: &HashMap<NamedNode, NodeIndex>,
    table: TableKey,
    table_iri: NamedNodeRef<'_>,
) -> Result<(), DataGraphError> {
    let mut keys = named_objects(graph, table_iri, ddl::FOREIGN_KEY)?;
    keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    for key in keys {
        let from = single_named(graph, key.as_ref(), ddl::FROM_COLUMN)?;
        let to = single_named(graph, key.as_ref(), ddl::TO_COLUMN)?;
        let from = resolve_column(database, indices, key.as_ref(), &from)?;
        let to = resolve_column(database, indices, key.as_ref(), &to)?;

        let action = |predicate: NamedNodeRef<'static>| -> Result<_, DataGraphError> {
            Ok(named_objects(graph, key.as_ref(), predicate)?
                .first()
                .map(|iri| action_from_iri(iri.as_ref())))
        };
        let on_delete = action(ddl::ON_DELETE)?;
        let on_update = action(ddl::ON_UPDATE)?;

        database.add_foreign_key(table, from, to, on_delete, on_update)?;
    }
    Ok(())
}

fn single_named(
    graph: &Graph,
    subject: NamedNodeRef<'_>,
    predicate: NamedNodeRef<'_>,
) -> Result<NamedNode, DataGraphError> {
    named_objects(graph, subject, predicate)?
        .into_iter()
        .next()
        .ok_or_else(|| DataGraphError::DanglingReference {
            subject: subject.as_str().to_string(),
            object: predicate.as_str().to_string(),
        })
}
