//! A small SHACL core: node shapes with property constraints.
//!
//! Supported: `sh:targetClass`, and on `sh:property` nodes `sh:path` (a
//! single predicate), `sh:minCount`, `sh:maxCount`, `sh:datatype`,
//! `sh:class` and `sh:message`. Anything else in the shapes graph is ignored.

use std::fmt;

use oxigraph::model::vocab::rdf;
use oxigraph::model::{Graph, NamedNode, NamedNodeRef, SubjectRef, TermRef, TripleRef};
use serde::Serialize;

use crate::error::OntologyError;
use crate::knowledge::KnowledgeGraph;
use crate::vocab::{sh, DDL_NS};

const DDL_SHAPES: &str = include_str!("../resources/ddl-shapes.ttl");

/// One failed constraint on one focus node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub focus: String,
    pub path: String,
    pub message: String,
    pub value: Option<String>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.focus, self.path, self.message)?;
        if let Some(value) = &self.value {
            write!(f, " (value {value})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct PropertyShape {
    path: NamedNode,
    min_count: Option<usize>,
    max_count: Option<usize>,
    datatype: Option<NamedNode>,
    class: Option<NamedNode>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
struct NodeShape {
    target_class: Option<NamedNode>,
    properties: Vec<PropertyShape>,
}

/// A set of parsed node shapes.
#[derive(Debug, Clone, Default)]
pub struct Shapes {
    shapes: Vec<NodeShape>,
}

impl Shapes {
    /// The bundled shapes for ddl data graphs.
    pub fn ddl() -> Result<Self, OntologyError> {
        let graph = KnowledgeGraph::from_reader(
            DDL_SHAPES.as_bytes(),
            oxigraph::io::RdfFormat::Turtle,
            DDL_NS,
        )?;
        Self::from_graph(graph.graph())
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, OntologyError> {
        let graph = KnowledgeGraph::from_path(path, DDL_NS)?;
        Self::from_graph(graph.graph())
    }

    pub fn from_graph(graph: &Graph) -> Result<Self, OntologyError> {
        let mut shapes = Vec::new();
        for shape in graph.subjects_for_predicate_object(rdf::TYPE, sh::NODE_SHAPE) {
            let target_class = named_object(graph, shape, sh::TARGET_CLASS);
            let mut properties = Vec::new();
            for property in graph.objects_for_subject_predicate(shape, sh::PROPERTY) {
                let property = as_subject(property).ok_or_else(|| OntologyError::InvalidShape {
                    shape: display_subject(shape),
                    reason: "sh:property is a literal".into(),
                })?;
                properties.push(parse_property(graph, shape, property)?);
            }
            shapes.push(NodeShape {
                target_class,
                properties,
            });
        }

        tracing::debug!(shapes = shapes.len(), "Loaded SHACL shapes");
        Ok(Self { shapes })
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Check `data` against every shape. An empty result means it conforms.
    pub fn validate(&self, data: &Graph) -> Vec<Violation> {
        let mut violations = Vec::new();
        for shape in &self.shapes {
            let Some(target) = &shape.target_class else {
                continue;
            };
            for focus in data.subjects_for_predicate_object(rdf::TYPE, target) {
                for property in &shape.properties {
                    check_property(data, focus, property, &mut violations);
                }
            }
        }
        violations
    }
}

fn parse_property(
    graph: &Graph,
    shape: SubjectRef<'_>,
    property: SubjectRef<'_>,
) -> Result<PropertyShape, OntologyError> {
    let invalid = |reason: &str| OntologyError::InvalidShape {
        shape: display_subject(shape),
        reason: reason.to_string(),
    };

    let path = named_object(graph, property, sh::PATH)
        .ok_or_else(|| invalid("property without a predicate sh:path"))?;
    let count = |predicate: NamedNodeRef<'static>| -> Result<Option<usize>, OntologyError> {
        match literal_object(graph, property, predicate) {
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| invalid(&format!("{predicate} is not a count: {v}"))),
            None => Ok(None),
        }
    };

    Ok(PropertyShape {
        min_count: count(sh::MIN_COUNT)?,
        max_count: count(sh::MAX_COUNT)?,
        datatype: named_object(graph, property, sh::DATATYPE),
        class: named_object(graph, property, sh::CLASS),
        message: literal_object(graph, property, sh::MESSAGE),
        path,
    })
}

fn check_property(
    data: &Graph,
    focus: SubjectRef<'_>,
    property: &PropertyShape,
    violations: &mut Vec<Violation>,
) {
    let violation = |default: String, value: Option<String>| Violation {
        focus: display_subject(focus),
        path: property.path.as_str().to_string(),
        message: property.message.clone().unwrap_or(default),
        value,
    };

    let values: Vec<TermRef<'_>> = data
        .objects_for_subject_predicate(focus, &property.path)
        .collect();

    if let Some(min) = property.min_count {
        if values.len() < min {
            violations.push(violation(
                format!("expected at least {min} value(s), found {}", values.len()),
                None,
            ));
        }
    }
    if let Some(max) = property.max_count {
        if values.len() > max {
            violations.push(violation(
                format!("expected at most {max} value(s), found {}", values.len()),
                None,
            ));
        }
    }

    for value in values {
        if let Some(datatype) = &property.datatype {
            let matches = matches!(value, TermRef::Literal(l) if l.datatype() == datatype.as_ref());
            if !matches {
                violations.push(violation(
                    format!("value is not a literal of type {}", datatype.as_str()),
                    Some(value.to_string()),
                ));
            }
        }
        if let Some(class) = &property.class {
            let typed = as_subject(value)
                .is_some_and(|s| data.contains(TripleRef::new(s, rdf::TYPE, class)));
            if !typed {
                violations.push(violation(
                    format!("value is not an instance of {}", class.as_str()),
                    Some(value.to_string()),
                ));
            }
        }
    }
}

fn as_subject(term: TermRef<'_>) -> Option<SubjectRef<'_>> {
    match term {
        TermRef::NamedNode(n) => Some(SubjectRef::NamedNode(n)),
        TermRef::BlankNode(b) => Some(SubjectRef::BlankNode(b)),
        _ => None,
    }
}

fn named_object(
    graph: &Graph,
    subject: SubjectRef<'_>,
    predicate: NamedNodeRef<'_>,
) -> Option<NamedNode> {
    match graph.object_for_subject_predicate(subject, predicate) {
        Some(TermRef::NamedNode(n)) => Some(n.into_owned()),
        _ => None,
    }
}

fn literal_object(
    graph: &Graph,
    subject: SubjectRef<'_>,
    predicate: NamedNodeRef<'_>,
) -> Option<String> {
    match graph.object_for_subject_predicate(subject, predicate) {
        Some(TermRef::Literal(l)) => Some(l.value().to_string()),
        _ => None,
    }
}

fn display_subject(subject: SubjectRef<'_>) -> String {
    match subject {
        SubjectRef::NamedNode(n) => n.as_str().to_string(),
        other => other.to_string(),
    }
}
