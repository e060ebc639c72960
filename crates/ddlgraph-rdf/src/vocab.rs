//! IRIs of the ddl ontology and the external vocabularies it leans on.

use ddlgraph_core::{NodeKind, ReferentialAction};
use oxigraph::model::NamedNodeRef;

/// Namespace of the ddl ontology.
pub const DDL_NS: &str = "https://ddlgraph.dev/ontology#";

pub mod ddl {
    use oxigraph::model::NamedNodeRef;

    pub const DATABASE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#Database");
    pub const SCHEMA: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#Schema");
    pub const TABLE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#Table");
    pub const COLUMN: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#Column");
    pub const FOREIGN_KEY_CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#ForeignKey");

    pub const NO_ACTION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#NoAction");
    pub const CASCADE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#Cascade");

    pub const HAS_NAME: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#hasName");
    pub const HAS_STRUCTURE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#hasStructure");
    pub const HAS_DATABASE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#hasDatabase");
    pub const PRIMARY_KEY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#primaryKey");
    pub const FOREIGN_KEY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#foreignKey");
    pub const FROM_COLUMN: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#fromColumn");
    pub const TO_COLUMN: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#toColumn");
    pub const ON_DELETE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#onDelete");
    pub const ON_UPDATE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#onUpdate");
    pub const DATA_TYPE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#dataType");
    pub const IS_NOT_NULL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#isNotNull");
    pub const OPTIONS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://ddlgraph.dev/ontology#options");

    /// Classes a structure node can have.
    pub const STRUCTURE_CLASSES: [NamedNodeRef<'static>; 4] = [DATABASE, SCHEMA, TABLE, COLUMN];

    /// Predicates the codec emits.
    pub const PROPERTIES: [NamedNodeRef<'static>; 12] = [
        HAS_NAME,
        HAS_STRUCTURE,
        HAS_DATABASE,
        PRIMARY_KEY,
        FOREIGN_KEY,
        FROM_COLUMN,
        TO_COLUMN,
        ON_DELETE,
        ON_UPDATE,
        DATA_TYPE,
        IS_NOT_NULL,
        OPTIONS,
    ];
}

pub mod sh {
    use oxigraph::model::NamedNodeRef;

    pub const NODE_SHAPE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#NodeShape");
    pub const TARGET_CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#targetClass");
    pub const PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#property");
    pub const PATH: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#path");
    pub const MIN_COUNT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#minCount");
    pub const MAX_COUNT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#maxCount");
    pub const DATATYPE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#datatype");
    pub const CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#class");
    pub const MESSAGE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#message");
}

pub mod owl {
    use oxigraph::model::NamedNodeRef;

    pub const CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Class");
    pub const OBJECT_PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#ObjectProperty");
    pub const DATATYPE_PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#DatatypeProperty");
}

/// RDF class of a structure kind.
pub fn class_of(kind: &NodeKind) -> NamedNodeRef<'static> {
    match kind {
        NodeKind::Database => ddl::DATABASE,
        NodeKind::Schema => ddl::SCHEMA,
        NodeKind::Table(_) => ddl::TABLE,
        NodeKind::Column(_) => ddl::COLUMN,
    }
}

pub fn action_iri(action: ReferentialAction) -> NamedNodeRef<'static> {
    match action {
        ReferentialAction::NoAction => ddl::NO_ACTION,
        ReferentialAction::Cascade => ddl::CASCADE,
    }
}

pub fn action_from_iri(iri: NamedNodeRef<'_>) -> ReferentialAction {
    if iri == ddl::CASCADE {
        ReferentialAction::Cascade
    } else {
        ReferentialAction::NoAction
    }
}
