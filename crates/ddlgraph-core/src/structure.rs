//! The schema tree: database → schema → table → column.
//!
//! Nodes live in an arena owned by their [`Database`] and refer to each other
//! by [`NodeIndex`]. Being in the arena is what attaches a node to the
//! database for addressing (base URI); being in a parent's `children` list is
//! containment. A freshly created node is attached but not contained, and its
//! identity is computed from its name alone.
//!
//! Identities are kept current eagerly: every edit that changes a node's
//! ancestor path recomputes the node and its whole subtree before returning.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EntityError, ForeignKeyError};
use crate::identity::{EntityId, Hashable, Identity};

// ── Indices ──────────────────────────────────────────────────────

/// Position of a node in its database arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// The database root is always the first arena slot.
    pub const ROOT: NodeIndex = NodeIndex(0);

    pub fn position(self) -> usize {
        self.0
    }
}

macro_rules! typed_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NodeIndex);

        impl $name {
            pub fn index(self) -> NodeIndex {
                self.0
            }
        }

        impl From<$name> for NodeIndex {
            fn from(key: $name) -> NodeIndex {
                key.0
            }
        }
    };
}

typed_key!(
    /// Handle to a schema node.
    SchemaKey
);
typed_key!(
    /// Handle to a table node.
    TableKey
);
typed_key!(
    /// Handle to a column node.
    ColumnKey
);

// ── Node payloads ────────────────────────────────────────────────

/// Referential action for foreign key deletes and updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Cascade,
}

/// A foreign key from one column to a column of another table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    from: ColumnKey,
    to: ColumnKey,
    on_delete: ReferentialAction,
    on_update: ReferentialAction,
}

impl ForeignKey {
    /// Validate and build a foreign key.
    ///
    /// Both columns must be contained in a table, and not the same one.
    pub fn new(
        database: &Database,
        from: ColumnKey,
        to: ColumnKey,
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    ) -> Result<Self, ForeignKeyError> {
        let from_node = database.node(from.into());
        let to_node = database.node(to.into());

        let from_parent = from_node.parent.ok_or_else(|| ForeignKeyError::MissingParent {
            column: from_node.name.clone(),
        })?;
        let to_parent = to_node.parent.ok_or_else(|| ForeignKeyError::MissingParent {
            column: to_node.name.clone(),
        })?;

        if from_parent == to_parent {
            return Err(ForeignKeyError::SameParent {
                from: from_node.name.clone(),
                to: to_node.name.clone(),
            });
        }

        Ok(Self {
            from,
            to,
            on_delete: on_delete.unwrap_or_default(),
            on_update: on_update.unwrap_or_default(),
        })
    }

    pub fn from(&self) -> ColumnKey {
        self.from
    }

    pub fn to(&self) -> ColumnKey {
        self.to
    }

    pub fn on_delete(&self) -> ReferentialAction {
        self.on_delete
    }

    pub fn on_update(&self) -> ReferentialAction {
        self.on_update
    }
}

/// Key metadata carried by a table.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    primary_keys: Vec<ColumnKey>,
    foreign_keys: Vec<ForeignKey>,
}

impl TableData {
    pub fn primary_keys(&self) -> &[ColumnKey] {
        &self.primary_keys
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }
}

/// Column attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnData {
    pub data_type: String,
    pub is_not_null: bool,
    pub options: String,
}

/// What kind of structure a node is, with its kind-specific payload.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Database,
    Schema,
    Table(TableData),
    Column(ColumnData),
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Database => "Database",
            NodeKind::Schema => "Schema",
            NodeKind::Table(_) => "Table",
            NodeKind::Column(_) => "Column",
        }
    }
}

/// One arena slot.
#[derive(Debug, Clone)]
struct Structure {
    name: String,
    identity: Identity,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    kind: NodeKind,
}

impl Structure {
    fn bare(name: String, kind: NodeKind) -> Self {
        Self {
            identity: Identity::compute(name.clone()),
            name,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }
}

// ── Database ─────────────────────────────────────────────────────

/// Root of a schema tree and owner of every node in it.
#[derive(Debug, Clone)]
pub struct Database {
    base_uri: Option<String>,
    nodes: Vec<Structure>,
}

impl Database {
    /// Create a database root named after its kind, e.g. `"Sqlite"`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base_uri: None,
            nodes: vec![Structure::bare(name.into(), NodeKind::Database)],
        }
    }

    pub fn name(&self) -> &str {
        &self.nodes[0].name
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    /// Set the base URI shared by every node of this tree.
    pub fn update_base_uri(&mut self, uri: impl Into<String>) {
        self.base_uri = Some(uri.into());
    }

    pub fn root(&self) -> StructureRef<'_> {
        self.structure(NodeIndex::ROOT)
    }

    /// View of a node. Panics if `index` does not belong to this database.
    pub fn structure(&self, index: impl Into<NodeIndex>) -> StructureRef<'_> {
        let index = index.into();
        assert!(index.0 < self.nodes.len(), "node {index:?} is not in this database");
        StructureRef { database: self, index }
    }

    /// Number of nodes in the arena, attached or contained.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, index: NodeIndex) -> &Structure {
        &self.nodes[index.0]
    }

    fn push(&mut self, name: String, kind: NodeKind) -> NodeIndex {
        self.nodes.push(Structure::bare(name, kind));
        NodeIndex(self.nodes.len() - 1)
    }

    // ── Construction ─────────────────────────────────────────────

    pub fn create_schema(&mut self, name: impl Into<String>) -> SchemaKey {
        SchemaKey(self.push(name.into(), NodeKind::Schema))
    }

    pub fn create_table(&mut self, name: impl Into<String>) -> TableKey {
        TableKey(self.push(name.into(), NodeKind::Table(TableData::default())))
    }

    pub fn create_column(&mut self, name: impl Into<String>) -> ColumnKey {
        self.create_column_with(name, ColumnData::default())
    }

    pub fn create_column_with(&mut self, name: impl Into<String>, data: ColumnData) -> ColumnKey {
        ColumnKey(self.push(name.into(), NodeKind::Column(data)))
    }

    // ── Structural edits ─────────────────────────────────────────

    /// Make `child` a sub-structure of `parent`.
    ///
    /// Does nothing and returns `false` when `parent` already holds a child
    /// with the identity `child` would get, or when the edit would put a node
    /// below itself or re-parent the root. A child contained elsewhere is
    /// moved. Returns `true` when the tree changed.
    pub fn add_structure(
        &mut self,
        parent: impl Into<NodeIndex>,
        child: impl Into<NodeIndex>,
    ) -> bool {
        let parent = parent.into();
        let child = child.into();

        if child == NodeIndex::ROOT || self.is_ancestor_or_self(child, parent) {
            return false;
        }

        let prospective = self.node(parent).identity.child(&self.node(child).name);
        let already_present = self
            .node(parent)
            .children
            .iter()
            .any(|&c| self.node(c).identity == prospective);
        if already_present {
            return false;
        }

        self.unlink(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        self.recompute_subtree(child);
        true
    }

    /// Remove `node` from its parent while keeping it (and its subtree)
    /// attached to this database. Its identity becomes root-level.
    pub fn detach(&mut self, node: impl Into<NodeIndex>) {
        let node = node.into();
        if self.unlink(node) {
            self.recompute_subtree(node);
        }
    }

    /// Rename a node, recomputing its identity and every descendant's.
    pub fn update_name(&mut self, node: impl Into<NodeIndex>, name: impl Into<String>) {
        let node = node.into();
        let name = name.into();
        tracing::trace!(from = %self.node(node).name, to = %name, "Renaming structure");
        self.nodes[node.0].name = name;
        self.recompute_subtree(node);
    }

    pub fn add_primary_key(&mut self, table: TableKey, column: ColumnKey) {
        let data = self.table_data_mut(table);
        if !data.primary_keys.contains(&column) {
            data.primary_keys.push(column);
        }
    }

    /// Add a foreign key to `table`. Fails without touching the table when
    /// the columns are not contained in two distinct tables.
    pub fn add_foreign_key(
        &mut self,
        table: TableKey,
        from: ColumnKey,
        to: ColumnKey,
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    ) -> Result<(), ForeignKeyError> {
        let key = ForeignKey::new(self, from, to, on_delete, on_update)?;
        self.table_data_mut(table).foreign_keys.push(key);
        Ok(())
    }

    pub fn table(&self, table: TableKey) -> &TableData {
        match &self.node(table.into()).kind {
            NodeKind::Table(data) => data,
            _ => unreachable!("TableKey always refers to a table"),
        }
    }

    pub fn column(&self, column: ColumnKey) -> &ColumnData {
        match &self.node(column.into()).kind {
            NodeKind::Column(data) => data,
            _ => unreachable!("ColumnKey always refers to a column"),
        }
    }

    pub fn column_mut(&mut self, column: ColumnKey) -> &mut ColumnData {
        match &mut self.nodes[column.0 .0].kind {
            NodeKind::Column(data) => data,
            _ => unreachable!("ColumnKey always refers to a column"),
        }
    }

    fn table_data_mut(&mut self, table: TableKey) -> &mut TableData {
        match &mut self.nodes[table.0 .0].kind {
            NodeKind::Table(data) => data,
            _ => unreachable!("TableKey always refers to a table"),
        }
    }

    /// Typed handles for nodes whose kind is only known at runtime.
    pub fn as_schema(&self, index: NodeIndex) -> Option<SchemaKey> {
        matches!(self.node(index).kind, NodeKind::Schema).then_some(SchemaKey(index))
    }

    pub fn as_table(&self, index: NodeIndex) -> Option<TableKey> {
        matches!(self.node(index).kind, NodeKind::Table(_)).then_some(TableKey(index))
    }

    pub fn as_column(&self, index: NodeIndex) -> Option<ColumnKey> {
        matches!(self.node(index).kind, NodeKind::Column(_)).then_some(ColumnKey(index))
    }

    // ── Lookup ───────────────────────────────────────────────────

    /// Child of `parent` with the given name.
    pub fn find_child(&self, parent: impl Into<NodeIndex>, name: &str) -> Option<NodeIndex> {
        self.node(parent.into())
            .children
            .iter()
            .copied()
            .find(|&c| self.node(c).name == name)
    }

    /// Resolve a name path below the root, e.g. `["main", "Users", "id"]`.
    pub fn find_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeIndex> {
        path.iter()
            .try_fold(NodeIndex::ROOT, |at, name| self.find_child(at, name.as_ref()))
    }

    /// First column named `column` in a table named `table`, in document order.
    pub fn find_column(&self, table: &str, column: &str) -> Option<ColumnKey> {
        self.descendants(NodeIndex::ROOT)
            .into_iter()
            .filter(|&i| self.node(i).name == table && self.as_table(i).is_some())
            .find_map(|t| self.find_child(t, column))
            .and_then(|c| self.as_column(c))
    }

    /// Every node below `node`, depth-first, parents before children, in
    /// insertion order.
    pub fn descendants(&self, node: impl Into<NodeIndex>) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeIndex> = self.node(node.into()).children.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            out.push(idx);
            stack.extend(self.node(idx).children.iter().rev().copied());
        }
        out
    }

    // ── Internals ────────────────────────────────────────────────

    fn is_ancestor_or_self(&self, candidate: NodeIndex, mut node: NodeIndex) -> bool {
        loop {
            if node == candidate {
                return true;
            }
            match self.node(node).parent {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    /// Drop `node` from its parent's child list. Returns whether it had one.
    fn unlink(&mut self, node: NodeIndex) -> bool {
        match self.nodes[node.0].parent.take() {
            Some(parent) => {
                self.nodes[parent.0].children.retain(|&c| c != node);
                true
            }
            None => false,
        }
    }

    fn recompute_subtree(&mut self, start: NodeIndex) {
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            let identity = self.structure(idx).compute_id();
            let node = &mut self.nodes[idx.0];
            node.identity = identity;
            stack.extend(node.children.iter().rev().copied());
        }
    }
}

// ── Views ────────────────────────────────────────────────────────

/// Borrowed view of one node together with its database.
///
/// Two views are equal when their identities are, regardless of which tree
/// they come from.
#[derive(Clone, Copy)]
pub struct StructureRef<'a> {
    database: &'a Database,
    index: NodeIndex,
}

impl<'a> StructureRef<'a> {
    fn node(&self) -> &'a Structure {
        self.database.node(self.index)
    }

    pub fn database(&self) -> &'a Database {
        self.database
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    pub fn identity(&self) -> &'a Identity {
        &self.node().identity
    }

    pub fn id(&self) -> &'a EntityId {
        self.node().identity.id()
    }

    pub fn hashed_from(&self) -> &'a str {
        self.node().identity.hashed_from()
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.node().kind
    }

    pub fn is_root(&self) -> bool {
        matches!(self.node().kind, NodeKind::Database)
    }

    /// `base_uri + id` of the owning database.
    pub fn uri(&self) -> Result<String, EntityError> {
        self.identity().uri(self.database.base_uri())
    }

    pub fn parent(&self) -> Option<StructureRef<'a>> {
        self.node().parent.map(|p| self.database.structure(p))
    }

    pub fn children(&self) -> impl Iterator<Item = StructureRef<'a>> + 'a {
        let database = self.database;
        self.node().children.iter().map(move |&c| database.structure(c))
    }

    pub fn descendants(&self) -> Vec<StructureRef<'a>> {
        self.database
            .descendants(self.index)
            .into_iter()
            .map(|i| self.database.structure(i))
            .collect()
    }
}

impl Hashable for StructureRef<'_> {
    fn compute_hash(&self) -> String {
        match self.parent() {
            Some(parent) => format!("{}{}", parent.hashed_from(), self.name()),
            None => self.name().to_string(),
        }
    }
}

impl PartialEq for StructureRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for StructureRef<'_> {}

impl fmt::Debug for StructureRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureRef")
            .field("kind", &self.kind().label())
            .field("name", &self.name())
            .field("id", self.id())
            .finish()
    }
}
