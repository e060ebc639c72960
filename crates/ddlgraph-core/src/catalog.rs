//! Building database trees from catalog metadata.
//!
//! Live introspection against a running database sits behind the
//! [`Introspector`] trait. [`CatalogIntrospector`] is the connection-free
//! implementation: it takes the rows a catalog query would return
//! (`information_schema.columns`, `PRAGMA table_info`, ...) and assembles the
//! tree from them.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::structure::{ColumnData, Database, NodeIndex, ReferentialAction, TableKey};

/// Anything that can produce a database tree.
pub trait Introspector {
    type Error: std::error::Error;

    fn build(&self) -> Result<Database, Self::Error>;
}

/// One column as reported by a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub data_type: String,
    #[serde(default)]
    pub not_null: bool,
    /// 1-based position within the primary key, if part of it.
    #[serde(default)]
    pub pk_position: Option<u32>,
    #[serde(default)]
    pub options: String,
}

/// One foreign key as reported by a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogForeignKey {
    pub schema: String,
    pub from_table: String,
    pub from_column: String,
    pub to_schema: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(default)]
    pub on_delete: ReferentialAction,
    #[serde(default)]
    pub on_update: ReferentialAction,
}

/// Builds a tree from pre-fetched catalog rows.
#[derive(Debug, Clone)]
pub struct CatalogIntrospector {
    database: String,
    base_uri: Option<String>,
    columns: Vec<CatalogColumn>,
    foreign_keys: Vec<CatalogForeignKey>,
}

impl CatalogIntrospector {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            base_uri: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn with_columns(mut self, columns: Vec<CatalogColumn>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_foreign_keys(mut self, foreign_keys: Vec<CatalogForeignKey>) -> Self {
        self.foreign_keys = foreign_keys;
        self
    }
}

impl Introspector for CatalogIntrospector {
    type Error = CatalogError;

    fn build(&self) -> Result<Database, CatalogError> {
        let mut db = Database::new(self.database.clone());
        if let Some(base) = &self.base_uri {
            db.update_base_uri(base.clone());
        }

        let mut primary_keys: Vec<(TableKey, u32, NodeIndex)> = Vec::new();

        for row in &self.columns {
            let schema = match db.find_path(&[&row.schema]) {
                Some(existing) => existing,
                None => {
                    let created = db.create_schema(row.schema.clone());
                    db.add_structure(NodeIndex::ROOT, created);
                    created.into()
                }
            };

            let table = match db.find_child(schema, &row.table).and_then(|t| db.as_table(t)) {
                Some(existing) => existing,
                None => {
                    let created = db.create_table(row.table.clone());
                    db.add_structure(schema, created);
                    created
                }
            };

            let data = ColumnData {
                data_type: row.data_type.clone(),
                is_not_null: row.not_null,
                options: row.options.clone(),
            };
            // A repeated row overwrites the column it names.
            let column = match db.find_child(table, &row.column).and_then(|c| db.as_column(c)) {
                Some(existing) => {
                    *db.column_mut(existing) = data;
                    existing
                }
                None => {
                    let created = db.create_column_with(row.column.clone(), data);
                    db.add_structure(table, created);
                    created
                }
            };

            if let Some(position) = row.pk_position {
                primary_keys.push((table, position, column.into()));
            }
        }

        primary_keys.sort_by_key(|&(_, position, _)| position);
        for (table, _, column) in primary_keys {
            if let Some(column) = db.as_column(column) {
                db.add_primary_key(table, column);
            }
        }

        for fk in &self.foreign_keys {
            let from = resolve_column(&db, &fk.schema, &fk.from_table, &fk.from_column)?;
            let to = resolve_column(&db, &fk.to_schema, &fk.to_table, &fk.to_column)?;
            let Some(table) = db.find_path(&[&fk.schema, &fk.from_table]).and_then(|t| db.as_table(t))
            else {
                return Err(unknown(&fk.from_table, &fk.from_column));
            };
            db.add_foreign_key(
                table,
                from,
                to,
                Some(fk.on_delete),
                Some(fk.on_update),
            )?;
        }

        tracing::debug!(
            database = %self.database,
            nodes = db.len(),
            "Built database tree from catalog"
        );

        Ok(db)
    }
}

fn resolve_column(
    db: &Database,
    schema: &str,
    table: &str,
    column: &str,
) -> Result<crate::structure::ColumnKey, CatalogError> {
    db.find_path(&[schema, table, column])
        .and_then(|c| db.as_column(c))
        .ok_or_else(|| unknown(table, column))
}

fn unknown(table: &str, column: &str) -> CatalogError {
    CatalogError::UnknownColumn {
        table: table.to_string(),
        column: column.to_string(),
    }
}
