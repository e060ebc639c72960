use thiserror::Error;

/// Raised when an entity is asked for an address it cannot have.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    #[error("Entity {id} has no base URI; set one on the owning database first")]
    MissingBaseUri { id: String },
}

/// Raised when a foreign key would connect columns that are not both
/// contained in distinct tables.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForeignKeyError {
    #[error("Foreign key column {column} has no parent structure")]
    MissingParent { column: String },

    #[error("Foreign key columns {from} and {to} share the same parent structure")]
    SameParent { from: String, to: String },
}

/// Errors from building a database tree out of catalog rows.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog references unknown column {table}.{column}")]
    UnknownColumn { table: String, column: String },

    #[error("Foreign key error: {0}")]
    ForeignKey(#[from] ForeignKeyError),
}

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),
}
