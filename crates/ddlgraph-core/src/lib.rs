//! ddlgraph-core: content-addressed schema hierarchy for ddlgraph.
//!
//! This crate provides the foundation shared by every ddlgraph component:
//! - SHA-256 identities derived from a node's ancestor-name path
//! - The database → schema → table → column tree with primary/foreign keys
//! - Catalog-driven tree building
//! - Configuration management
//! - Common error types

pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod structure;

pub use error::{CatalogError, ConfigError, EntityError, ForeignKeyError};
pub use identity::{EntityId, Hashable, Identity};
pub use structure::{
    ColumnData, ColumnKey, Database, ForeignKey, NodeIndex, NodeKind, ReferentialAction,
    SchemaKey, StructureRef, TableData, TableKey,
};
