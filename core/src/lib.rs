//! Core schema types for database structure dumps.
//!
//! This crate defines the in-memory model built from a schema dump:
//!
//! - [`Database`]: a logical database and the tables it owns.
//! - [`Table`]: a table with its [`Field`]s, [`Index`]es and [`Trigger`]s.
//! - [`Sequence`]: a database sequence, kept beside the tree.
//! - [`SchemaSnapshot`]: the complete result of one dump.
//!
//! Field types are translated to [`PrimitiveType`], display names go through
//! a [`CaseFold`], and [`validate_snapshot`] reports duplicate or dangling
//! names that the parser deliberately lets through.
//!
//! # Example
//!
//! ```
//! use schema_index_core::*;
//!
//! let mut table = Table::new("customer");
//! table.fields.push(Field::new("id", "integer", 1).with_flags(FieldFlags::PRIMARY_KEY));
//!
//! let mut db = Database::new("sports", "sports.db", "11.7");
//! db.tables.push(table);
//!
//! let snapshot = SchemaSnapshot { databases: vec![db], sequences: Vec::new() };
//! let field = snapshot.databases[0].find_table("CUSTOMER").unwrap().find_field("ID").unwrap();
//! assert!(field.is_primary_key());
//! assert_eq!(field.resolved_type, PrimitiveType::Integer);
//! assert!(validate_snapshot(&snapshot).is_empty());
//! ```

mod case;
mod primitive;
mod snapshot;
mod types;
mod validate;

pub use case::{CaseFold, CaseMode};
pub use primitive::PrimitiveType;
pub use snapshot::SchemaSnapshot;
pub use types::*;
pub use validate::{ValidationError, validate_snapshot};
