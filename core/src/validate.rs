//! Snapshot validation.
//!
//! The dump parser accepts whatever the dump says, in order. Validation walks
//! a loaded [`SchemaSnapshot`] afterwards and reports the structural problems
//! that make name resolution ambiguous or incomplete: empty names, names
//! repeated within one scope, index components that name no field, and
//! sequences pointing at a database that was never declared.
//!
//! # Examples
//!
//! ```
//! use schema_index_core::*;
//!
//! let mut db = Database::new("sports", "sports.db", "11.7");
//! db.tables.push(Table::new("customer"));
//! db.tables.push(Table::new("Customer"));
//!
//! let snapshot = SchemaSnapshot { databases: vec![db], sequences: Vec::new() };
//! let errors = validate_snapshot(&snapshot);
//! assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateTable { .. })));
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{Database, SchemaSnapshot, Table};

/// Snapshot validation findings.
///
/// Names are reported as they appear in the dump.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A database header carried an empty logical name.
    #[error("database name cannot be empty")]
    EmptyDatabaseName,
    /// A table record carried an empty name.
    #[error("table name cannot be empty in database {database}")]
    EmptyTableName { database: String },
    /// A field record carried an empty name.
    #[error("field name cannot be empty in table {database}.{table}")]
    EmptyFieldName { database: String, table: String },
    /// Two databases share a logical name.
    #[error("duplicate database: {0}")]
    DuplicateDatabase(String),
    /// Two tables of one database share a name.
    #[error("duplicate table in database {database}: {table}")]
    DuplicateTable { database: String, table: String },
    /// Two fields of one table share a name.
    #[error("duplicate field in table {database}.{table}: {field}")]
    DuplicateField {
        database: String,
        table: String,
        field: String,
    },
    /// An index lists a component that is not a field of its table.
    #[error("index {index} of {database}.{table} references unknown field {field}")]
    UnknownIndexField {
        database: String,
        table: String,
        index: String,
        field: String,
    },
    /// A sequence names a database that is not in the snapshot.
    #[error("sequence {sequence} references unknown database {database}")]
    UnknownSequenceDatabase { sequence: String, database: String },
}

/// Validates a full snapshot and returns every finding.
///
/// Unlike a parse failure, findings never invalidate the snapshot; they are
/// meant for reporting.
pub fn validate_snapshot(snapshot: &SchemaSnapshot) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen_databases: HashSet<String> = HashSet::new();

    for db in &snapshot.databases {
        if db.name.trim().is_empty() {
            errors.push(ValidationError::EmptyDatabaseName);
        } else if !seen_databases.insert(db.name.to_lowercase()) {
            errors.push(ValidationError::DuplicateDatabase(db.name.clone()));
        }
        errors.extend(validate_database(db));
    }

    for sequence in &snapshot.sequences {
        if !seen_databases.contains(&sequence.database.to_lowercase()) {
            errors.push(ValidationError::UnknownSequenceDatabase {
                sequence: sequence.name.clone(),
                database: sequence.database.clone(),
            });
        }
    }

    errors
}

fn validate_database(db: &Database) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for table in &db.tables {
        if table.name.trim().is_empty() {
            errors.push(ValidationError::EmptyTableName {
                database: db.name.clone(),
            });
            continue;
        }
        if !seen.insert(table.name.to_lowercase()) {
            errors.push(ValidationError::DuplicateTable {
                database: db.name.clone(),
                table: table.name.clone(),
            });
        }
        errors.extend(validate_table(&db.name, table));
    }

    errors
}

fn validate_table(database: &str, table: &Table) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for field in &table.fields {
        if field.name.trim().is_empty() {
            errors.push(ValidationError::EmptyFieldName {
                database: database.to_string(),
                table: table.name.clone(),
            });
            continue;
        }
        if !seen.insert(field.name.to_lowercase()) {
            errors.push(ValidationError::DuplicateField {
                database: database.to_string(),
                table: table.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    for index in &table.indexes {
        for component in index.fields.iter().filter(|c| !c.is_empty()) {
            if table.find_field(component).is_none() {
                errors.push(ValidationError::UnknownIndexField {
                    database: database.to_string(),
                    table: table.name.clone(),
                    index: index.name.clone(),
                    field: component.clone(),
                });
            }
        }
    }

    errors
}
