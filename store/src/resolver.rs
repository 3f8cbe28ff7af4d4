//! Case-insensitive lookup of databases, tables and fields by name.
//!
//! Names may be qualified with dots: `TABLE`, `DB.TABLE`, `TABLE.FIELD` or
//! `DB.TABLE.FIELD`. An unqualified table name resolves to the first table
//! with that name, in database order and then table order.
//!
//! # Examples
//!
//! ```
//! use schema_index_core::{Database, Field, FieldFlags, SchemaSnapshot, Table};
//! use schema_index_store::SchemaLookup;
//!
//! let mut table = Table::new("customer");
//! table.fields.push(Field::new("id", "integer", 1).with_flags(FieldFlags::PRIMARY_KEY));
//! let mut db = Database::new("mydb", "phys", "v1");
//! db.tables.push(table);
//! let snapshot = SchemaSnapshot { databases: vec![db], sequences: vec![] };
//!
//! let qualified = snapshot.find_field("mydb.customer.id").unwrap();
//! let short = snapshot.find_field("CUSTOMER.ID").unwrap();
//! assert!(std::ptr::eq(qualified, short));
//! assert!(qualified.is_primary_key());
//! ```

use schema_index_core::{Database, Field, SchemaSnapshot, Table};
use thiserror::Error;
use tracing::debug;

/// Most segments a qualified name may have (`DB.TABLE.FIELD`).
pub const MAX_SEGMENTS: usize = 3;

/// A qualified name rejected by [`QualifiedName::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("{name:?} has {segments} segments, at most {MAX_SEGMENTS} are allowed")]
    TooManySegments { name: String, segments: usize },
}

/// A dotted name split into its segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifiedName<'a> {
    Simple(&'a str),
    Pair(&'a str, &'a str),
    Triple(&'a str, &'a str, &'a str),
}

impl<'a> QualifiedName<'a> {
    /// Splits `name` on `.`.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_index_store::{NameError, QualifiedName};
    ///
    /// assert_eq!(QualifiedName::parse("customer"), Ok(QualifiedName::Simple("customer")));
    /// assert_eq!(
    ///     QualifiedName::parse("sports.customer"),
    ///     Ok(QualifiedName::Pair("sports", "customer"))
    /// );
    /// assert!(matches!(
    ///     QualifiedName::parse("a.b.c.d"),
    ///     Err(NameError::TooManySegments { segments: 4, .. })
    /// ));
    /// ```
    pub fn parse(name: &'a str) -> Result<Self, NameError> {
        let mut parts = name.split('.');
        let first = parts.next().unwrap_or_default();
        let (second, third) = (parts.next(), parts.next());
        let rest = parts.count();
        match (second, third) {
            _ if rest > 0 => Err(NameError::TooManySegments {
                name: name.to_string(),
                segments: MAX_SEGMENTS + rest,
            }),
            (None, _) => Ok(Self::Simple(first)),
            (Some(second), None) => Ok(Self::Pair(first, second)),
            (Some(second), Some(third)) => Ok(Self::Triple(first, second, third)),
        }
    }

    /// Number of segments.
    pub fn segments(&self) -> usize {
        match self {
            Self::Simple(_) => 1,
            Self::Pair(..) => 2,
            Self::Triple(..) => 3,
        }
    }
}

/// Returns the first table of `db` whose name matches.
pub fn find_table_in<'a>(name: &str, db: &'a Database) -> Option<&'a Table> {
    db.find_table(name)
}

/// Returns the first field of `table` whose name matches.
pub fn find_field_in<'a>(name: &str, table: &'a Table) -> Option<&'a Field> {
    table.find_field(name)
}

/// Name lookups over a loaded schema.
///
/// Implemented by [`SchemaSnapshot`] and by
/// [`SchemaStore`](crate::SchemaStore), which delegates to its current
/// snapshot.
pub trait SchemaLookup {
    /// The schema being searched.
    fn schema(&self) -> &SchemaSnapshot;

    /// Returns the first database whose name matches.
    fn find_database(&self, name: &str) -> Option<&Database> {
        self.schema()
            .databases
            .iter()
            .find(|db| schema_index_core::names_match(&db.name, name))
    }

    /// Resolves `TABLE` or `DB.TABLE`.
    ///
    /// Names with more than two segments resolve to nothing.
    fn find_table(&self, name: &str) -> Option<&Table> {
        match parse_logged(name)? {
            QualifiedName::Simple(table) => first_table(self.schema(), table).map(|(_, t)| t),
            QualifiedName::Pair(db, table) => find_table_in(table, self.find_database(db)?),
            QualifiedName::Triple(..) => {
                debug!(name, "Table name has too many segments");
                None
            }
        }
    }

    /// Resolves `TABLE.FIELD` or `DB.TABLE.FIELD`.
    ///
    /// An unqualified name resolves to nothing. With four or more segments
    /// the first two are read as `TABLE.FIELD` and the rest is ignored.
    fn find_field(&self, name: &str) -> Option<&Field> {
        self.locate_field(name).map(|(_, _, field)| field)
    }

    /// Like [`find_field`](Self::find_field), also returning the owning
    /// database and table.
    fn locate_field(&self, name: &str) -> Option<(&Database, &Table, &Field)> {
        let (db_name, table_name, field_name) = match QualifiedName::parse(name) {
            Ok(QualifiedName::Simple(_)) => return None,
            Ok(QualifiedName::Pair(table, field)) => (None, table, field),
            Ok(QualifiedName::Triple(db, table, field)) => (Some(db), table, field),
            Err(e) => {
                debug!(error = %e, "Reading the first two segments as TABLE.FIELD");
                let mut parts = name.split('.');
                (None, parts.next()?, parts.next()?)
            }
        };
        let (db, table) = match db_name {
            Some(db_name) => {
                let db = self.find_database(db_name)?;
                (db, find_table_in(table_name, db)?)
            }
            None => first_table(self.schema(), table_name)?,
        };
        Some((db, table, find_field_in(field_name, table)?))
    }
}

impl SchemaLookup for SchemaSnapshot {
    fn schema(&self) -> &SchemaSnapshot {
        self
    }
}

fn parse_logged(name: &str) -> Option<QualifiedName<'_>> {
    match QualifiedName::parse(name) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(error = %e, "Rejected qualified name");
            None
        }
    }
}

fn first_table<'a>(snapshot: &'a SchemaSnapshot, name: &str) -> Option<(&'a Database, &'a Table)> {
    snapshot
        .databases
        .iter()
        .find_map(|db| db.find_table(name).map(|table| (db, table)))
}
