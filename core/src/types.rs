//! Schema type definitions for database structure modeling.
//!
//! This module defines the data model captured from a schema dump: databases
//! own tables, tables own fields, indexes and triggers. Sequences live in a
//! flat list beside the tree because they are not nested under any table.
//! The types are designed for serialization with [`serde`] so a loaded
//! schema can be printed as JSON or YAML.

use bitflags::bitflags;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::PrimitiveType;

bitflags! {
    /// Per-field attributes decoded from the dump's `0/1` columns.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_index_core::FieldFlags;
    ///
    /// let flags = FieldFlags::MANDATORY | FieldFlags::PRIMARY_KEY;
    /// assert!(flags.contains(FieldFlags::PRIMARY_KEY));
    /// assert!(!(flags - FieldFlags::PRIMARY_KEY).contains(FieldFlags::PRIMARY_KEY));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FieldFlags: u8 {
        /// Field must have a value.
        const MANDATORY = 1 << 0;
        /// Field is an array (has an extent).
        const EXTENT = 1 << 1;
        /// Field is a component of at least one index.
        const INDEXED = 1 << 2;
        /// Field is a component of the primary index.
        const PRIMARY_KEY = 1 << 3;
    }
}

bitflags! {
    /// Index attributes. Primary and unique are independent bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct IndexFlags: u8 {
        const PRIMARY = 1 << 0;
        const UNIQUE = 1 << 1;
    }
}

/// A logical database read from a dump header record.
///
/// # Examples
///
/// ```
/// use schema_index_core::{Database, Table};
///
/// let mut db = Database::new("sports", "/db/sports", "11.7");
/// db.tables.push(Table::new("Customer"));
/// assert_eq!(db.find_table("CUSTOMER").unwrap().name, "Customer");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Logical name, the name used to qualify tables.
    pub name: String,
    /// Physical name (usually the database file path).
    pub physical_name: String,
    /// Version tag of the runtime that produced the dump.
    pub version: String,
    /// Date and time the dump was taken, when the header carries a valid one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dumped_at: Option<NaiveDateTime>,
    pub tables: Vec<Table>,
}

impl Database {
    pub fn new(
        name: impl Into<String>,
        physical_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            physical_name: physical_name.into(),
            version: version.into(),
            dumped_at: None,
            tables: Vec::new(),
        }
    }

    /// Returns the first table whose name matches case-insensitively.
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| names_match(&table.name, name))
    }
}

/// A table and the fields, indexes and triggers it owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub id: String,
    pub crc: String,
    pub dump_name: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub indexes: Vec<Index>,
    pub triggers: Vec<Trigger>,
}

impl Table {
    /// Creates an empty table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the first field whose name matches case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_index_core::{Field, Table};
    ///
    /// let mut table = Table::new("customer");
    /// table.fields.push(Field::new("CustNum", "integer", 1));
    /// assert!(table.find_field("custnum").is_some());
    /// assert!(table.find_field("name").is_none());
    /// ```
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| names_match(&field.name, name))
    }

    /// Returns the index flagged as primary, if any.
    pub fn primary_index(&self) -> Option<&Index> {
        self.indexes
            .iter()
            .find(|index| index.flags.contains(IndexFlags::PRIMARY))
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Type name exactly as written in the dump.
    pub raw_type: String,
    /// Canonical type translated from [`raw_type`](Self::raw_type).
    pub resolved_type: PrimitiveType,
    /// Display format (e.g. `>>>9`, `x(8)`).
    pub format: String,
    /// Position of the field within its table.
    pub order: i32,
    pub flags: FieldFlags,
    pub initial_value: String,
    pub description: String,
}

impl Field {
    /// Creates a field, resolving its canonical type from `raw_type`.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_index_core::{Field, PrimitiveType};
    ///
    /// let field = Field::new("name", "character", 2);
    /// assert_eq!(field.resolved_type, PrimitiveType::Character);
    /// ```
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>, order: i32) -> Self {
        let raw_type = raw_type.into();
        Self {
            name: name.into(),
            resolved_type: PrimitiveType::from_type_name(&raw_type),
            raw_type,
            format: String::new(),
            order,
            flags: FieldFlags::empty(),
            initial_value: String::new(),
            description: String::new(),
        }
    }

    /// Adds flags.
    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.flags.contains(FieldFlags::PRIMARY_KEY)
    }
}

/// A table index. Component fields are kept as names, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub flags: IndexFlags,
    pub fields: Vec<String>,
}

/// A schema trigger bound to a table event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Event name (e.g. `CREATE`, `WRITE`).
    pub event: String,
    /// Procedure run when the event fires.
    pub procedure: String,
}

/// A database sequence.
///
/// `database` names the owning database; it is a reference by name, not an
/// ownership link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub database: String,
}

/// Case-insensitive name comparison shared by every lookup over the model.
///
/// # Examples
///
/// ```
/// use schema_index_core::names_match;
///
/// assert!(names_match("Customer", "CUSTOMER"));
/// assert!(!names_match("Customer", "Customers"));
/// ```
pub fn names_match(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_table_is_case_insensitive() {
        let mut db = Database::new("mydb", "phys", "v1");
        db.tables.push(Table::new("Customer"));
        db.tables.push(Table::new("Order"));

        assert_eq!(db.find_table("customer").unwrap().name, "Customer");
        assert_eq!(db.find_table("ORDER").unwrap().name, "Order");
        assert!(db.find_table("invoice").is_none());
    }

    #[test]
    fn test_find_returns_first_duplicate() {
        let mut table = Table::new("t");
        table.fields.push(Field::new("a", "integer", 1));
        table.fields.push(Field::new("A", "character", 2));

        assert_eq!(table.find_field("a").unwrap().order, 1);
    }

    #[test]
    fn test_names_match_handles_non_ascii() {
        assert!(names_match("Bestellübersicht", "BESTELLÜBERSICHT"));
        assert!(!names_match("abc", "abd"));
    }

    #[test]
    fn test_primary_index() {
        let mut table = Table::new("t");
        table.indexes.push(Index {
            name: "byName".into(),
            flags: IndexFlags::UNIQUE,
            fields: vec!["name".into()],
        });
        table.indexes.push(Index {
            name: "byId".into(),
            flags: IndexFlags::PRIMARY | IndexFlags::UNIQUE,
            fields: vec!["id".into()],
        });

        assert_eq!(table.primary_index().unwrap().name, "byId");
    }

    #[test]
    fn test_field_flags_serialize() {
        let field = Field::new("id", "integer", 1)
            .with_flags(FieldFlags::MANDATORY | FieldFlags::PRIMARY_KEY);
        let json = serde_json::to_string(&field).unwrap();
        let back: Field = serde_json::from_str(&json).unwrap();
        assert_eq!(back.flags, field.flags);
        assert!(back.is_primary_key());
    }
}
