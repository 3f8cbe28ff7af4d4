use serde::{Deserialize, Serialize};

use crate::{Database, Sequence};

/// The complete schema read from one dump: the database tree plus the flat
/// sequence list.
///
/// A snapshot is produced by the dump parser and swapped wholesale into the
/// store on every refresh; it is never patched in place.
///
/// # Examples
///
/// ```
/// use schema_index_core::*;
///
/// let mut snapshot = SchemaSnapshot::default();
/// let mut db = Database::new("sports", "sports.db", "11.7");
/// db.tables.push(Table::new("customer"));
/// snapshot.databases.push(db);
/// snapshot.sequences.push(Sequence { name: "next-cust".into(), database: "sports".into() });
///
/// assert_eq!(snapshot.table_count(), 1);
/// assert!(!snapshot.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub databases: Vec<Database>,
    pub sequences: Vec<Sequence>,
}

impl SchemaSnapshot {
    /// Returns `true` when neither databases nor sequences were loaded.
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty() && self.sequences.is_empty()
    }

    pub fn clear(&mut self) {
        self.databases.clear();
        self.sequences.clear();
    }

    pub fn table_count(&self) -> usize {
        self.databases.iter().map(|db| db.tables.len()).sum()
    }

    pub fn field_count(&self) -> usize {
        self.databases
            .iter()
            .flat_map(|db| db.tables.iter())
            .map(|table| table.fields.len())
            .sum()
    }
}
