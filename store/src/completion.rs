//! Completion entries projected from a schema snapshot.
//!
//! A [`CompletionIndex`] holds every entry once, in an arena addressed by
//! [`EntryId`], and exposes two views over it:
//!
//! - the flat list ([`CompletionIndex::items`]) offered to an autocomplete
//!   popup: sequences, then each database followed by its tables;
//! - the tree reached through [`CompletionIndex::children`] and
//!   [`CompletionIndex::parent`]: tables under their database, fields under
//!   their table.
//!
//! Tables appear in both views. Fields are only reachable through their
//! table.

use std::collections::BTreeMap;

use schema_index_core::{CaseFold, FieldFlags, SchemaSnapshot};
use serde::{Deserialize, Serialize};

/// Separator typed between a database or table and its children.
pub const CHILD_SEPARATOR: char = '.';

/// Position of an entry in its [`CompletionIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(usize);

impl EntryId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a completion entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    Database,
    Table,
    Field,
    PrimaryKeyField,
    Sequence,
}

/// Path back to the model item an entry was built from, as indexes into the
/// snapshot's `sequences` and `databases` vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrigin {
    Sequence(usize),
    Database(usize),
    Table(usize, usize),
    Field(usize, usize, usize),
}

/// One candidate offered to an autocomplete consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    /// Name after case folding.
    pub display_text: String,
    /// Secondary text: owning database for sequences and tables, type name
    /// for fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_text: Option<String>,
    pub kind: CompletionKind,
    pub ranking: i32,
    /// Field flags without [`FieldFlags::PRIMARY_KEY`], which is carried by
    /// the kind instead.
    pub flags: FieldFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntryId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_separator: Option<char>,
    pub origin: EntryOrigin,
}

impl CompletionEntry {
    fn new(display_text: String, kind: CompletionKind, origin: EntryOrigin) -> Self {
        Self {
            display_text,
            sub_text: None,
            kind,
            ranking: 0,
            flags: FieldFlags::empty(),
            parent: None,
            children: Vec::new(),
            child_separator: None,
            origin,
        }
    }
}

/// The completion entries of one snapshot.
///
/// # Examples
///
/// ```
/// use schema_index_core::{CaseMode, Database, Field, SchemaSnapshot, Table};
/// use schema_index_store::{CompletionIndex, CompletionKind};
///
/// let mut table = Table::new("customer");
/// table.fields.push(Field::new("name", "character", 1));
/// let mut db = Database::new("sports", "sports.db", "11.7");
/// db.tables.push(table);
/// let snapshot = SchemaSnapshot { databases: vec![db], sequences: vec![] };
///
/// let index = CompletionIndex::build(&snapshot, &CaseMode::Upper);
/// let names: Vec<_> = index.iter().map(|e| e.display_text.as_str()).collect();
/// assert_eq!(names, ["SPORTS", "CUSTOMER"]);
///
/// let table_id = index.items()[1];
/// let field = index.children(table_id).next().unwrap();
/// assert_eq!(field.kind, CompletionKind::Field);
/// assert_eq!(field.sub_text.as_deref(), Some("CHARACTER"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionIndex {
    entries: Vec<CompletionEntry>,
    items: Vec<EntryId>,
}

impl CompletionIndex {
    /// Builds the entries of `snapshot`, folding every display name with
    /// `fold`. Sub texts are kept as stored.
    pub fn build(snapshot: &SchemaSnapshot, fold: &dyn CaseFold) -> Self {
        let mut index = Self::default();

        for (s, sequence) in snapshot.sequences.iter().enumerate() {
            let mut entry = CompletionEntry::new(
                fold.fold(&sequence.name),
                CompletionKind::Sequence,
                EntryOrigin::Sequence(s),
            );
            entry.sub_text = Some(sequence.database.clone());
            let id = index.push(entry);
            index.items.push(id);
        }

        for (d, db) in snapshot.databases.iter().enumerate() {
            let mut entry = CompletionEntry::new(
                fold.fold(&db.name),
                CompletionKind::Database,
                EntryOrigin::Database(d),
            );
            entry.child_separator = Some(CHILD_SEPARATOR);
            let db_id = index.push(entry);
            index.items.push(db_id);

            for (t, table) in db.tables.iter().enumerate() {
                let mut entry = CompletionEntry::new(
                    fold.fold(&table.name),
                    CompletionKind::Table,
                    EntryOrigin::Table(d, t),
                );
                entry.sub_text = Some(db.name.clone());
                entry.child_separator = Some(CHILD_SEPARATOR);
                let table_id = index.push_child(db_id, entry);
                index.items.push(table_id);

                for (f, field) in table.fields.iter().enumerate() {
                    let kind = if field.is_primary_key() {
                        CompletionKind::PrimaryKeyField
                    } else {
                        CompletionKind::Field
                    };
                    let mut entry =
                        CompletionEntry::new(fold.fold(&field.name), kind, EntryOrigin::Field(d, t, f));
                    entry.sub_text = Some(field.resolved_type.to_string());
                    entry.flags = field.flags.difference(FieldFlags::PRIMARY_KEY);
                    index.push_child(table_id, entry);
                }
            }
        }

        index
    }

    fn push(&mut self, entry: CompletionEntry) -> EntryId {
        let id = EntryId(self.entries.len());
        self.entries.push(entry);
        id
    }

    fn push_child(&mut self, parent: EntryId, mut entry: CompletionEntry) -> EntryId {
        entry.parent = Some(parent);
        let id = self.push(entry);
        self.entries[parent.0].children.push(id);
        id
    }

    /// Ids of the flat completion list, in display order.
    pub fn items(&self) -> &[EntryId] {
        &self.items
    }

    /// Entries of the flat completion list, in display order.
    pub fn iter(&self) -> impl Iterator<Item = &CompletionEntry> {
        self.items.iter().map(|id| &self.entries[id.0])
    }

    /// Every entry, fields included, in build order.
    pub fn entries(&self) -> &[CompletionEntry] {
        &self.entries
    }

    pub fn get(&self, id: EntryId) -> Option<&CompletionEntry> {
        self.entries.get(id.0)
    }

    /// Children of `id`; empty when `id` has none or is unknown.
    pub fn children(&self, id: EntryId) -> impl Iterator<Item = &CompletionEntry> {
        self.get(id)
            .map(|entry| entry.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|child| &self.entries[child.0])
    }

    pub fn parent(&self, id: EntryId) -> Option<&CompletionEntry> {
        self.get(id)?.parent.and_then(|parent| self.get(parent))
    }

    /// Length of the flat completion list.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Maps every table name, bare and database-qualified, to
/// [`CompletionKind::Table`].
///
/// # Examples
///
/// ```
/// use schema_index_core::{Database, SchemaSnapshot, Table};
/// use schema_index_store::{CompletionKind, table_dictionary};
///
/// let mut db = Database::new("DB", "db", "1");
/// db.tables.push(Table::new("T1"));
/// let snapshot = SchemaSnapshot { databases: vec![db], sequences: vec![] };
///
/// let dictionary = table_dictionary(&snapshot);
/// assert_eq!(dictionary.len(), 2);
/// assert_eq!(dictionary["T1"], CompletionKind::Table);
/// assert_eq!(dictionary["DB.T1"], CompletionKind::Table);
/// ```
pub fn table_dictionary(snapshot: &SchemaSnapshot) -> BTreeMap<String, CompletionKind> {
    let mut dictionary = BTreeMap::new();
    extend_table_dictionary(snapshot, &mut dictionary);
    dictionary
}

/// Adds the table names of `snapshot` to `dictionary`, leaving keys that are
/// already present untouched.
pub fn extend_table_dictionary(
    snapshot: &SchemaSnapshot,
    dictionary: &mut BTreeMap<String, CompletionKind>,
) {
    for db in &snapshot.databases {
        for table in &db.tables {
            dictionary
                .entry(table.name.clone())
                .or_insert(CompletionKind::Table);
            dictionary
                .entry(format!("{}{CHILD_SEPARATOR}{}", db.name, table.name))
                .or_insert(CompletionKind::Table);
        }
    }
}
