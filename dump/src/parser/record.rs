//! Record tags and column layouts of the dump format.
//!
//! ```text
//! H  <dump date>  <dump time>  <logical db>  <physical db>  <version>
//! S  <sequence name>  <unused>
//! T  <table>  <id>  <crc>  <dump name>  <description>
//! X  <parent table>  <event>  <procedure>  <crc>
//! I  <parent table>  <index>  <primary 0/1>  <unique 0/1>  <crc>  <fields joined by %>
//! F  <parent table>  <field>  <type>  <format>  <order>  <mandatory>  <extent>  <indexed>  <pk>  <initial>  <description>
//! ```
//!
//! Columns are separated by a tab; the tag occupies column 0.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const COLUMN_SEPARATOR: char = '\t';
pub const INDEX_FIELD_SEPARATOR: char = '%';

/// Column positions for `F` records.
pub mod field_col {
    pub const NAME: usize = 2;
    pub const TYPE: usize = 3;
    pub const FORMAT: usize = 4;
    pub const ORDER: usize = 5;
    pub const MANDATORY: usize = 6;
    pub const EXTENT: usize = 7;
    pub const INDEXED: usize = 8;
    pub const PRIMARY_KEY: usize = 9;
    pub const INITIAL: usize = 10;
    pub const DESCRIPTION: usize = 11;
}

/// Column positions for `I` records.
pub mod index_col {
    pub const NAME: usize = 2;
    pub const PRIMARY: usize = 3;
    pub const UNIQUE: usize = 4;
    pub const FIELDS: usize = 6;
}

/// The record type selected by a line's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordTag {
    Header,
    Sequence,
    Table,
    Trigger,
    Index,
    Field,
}

impl RecordTag {
    pub fn from_char(tag: char) -> Option<Self> {
        match tag {
            'H' => Some(Self::Header),
            'S' => Some(Self::Sequence),
            'T' => Some(Self::Table),
            'X' => Some(Self::Trigger),
            'I' => Some(Self::Index),
            'F' => Some(Self::Field),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Header => 'H',
            Self::Sequence => 'S',
            Self::Table => 'T',
            Self::Trigger => 'X',
            Self::Index => 'I',
            Self::Field => 'F',
        }
    }

    /// Exact number of columns, tag included, a record must have.
    pub fn column_count(self) -> usize {
        match self {
            Self::Header => 6,
            Self::Sequence => 3,
            Self::Table => 6,
            Self::Trigger => 5,
            Self::Index => 7,
            Self::Field => 12,
        }
    }
}

impl fmt::Display for RecordTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// `"1"` is the only truthy flag value.
pub fn flag_column(columns: &[&str], index: usize) -> bool {
    columns.get(index).is_some_and(|value| *value == "1")
}
