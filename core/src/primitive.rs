//! Canonical field types and the translation table from dump type names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical type of a field, translated from the raw type string of a dump.
///
/// Translation is case-insensitive, treats `-` and `_` alike and accepts the
/// usual abbreviations. Anything else becomes [`PrimitiveType::Unknown`].
///
/// # Examples
///
/// ```
/// use schema_index_core::PrimitiveType;
///
/// assert_eq!(PrimitiveType::from_type_name("INTEGER"), PrimitiveType::Integer);
/// assert_eq!(PrimitiveType::from_type_name("datetime_tz"), PrimitiveType::DatetimeTz);
/// assert_eq!(PrimitiveType::from_type_name("char"), PrimitiveType::Character);
/// assert_eq!(PrimitiveType::from_type_name("geometry"), PrimitiveType::Unknown);
/// assert_eq!(PrimitiveType::DatetimeTz.to_string(), "DATETIME-TZ");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveType {
    Character,
    Longchar,
    Integer,
    Int64,
    Decimal,
    Logical,
    Date,
    Datetime,
    DatetimeTz,
    Raw,
    Recid,
    Rowid,
    Blob,
    Clob,
    Handle,
    ComHandle,
    Memptr,
    /// The raw type string did not match any known type.
    #[default]
    Unknown,
}

impl PrimitiveType {
    /// Translates a dump type name. Never fails.
    pub fn from_type_name(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_uppercase().replace('_', "-");
        match normalized.as_str() {
            "CHARACTER" | "CHAR" | "CHARA" | "CHARAC" | "CHARACT" | "CHARACTE" => Self::Character,
            "LONGCHAR" => Self::Longchar,
            "INTEGER" | "INT" | "INTE" | "INTEG" | "INTEGE" => Self::Integer,
            "INT64" => Self::Int64,
            "DECIMAL" | "DEC" | "DECI" | "DECIM" | "DECIMA" => Self::Decimal,
            "LOGICAL" | "LOG" | "LOGI" | "LOGIC" | "LOGICA" => Self::Logical,
            "DATE" => Self::Date,
            "DATETIME" => Self::Datetime,
            "DATETIME-TZ" => Self::DatetimeTz,
            "RAW" => Self::Raw,
            "RECID" => Self::Recid,
            "ROWID" => Self::Rowid,
            "BLOB" => Self::Blob,
            "CLOB" => Self::Clob,
            "HANDLE" | "WIDGET-HANDLE" => Self::Handle,
            "COM-HANDLE" => Self::ComHandle,
            "MEMPTR" => Self::Memptr,
            _ => Self::Unknown,
        }
    }

    /// Canonical upper-case spelling, as shown next to completion entries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Character => "CHARACTER",
            Self::Longchar => "LONGCHAR",
            Self::Integer => "INTEGER",
            Self::Int64 => "INT64",
            Self::Decimal => "DECIMAL",
            Self::Logical => "LOGICAL",
            Self::Date => "DATE",
            Self::Datetime => "DATETIME",
            Self::DatetimeTz => "DATETIME-TZ",
            Self::Raw => "RAW",
            Self::Recid => "RECID",
            Self::Rowid => "ROWID",
            Self::Blob => "BLOB",
            Self::Clob => "CLOB",
            Self::Handle => "HANDLE",
            Self::ComHandle => "COM-HANDLE",
            Self::Memptr => "MEMPTR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
