//! Diagnostics collected while reading a dump.

use serde::{Deserialize, Serialize};

use super::record::RecordTag;

/// Why a line did not make it into the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The record did not have the exact column count of its tag.
    ColumnCount { expected: usize, found: usize },
    /// A table or sequence appeared before any database header.
    NoOpenDatabase,
    /// A field, index or trigger appeared with no open table.
    NoOpenTable,
    /// The first character is not a known record tag.
    UnknownTag,
    /// A numeric column could not be read.
    InvalidNumber { column: usize, value: String },
}

/// One skipped line, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLine {
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<RecordTag>,
    pub reason: SkipReason,
}

/// Summary of one parse pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseReport {
    /// Lines consumed from the source, blank lines included.
    pub lines_read: usize,
    /// Records that were added to the snapshot.
    pub records_accepted: usize,
    pub skipped: Vec<SkippedLine>,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Number of skipped lines matching `predicate`.
    pub fn count_skipped(&self, predicate: impl Fn(&SkipReason) -> bool) -> usize {
        self.skipped
            .iter()
            .filter(|skipped| predicate(&skipped.reason))
            .count()
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let malformed = self.count_skipped(|r| {
            matches!(
                r,
                SkipReason::ColumnCount { .. } | SkipReason::InvalidNumber { .. }
            )
        });
        if malformed > 0 {
            warnings.push(format!("Skipped {malformed} malformed records"));
        }

        let orphans =
            self.count_skipped(|r| matches!(r, SkipReason::NoOpenDatabase | SkipReason::NoOpenTable));
        if orphans > 0 {
            warnings.push(format!("Dropped {orphans} records without a parent"));
        }

        let unknown = self.count_skipped(|r| matches!(r, SkipReason::UnknownTag));
        if unknown > 0 {
            warnings.push(format!("Ignored {unknown} lines with an unknown tag"));
        }

        warnings
    }
}
