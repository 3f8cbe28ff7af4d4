//! Line-oriented parser for schema dumps.
//!
//! A dump is a sequence of tab-separated records, one per line, whose first
//! character selects the record type (see [`record`] for the column
//! layouts). The parser makes a single linear pass, tracking which database
//! and table are currently open:
//!
//! - `H` opens a database (and closes any open table),
//! - `T` appends a table to the open database and opens it,
//! - `X`, `I` and `F` attach to the open table,
//! - `S` appends a sequence that refers to the open database by name.
//!
//! Records with the wrong column count, or with no open parent, are skipped
//! and reported in the [`ParseReport`]; parsing always continues. A field
//! order that is not a number is skipped the same way unless
//! [`ParseOptions::strict_numbers`] is set, in which case the whole pass
//! fails with [`DumpError::InvalidNumber`].
//!
//! # Example
//!
//! ```
//! use schema_index_dump::parser::DumpParser;
//!
//! let dump = "H\t2017-01-01\t00:00:00\tmydb\tphys\tv1\n\
//!             T\tcustomer\t1\tcrc1\tdump1\tdesc1\n\
//!             F\tcustomer\tid\tINTEGER\t>>9\t1\t1\t0\t1\t0\t0\tpk field\n";
//!
//! let outcome = DumpParser::new().parse_str(dump).unwrap();
//! let table = &outcome.snapshot.databases[0].tables[0];
//! assert_eq!(table.name, "customer");
//! assert!(table.fields[0].is_primary_key());
//! assert!(outcome.report.is_clean());
//! ```

mod diagnostics;
pub mod record;

use std::io::BufRead;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use schema_index_core::{
    Database, Field, FieldFlags, Index, IndexFlags, PrimitiveType, SchemaSnapshot, Sequence,
    Table, Trigger,
};
use tracing::{debug, info};

pub use diagnostics::{ParseReport, SkipReason, SkippedLine};
pub use record::RecordTag;

use crate::error::{DumpError, Result};
use record::{COLUMN_SEPARATOR, INDEX_FIELD_SEPARATOR, field_col, flag_column, index_col};

/// Parser behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Fail the whole pass on an unreadable numeric column instead of
    /// skipping the record.
    pub strict_numbers: bool,
}

/// Result of one successful parse pass.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub snapshot: SchemaSnapshot,
    pub report: ParseReport,
}

/// Dump parser. Every call starts from an empty snapshot.
#[derive(Debug, Clone, Default)]
pub struct DumpParser {
    options: ParseOptions,
}

impl DumpParser {
    /// Creates a parser that skips every malformed record.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self { options }
    }

    /// Creates a parser that fails on unreadable numeric columns.
    pub fn strict() -> Self {
        Self::with_options(ParseOptions {
            strict_numbers: true,
        })
    }

    pub fn options(&self) -> ParseOptions {
        self.options
    }

    /// Parses an in-memory dump.
    pub fn parse_str(&self, text: &str) -> Result<ParseOutcome> {
        self.parse_lines(text.lines())
    }

    /// Parses any sequence of lines, in order.
    pub fn parse_lines<I, S>(&self, lines: I) -> Result<ParseOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = ParseState::new(self.options);
        for line in lines {
            state.consume(line.as_ref())?;
        }
        Ok(state.finish())
    }

    /// Parses a dump from a reader.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected, so a
    /// dump written in a legacy code page still loads.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError::Io`] if reading fails, or
    /// [`DumpError::InvalidNumber`] in strict mode.
    pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> Result<ParseOutcome> {
        let mut state = ParseState::new(self.options);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            state.consume(line.strip_suffix('\n').unwrap_or(&line))?;
        }
        Ok(state.finish())
    }
}

/// Open parent context threaded through the line loop.
struct ParseState {
    options: ParseOptions,
    snapshot: SchemaSnapshot,
    report: ParseReport,
    current_database: Option<usize>,
    /// Database and table index of the last `T` record. A new header does
    /// not close it.
    current_table: Option<(usize, usize)>,
}

impl ParseState {
    fn new(options: ParseOptions) -> Self {
        Self {
            options,
            snapshot: SchemaSnapshot::default(),
            report: ParseReport::default(),
            current_database: None,
            current_table: None,
        }
    }

    fn consume(&mut self, raw: &str) -> Result<()> {
        self.report.lines_read += 1;
        let line_no = self.report.lines_read;
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        let Some(first) = line.chars().next() else {
            return Ok(());
        };
        let Some(tag) = RecordTag::from_char(first) else {
            self.skip(line_no, None, SkipReason::UnknownTag);
            return Ok(());
        };

        let columns: Vec<&str> = line.split(COLUMN_SEPARATOR).collect();
        if columns.len() != tag.column_count() {
            let reason = SkipReason::ColumnCount {
                expected: tag.column_count(),
                found: columns.len(),
            };
            self.skip(line_no, Some(tag), reason);
            return Ok(());
        }

        let applied = match tag {
            RecordTag::Header => {
                self.open_database(&columns);
                Ok(())
            }
            RecordTag::Sequence => self.add_sequence(&columns),
            RecordTag::Table => self.add_table(&columns),
            RecordTag::Trigger => self.add_trigger(&columns),
            RecordTag::Index => self.add_index(&columns),
            RecordTag::Field => self.add_field(&columns),
        };

        match applied {
            Ok(()) => self.report.records_accepted += 1,
            Err(SkipReason::InvalidNumber { column, value }) if self.options.strict_numbers => {
                return Err(DumpError::InvalidNumber {
                    line: line_no,
                    column,
                    value,
                });
            }
            Err(reason) => self.skip(line_no, Some(tag), reason),
        }
        Ok(())
    }

    fn skip(&mut self, line: usize, tag: Option<RecordTag>, reason: SkipReason) {
        debug!(line, tag = ?tag, reason = ?reason, "Skipping dump record");
        self.report.skipped.push(SkippedLine { line, tag, reason });
    }

    fn finish(self) -> ParseOutcome {
        let snapshot = self.snapshot;
        let report = self.report;
        if !report.is_clean() {
            info!(
                skipped = report.skipped.len(),
                lines = report.lines_read,
                "Dump contained records that were skipped"
            );
        }
        debug!(
            databases = snapshot.databases.len(),
            tables = snapshot.table_count(),
            sequences = snapshot.sequences.len(),
            "Parsed dump"
        );
        ParseOutcome { snapshot, report }
    }

    fn open_database(&mut self, columns: &[&str]) {
        let mut db = Database::new(columns[3], columns[4], columns[5]);
        db.dumped_at = parse_dump_timestamp(columns[1], columns[2]);
        self.snapshot.databases.push(db);
        self.current_database = Some(self.snapshot.databases.len() - 1);
    }

    fn add_sequence(&mut self, columns: &[&str]) -> std::result::Result<(), SkipReason> {
        let db = self.current_database_mut()?;
        let database = db.name.clone();
        self.snapshot.sequences.push(Sequence {
            name: columns[1].to_string(),
            database,
        });
        Ok(())
    }

    fn add_table(&mut self, columns: &[&str]) -> std::result::Result<(), SkipReason> {
        let db_index = self.current_database.ok_or(SkipReason::NoOpenDatabase)?;
        let db = self.current_database_mut()?;
        db.tables.push(Table {
            name: columns[1].to_string(),
            id: columns[2].to_string(),
            crc: columns[3].to_string(),
            dump_name: columns[4].to_string(),
            description: columns[5].to_string(),
            ..Table::default()
        });
        self.current_table = Some((db_index, db.tables.len() - 1));
        Ok(())
    }

    fn add_trigger(&mut self, columns: &[&str]) -> std::result::Result<(), SkipReason> {
        let table = self.current_table_mut()?;
        table.triggers.push(Trigger {
            event: columns[2].to_string(),
            procedure: columns[3].to_string(),
        });
        Ok(())
    }

    fn add_index(&mut self, columns: &[&str]) -> std::result::Result<(), SkipReason> {
        let table = self.current_table_mut()?;
        let mut flags = IndexFlags::empty();
        if flag_column(columns, index_col::PRIMARY) {
            flags |= IndexFlags::PRIMARY;
        }
        if flag_column(columns, index_col::UNIQUE) {
            flags |= IndexFlags::UNIQUE;
        }
        table.indexes.push(Index {
            name: columns[index_col::NAME].to_string(),
            flags,
            fields: columns[index_col::FIELDS]
                .split(INDEX_FIELD_SEPARATOR)
                .map(String::from)
                .collect(),
        });
        Ok(())
    }

    fn add_field(&mut self, columns: &[&str]) -> std::result::Result<(), SkipReason> {
        let table = self.current_table_mut()?;

        let raw_order = columns[field_col::ORDER];
        let order = raw_order
            .trim()
            .parse::<i32>()
            .map_err(|_| SkipReason::InvalidNumber {
                column: field_col::ORDER,
                value: raw_order.to_string(),
            })?;

        let mut flags = FieldFlags::empty();
        for (column, flag) in [
            (field_col::MANDATORY, FieldFlags::MANDATORY),
            (field_col::EXTENT, FieldFlags::EXTENT),
            (field_col::INDEXED, FieldFlags::INDEXED),
            (field_col::PRIMARY_KEY, FieldFlags::PRIMARY_KEY),
        ] {
            if flag_column(columns, column) {
                flags |= flag;
            }
        }

        let raw_type = columns[field_col::TYPE];
        table.fields.push(Field {
            name: columns[field_col::NAME].to_string(),
            raw_type: raw_type.to_string(),
            resolved_type: PrimitiveType::from_type_name(raw_type),
            format: columns[field_col::FORMAT].to_string(),
            order,
            flags,
            initial_value: columns[field_col::INITIAL].to_string(),
            description: columns[field_col::DESCRIPTION].to_string(),
        });
        Ok(())
    }

    fn current_database_mut(&mut self) -> std::result::Result<&mut Database, SkipReason> {
        self.current_database
            .and_then(|index| self.snapshot.databases.get_mut(index))
            .ok_or(SkipReason::NoOpenDatabase)
    }

    fn current_table_mut(&mut self) -> std::result::Result<&mut Table, SkipReason> {
        let (db, table) = self.current_table.ok_or(SkipReason::NoOpenTable)?;
        if self.current_database != Some(db) {
            debug!(
                database = db,
                table,
                "Record attached to a table opened before the last header"
            );
        }
        self.snapshot
            .databases
            .get_mut(db)
            .and_then(|db| db.tables.get_mut(table))
            .ok_or(SkipReason::NoOpenTable)
    }
}

/// Reads the header's date (`YYYY-MM-DD`, optionally followed by more text)
/// and time (`HH:MM:SS`). A missing or odd time falls back to midnight.
fn parse_dump_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = date.trim();
    let date = NaiveDate::parse_from_str(date.get(..10).unwrap_or(date), "%Y-%m-%d").ok()?;
    let time = time.trim();
    let time = NaiveTime::parse_from_str(time.get(..8).unwrap_or(time), "%H:%M:%S")
        .unwrap_or(NaiveTime::MIN);
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "H\t2017-01-01\t00:00:00\tmydb\tphys\tv1";
    const TABLE: &str = "T\tcustomer\t1\tcrc1\tdump1\tdesc1";
    const FIELD: &str = "F\tcustomer\tid\tINTEGER\t>>9\t1\t1\t0\t1\t0\t0\tpk field";

    fn parse(lines: &[&str]) -> ParseOutcome {
        DumpParser::new().parse_lines(lines.iter()).unwrap()
    }

    #[test]
    fn test_header_table_field() {
        let outcome = parse(&[HEADER, TABLE, FIELD]);
        let db = &outcome.snapshot.databases[0];
        assert_eq!(db.name, "mydb");
        assert_eq!(db.physical_name, "phys");
        assert_eq!(db.version, "v1");
        assert_eq!(
            db.dumped_at,
            NaiveDate::from_ymd_opt(2017, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        );

        let table = &db.tables[0];
        assert_eq!(table.id, "1");
        assert_eq!(table.crc, "crc1");
        assert_eq!(table.dump_name, "dump1");
        assert_eq!(table.description, "desc1");

        let field = &table.fields[0];
        assert_eq!(field.name, "id");
        assert_eq!(field.raw_type, "INTEGER");
        assert_eq!(field.resolved_type, PrimitiveType::Integer);
        assert_eq!(field.format, ">>9");
        assert_eq!(field.order, 1);
        assert_eq!(field.flags, FieldFlags::MANDATORY | FieldFlags::PRIMARY_KEY);
        assert_eq!(field.initial_value, "0");
        assert_eq!(field.description, "pk field");

        assert_eq!(outcome.report.records_accepted, 3);
        assert!(outcome.report.is_clean());
    }

    #[test]
    fn test_table_before_header_is_dropped() {
        let outcome = parse(&["T\tFoo\t1\tabc\tdump\tdesc"]);
        assert!(outcome.snapshot.databases.is_empty());
        assert_eq!(
            outcome.report.skipped[0].reason,
            SkipReason::NoOpenDatabase
        );
    }

    #[test]
    fn test_children_without_table_are_dropped() {
        let outcome = parse(&[
            HEADER,
            "X\tcustomer\tWRITE\ttrig.p\tcrc",
            "I\tcustomer\tpk\t1\t1\tcrc\tid",
            FIELD,
        ]);
        assert!(outcome.snapshot.databases[0].tables.is_empty());
        assert_eq!(
            outcome.report.count_skipped(|r| *r == SkipReason::NoOpenTable),
            3
        );
    }

    #[test]
    fn test_new_header_keeps_open_table() {
        let outcome = parse(&[HEADER, TABLE, "H\t2017-01-01\t00:00:00\tother\tp\tv", FIELD]);
        let snapshot = &outcome.snapshot;
        assert_eq!(snapshot.databases.len(), 2);
        assert_eq!(snapshot.databases[0].tables[0].fields.len(), 1);
        assert!(snapshot.databases[1].tables.is_empty());
        assert!(outcome.report.is_clean());
    }

    #[test]
    fn test_column_count_is_exact() {
        let outcome = parse(&[
            HEADER,
            "H\t2017-01-01\t00:00:00\tmydb\tphys",
            "T\tcustomer\t1\tcrc1\tdump1\tdesc1\textra",
        ]);
        assert_eq!(outcome.snapshot.databases.len(), 1);
        assert!(outcome.snapshot.databases[0].tables.is_empty());
        assert_eq!(
            outcome.report.skipped[0].reason,
            SkipReason::ColumnCount {
                expected: 6,
                found: 5
            }
        );
        assert_eq!(
            outcome.report.skipped[1].reason,
            SkipReason::ColumnCount {
                expected: 6,
                found: 7
            }
        );
    }

    #[test]
    fn test_index_flags_and_components() {
        let outcome = parse(&[
            HEADER,
            TABLE,
            "I\tcustomer\tbyAll\t1\t1\tcrc\ta%b%c",
            "I\tcustomer\tbyName\t0\t1\tcrc\tname",
            "I\tcustomer\tbyDate\t0\t0\tcrc\tdate",
        ]);
        let indexes = &outcome.snapshot.databases[0].tables[0].indexes;
        assert_eq!(indexes[0].flags, IndexFlags::PRIMARY | IndexFlags::UNIQUE);
        assert_eq!(indexes[0].fields, vec!["a", "b", "c"]);
        assert_eq!(indexes[1].flags, IndexFlags::UNIQUE);
        assert_eq!(indexes[2].flags, IndexFlags::empty());
    }

    #[test]
    fn test_trigger_and_sequence() {
        let outcome = parse(&[
            HEADER,
            "S\tnext-cust\t0",
            TABLE,
            "X\tcustomer\tWRITE\tcust-write.p\tcrc",
            "S\tnext-order\t0",
        ]);
        let snapshot = &outcome.snapshot;
        let trigger = &snapshot.databases[0].tables[0].triggers[0];
        assert_eq!(trigger.event, "WRITE");
        assert_eq!(trigger.procedure, "cust-write.p");
        assert_eq!(snapshot.sequences.len(), 2);
        assert!(snapshot.sequences.iter().all(|s| s.database == "mydb"));
    }

    #[test]
    fn test_sequence_before_header_is_dropped() {
        let outcome = parse(&["S\tnext\t0"]);
        assert!(outcome.snapshot.sequences.is_empty());
    }

    #[test]
    fn test_invalid_order_is_skipped_by_default() {
        let outcome = parse(&[
            HEADER,
            TABLE,
            "F\tcustomer\tid\tINTEGER\t>>9\tfirst\t1\t0\t1\t0\t0\tpk field",
            "F\tcustomer\tname\tcharacter\tx(20)\t 2 \t0\t0\t0\t0\t\tname",
        ]);
        let fields = &outcome.snapshot.databases[0].tables[0].fields;
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].order, 2);
        assert_eq!(
            outcome.report.skipped[0].reason,
            SkipReason::InvalidNumber {
                column: 5,
                value: "first".into()
            }
        );
    }

    #[test]
    fn test_invalid_order_fails_in_strict_mode() {
        let err = DumpParser::strict()
            .parse_lines([
                HEADER,
                TABLE,
                "F\tcustomer\tid\tINTEGER\t>>9\tx\t1\t0\t1\t0\t0\tpk field",
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            DumpError::InvalidNumber { line: 3, column: 5, ref value } if value == "x"
        ));
    }

    #[test]
    fn test_blank_lines_unknown_tags_and_crlf() {
        let text = format!("{HEADER}\r\n\r\n# comment\r\n{TABLE}\r\n");
        let outcome = DumpParser::new().parse_str(&text).unwrap();
        let db = &outcome.snapshot.databases[0];
        assert_eq!(db.version, "v1");
        assert_eq!(db.tables[0].description, "desc1");
        assert_eq!(outcome.report.lines_read, 4);
        assert_eq!(outcome.report.skipped.len(), 1);
        assert_eq!(outcome.report.skipped[0].reason, SkipReason::UnknownTag);
    }

    #[test]
    fn test_parse_reader_tolerates_invalid_utf8() {
        // Latin-1 'é' is not valid UTF-8 on its own.
        let mut bytes = format!("{HEADER}\nT\tcli").into_bytes();
        bytes.push(0xe9);
        bytes.extend_from_slice(b"nt\t1\tcrc\tdump\tdesc\n");

        let outcome = DumpParser::new().parse_reader(bytes.as_slice()).unwrap();
        assert_eq!(outcome.snapshot.databases[0].tables.len(), 1);
    }

    #[test]
    fn test_unreadable_header_timestamp_is_none() {
        let outcome = parse(&["H\tyesterday\tnoon\tmydb\tphys\tv1"]);
        assert_eq!(outcome.snapshot.databases[0].dumped_at, None);
    }

    #[test]
    fn test_header_timestamp_with_time() {
        let ts = parse_dump_timestamp("2021-06-30", "13:45:10").unwrap();
        assert_eq!(ts.to_string(), "2021-06-30 13:45:10");
        let date_only = parse_dump_timestamp("2021-06-30", "").unwrap();
        assert_eq!(date_only.to_string(), "2021-06-30 00:00:00");
    }
}
