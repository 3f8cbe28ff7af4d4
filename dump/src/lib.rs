//! Reading and producing database schema dumps.
//!
//! This crate turns the tab-separated dump written by a schema extraction
//! program into a [`SchemaSnapshot`], and provides the pieces needed to
//! produce such a dump in the first place.
//!
//! # Main entry points
//!
//! - [`parser::DumpParser`]: parse a dump from a string, a line iterator or
//!   any [`BufRead`](std::io::BufRead).
//! - [`storage::DumpLocation`]: the managed file a given environment's dump
//!   is stored in.
//! - [`extractor::Executor`] / [`extractor::ProcessExecutor`]: run the
//!   external program that writes a dump.
//!
//! # Example
//!
//! ```
//! use schema_index_dump::parse_dump;
//!
//! let dump = "H\t2017-01-01\t00:00:00\tsports\tsports.db\t11.7\n\
//!             T\tcustomer\t2\t1234\tcustomer\tCustomers\n\
//!             I\tcustomer\tCustNum\t1\t1\t99\tCustNum\n\
//!             F\tcustomer\tCustNum\tinteger\t>>>>9\t10\t1\t0\t1\t1\t0\tCustomer number\n\
//!             S\tNextCustNum\t0\n";
//!
//! let outcome = parse_dump(dump).unwrap();
//! assert_eq!(outcome.snapshot.table_count(), 1);
//! assert_eq!(outcome.snapshot.sequences[0].database, "sports");
//! ```
//!
//! [`SchemaSnapshot`]: schema_index_core::SchemaSnapshot

pub mod error;
pub mod extractor;
pub mod parser;
pub mod storage;

pub use error::{DumpError, Result};
pub use parser::{DumpParser, ParseOptions, ParseOutcome, ParseReport};

/// Parses an in-memory dump with the default, lenient options.
pub fn parse_dump(text: &str) -> Result<ParseOutcome> {
    DumpParser::new().parse_str(text)
}
