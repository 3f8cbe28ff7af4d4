//! Basic dump parsing example.
//!
//! Parses a schema dump and prints its databases, tables and the parse
//! report.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p schema-index-dump --example parse_dump -- path/to/file.dump
//! ```
//!
//! Without an argument a small built-in dump is parsed.

use std::fs::File;
use std::io::BufReader;

use schema_index_dump::DumpParser;

const SAMPLE: &str = "H\t2017-03-14\t09:26:53\tsports\t/db/sports\t11.7\n\
                      S\tNextCustNum\t0\n\
                      T\tCustomer\t2\t58963\tcustomer\tCustomer master file\n\
                      I\tCustomer\tCustNum\t1\t1\t111\tCustNum\n\
                      F\tCustomer\tCustNum\tinteger\t>>>>9\t10\t1\t0\t1\t1\t0\tCustomer number\n\
                      F\tCustomer\tName\tcharacter\tx(30)\t20\t0\t0\t0\t0\t\tCustomer name\n\
                      T\tBroken\n";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let parser = DumpParser::new();
    let outcome = match std::env::args().nth(1) {
        Some(path) => parser.parse_reader(BufReader::new(File::open(path)?))?,
        None => parser.parse_str(SAMPLE)?,
    };

    for db in &outcome.snapshot.databases {
        let dumped_at = db
            .dumped_at
            .map(|at| at.to_string())
            .unwrap_or_else(|| "unknown date".into());
        println!("{} ({}, dumped {dumped_at})", db.name, db.physical_name);
        for table in &db.tables {
            println!("  {} - {}", table.name, table.description);
            for field in &table.fields {
                let marker = if field.is_primary_key() { "*" } else { " " };
                println!("   {marker} {:<20} {}", field.name, field.resolved_type);
            }
        }
    }
    for sequence in &outcome.snapshot.sequences {
        println!("sequence {}.{}", sequence.database, sequence.name);
    }

    let report = &outcome.report;
    println!(
        "\n{} line(s) read, {} record(s) accepted",
        report.lines_read, report.records_accepted
    );
    for warning in report.warnings() {
        println!("warning: {warning}");
    }
    Ok(())
}
