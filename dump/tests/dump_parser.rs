use std::fs;
use std::io::BufReader;
use std::path::PathBuf;

use schema_index_core::{FieldFlags, IndexFlags, PrimitiveType, validate_snapshot};
use schema_index_dump::parser::{DumpParser, SkipReason};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture should be readable")
}

#[test]
fn test_sports_fixture_builds_both_databases() {
    let outcome = DumpParser::new()
        .parse_str(&fixture("sports.dump"))
        .expect("fixture should parse");
    let snapshot = &outcome.snapshot;

    let names: Vec<&str> = snapshot.databases.iter().map(|db| db.name.as_str()).collect();
    assert_eq!(names, vec!["sports", "stats"]);

    let sports = &snapshot.databases[0];
    let tables: Vec<&str> = sports.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tables, vec!["Customer", "Order"]);

    let stats = &snapshot.databases[1];
    let tables: Vec<&str> = stats.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tables, vec!["Run", "Customer"]);

    assert_eq!(snapshot.table_count(), 4);
    assert_eq!(snapshot.field_count(), 11);
}

#[test]
fn test_sports_fixture_sequences_reference_their_database() {
    let outcome = DumpParser::new()
        .parse_str(&fixture("sports.dump"))
        .expect("fixture should parse");

    let sequences: Vec<(&str, &str)> = outcome
        .snapshot
        .sequences
        .iter()
        .map(|s| (s.name.as_str(), s.database.as_str()))
        .collect();
    assert_eq!(
        sequences,
        vec![
            ("NextCustNum", "sports"),
            ("NextInvNum", "sports"),
            ("NextRunId", "stats"),
        ]
    );
}

#[test]
fn test_sports_fixture_customer_details() {
    let outcome = DumpParser::new()
        .parse_str(&fixture("sports.dump"))
        .expect("fixture should parse");
    let customer = outcome.snapshot.databases[0]
        .find_table("customer")
        .expect("customer table");

    assert_eq!(customer.description, "Customer master file");
    assert_eq!(customer.triggers.len(), 2);
    assert_eq!(customer.triggers[1].procedure, "sports/delcust.p");

    let primary = customer.primary_index().expect("primary index");
    assert_eq!(primary.name, "CustNum");
    assert_eq!(primary.flags, IndexFlags::PRIMARY | IndexFlags::UNIQUE);
    assert_eq!(customer.indexes[1].fields, vec!["Name", "CustNum"]);

    let cust_num = customer.find_field("custnum").expect("CustNum field");
    assert_eq!(cust_num.order, 10);
    assert_eq!(
        cust_num.flags,
        FieldFlags::MANDATORY | FieldFlags::INDEXED | FieldFlags::PRIMARY_KEY
    );

    let phone = customer.find_field("Phone").expect("Phone field");
    assert_eq!(phone.flags, FieldFlags::EXTENT);
    assert_eq!(phone.initial_value, "");
}

#[test]
fn test_sports_fixture_resolves_types() {
    let outcome = DumpParser::new()
        .parse_str(&fixture("sports.dump"))
        .expect("fixture should parse");
    let snapshot = &outcome.snapshot;

    let order = snapshot.databases[0].find_table("order").unwrap();
    assert_eq!(
        order.find_field("Promised").unwrap().resolved_type,
        PrimitiveType::DatetimeTz
    );
    assert_eq!(
        order.find_field("OrderDate").unwrap().resolved_type,
        PrimitiveType::Date
    );

    let run = snapshot.databases[1].find_table("run").unwrap();
    assert_eq!(run.find_field("RunId").unwrap().resolved_type, PrimitiveType::Int64);
    assert_eq!(run.find_field("Payload").unwrap().resolved_type, PrimitiveType::Blob);
}

#[test]
fn test_sports_fixture_reports_malformed_lines() {
    let outcome = DumpParser::new()
        .parse_str(&fixture("sports.dump"))
        .expect("fixture should parse");
    let report = &outcome.report;

    assert_eq!(report.lines_read, 27);
    assert_eq!(report.records_accepted, 25);
    let lines: Vec<usize> = report.skipped.iter().map(|s| s.line).collect();
    assert_eq!(lines, vec![4, 27]);
    assert!(
        report
            .skipped
            .iter()
            .all(|s| matches!(s.reason, SkipReason::ColumnCount { .. }))
    );
}

#[test]
fn test_reader_and_string_parses_agree() {
    let from_str = DumpParser::new()
        .parse_str(&fixture("sports.dump"))
        .expect("fixture should parse");
    let file = fs::File::open(fixture_path("sports.dump")).unwrap();
    let from_reader = DumpParser::new()
        .parse_reader(BufReader::new(file))
        .expect("fixture should parse");

    assert_eq!(from_str.snapshot, from_reader.snapshot);
    assert_eq!(from_str.report, from_reader.report);
}

#[test]
fn test_parsing_twice_is_deterministic() {
    let text = fixture("sports.dump");
    let parser = DumpParser::new();
    let first = parser.parse_str(&text).unwrap();
    let second = parser.parse_str(&text).unwrap();
    assert_eq!(first.snapshot, second.snapshot);
}

#[test]
fn test_sports_fixture_validates_cleanly() {
    let outcome = DumpParser::new()
        .parse_str(&fixture("sports.dump"))
        .expect("fixture should parse");
    assert!(validate_snapshot(&outcome.snapshot).is_empty());
}
