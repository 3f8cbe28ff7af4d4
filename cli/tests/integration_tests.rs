use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const BIN: &str = env!("CARGO_BIN_EXE_schema-index");

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("dump")
        .join("tests")
        .join("fixtures")
        .join("sports.dump")
}

fn run(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run schema-index")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Settings YAML pointing storage into `dir`.
fn write_config(dir: &Path, extraction: &str) -> PathBuf {
    let yaml = format!(
        r#"environment:
  name: Dev
  suffix: ""
  database: sports
storage:
  folder: {folder}
{extraction}"#,
        folder = dir.join("dumps").display()
    );
    let path = dir.join("schema-index.yml");
    fs::write(&path, yaml).expect("failed to write config");
    path
}

// ---------------------------------------------------------------------------
// Dump commands
// ---------------------------------------------------------------------------

#[test]
fn parse_prints_schema_json_and_warns_on_skipped_lines() {
    let input = fixture();
    let out = run(&["parse", "--input", input.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let schema = json(&out);
    assert_eq!(schema["databases"][0]["name"], "sports");
    assert_eq!(schema["databases"][1]["tables"][0]["name"], "Run");
    assert_eq!(schema["sequences"].as_array().unwrap().len(), 3);
    assert!(stderr(&out).contains("Skipped 2 malformed records"));
}

#[test]
fn parse_with_report_as_yaml() {
    let input = fixture();
    let out = run(&[
        "parse",
        "--input",
        input.to_str().unwrap(),
        "--with-report",
        "--format",
        "yaml",
    ]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("schema:"));
    assert!(text.contains("lines_read: 27"));
}

#[test]
fn strict_parse_fails_on_bad_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.dump");
    fs::write(
        &path,
        "H\t2017-01-01\t00:00:00\tdb\tp\tv\n\
         T\tt\t1\tc\td\te\n\
         F\tt\tf\tinteger\t>9\tten\t0\t0\t0\t0\t0\tdesc\n",
    )
    .unwrap();

    let lenient = run(&["parse", "--input", path.to_str().unwrap()]);
    assert!(lenient.status.success());
    assert_eq!(json(&lenient)["databases"][0]["tables"][0]["fields"], serde_json::json!([]));

    let strict = run(&["parse", "--input", path.to_str().unwrap(), "--strict"]);
    assert!(!strict.status.success());
    assert!(stderr(&strict).starts_with("error: "));
}

#[test]
fn validate_reports_counts() {
    let input = fixture();
    let out = run(&["validate", "--input", input.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("2 database(s), 4 table(s), 11 field(s), 3 sequence(s)"));
}

#[test]
fn validate_fails_on_unknown_index_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dangling.dump");
    fs::write(
        &path,
        "H\t2017-01-01\t00:00:00\tdb\tp\tv\n\
         T\tt\t1\tc\td\te\n\
         I\tt\tidx\t1\t0\t9\tmissing\n",
    )
    .unwrap();

    let out = run(&["validate", "--input", path.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("1 validation problem(s)"));
}

#[test]
fn complete_upper_cases_display_text() {
    let input = fixture();
    let out = run(&["complete", "--input", input.to_str().unwrap(), "--case", "upper"]);
    assert!(out.status.success());

    let entries = json(&out);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 9);
    assert_eq!(entries[0]["kind"], "sequence");
    assert_eq!(entries[0]["text"], "NEXTCUSTNUM");
    assert_eq!(entries[0]["sub_text"], "sports");
    assert_eq!(entries[3]["text"], "SPORTS");
    assert_eq!(entries[4]["text"], "CUSTOMER");
    assert_eq!(
        entries[4]["children"],
        serde_json::json!(["CUSTNUM", "NAME", "BALANCE", "PHONE"])
    );
}

#[test]
fn resolve_field_table_and_database() {
    let input = fixture();
    let input = input.to_str().unwrap();

    let field = json(&run(&["resolve", "--input", input, "stats.customer.custnum"]));
    assert_eq!(field["kind"], "field");
    assert_eq!(field["database"], "stats");
    assert_eq!(field["field"]["description"], "Copied customer number");

    let table = json(&run(&["resolve", "--input", input, "ORDER"]));
    assert_eq!(table["kind"], "table");
    assert_eq!(table["table"]["name"], "Order");

    let database = json(&run(&["resolve", "--input", input, "Stats"]));
    assert_eq!(database["kind"], "database");

    let missing = run(&["resolve", "--input", input, "a.b.c.d"]);
    assert!(!missing.status.success());
}

#[test]
fn tables_lists_bare_and_qualified_names() {
    let input = fixture();
    let out = run(&["tables", "--input", input.to_str().unwrap()]);
    assert!(out.status.success());
    let lines: Vec<String> = stdout(&out).lines().map(String::from).collect();
    assert_eq!(
        lines,
        vec![
            "Customer",
            "Order",
            "Run",
            "sports.Customer",
            "sports.Order",
            "stats.Customer",
            "stats.Run",
        ]
    );
}

#[test]
fn stdin_input_is_accepted() {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = Command::new(BIN)
        .args(["tables", "--input", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"H\t2017-01-01\t00:00:00\tDB\tp\tv\nT\tT1\t1\tc\td\te\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    assert_eq!(stdout(&out), "DB.T1\nT1\n");
}

// ---------------------------------------------------------------------------
// Environment commands
// ---------------------------------------------------------------------------

#[test]
fn path_prints_managed_location() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let out = run(&["path", "--config", config.to_str().unwrap()]);
    assert!(out.status.success());
    assert_eq!(
        PathBuf::from(stdout(&out).trim()),
        dir.path().join("dumps").join("dev__sports.dump")
    );
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.yml");
    fs::write(&path, "storage:\n  folder: /tmp\n").unwrap();
    let out = run(&["path", "--config", path.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("environment.name is empty"));
}

#[test]
fn extract_without_program_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let out = run(&["extract", "--config", config.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("extraction.program is not set"));
}

#[cfg(unix)]
#[test]
fn extract_copies_dump_then_delete_removes_it() {
    let dir = tempfile::tempdir().unwrap();
    let source = fixture();
    let extraction = format!(
        "extraction:\n  program: sh\n  args: [\"-c\", \"cp '{}' \\\"$SCHEMA_INDEX_OUTPUT\\\"\"]\n  timeout_secs: 30\n",
        source.display()
    );
    let config = write_config(dir.path(), &extraction);
    let config = config.to_str().unwrap();

    let out = run(&["extract", "--config", config]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("2 database(s), 4 table(s)"));
    let managed = dir.path().join("dumps").join("dev__sports.dump");
    assert_eq!(fs::read(&managed).unwrap(), fs::read(&source).unwrap());

    let out = run(&["delete", "--config", config]);
    assert!(out.status.success());
    assert!(!managed.exists());

    let out = run(&["delete", "--config", config]);
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("No dump at"));
}

#[cfg(unix)]
#[test]
fn failed_extraction_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let extraction = "extraction:\n  program: sh\n  args: [\"-c\", \"echo 'cannot connect' >&2; exit 2\"]\n";
    let config = write_config(dir.path(), extraction);

    let out = run(&["extract", "--config", config.to_str().unwrap()]);
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("cannot connect"));
    assert!(err.contains("error: extraction did not produce a usable dump"));
}
