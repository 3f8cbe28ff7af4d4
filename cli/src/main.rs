use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use clap::{Args, Parser, Subcommand};
use parking_lot::RwLock;
use schema_index_core::{CaseMode, Database, Field, Table, validate_snapshot};
use schema_index_dump::{DumpParser, ParseOutcome};
use schema_index_store::{
    DumpFiles, ExtractionOrchestrator, LocalFiles, Notification, SchemaLookup, SchemaStore,
    Settings,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

/// Case conversion for completion display names.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliCase {
    Keep,
    Upper,
    Lower,
    Camel,
}

impl From<CliCase> for CaseMode {
    fn from(case: CliCase) -> Self {
        match case {
            CliCase::Keep => Self::Keep,
            CliCase::Upper => Self::Upper,
            CliCase::Lower => Self::Lower,
            CliCase::Camel => Self::Camel,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "schema-index")]
#[command(about = "Parse, query and extract database schema dumps")]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a dump and print the schema it describes.
    Parse(ParseArgs),
    /// Check a dump for malformed records and inconsistent names.
    Validate(InputArgs),
    /// Print the completion entries built from a dump.
    Complete(CompleteArgs),
    /// Resolve a TABLE, DB.TABLE, TABLE.FIELD or DB.TABLE.FIELD name.
    Resolve(ResolveArgs),
    /// List table names, bare and database-qualified.
    Tables(InputArgs),
    /// Run the configured extraction program and load its dump.
    Extract(ConfigArgs),
    /// Delete the managed dump of the configured environment.
    Delete(ConfigArgs),
    /// Print the managed dump path of the configured environment.
    Path(ConfigArgs),
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Dump file, or `-` for stdin.
    #[arg(long)]
    input: PathBuf,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Fail on unreadable numeric columns instead of skipping the record.
    #[arg(long)]
    strict: bool,
    /// Output both the schema and the parse report.
    #[arg(long)]
    with_report: bool,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct CompleteArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Case applied to display names.
    #[arg(long, default_value = "keep")]
    case: CliCase,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Name to resolve.
    name: String,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Settings YAML file.
    #[arg(long)]
    config: PathBuf,
}

/// What a name resolved to.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Resolved<'a> {
    Field {
        database: &'a str,
        table: &'a str,
        field: &'a Field,
    },
    Table {
        table: &'a Table,
    },
    Database {
        database: &'a Database,
    },
}

/// One line of `complete` output.
#[derive(Debug, Serialize)]
struct CompletionLine<'a> {
    text: &'a str,
    kind: schema_index_store::CompletionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<&'a str>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Validate(args) => run_validate(args),
        Command::Complete(args) => run_complete(args),
        Command::Resolve(args) => run_resolve(args),
        Command::Tables(args) => run_tables(args),
        Command::Extract(args) => run_extract(args),
        Command::Delete(args) => run_delete(args),
        Command::Path(args) => run_path(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let parser = if args.strict {
        DumpParser::strict()
    } else {
        DumpParser::new()
    };
    let outcome = parse_input(&args.input.input, &parser)?;
    print_warnings(&outcome);

    let output = if args.with_report {
        serde_json::json!({ "schema": outcome.snapshot, "report": outcome.report })
    } else {
        serde_json::to_value(&outcome.snapshot)
            .map_err(|e| format!("Failed to serialize schema: {e}"))?
    };
    println!("{}", format_output(&output, args.format)?);
    Ok(())
}

fn run_validate(args: InputArgs) -> Result<(), String> {
    let outcome = parse_input(&args.input, &DumpParser::new())?;
    print_warnings(&outcome);

    let snapshot = &outcome.snapshot;
    let problems = validate_snapshot(snapshot);
    for problem in &problems {
        eprintln!("  {problem}");
    }
    if !problems.is_empty() {
        return Err(format!("{} validation problem(s)", problems.len()));
    }

    println!(
        "Validated dump: {} database(s), {} table(s), {} field(s), {} sequence(s).",
        snapshot.databases.len(),
        snapshot.table_count(),
        snapshot.field_count(),
        snapshot.sequences.len()
    );
    Ok(())
}

fn run_complete(args: CompleteArgs) -> Result<(), String> {
    let store = load_store(&args.input.input, args.case.into())?;
    let index = store.completion_index();

    let lines: Vec<CompletionLine<'_>> = index
        .items()
        .iter()
        .filter_map(|&id| {
            let entry = index.get(id)?;
            Some(CompletionLine {
                text: &entry.display_text,
                kind: entry.kind,
                sub_text: entry.sub_text.as_deref(),
                children: index
                    .children(id)
                    .map(|child| child.display_text.as_str())
                    .collect(),
            })
        })
        .collect();

    let value =
        serde_json::to_value(&lines).map_err(|e| format!("Failed to serialize entries: {e}"))?;
    println!("{}", format_output(&value, args.format)?);
    Ok(())
}

fn run_resolve(args: ResolveArgs) -> Result<(), String> {
    let store = load_store(&args.input.input, CaseMode::Keep)?;
    let name = args.name.as_str();

    let resolved = if let Some((db, table, field)) = store.locate_field(name) {
        Resolved::Field {
            database: &db.name,
            table: &table.name,
            field,
        }
    } else if let Some(table) = store.find_table(name) {
        Resolved::Table { table }
    } else if let Some(database) = store.find_database(name) {
        Resolved::Database { database }
    } else {
        return Err(format!("'{name}' does not name a database, table or field"));
    };

    let raw = serde_json::to_string_pretty(&resolved)
        .map_err(|e| format!("Failed to serialize '{name}': {e}"))?;
    println!("{raw}");
    Ok(())
}

fn run_tables(args: InputArgs) -> Result<(), String> {
    let store = load_store(&args.input, CaseMode::Keep)?;
    for name in store.table_dictionary().keys() {
        println!("{name}");
    }
    Ok(())
}

fn run_extract(args: ConfigArgs) -> Result<(), String> {
    let settings = load_settings(&args.config)?;
    let executor = settings.process_executor().map_err(|e| e.to_string())?;

    let store = Arc::new(RwLock::new(SchemaStore::with_case_fold(
        settings.completion.case,
    )));
    let location = settings.location();
    let staging = location.folder().join(".staging");
    let orchestrator = ExtractionOrchestrator::builder(Arc::clone(&store), location, executor)
        .staging_dir(staging)
        .needs_connection(settings.extraction.needs_connection)
        .notifier(|n: Notification| eprintln!("{}: {}", n.severity, n.message))
        .build();

    let (done_tx, done_rx) = mpsc::channel();
    orchestrator
        .request_extraction(move || {
            let _ = done_tx.send(());
        })
        .map_err(|e| e.to_string())?;

    // The callback is dropped without running when the extraction fails.
    done_rx
        .recv()
        .map_err(|_| "extraction did not produce a usable dump".to_string())?;

    let store = store.read();
    println!(
        "Extracted '{}': {} database(s), {} table(s) into '{}'.",
        settings.environment.database,
        store.databases().len(),
        store.snapshot().table_count(),
        orchestrator.dump_path().display()
    );
    Ok(())
}

fn run_delete(args: ConfigArgs) -> Result<(), String> {
    let settings = load_settings(&args.config)?;
    let path = settings.location().path();
    if !LocalFiles.exists(&path) {
        println!("No dump at '{}'.", path.display());
        return Ok(());
    }
    LocalFiles
        .delete(&path)
        .map_err(|e| format!("Failed to delete '{}': {e}", path.display()))?;
    println!("Deleted '{}'.", path.display());
    Ok(())
}

fn run_path(args: ConfigArgs) -> Result<(), String> {
    let settings = load_settings(&args.config)?;
    println!("{}", settings.location().path().display());
    Ok(())
}

fn load_settings(path: &Path) -> Result<Settings, String> {
    let settings = Settings::load(path)
        .map_err(|e| format!("Failed to load '{}': {e}", path.display()))?;
    settings.validate().map_err(|e| e.to_string())?;
    Ok(settings)
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>, String> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).map_err(|e| format!("Failed to read '{}': {e}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn parse_input(path: &Path, parser: &DumpParser) -> Result<ParseOutcome, String> {
    let reader = open_input(path)?;
    parser
        .parse_reader(reader)
        .map_err(|e| format!("Failed to parse '{}': {e}", path.display()))
}

fn load_store(path: &Path, case: CaseMode) -> Result<SchemaStore, String> {
    let reader = open_input(path)?;
    let mut store = SchemaStore::with_case_fold(case);
    let report = store
        .refresh(Some(reader))
        .map_err(|e| format!("Failed to load '{}': {e}", path.display()))?;
    for warning in report.warnings() {
        eprintln!("warning: {warning}");
    }
    debug!(
        databases = store.databases().len(),
        tables = store.snapshot().table_count(),
        "Loaded dump"
    );
    Ok(store)
}

fn print_warnings(outcome: &ParseOutcome) {
    for warning in outcome.report.warnings() {
        eprintln!("warning: {warning}");
    }
    for skipped in &outcome.report.skipped {
        debug!(line = skipped.line, reason = ?skipped.reason, "Skipped record");
    }
}

fn format_output(value: &serde_json::Value, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use schema_index_core::SchemaSnapshot;

    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "schema-index",
            "complete",
            "--input",
            "a.dump",
            "--case",
            "upper",
            "--format",
            "yaml",
        ])
        .unwrap();
        match cli.command {
            Command::Complete(args) => {
                assert_eq!(args.input.input, PathBuf::from("a.dump"));
                assert_eq!(CaseMode::from(args.case), CaseMode::Upper);
                assert!(matches!(args.format, CliOutputFormat::Yaml));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli =
            Cli::try_parse_from(["schema-index", "resolve", "--input", "a.dump", "x.y", "-v"])
                .unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_resolved_serializes_with_kind() {
        let mut snapshot = SchemaSnapshot::default();
        snapshot.databases.push(Database::new("db", "p", "v"));
        let value = serde_json::to_value(Resolved::Database {
            database: &snapshot.databases[0],
        })
        .unwrap();
        assert_eq!(value["kind"], "database");
        assert_eq!(value["database"]["name"], "db");
    }
}
