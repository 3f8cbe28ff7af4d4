//! Managed storage location for extracted dumps.
//!
//! Each environment keeps exactly one dump file, named after the environment
//! triple `(name, suffix, database)`. Names are made filesystem-safe and
//! lower-cased so that the same environment always maps to the same file
//! regardless of how its identifiers are capitalised.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Extension of every managed dump file.
pub const DUMP_EXTENSION: &str = "dump";

static INVALID_FILE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("static regex must compile")
});

/// Identifies the environment a dump was extracted from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentKey {
    pub name: String,
    #[serde(default)]
    pub suffix: String,
    pub database: String,
}

impl EnvironmentKey {
    pub fn new(
        name: impl Into<String>,
        suffix: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            suffix: suffix.into(),
            database: database.into(),
        }
    }

    /// File name of this environment's dump.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_index_dump::storage::EnvironmentKey;
    ///
    /// let key = EnvironmentKey::new("Prod", "EU", "sports:main");
    /// assert_eq!(key.file_name(), "prod_eu_sports_main.dump");
    /// ```
    pub fn file_name(&self) -> String {
        let joined = format!("{}_{}_{}", self.name, self.suffix, self.database);
        format!(
            "{}.{DUMP_EXTENSION}",
            sanitize_file_name(&joined).to_lowercase()
        )
    }
}

/// Where the dump of one environment lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpLocation {
    folder: PathBuf,
    key: EnvironmentKey,
}

impl DumpLocation {
    pub fn new(folder: impl Into<PathBuf>, key: EnvironmentKey) -> Self {
        Self {
            folder: folder.into(),
            key,
        }
    }

    /// Default storage folder (`$XDG_DATA_HOME/schema-index/`).
    pub fn default_folder() -> PathBuf {
        data_dir().join("schema-index")
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn key(&self) -> &EnvironmentKey {
        &self.key
    }

    /// Full path of the managed dump file.
    pub fn path(&self) -> PathBuf {
        self.folder.join(self.key.file_name())
    }
}

/// Replaces characters that are not allowed in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    INVALID_FILE_CHARS.replace_all(name, "_").into_owned()
}

fn data_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
