//! Settings for one schema-index environment.
//!
//! Defines the YAML-serializable configuration naming the environment whose
//! dump is managed, where dumps are stored, how completion text is cased and
//! how the extraction program is run.
//!
//! # Example YAML
//!
//! ```yaml
//! environment:
//!   name: prod
//!   suffix: eu
//!   database: sports
//! storage:
//!   folder: /var/lib/schema-index
//! completion:
//!   case: upper
//! extraction:
//!   program: /opt/tools/dump-schema
//!   args: ["--out", "{output}"]
//!   timeout_secs: 600
//!   needs_connection: true
//! ```
//!
//! Every section is optional and falls back to its [`Default`].

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use schema_index_core::CaseMode;
use schema_index_dump::extractor::ProcessExecutor;
use schema_index_dump::storage::{DumpLocation, EnvironmentKey};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Where managed dumps are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Storage folder. Defaults to [`DumpLocation::default_folder`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,
}

impl StorageSettings {
    /// The configured folder, or the default one.
    pub fn folder(&self) -> PathBuf {
        self.folder
            .clone()
            .unwrap_or_else(DumpLocation::default_folder)
    }
}

/// How completion entries are presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSettings {
    #[serde(default)]
    pub case: CaseMode,
}

/// How the external extraction program is run.
///
/// # Examples
///
/// ```
/// # use schema_index_store::ExtractionSettings;
/// let extraction = ExtractionSettings::default();
/// assert!(extraction.program.is_none());
/// assert!(extraction.needs_connection);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Program that writes the dump.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    /// Program arguments; `{output}` is replaced by the dump path.
    pub args: Vec<String>,
    /// Kill the program after this many seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// The program must connect to the databases.
    pub needs_connection: bool,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_secs: None,
            needs_connection: true,
        }
    }
}

/// Top-level settings.
///
/// # Examples
///
/// ```no_run
/// use schema_index_store::Settings;
///
/// let settings = Settings::load("schema-index.yml").unwrap();
/// settings.validate().unwrap();
/// println!("dump lives at {}", settings.location().path().display());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: EnvironmentKey,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub completion: CompletionSettings,
    #[serde(default)]
    pub extraction: ExtractionSettings,
}

impl Settings {
    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](StoreError::Io) if the file cannot be read, or
    /// [`Yaml`](StoreError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let settings = serde_yaml::from_reader(reader)?;
        Ok(settings)
    }

    /// Saves the settings as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](StoreError::Io) if the file cannot be written, or
    /// [`Yaml`](StoreError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks that the settings identify an environment.
    ///
    /// # Errors
    ///
    /// Returns [`Config`](StoreError::Config) when the environment name or
    /// database is empty, or when an extraction program is configured with
    /// an empty path.
    pub fn validate(&self) -> Result<()> {
        if self.environment.name.trim().is_empty() {
            return Err(StoreError::Config("environment.name is empty".into()));
        }
        if self.environment.database.trim().is_empty() {
            return Err(StoreError::Config("environment.database is empty".into()));
        }
        if let Some(program) = &self.extraction.program {
            if program.as_os_str().is_empty() {
                return Err(StoreError::Config("extraction.program is empty".into()));
            }
        }
        Ok(())
    }

    /// Managed dump location of the configured environment.
    pub fn location(&self) -> DumpLocation {
        DumpLocation::new(self.storage.folder(), self.environment.clone())
    }

    /// Builds the process executor described by the `extraction` section.
    ///
    /// # Errors
    ///
    /// Returns [`Config`](StoreError::Config) when no program is configured.
    pub fn process_executor(&self) -> Result<ProcessExecutor> {
        let program = self
            .extraction
            .program
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| StoreError::Config("extraction.program is not set".into()))?;

        let mut executor = ProcessExecutor::new(program).with_args(self.extraction.args.clone());
        if let Some(secs) = self.extraction.timeout_secs {
            executor = executor.with_timeout(Duration::from_secs(secs));
        }
        Ok(executor)
    }
}
