//! Single-flight schema extraction.
//!
//! [`ExtractionOrchestrator`] asks an [`Executor`] to write a fresh dump,
//! copies the result into the environment's managed [`DumpLocation`],
//! refreshes the shared [`SchemaStore`] and tells the user how it went
//! through a [`Notifier`]. At most one extraction runs at a time; a request
//! made while one is running is rejected.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use parking_lot::RwLock;
//! use schema_index_dump::extractor::ProcessExecutor;
//! use schema_index_dump::storage::{DumpLocation, EnvironmentKey};
//! use schema_index_store::{ExtractionOrchestrator, SchemaStore};
//!
//! let store = Arc::new(RwLock::new(SchemaStore::new()));
//! let location = DumpLocation::new("/var/lib/schema-index", EnvironmentKey::new("prod", "", "sports"));
//! let orchestrator = ExtractionOrchestrator::builder(
//!     Arc::clone(&store),
//!     location,
//!     ProcessExecutor::new("dump-schema").with_args(["{output}"]),
//! )
//! .build();
//!
//! orchestrator
//!     .request_extraction(|| println!("schema ready"))
//!     .unwrap();
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use schema_index_dump::ParseReport;
use schema_index_dump::extractor::{ExecutionOutcome, Executor, ExtractionRequest};
use schema_index_dump::storage::DumpLocation;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::Result;
use crate::files::{DumpFiles, LocalFiles};
use crate::notify::{Notification, Notifier, Severity, TracingNotifier};
use crate::store::{Listeners, SchemaStore};

/// Category shared by every notification the orchestrator raises.
pub const NOTIFICATION_CATEGORY: &str = "schema-extraction";

const NOTIFICATION_TITLE: &str = "Database schema";

/// Callback run once after a successful extraction.
pub type DoneCallback = Box<dyn FnOnce() + Send + 'static>;

/// Extraction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionState {
    Idle,
    Extracting,
}

/// Why [`ExtractionOrchestrator::request_extraction`] did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractionRejected {
    #[error("an extraction is already running")]
    Busy,
    #[error("the extraction could not be started")]
    NotStarted,
}

struct Flight {
    state: ExtractionState,
    on_done: Option<DoneCallback>,
}

struct Inner {
    store: Arc<RwLock<SchemaStore>>,
    location: DumpLocation,
    staging_dir: PathBuf,
    needs_connection: bool,
    executor: Box<dyn Executor>,
    files: Box<dyn DumpFiles>,
    notifier: Box<dyn Notifier>,
    flight: Mutex<Flight>,
}

/// Builder for [`ExtractionOrchestrator`].
pub struct OrchestratorBuilder {
    store: Arc<RwLock<SchemaStore>>,
    location: DumpLocation,
    executor: Box<dyn Executor>,
    files: Box<dyn DumpFiles>,
    notifier: Box<dyn Notifier>,
    staging_dir: Option<PathBuf>,
    needs_connection: bool,
}

impl OrchestratorBuilder {
    /// Replaces [`LocalFiles`].
    pub fn files(mut self, files: impl DumpFiles + 'static) -> Self {
        self.files = Box::new(files);
        self
    }

    /// Replaces [`TracingNotifier`].
    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Folder the executor writes into before the dump is copied to its
    /// managed location. Defaults to `schema-index` under the system temp
    /// folder.
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Whether extractions need a live connection. Defaults to `true`.
    pub fn needs_connection(mut self, needs_connection: bool) -> Self {
        self.needs_connection = needs_connection;
        self
    }

    pub fn build(self) -> ExtractionOrchestrator {
        ExtractionOrchestrator {
            inner: Arc::new(Inner {
                store: self.store,
                location: self.location,
                staging_dir: self
                    .staging_dir
                    .unwrap_or_else(|| std::env::temp_dir().join("schema-index")),
                needs_connection: self.needs_connection,
                executor: self.executor,
                files: self.files,
                notifier: self.notifier,
                flight: Mutex::new(Flight {
                    state: ExtractionState::Idle,
                    on_done: None,
                }),
            }),
        }
    }
}

/// Runs extractions for one environment and keeps its store current.
///
/// Cloning yields another handle to the same orchestrator.
#[derive(Clone)]
pub struct ExtractionOrchestrator {
    inner: Arc<Inner>,
}

impl ExtractionOrchestrator {
    pub fn builder(
        store: Arc<RwLock<SchemaStore>>,
        location: DumpLocation,
        executor: impl Executor + 'static,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            store,
            location,
            executor: Box::new(executor),
            files: Box::new(LocalFiles),
            notifier: Box::new(TracingNotifier),
            staging_dir: None,
            needs_connection: true,
        }
    }

    /// Starts an extraction.
    ///
    /// `on_done` runs once, after the store has been refreshed with the new
    /// dump, and before the orchestrator returns to idle. It is dropped
    /// without running if the extraction fails.
    ///
    /// # Errors
    ///
    /// [`ExtractionRejected::Busy`] when an extraction is already running,
    /// [`ExtractionRejected::NotStarted`] when the executor could not start.
    pub fn request_extraction(
        &self,
        on_done: impl FnOnce() + Send + 'static,
    ) -> std::result::Result<(), ExtractionRejected> {
        let inner = &self.inner;
        {
            let mut flight = inner.flight.lock();
            if flight.state == ExtractionState::Extracting {
                drop(flight);
                inner.notify(
                    Severity::Warning,
                    "An extraction is already running, please wait for it to finish.",
                );
                return Err(ExtractionRejected::Busy);
            }
            flight.state = ExtractionState::Extracting;
            flight.on_done = Some(Box::new(on_done));
        }

        let database = &inner.location.key().database;
        inner.notify(
            Severity::Info,
            format!("Extracting the schema of {database}, this can take a while."),
        );

        if let Err(e) = inner.files.ensure_dir(&inner.staging_dir) {
            drop(inner.land());
            inner.notify(
                Severity::Error,
                format!("Could not prepare {}: {e}", inner.staging_dir.display()),
            );
            return Err(ExtractionRejected::NotStarted);
        }

        let request = ExtractionRequest {
            needs_connection: inner.needs_connection,
            output_path: inner.staging_dir.join(inner.location.key().file_name()),
        };
        let handle = Arc::clone(inner);
        let started = inner
            .executor
            .execute(request, Box::new(move |outcome| handle.complete(outcome)));

        if !started {
            drop(inner.land());
            inner.notify(Severity::Error, "The schema extraction could not be started.");
            return Err(ExtractionRejected::NotStarted);
        }
        Ok(())
    }

    /// Deletes the managed dump, then refreshes the store, which leaves it
    /// empty.
    ///
    /// A failed delete is reported through the notifier, not returned.
    pub fn delete_current(&self) -> Result<ParseReport> {
        let inner = &self.inner;
        let path = inner.location.path();
        if inner.files.exists(&path) {
            match inner.files.delete(&path) {
                Ok(()) => info!(path = %path.display(), "Deleted schema dump"),
                Err(e) => inner.notify(
                    Severity::Error,
                    format!("Could not delete {}: {e}", path.display()),
                ),
            }
        }
        inner.refresh()
    }

    /// Reloads the store from the managed dump.
    pub fn refresh(&self) -> Result<ParseReport> {
        self.inner.refresh()
    }

    pub fn state(&self) -> ExtractionState {
        self.inner.flight.lock().state
    }

    pub fn is_extracting(&self) -> bool {
        self.state() == ExtractionState::Extracting
    }

    /// Path of the managed dump.
    pub fn dump_path(&self) -> PathBuf {
        self.inner.location.path()
    }

    pub fn location(&self) -> &DumpLocation {
        &self.inner.location
    }

    pub fn store(&self) -> &Arc<RwLock<SchemaStore>> {
        &self.inner.store
    }
}

impl Inner {
    fn notify(&self, severity: Severity, message: impl Into<String>) {
        self.notifier.notify(Notification::new(
            severity,
            NOTIFICATION_TITLE,
            message,
            NOTIFICATION_CATEGORY,
        ));
    }

    /// Returns to idle, handing back the pending callback.
    fn land(&self) -> Option<DoneCallback> {
        let mut flight = self.flight.lock();
        flight.state = ExtractionState::Idle;
        flight.on_done.take()
    }

    fn refresh(&self) -> Result<ParseReport> {
        let (result, listeners) = self.reload();
        listeners.notify();
        result
    }

    /// Reloads under the write lock and returns the listeners to call once
    /// it is released.
    fn reload(&self) -> (Result<ParseReport>, Listeners) {
        let mut store = self.store.write();
        let result = store.reload_from_path(self.files.as_ref(), &self.location.path());
        (result, store.listeners())
    }

    fn complete(&self, outcome: ExecutionOutcome) {
        let artifact = match outcome {
            ExecutionOutcome::Succeeded { artifact } => artifact,
            ExecutionOutcome::Failed { reason } => {
                drop(self.land());
                self.notify(
                    Severity::Warning,
                    format!("The schema extraction failed: {reason}"),
                );
                return;
            }
        };

        let target = self.location.path();
        if let Err(e) = self.files.copy(&artifact, &target) {
            drop(self.land());
            self.notify(
                Severity::Error,
                format!(
                    "Could not copy {} to {}: {e}",
                    artifact.display(),
                    target.display()
                ),
            );
            return;
        }
        self.discard_artifact(&artifact, &target);

        let (result, listeners) = self.reload();
        listeners.notify();

        // Still extracting while the callback runs.
        let on_done = self.flight.lock().on_done.take();
        match result {
            Ok(report) => {
                let database = &self.location.key().database;
                self.notify(
                    Severity::Success,
                    format!(
                        "The schema of {database} was updated ({} tables).",
                        self.store.read().snapshot().table_count()
                    ),
                );
                for warning in report.warnings() {
                    self.notify(Severity::Warning, warning);
                }
                if let Some(on_done) = on_done {
                    on_done();
                }
                drop(self.land());
            }
            Err(e) => {
                drop(on_done);
                drop(self.land());
                self.notify(
                    Severity::Error,
                    format!("The extracted schema could not be loaded: {e}"),
                );
            }
        }
    }

    fn discard_artifact(&self, artifact: &Path, target: &Path) {
        if artifact == target {
            return;
        }
        if let Err(e) = self.files.delete(artifact) {
            debug!(path = %artifact.display(), error = %e, "Could not remove extraction output");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use schema_index_dump::extractor::CompletionCallback;
    use schema_index_dump::storage::EnvironmentKey;

    use super::*;

    /// Executor that remembers the completion instead of running anything.
    #[derive(Clone, Default)]
    struct Parked {
        pending: Arc<Mutex<Option<CompletionCallback>>>,
    }

    impl Executor for Parked {
        fn execute(&self, _request: ExtractionRequest, on_complete: CompletionCallback) -> bool {
            *self.pending.lock() = Some(on_complete);
            true
        }
    }

    struct Refusing;

    impl Executor for Refusing {
        fn execute(&self, _request: ExtractionRequest, _on_complete: CompletionCallback) -> bool {
            false
        }
    }

    fn orchestrator(executor: impl Executor + 'static) -> (ExtractionOrchestrator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let location = DumpLocation::new(dir.path(), EnvironmentKey::new("dev", "", "sports"));
        let orchestrator = ExtractionOrchestrator::builder(
            Arc::new(RwLock::new(SchemaStore::new())),
            location,
            executor,
        )
        .staging_dir(dir.path().join("staging"))
        .notifier(|_: Notification| {})
        .build();
        (orchestrator, dir)
    }

    #[test]
    fn test_second_request_is_busy() {
        let parked = Parked::default();
        let (orchestrator, _dir) = orchestrator(parked.clone());

        orchestrator.request_extraction(|| {}).unwrap();
        assert!(orchestrator.is_extracting());
        assert_eq!(
            orchestrator.request_extraction(|| {}),
            Err(ExtractionRejected::Busy)
        );

        let complete = parked.pending.lock().take().unwrap();
        complete(ExecutionOutcome::Failed {
            reason: "no connection".into(),
        });
        assert_eq!(orchestrator.state(), ExtractionState::Idle);
    }

    #[test]
    fn test_refused_start_returns_to_idle() {
        let (orchestrator, _dir) = orchestrator(Refusing);
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let result = orchestrator.request_extraction(move || flag.store(true, Ordering::SeqCst));
        assert_eq!(result, Err(ExtractionRejected::NotStarted));
        assert!(!orchestrator.is_extracting());
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_dump_path_follows_location() {
        let (orchestrator, dir) = orchestrator(Refusing);
        assert_eq!(orchestrator.dump_path(), dir.path().join("dev__sports.dump"));
    }
}
