//! The in-memory schema of the current environment.
//!
//! [`SchemaStore`] owns the latest [`SchemaSnapshot`], a lazily built
//! [`CompletionIndex`] over it, the case fold used for display names, and the
//! listeners told whenever any of these change.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use schema_index_store::{SchemaLookup, SchemaStore};
//!
//! let mut store = SchemaStore::new();
//! let updates = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&updates);
//! store.subscribe(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! let dump = "H\t2017-01-01\t00:00:00\tmydb\tphys\tv1\n\
//!             T\tcustomer\t1\tcrc1\tdump1\tdesc1\n";
//! store.refresh(Some(Cursor::new(dump))).unwrap();
//!
//! assert_eq!(updates.load(Ordering::SeqCst), 1);
//! assert!(store.find_table("mydb.customer").is_some());
//! assert_eq!(store.completion_index().len(), 2);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use schema_index_core::{CaseFold, CaseMode, Database, SchemaSnapshot, Sequence};
use schema_index_dump::{DumpParser, ParseOptions, ParseReport};
use tracing::{debug, info, warn};

use crate::completion::{CompletionIndex, CompletionKind, extend_table_dictionary};
use crate::error::Result;
use crate::files::DumpFiles;
use crate::resolver::SchemaLookup;

/// Callback run after every store update.
pub type Listener = Arc<dyn Fn() + Send + Sync + 'static>;

/// Handle returned by [`SchemaStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Listeners captured from a store, callable once the store is released.
#[derive(Clone, Default)]
pub struct Listeners(Vec<Listener>);

impl Listeners {
    /// Calls every listener, in subscription order.
    pub fn notify(&self) {
        for listener in &self.0 {
            listener();
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listeners").field(&self.0.len()).finish()
    }
}

/// Schema store.
///
/// Every state change (refresh, cache invalidation, case fold change) calls
/// each listener exactly once. Listeners run synchronously inside the
/// mutating call, so a listener must not try to lock a `RwLock` wrapping
/// this store. [`ExtractionOrchestrator`](crate::ExtractionOrchestrator)
/// releases its lock before notifying.
pub struct SchemaStore {
    snapshot: SchemaSnapshot,
    parser: DumpParser,
    case_fold: Box<dyn CaseFold>,
    completion: OnceLock<CompletionIndex>,
    subscribers: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Default for SchemaStore {
    fn default() -> Self {
        Self {
            snapshot: SchemaSnapshot::default(),
            parser: DumpParser::new(),
            case_fold: Box::new(CaseMode::Keep),
            completion: OnceLock::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }
}

impl fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaStore")
            .field("databases", &self.snapshot.databases.len())
            .field("sequences", &self.snapshot.sequences.len())
            .field("parser", &self.parser)
            .field("completion_cached", &self.completion.get().is_some())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl SchemaStore {
    /// Creates an empty store that keeps names as stored.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store folding display names with `fold`.
    pub fn with_case_fold(fold: impl CaseFold + 'static) -> Self {
        Self {
            case_fold: Box::new(fold),
            ..Self::default()
        }
    }

    /// Sets the options used by later refreshes.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parser = DumpParser::with_options(options);
        self
    }

    /// Replaces the schema.
    ///
    /// With `Some(source)` the schema is re-read from `source`; with `None`
    /// the store is emptied. Either way the completion cache is dropped and
    /// listeners are called once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dump`](crate::StoreError::Dump) when the dump
    /// cannot be read. The store is then left empty.
    pub fn refresh<R: BufRead>(&mut self, source: Option<R>) -> Result<ParseReport> {
        let result = self.reload(source);
        self.emit();
        result
    }

    /// Refreshes from the dump at `path`, emptying the store when there is
    /// none.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`](crate::StoreError::Io) when the file exists
    /// but cannot be opened, or any error of [`refresh`](Self::refresh).
    pub fn refresh_from_path(&mut self, files: &dyn DumpFiles, path: &Path) -> Result<ParseReport> {
        let result = self.reload_from_path(files, path);
        self.emit();
        result
    }

    pub(crate) fn reload_from_path(
        &mut self,
        files: &dyn DumpFiles,
        path: &Path,
    ) -> Result<ParseReport> {
        if !files.exists(path) {
            debug!(path = %path.display(), "No dump available");
            return self.reload(None::<&[u8]>);
        }
        match files.open(path) {
            Ok(reader) => self.reload(Some(reader)),
            Err(e) => {
                self.clear();
                Err(e.into())
            }
        }
    }

    fn reload<R: BufRead>(&mut self, source: Option<R>) -> Result<ParseReport> {
        self.clear();
        let Some(source) = source else {
            return Ok(ParseReport::default());
        };

        let outcome = self.parser.parse_reader(source)?;
        for warning in outcome.report.warnings() {
            warn!("{warning}");
        }
        self.snapshot = outcome.snapshot;
        info!(
            databases = self.snapshot.databases.len(),
            tables = self.snapshot.table_count(),
            sequences = self.snapshot.sequences.len(),
            "Schema refreshed"
        );
        Ok(outcome.report)
    }

    fn clear(&mut self) {
        self.snapshot.clear();
        self.completion = OnceLock::new();
    }

    /// Drops the completion cache so the next access rebuilds it.
    pub fn invalidate_completion_cache(&mut self) {
        self.completion = OnceLock::new();
        self.emit();
    }

    /// Replaces the case fold used for completion display names.
    pub fn set_case_fold(&mut self, fold: impl CaseFold + 'static) {
        self.case_fold = Box::new(fold);
        self.invalidate_completion_cache();
    }

    /// Completion entries of the current schema, built on first use.
    pub fn completion_index(&self) -> &CompletionIndex {
        self.completion
            .get_or_init(|| CompletionIndex::build(&self.snapshot, self.case_fold.as_ref()))
    }

    /// Bare and database-qualified table names. Recomputed on every call.
    pub fn table_dictionary(&self) -> BTreeMap<String, CompletionKind> {
        let mut dictionary = BTreeMap::new();
        self.extend_table_dictionary(&mut dictionary);
        dictionary
    }

    /// Adds table names to `dictionary` without overwriting existing keys.
    pub fn extend_table_dictionary(&self, dictionary: &mut BTreeMap<String, CompletionKind>) {
        extend_table_dictionary(&self.snapshot, dictionary);
    }

    /// Registers `listener` to run after every update.
    pub fn subscribe(&mut self, listener: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// The current listeners, to be notified after a lock is released.
    pub(crate) fn listeners(&self) -> Listeners {
        Listeners(self.subscribers.iter().map(|(_, l)| Arc::clone(l)).collect())
    }

    fn emit(&self) {
        self.listeners().notify();
    }

    pub fn snapshot(&self) -> &SchemaSnapshot {
        &self.snapshot
    }

    pub fn databases(&self) -> &[Database] {
        &self.snapshot.databases
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.snapshot.sequences
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}

impl SchemaLookup for SchemaStore {
    fn schema(&self) -> &SchemaSnapshot {
        &self.snapshot
    }
}
