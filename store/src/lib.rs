//! Schema store, name resolution and completion index for database schema
//! dumps.
//!
//! This crate keeps the schema of one environment in memory and serves it to
//! editor features:
//!
//! - [`SchemaStore`] holds the parsed schema, refreshes it from a dump and
//!   tells subscribers when it changed.
//! - [`SchemaLookup`] resolves `TABLE`, `DB.TABLE`, `TABLE.FIELD` and
//!   `DB.TABLE.FIELD` names case-insensitively.
//! - [`CompletionIndex`] projects the schema into autocomplete entries.
//! - [`ExtractionOrchestrator`] produces fresh dumps one at a time and reloads
//!   the store when they land.
//! - [`Settings`] is the YAML configuration tying these together.
//!
//! # Quick start
//!
//! ```no_run
//! use schema_index_store::{LocalFiles, SchemaLookup, SchemaStore, Settings};
//!
//! let settings = Settings::load("schema-index.yml").unwrap();
//! let mut store = SchemaStore::with_case_fold(settings.completion.case);
//! store
//!     .refresh_from_path(&LocalFiles, &settings.location().path())
//!     .unwrap();
//!
//! if let Some(field) = store.find_field("customer.custnum") {
//!     println!("{} is {}", field.name, field.resolved_type);
//! }
//! for entry in store.completion_index().iter() {
//!     println!("{}", entry.display_text);
//! }
//! ```

mod completion;
mod config;
mod error;
mod files;
mod notify;
mod orchestrator;
mod resolver;
mod store;

pub use completion::{
    CHILD_SEPARATOR, CompletionEntry, CompletionIndex, CompletionKind, EntryId, EntryOrigin,
    extend_table_dictionary, table_dictionary,
};
pub use config::{CompletionSettings, ExtractionSettings, Settings, StorageSettings};
pub use error::{Result, StoreError};
pub use files::{DumpFiles, LocalFiles};
pub use notify::{Notification, Notifier, Severity, TracingNotifier};
pub use orchestrator::{
    DoneCallback, ExtractionOrchestrator, ExtractionRejected, ExtractionState,
    NOTIFICATION_CATEGORY, OrchestratorBuilder,
};
pub use resolver::{
    MAX_SEGMENTS, NameError, QualifiedName, SchemaLookup, find_field_in, find_table_in,
};
pub use store::{Listener, Listeners, SchemaStore, SubscriptionId};
