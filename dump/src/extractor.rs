//! External extraction of schema dumps.
//!
//! Producing a dump requires a live connection to the databases, which this
//! crate does not have. Extraction is delegated to an [`Executor`]: it is
//! handed an [`ExtractionRequest`] naming where the dump must be written and
//! reports back through a completion callback, possibly from another thread.
//!
//! [`ProcessExecutor`] is the stock executor. It runs a configured program
//! in the background, tells it where to write through the
//! `SCHEMA_INDEX_OUTPUT` environment variable (and through any `{output}`
//! placeholder in its arguments), and reports success when the program exits
//! with status 0 and the dump exists.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::mpsc;
//!
//! use schema_index_dump::extractor::{Executor, ExtractionRequest, ProcessExecutor};
//!
//! let executor = ProcessExecutor::new("dump-schema").with_args(["--out", "{output}"]);
//! let (tx, rx) = mpsc::channel();
//! let started = executor.execute(
//!     ExtractionRequest {
//!         needs_connection: true,
//!         output_path: PathBuf::from("/tmp/prod.dump"),
//!     },
//!     Box::new(move |outcome| {
//!         let _ = tx.send(outcome);
//!     }),
//! );
//! if started {
//!     println!("{:?}", rx.recv());
//! }
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Environment variable carrying the output path to the extraction program.
pub const OUTPUT_ENV: &str = "SCHEMA_INDEX_OUTPUT";
/// Environment variable set to `1` when the extraction needs a live connection.
pub const CONNECT_ENV: &str = "SCHEMA_INDEX_CONNECT";
/// Argument placeholder replaced by the output path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Maximum number of stderr bytes kept for a failure reason.
const STDERR_TAIL_BYTES: usize = 2048;

/// What the executor is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// The extraction must connect to the databases.
    pub needs_connection: bool,
    /// Where the dump must be written.
    pub output_path: PathBuf,
}

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The dump was written to `artifact`.
    Succeeded { artifact: PathBuf },
    /// The execution ended without producing a usable dump.
    Failed { reason: String },
}

/// Callback invoked exactly once when an execution ends.
pub type CompletionCallback = Box<dyn FnOnce(ExecutionOutcome) + Send + 'static>;

/// Runs extractions on behalf of the orchestrator.
pub trait Executor: Send + Sync {
    /// Starts an extraction.
    ///
    /// Returns `false` when nothing was started; `on_complete` is then never
    /// called. Otherwise `on_complete` is called once, from any thread.
    fn execute(&self, request: ExtractionRequest, on_complete: CompletionCallback) -> bool;
}

/// Executor that runs an external program.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Sets the program arguments. `{output}` is replaced by the output path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kills the program if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn command(&self, request: &ExtractionRequest) -> Command {
        let output = request.output_path.to_string_lossy();
        let mut command = Command::new(&self.program);
        command
            .args(self.args.iter().map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output)))
            .env(OUTPUT_ENV, &request.output_path)
            .env(CONNECT_ENV, if request.needs_connection { "1" } else { "0" })
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, request: ExtractionRequest, on_complete: CompletionCallback) -> bool {
        let mut child = match self.command(&request).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.program.display(), error = %e, "Failed to start extraction");
                return false;
            }
        };
        info!(
            program = %self.program.display(),
            output = %request.output_path.display(),
            "Started extraction"
        );

        let timeout = self.timeout;
        let output_path = request.output_path;
        let spawned = std::thread::Builder::new()
            .name("schema-extraction".into())
            .spawn(move || {
                let outcome = wait_for_extraction(&mut child, timeout, &output_path);
                debug!(outcome = ?outcome, "Extraction finished");
                on_complete(outcome);
            });

        match spawned {
            Ok(_) => true,
            Err(e) => {
                // The closure owning the child was dropped with the failed spawn;
                // the process keeps running unobserved.
                warn!(error = %e, "Failed to start extraction watcher");
                false
            }
        }
    }
}

fn wait_for_extraction(
    child: &mut Child,
    timeout: Option<Duration>,
    output_path: &Path,
) -> ExecutionOutcome {
    // Drain stderr in the background so a chatty program cannot fill the pipe
    // and block before it exits.
    let stderr_thread = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let status = match timeout {
        Some(limit) => match child.wait_timeout(limit) {
            Ok(Some(status)) => Ok(status),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return ExecutionOutcome::Failed {
                    reason: format!("extraction timed out after {limit:?}"),
                };
            }
            Err(e) => Err(e),
        },
        None => child.wait(),
    };

    let stderr = stderr_thread
        .and_then(|t| t.join().ok())
        .map(|buf| stderr_tail(&buf))
        .unwrap_or_default();

    match status {
        Ok(status) if status.success() => {
            if output_path.exists() {
                ExecutionOutcome::Succeeded {
                    artifact: output_path.to_path_buf(),
                }
            } else {
                ExecutionOutcome::Failed {
                    reason: format!("no dump written to {}", output_path.display()),
                }
            }
        }
        Ok(status) => ExecutionOutcome::Failed {
            reason: if stderr.is_empty() {
                format!("extraction exited with {status}")
            } else {
                format!("extraction exited with {status}: {stderr}")
            },
        },
        Err(e) => ExecutionOutcome::Failed {
            reason: format!("extraction wait failed: {e}"),
        },
    }
}

fn stderr_tail(buf: &[u8]) -> String {
    let start = buf.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&buf[start..]).trim().to_string()
}
