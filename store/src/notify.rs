//! User-facing notifications raised by the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// How prominent a notification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub title: String,
    /// Groups related notifications so a host can replace older ones.
    pub category: String,
}

impl Notification {
    pub fn new(
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            severity,
            title: title.into(),
            category: category.into(),
        }
    }
}

/// Receives notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<F> Notifier for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Notifier that writes every notification to the `tracing` log.
///
/// Info and success go out at `INFO`, warnings at `WARN`, errors at `ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Info | Severity::Success => {
                info!(category = %n.category, severity = %n.severity, title = %n.title, "{}", n.message)
            }
            Severity::Warning => {
                warn!(category = %n.category, title = %n.title, "{}", n.message)
            }
            Severity::Error => {
                error!(category = %n.category, title = %n.title, "{}", n.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_closure_notifier() {
        let seen = Mutex::new(Vec::new());
        let notifier = |n: Notification| seen.lock().push(n.severity);
        notifier.notify(Notification::new(Severity::Warning, "t", "m", "c"));
        TracingNotifier.notify(Notification::new(Severity::Error, "t", "m", "c"));
        assert_eq!(*seen.lock(), vec![Severity::Warning]);
    }

    #[test]
    fn test_severity_display_and_fields() {
        assert_eq!(Severity::Success.to_string(), "success");
        let n = Notification::new(Severity::Info, "Schema", "ready", "schema-extraction");
        assert_eq!(n.title, "Schema");
        assert_eq!(n.message, "ready");
    }
}
