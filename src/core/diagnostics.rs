use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Runtime message levels surfaced by the host on the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Remark,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Remark => "Remark",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Shared diagnostics sink.
///
/// Cloning shares the same buffer, so the control thread and every merge task
/// of a tick report into one list.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Remark => tracing::debug!(%severity, "{}", message),
            Severity::Warning => tracing::warn!(%severity, "{}", message),
            Severity::Error => tracing::error!(%severity, "{}", message),
        }
        self.lock().push(Diagnostic { severity, message });
    }

    pub fn remark(&self, message: impl Into<String>) {
        self.add(Severity::Remark, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.add(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.add(Severity::Error, message);
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lock().iter().filter(|d| d.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
