use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Failure raised by a converter, with an optional inner cause
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    pub message: String,
    pub inner: Option<String>,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            inner: None,
        }
    }

    pub fn with_inner(mut self, inner: impl fmt::Display) -> Self {
        self.inner = Some(inner.to_string());
        self
    }

    /// Text surfaced to the user: `message: inner` when a cause is known
    pub fn report(&self) -> String {
        match &self.inner {
            Some(inner) => format!("{}: {}", self.message, inner),
            None => self.message.clone(),
        }
    }
}

/// Append-only queue of conversion errors shared by all tasks of a tick.
///
/// Tasks push while they run; the control thread drains once per collect call.
#[derive(Debug, Clone, Default)]
pub struct ConversionErrors {
    queue: Arc<Mutex<Vec<ConversionError>>>,
}

impl ConversionErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, error: ConversionError) {
        self.lock().push(error);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take every queued error, in the order they were produced
    pub fn drain(&self) -> Vec<ConversionError> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConversionError>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
