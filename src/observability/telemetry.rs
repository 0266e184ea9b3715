use std::error::Error;
use std::sync::{Arc, Mutex};

/// Sink for failures worth reporting beyond the node's own diagnostics.
///
/// Handed to every merge task instead of living in a process-wide static.
pub trait Telemetry: Send + Sync {
    fn capture_error(&self, context: &str, error: &dyn Error);

    fn capture_fault(&self, context: &str, message: &str);
}

/// Default telemetry: everything goes to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn capture_error(&self, context: &str, error: &dyn Error) {
        tracing::warn!(context, error = %error, "captured error");
    }

    fn capture_fault(&self, context: &str, message: &str) {
        tracing::error!(context, fault = message, "captured fault");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedEvent {
    Error { context: String, message: String },
    Fault { context: String, message: String },
}

/// Keeps captured events in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingTelemetry {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn push(&self, event: CapturedEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

impl Telemetry for RecordingTelemetry {
    fn capture_error(&self, context: &str, error: &dyn Error) {
        self.push(CapturedEvent::Error {
            context: context.to_string(),
            message: error.to_string(),
        });
    }

    fn capture_fault(&self, context: &str, message: &str) {
        self.push(CapturedEvent::Fault {
            context: context.to_string(),
            message: message.to_string(),
        });
    }
}
