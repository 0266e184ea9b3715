use crate::convert::Converter;
use crate::core::Diagnostics;
use crate::observability::{Telemetry, TracingTelemetry};
use std::sync::Arc;

/// Collaborators for one tick, passed to every invocation and merge task
#[derive(Clone)]
pub struct TickContext {
    pub diagnostics: Diagnostics,
    pub converter: Option<Arc<dyn Converter>>,
    pub telemetry: Arc<dyn Telemetry>,
}

impl TickContext {
    pub fn new() -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            converter: None,
            telemetry: Arc::new(TracingTelemetry),
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl Default for TickContext {
    fn default() -> Self {
        Self::new()
    }
}
