pub mod collector;
pub mod metrics;
pub mod monitor;
pub mod setup;
pub mod telemetry;

pub use collector::{MetricsCollector, MetricsSnapshot};
pub use metrics::NodeMetrics;
pub use monitor::NodeMonitor;
pub use setup::HostApplication;
pub use telemetry::{CapturedEvent, RecordingTelemetry, Telemetry, TracingTelemetry};
