//! Process-level logging setup for hosts embedding the node library.

use serde::{Deserialize, Serialize};

pub const FALLBACK_HOST_APPLICATION: &str = "other (Rust)";
pub const DEFAULT_VERSIONED_HOST_APPLICATION: &str = "Other";

/// Host application the library runs inside, attached to every log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostApplication {
    pub name: String,
    pub versioned_name: String,
}

impl HostApplication {
    pub fn new(name: impl Into<String>, versioned_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versioned_name: versioned_name.into(),
        }
    }

    /// Name of the current executable, or a generic fallback
    pub fn detect() -> Self {
        let name = std::env::current_exe()
            .ok()
            .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_HOST_APPLICATION.to_string());

        Self::new(name, DEFAULT_VERSIONED_HOST_APPLICATION)
    }
}

impl Default for HostApplication {
    fn default() -> Self {
        Self::detect()
    }
}

/// Install the global `tracing` subscriber.
///
/// Verbosity comes from `RUST_LOG` (default `info`). Calling this more than once,
/// or after another subscriber was installed, is a no-op.
#[cfg(feature = "logging")]
pub fn init(host: &HostApplication) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            host = %host.name,
            versioned_host = %host.versioned_name,
            "logging initialized"
        );
    }
}

#[cfg(not(feature = "logging"))]
pub fn init(host: &HostApplication) {
    tracing::debug!(host = %host.name, "logging feature disabled, no subscriber installed");
}
