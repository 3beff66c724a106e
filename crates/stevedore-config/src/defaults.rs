//! Built-in defaults applied before any configuration layer is merged.

use crate::logging::LogFormat;
use crate::scope::ScopeSelector;

/// Image or container name managed when none is configured.
pub const DEFAULT_INSTANCE_NAME: &str = "flask-reverse-api";

/// Port mapping forwarded to the launch command when none is configured.
pub const DEFAULT_PORT_MAPPING: &str = "8000:8000";

/// Container runtime binary used to query, launch, and stop instances.
pub const DEFAULT_RUNTIME_BINARY: &str = "docker";

/// Pause after issuing the launch command, in milliseconds.
pub const DEFAULT_START_GRACE_MS: u64 = 2_500;

/// Pause after issuing the stop command, in milliseconds.
pub const DEFAULT_STOP_GRACE_MS: u64 = 1_500;

/// First wait between polling attempts, in milliseconds.
pub const DEFAULT_RETRY_INITIAL_MS: u64 = 1_000;

/// Cap applied to the wait between polling attempts, in milliseconds.
pub const DEFAULT_RETRY_MAX_MS: u64 = 10_000;

/// Growth factor applied to successive waits.
pub const DEFAULT_RETRY_MULTIPLIER: u32 = 2;

/// Maximum number of polling attempts before a transition is abandoned.
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 10;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default lifecycle scope.
pub fn default_instance_scope() -> ScopeSelector {
    ScopeSelector::Session
}
