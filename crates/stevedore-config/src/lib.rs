//! Shared configuration for the stevedore lifecycle controller.
//!
//! [`Config`] is assembled by `ortho_config` from four layers, lowest
//! precedence first: the built-in defaults in [`defaults`], a TOML file named
//! by `--config-path` or `STEVEDORE_CONFIG_PATH`, `STEVEDORE_*` environment
//! variables, and command-line flags. Both the lifecycle library and the CLI
//! read the same structure so an embedding test harness and an operator at a
//! terminal agree on which instance is managed and how patiently.
//!
//! Load through [`Config::load_from_args`]. The `--manage-instance` switch
//! only takes part in the command-line layer when it was passed, so a file or
//! environment value enabling management is not overridden by its absence.
//!
//! Environment values arrive pre-typed: `true` becomes a boolean, `8000` a
//! number and `a,b` a list. Text options are turned back into the text that
//! was set, so `STEVEDORE_LOG_FILTER=stevedore=debug,info` loads as written.

use std::borrow::Cow;
use std::ffi::OsString;
use std::time::Duration;

use ortho_config::declarative::LayerComposition;
use ortho_config::serde_json::{Map, Value};
use ortho_config::{MergeLayer, MergeProvenance, OrthoConfig, OrthoResult};
use serde::{Deserialize, Serialize};

pub mod defaults;
mod logging;
mod scope;

pub use defaults::{
    DEFAULT_INSTANCE_NAME, DEFAULT_LOG_FILTER, DEFAULT_PORT_MAPPING, DEFAULT_RETRY_INITIAL_MS,
    DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_RETRY_MAX_MS, DEFAULT_RETRY_MULTIPLIER,
    DEFAULT_RUNTIME_BINARY, DEFAULT_START_GRACE_MS, DEFAULT_STOP_GRACE_MS, default_instance_scope,
    default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use scope::{ScopeSelector, ScopeSelectorParseError};

/// Resolved configuration for one managed instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "STEVEDORE")]
pub struct Config {
    /// Gates every start and stop side effect triggered by lifecycle hooks.
    pub manage_instance: bool,
    /// Image name identifying the managed dependency.
    pub instance_name: String,
    /// Port mapping passed through to the launch command.
    pub port_mapping: String,
    /// Which lifecycle events trigger start and stop.
    pub instance_scope: ScopeSelector,
    /// Container runtime binary (`docker`, `podman`, ...).
    pub runtime_binary: String,
    /// Pause after the launch command before polling starts, in milliseconds.
    pub start_grace_ms: u64,
    /// Pause after the stop command before polling starts, in milliseconds.
    pub stop_grace_ms: u64,
    /// First wait between polling attempts, in milliseconds.
    pub retry_initial_ms: u64,
    /// Cap on the wait between polling attempts, in milliseconds.
    pub retry_max_ms: u64,
    /// Growth factor applied to successive waits.
    pub retry_multiplier: u32,
    /// Polling attempts allowed before a transition is reported as failed.
    pub retry_max_attempts: u32,
    /// Tracing filter expression.
    pub log_filter: String,
    /// Tracing output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manage_instance: false,
            instance_name: DEFAULT_INSTANCE_NAME.to_owned(),
            port_mapping: DEFAULT_PORT_MAPPING.to_owned(),
            instance_scope: default_instance_scope(),
            runtime_binary: DEFAULT_RUNTIME_BINARY.to_owned(),
            start_grace_ms: DEFAULT_START_GRACE_MS,
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
            retry_initial_ms: DEFAULT_RETRY_INITIAL_MS,
            retry_max_ms: DEFAULT_RETRY_MAX_MS,
            retry_multiplier: DEFAULT_RETRY_MULTIPLIER,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}

/// Field carrying the management switch in the command-line layer.
const MANAGE_INSTANCE_KEY: &str = "manage_instance";

/// Fields holding free text.
const TEXT_FIELDS: &[&str] = &["instance_name", "port_mapping", "runtime_binary", "log_filter"];

impl Config {
    /// Loads the layered configuration from `args` (program name first).
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when an argument, the
    /// configuration file, or an environment value is malformed.
    pub fn load_from_args<I, T>(args: I) -> OrthoResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let (layers, errors) = Self::compose_layers_from_iter(args).into_parts();
        let layers = layers.into_iter().map(normalise_layer).collect();
        LayerComposition::new(layers, errors)
            .into_merge_result(|layers| Self::merge_from_layers(layers))
    }

    /// Returns whether lifecycle hooks may start and stop the instance.
    #[must_use]
    pub const fn manage_instance(&self) -> bool {
        self.manage_instance
    }

    /// Returns the managed image name.
    #[must_use]
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Returns the port mapping passed to the launch command.
    #[must_use]
    pub fn port_mapping(&self) -> &str {
        &self.port_mapping
    }

    /// Returns the configured lifecycle scope.
    #[must_use]
    pub const fn instance_scope(&self) -> ScopeSelector {
        self.instance_scope
    }

    /// Returns the container runtime binary.
    #[must_use]
    pub fn runtime_binary(&self) -> &str {
        &self.runtime_binary
    }

    /// Returns the pause applied after the launch command.
    #[must_use]
    pub const fn start_grace(&self) -> Duration {
        Duration::from_millis(self.start_grace_ms)
    }

    /// Returns the pause applied after the stop command.
    #[must_use]
    pub const fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// Returns the first wait between polling attempts.
    #[must_use]
    pub const fn retry_initial_wait(&self) -> Duration {
        Duration::from_millis(self.retry_initial_ms)
    }

    /// Returns the cap applied to waits between polling attempts.
    #[must_use]
    pub const fn retry_max_wait(&self) -> Duration {
        Duration::from_millis(self.retry_max_ms)
    }

    /// Returns the growth factor applied to successive waits.
    #[must_use]
    pub const fn retry_multiplier(&self) -> u32 {
        self.retry_multiplier
    }

    /// Returns the polling attempt ceiling.
    #[must_use]
    pub const fn retry_max_attempts(&self) -> u32 {
        self.retry_max_attempts
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the tracing output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Adjusts a layer before merging.
///
/// Clap reports an absent `--manage-instance` as `false`, which would shadow
/// the file and environment layers, so the command-line layer drops it. The
/// environment layer gets its text fields back as strings.
fn normalise_layer(layer: MergeLayer<'static>) -> MergeLayer<'static> {
    let provenance = layer.provenance();
    if !matches!(provenance, MergeProvenance::Cli | MergeProvenance::Environment) {
        return layer;
    }

    let mut value = layer.into_value();
    if let Some(fields) = value.as_object_mut() {
        if provenance == MergeProvenance::Cli {
            drop_unset_switch(fields);
        } else {
            restore_text_fields(fields);
        }
    }

    if provenance == MergeProvenance::Cli {
        MergeLayer::cli(Cow::Owned(value))
    } else {
        MergeLayer::environment(Cow::Owned(value))
    }
}

fn drop_unset_switch(fields: &mut Map<String, Value>) {
    if fields.get(MANAGE_INSTANCE_KEY) == Some(&Value::Bool(false)) {
        fields.remove(MANAGE_INSTANCE_KEY);
    }
}

fn restore_text_fields(fields: &mut Map<String, Value>) {
    for key in TEXT_FIELDS {
        let Some(value) = fields.get_mut(*key) else {
            continue;
        };
        let text = match &*value {
            Value::Bool(_) | Value::Number(_) => value.to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_owned))
                .collect::<Vec<_>>()
                .join(","),
            Value::Null | Value::String(_) | Value::Object(_) => continue,
        };
        *value = Value::String(text);
    }
}
