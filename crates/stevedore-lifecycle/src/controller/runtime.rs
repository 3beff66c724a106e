//! Container runtime command lines.
//!
//! The controller needs three things from the runtime: which instances of an
//! image are running, a detached launch, and a stop by identifier. Any binary
//! speaking the `docker` CLI dialect (for example `podman`) fits.

use stevedore_config::DEFAULT_RUNTIME_BINARY;

use super::handle::{InstanceHandle, InstanceSpec};
use crate::command::CommandLine;
use crate::error::CommandError;

/// Builds runtime command lines for one binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCommands {
    binary: String,
}

impl Default for RuntimeCommands {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIME_BINARY)
    }
}

impl RuntimeCommands {
    /// Creates a builder for the given runtime binary.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Runtime binary name.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// `<binary> ps -q --filter ancestor=<name>`
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] when the binary name is blank.
    pub fn query(&self, spec: &InstanceSpec) -> Result<CommandLine, CommandError> {
        CommandLine::new([
            self.binary.clone(),
            String::from("ps"),
            String::from("-q"),
            String::from("--filter"),
            format!("ancestor={}", spec.name()),
        ])
    }

    /// `<binary> run -d -p <ports> <name>`
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] when the binary name is blank.
    pub fn launch(&self, spec: &InstanceSpec) -> Result<CommandLine, CommandError> {
        CommandLine::new([
            self.binary.clone(),
            String::from("run"),
            String::from("-d"),
            String::from("-p"),
            spec.port_mapping().to_owned(),
            spec.name().to_owned(),
        ])
    }

    /// `<binary> stop <id>...`
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] when the binary name is blank.
    pub fn stop(&self, handle: &InstanceHandle) -> Result<CommandLine, CommandError> {
        let argv = [self.binary.clone(), String::from("stop")]
            .into_iter()
            .chain(handle.ids().map(str::to_owned));
        CommandLine::new(argv)
    }
}
