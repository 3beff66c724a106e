//! Identity of the managed instance and of its running copies.

use std::fmt;

use stevedore_config::Config;

/// Which dependency is managed and how its endpoint is exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSpec {
    name: String,
    port_mapping: String,
}

impl InstanceSpec {
    /// Creates a spec for the named image with the given port mapping.
    #[must_use]
    pub fn new(name: impl Into<String>, port_mapping: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port_mapping: port_mapping.into(),
        }
    }

    /// Builds the instance spec named by the shared configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.instance_name(), config.port_mapping())
    }

    /// Image name identifying the dependency.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port mapping passed to the launch command.
    #[must_use]
    pub fn port_mapping(&self) -> &str {
        &self.port_mapping
    }
}

/// Opaque identifier of a running instance; empty means none was observed.
///
/// Handles are query results, not owned resources: they are fetched again on
/// every check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InstanceHandle(String);

impl InstanceHandle {
    /// Wraps runtime output, trimming surrounding whitespace.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    /// The handle meaning "not running".
    #[must_use]
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// Returns `true` when at least one instance was observed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.0.is_empty()
    }

    /// Raw identifier text as reported by the runtime.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Individual identifiers when the runtime reported several matches.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_running() {
            formatter.write_str(&self.ids().collect::<Vec<_>>().join(","))
        } else {
            formatter.write_str("<none>")
        }
    }
}
