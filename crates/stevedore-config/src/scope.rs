//! Lifecycle scope selection.
//!
//! The scope decides which lifecycle events start and stop the managed
//! instance: once around the whole session, or around every unit of work.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Granularity at which the managed instance is started and stopped.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ScopeSelector {
    /// One instance spans the whole session.
    #[default]
    Session,
    /// Each unit of work gets a fresh instance.
    #[serde(alias = "test")]
    #[strum(to_string = "unit", serialize = "test")]
    Unit,
}

/// Errors encountered while parsing a [`ScopeSelector`] from text.
pub type ScopeSelectorParseError = strum::ParseError;
