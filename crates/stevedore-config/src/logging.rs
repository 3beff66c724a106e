//! Log output formats.
//!
//! Interactive operators read compact lines; CI systems collecting the
//! stderr of a test session usually want one JSON object per event.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How lifecycle events are rendered on standard error.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event with fields flattened to the top level.
    Json,
    /// Single-line text, coloured when standard error is a terminal.
    #[default]
    #[serde(alias = "text")]
    #[strum(to_string = "compact", serialize = "text")]
    Compact,
}

impl LogFormat {
    /// Returns whether the format is meant for a person rather than a parser.
    #[must_use]
    pub const fn is_human_readable(self) -> bool {
        matches!(self, Self::Compact)
    }
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;
