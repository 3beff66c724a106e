//! Configuration loading helpers for the `stevedore` CLI.
//!
//! Leading configuration flags are separated from the subcommand so
//! `ortho-config` only receives options it understands while clap parses the
//! rest.

use std::ffi::{OsStr, OsString};

use stevedore_config::Config;

use crate::errors::AppError;

/// Configuration flags that take a value.
///
/// MAINTENANCE: keep in sync with the fields of `stevedore_config::Config`.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--instance-name",
    "--port-mapping",
    "--instance-scope",
    "--runtime-binary",
    "--start-grace-ms",
    "--stop-grace-ms",
    "--retry-initial-ms",
    "--retry-max-ms",
    "--retry-multiplier",
    "--retry-max-attempts",
    "--log-filter",
    "--log-format",
];

/// Configuration flags that stand alone.
pub(crate) const CONFIG_CLI_SWITCHES: &[&str] = &["--manage-instance"];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// # Flag Ordering
    ///
    /// Configuration flags must appear before the subcommand. Flags after it
    /// are treated as subcommand operands; for `run` they reach the wrapped
    /// program untouched.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_args(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

fn classify_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Skip;
    }

    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*text, false),
    };

    if CONFIG_CLI_SWITCHES.contains(&flag) {
        return FlagAction::Include { needs_value: false };
    }
    if CONFIG_CLI_FLAGS.contains(&flag) {
        return FlagAction::Include {
            needs_value: !inline_value,
        };
    }
    FlagAction::Skip
}

/// Configuration arguments (program name first) and the index where the
/// subcommand begins.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut arguments = args.iter();
    let Some(program) = arguments.next() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut command_start = 1_usize;
    let mut pending_value = false;

    for argument in arguments {
        if pending_value {
            pending_value = false;
        } else {
            match classify_flag(argument) {
                FlagAction::Include { needs_value } => pending_value = needs_value,
                FlagAction::Skip => break,
            }
        }
        config_arguments.push(argument.clone());
        command_start += 1;
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case::inline_value("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case::separate_value("--log-filter", FlagAction::Include { needs_value: true })]
    #[case::switch("--manage-instance", FlagAction::Include { needs_value: false })]
    #[case::subcommand("start", FlagAction::Skip)]
    #[case::unknown("--unknown", FlagAction::Skip)]
    fn flags_are_classified(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify_flag(OsStr::new(argument)), expected);
    }

    #[test]
    fn config_flags_are_split_from_subcommand() {
        let args = os_args(&[
            "stevedore",
            "--manage-instance",
            "--instance-name",
            "redis",
            "--retry-max-attempts=3",
            "run",
            "--",
            "pytest",
            "--instance-name",
        ]);

        let split = split_config_arguments(&args);

        assert_eq!(
            split.config_arguments,
            os_args(&[
                "stevedore",
                "--manage-instance",
                "--instance-name",
                "redis",
                "--retry-max-attempts=3",
            ])
        );
        assert_eq!(split.command_start, 5);
    }

    #[test]
    fn empty_arguments_split_cleanly() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert_eq!(split.command_start, 0);
    }
}
