//! Separates global options from command tokens.
//!
//! Global options are only recognised before the first command token. They
//! are handed to `ortho_config`, while the remaining tokens go to the command
//! parser. A console session never re-parses them.

use std::ffi::{OsStr, OsString};

use kitsh_config::Config;
use ortho_config::OrthoConfig;

use crate::AppError;

/// Global flags that take a value.
const VALUE_FLAGS: &[&str] = &[
    "--config-path",
    "--target",
    "--host",
    "-t",
    "--log-filter",
    "--log-format",
    "--history-path",
    "--novnc-dir",
];

/// Alternative spelling of `--target`.
const HOST_ALIAS: &str = "--host";

/// Global flags that stand alone.
const SWITCH_FLAGS: &[&str] = &["--ssl", "--no-history"];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the global-option prefix of argv.
    ///
    /// `args` starts with the program name and holds only the flags listed in
    /// this module, each followed by its value where one is needed.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if SWITCH_FLAGS.contains(&flag) {
        return FlagAction::Include { needs_value: false };
    }
    if VALUE_FLAGS.contains(&flag) {
        return FlagAction::Include {
            needs_value: !inline_value,
        };
    }
    FlagAction::Skip
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit::default();
    };

    let mut config_arguments = vec![program.clone()];
    let mut remaining = rest.iter();
    let mut command_arguments = Vec::new();
    while let Some(argument) = remaining.next() {
        match process_config_flag(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(canonical_flag(argument));
                if needs_value {
                    config_arguments.extend(remaining.next().cloned());
                }
            }
            FlagAction::Skip => {
                command_arguments.push(argument.clone());
                command_arguments.extend(remaining.cloned());
                break;
            }
        }
    }

    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

/// Rewrites `--host` to the `--target` flag the loader understands.
fn canonical_flag(argument: &OsString) -> OsString {
    let Some(text) = argument.to_str() else {
        return argument.clone();
    };
    match text.strip_prefix(HOST_ALIAS) {
        Some(rest) if rest.is_empty() || rest.starts_with('=') => {
            OsString::from(format!("--target{rest}"))
        }
        _ => argument.clone(),
    }
}
