//! Shared configuration for the kitsh command shell.
//!
//! Values are layered by `ortho_config`: a configuration file named by
//! `--config-path`, then `KITSUNE_*` environment variables, then CLI flags.
//! Only the global options that precede a command are handed to the loader;
//! the command tokens themselves belong to the CLI front-end.

mod defaults;
mod logging;
mod target;

use std::path::PathBuf;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_PORT, HISTORY_FILE_NAME, default_history_path,
    default_log_format, default_novnc_dir,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use target::{Target, TargetError};

/// Global options shared by one-shot invocations and console sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "KITSUNE")]
pub struct Config {
    /// The kitsune service to connect to, as `host[:port]`. `--host` is
    /// accepted as an alias on the command line.
    #[ortho_config(cli_short = 't')]
    pub target: Option<String>,
    /// Opens a TLS connection instead of plain TCP.
    pub ssl: bool,
    /// Tracing filter expression (for example `kitsh_cli=debug`).
    pub log_filter: Option<String>,
    /// Tracing output format.
    pub log_format: Option<LogFormat>,
    /// Overrides the console history file location.
    pub history_path: Option<Utf8PathBuf>,
    /// Disables loading and saving console history.
    pub no_history: bool,
    /// Directory holding the noVNC assets served by `vm vnc`.
    pub novnc_dir: Option<Utf8PathBuf>,
}

impl Config {
    /// Resolves the configured connection target.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::Missing`] when no target was configured and a
    /// parse error when the value is not a valid `host[:port]`.
    pub fn target(&self) -> Result<Target, TargetError> {
        self.target
            .as_deref()
            .ok_or(TargetError::Missing)?
            .parse()
    }

    /// Returns the raw target text, if any.
    #[must_use]
    pub fn target_text(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Returns the tracing output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Returns the history file, or `None` when persistence is disabled or no
    /// location could be determined.
    #[must_use]
    pub fn history_path(&self) -> Option<PathBuf> {
        if self.no_history {
            return None;
        }
        match &self.history_path {
            Some(path) => Some(path.clone().into_std_path_buf()),
            None => default_history_path(),
        }
    }

    /// Returns the noVNC asset directory.
    #[must_use]
    pub fn novnc_dir(&self) -> PathBuf {
        self.novnc_dir
            .clone()
            .map_or_else(default_novnc_dir, Utf8PathBuf::into_std_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_target_is_reported() {
        let config = Config::default();
        assert!(matches!(config.target(), Err(TargetError::Missing)));
    }

    #[test]
    fn configured_target_is_parsed() {
        let config = Config {
            target: Some(String::from("kitsune.local:7000")),
            ..Config::default()
        };
        let target = config.target().expect("target should parse");
        assert_eq!(target.host(), "kitsune.local");
        assert_eq!(target.port(), 7000);
    }

    #[test]
    fn disabled_history_has_no_path() {
        let config = Config {
            history_path: Some(Utf8PathBuf::from("/tmp/kitsh-history")),
            no_history: true,
            ..Config::default()
        };
        assert!(config.history_path().is_none());
    }

    #[test]
    fn explicit_history_path_wins() {
        let config = Config {
            history_path: Some(Utf8PathBuf::from("/tmp/kitsh-history")),
            ..Config::default()
        };
        assert_eq!(
            config.history_path(),
            Some(PathBuf::from("/tmp/kitsh-history"))
        );
    }

    #[test]
    fn logging_defaults_apply() {
        let config = Config::default();
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
        assert_eq!(config.log_format(), LogFormat::Compact);
    }
}
