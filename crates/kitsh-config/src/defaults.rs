use std::env;
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Port used when a target omits one.
pub const DEFAULT_PORT: u16 = 50051;

/// Default log filter expression used by the shell.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// File name of the persisted console history.
pub const HISTORY_FILE_NAME: &str = ".kitsh_history";

/// Default logging format for the shell.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Computes the default history file location.
///
/// The file lives in the user's home directory. When no home directory can be
/// determined the executable's own directory is used instead.
#[must_use]
pub fn default_history_path() -> Option<PathBuf> {
    dirs::home_dir()
        .or_else(executable_directory)
        .map(|dir| dir.join(HISTORY_FILE_NAME))
}

/// Computes the default noVNC asset directory.
#[must_use]
pub fn default_novnc_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(executable_directory)
        .map_or_else(|| PathBuf::from("noVNC"), |dir| dir.join("kitsh").join("noVNC"))
}

fn executable_directory() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
}
