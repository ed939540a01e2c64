//! Config path management.
//!
//! Handles determining the user config file location across platforms,
//! with support for a CLI override and an environment variable.

use std::path::{Path, PathBuf};

use etcetera::base_strategy::{BaseStrategy, choose_base_strategy};

/// Environment variable overriding the config location (also used by tests).
pub const CONFIG_PATH_ENV: &str = "MAILSCOPE_CONFIG_PATH";

/// Where the config file is expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub path: PathBuf,
    /// Set when the user named the file with `--config`; a missing file is
    /// then an error instead of "use defaults".
    pub explicit: bool,
}

/// Get the user config file path.
///
/// Priority:
/// 1. CLI `--config` flag
/// 2. `MAILSCOPE_CONFIG_PATH` environment variable
/// 3. Platform-specific default location
pub fn get_config_path(cli_override: Option<&Path>) -> Option<ConfigPath> {
    if let Some(path) = cli_override {
        return Some(ConfigPath {
            path: path.to_path_buf(),
            explicit: true,
        });
    }

    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return Some(ConfigPath {
            path: PathBuf::from(path),
            explicit: false,
        });
    }

    // choose_base_strategy uses:
    // - XDG on Linux and macOS (respects XDG_CONFIG_HOME, falls back to ~/.config)
    // - Windows conventions on Windows (%APPDATA%)
    let strategy = choose_base_strategy().ok()?;
    Some(ConfigPath {
        path: strategy.config_dir().join("mailscope").join("config.toml"),
        explicit: false,
    })
}
