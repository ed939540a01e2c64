//! User configuration.
//!
//! Stored at `~/.config/mailscope/config.toml` (or wherever
//! [`path::get_config_path`] points). Every key is optional; command-line
//! flags override whatever the file says.
//!
//! ```toml
//! # Actors to reconstruct when --actor is not given (default: all)
//! actors = [0, 1, 5]
//! # "text" or "json"
//! format = "text"
//! # "report" keeps going and lists bad keys; "abort" fails the run
//! on-violation = "report"
//! ```

pub mod path;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::trace::{ActorId, ActorSelection};

pub use path::{CONFIG_PATH_ENV, ConfigPath, get_config_path};

/// Output format for the report.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// What a depth-invariant violation does to the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationPolicy {
    /// Report the offending keys next to the clean ones.
    #[default]
    Report,
    /// Fail the run on the first offending key.
    Abort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct UserConfig {
    /// Actor ids to reconstruct when none are given on the command line.
    pub actors: Option<Vec<ActorId>>,
    pub format: OutputFormat,
    pub on_violation: ViolationPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl UserConfig {
    /// Load the config from `location`, or defaults when there is none.
    ///
    /// A missing file is fine unless the user named it explicitly.
    pub fn load(location: Option<&ConfigPath>) -> Result<Self, ConfigError> {
        let Some(ConfigPath { path, explicit }) = location else {
            return Ok(Self::default());
        };

        if !path.exists() {
            if *explicit {
                return Err(ConfigError::NotFound { path: path.clone() });
            }
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Actor selection from the config, falling back to every actor.
    pub fn actor_selection(&self) -> ActorSelection {
        match &self.actors {
            Some(ids) => ActorSelection::Ids(ids.clone()),
            None => ActorSelection::All,
        }
    }
}
