//! CLI settings resolved from flags, environment and the config file.

use std::path::{Path, PathBuf};

use logbook_core::config::{parse_optional, RemoteConfig, ENV_API_URL};
use logbook_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::CliError;

pub const ENV_DB_PATH: &str = "LOGBOOK_DB_PATH";
const CONFIG_FILE_NAME: &str = "config.json";

/// Contents of `config.json`; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl FileConfig {
    pub fn load() -> Result<Self, CliError> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            CliError::Config(format!("Failed to read config at {}: {error}", path.display()))
        })?;
        serde_json::from_str::<Self>(&raw).map_err(|error| {
            CliError::Config(format!("Failed to parse config at {}: {error}", path.display()))
        })
    }
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("logbook").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("logbook").join("logbook.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve data directory".to_string()))
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub remote: Option<RemoteConfig>,
    pub offline: bool,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> Result<Self, CliError> {
        let file = FileConfig::load()?;
        Ok(Self {
            db_path: resolve_db_path(
                cli.db_path.clone(),
                std::env::var_os(ENV_DB_PATH).map(PathBuf::from),
                &file,
            )?,
            remote: resolve_remote(cli.api_url.clone(), std::env::var(ENV_API_URL).ok(), &file)?,
            offline: cli.offline,
        })
    }

    pub fn require_remote(&self) -> Result<&RemoteConfig, CliError> {
        self.remote.as_ref().ok_or(CliError::RemoteNotConfigured)
    }
}

pub fn resolve_db_path(
    flag: Option<PathBuf>,
    env: Option<PathBuf>,
    file: &FileConfig,
) -> Result<PathBuf, CliError> {
    let configured = flag
        .or(env)
        .or_else(|| file.db_path.clone())
        .filter(|path| !path.as_os_str().is_empty());
    configured.map_or_else(default_db_path, Ok)
}

pub fn resolve_remote(
    flag: Option<String>,
    env: Option<String>,
    file: &FileConfig,
) -> Result<Option<RemoteConfig>, CliError> {
    let url = normalize_text_option(flag)
        .or_else(|| normalize_text_option(env))
        .or_else(|| normalize_text_option(file.api_url.clone()));
    Ok(parse_optional(url)?)
}
