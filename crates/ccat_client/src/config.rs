//! Client config load/save for `~/.catctl/config.yaml`.

use std::path::{Path, PathBuf};

use crate::chat::DEFAULT_WS_URL;
use crate::client::{ClientBuilder, DEFAULT_BASE_URL};

/// Server section (base_url, ws_url).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ServerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
}

/// Auth section (api_key).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AuthSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Full config file.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub auth: AuthSection,
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.server.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn ws_url(&self) -> &str {
        self.server.ws_url.as_deref().unwrap_or(DEFAULT_WS_URL)
    }

    /// Apply values set on the command line or in the environment on top of
    /// the file's values.
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        ws_url: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        if base_url.is_some() {
            self.server.base_url = base_url;
        }
        if ws_url.is_some() {
            self.server.ws_url = ws_url;
        }
        if api_key.is_some() {
            self.auth.api_key = api_key;
        }
        self
    }

    /// Client builder preloaded with this config.
    pub fn client_builder(&self) -> ClientBuilder {
        let builder = ClientBuilder::new()
            .base_url(self.base_url())
            .ws_url(self.ws_url());
        match &self.auth.api_key {
            Some(key) => builder.api_key(key.clone()),
            None => builder,
        }
    }
}

/// Where `catctl` keeps its config: `.catctl/config.yaml` under the user's
/// home directory. `None` when no home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".catctl").join("config.yaml"))
}

fn home_dir() -> Option<PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var_os(var)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Load config from a YAML file, falling back to defaults when it does not exist.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    match load(path) {
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Config::default())
        }
        other => other,
    }
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Config load/save error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
