use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid fixture.toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid fixture.json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FixtureConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_docroot")]
    pub docroot: PathBuf,
    /// Path prefix the cookie resources are mounted under.
    #[serde(default = "default_mount")]
    pub mount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Sent as `Access-Control-Allow-Origin` when the request has no `Origin`.
    #[serde(default = "default_origin")]
    pub default_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_docroot() -> PathBuf {
    PathBuf::from(".")
}

fn default_mount() -> String {
    "/cookies/resources".to_string()
}

fn default_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: default_addr(),
            docroot: default_docroot(),
            mount: default_mount(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        CorsConfig {
            default_origin: default_origin(),
        }
    }
}

impl FixtureConfig {
    /// Loads `fixture.toml` from `dir`, falling back to `fixture.json`, then
    /// to defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join("fixture.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: FixtureConfig = toml::from_str(&content)?;
            return Ok(config);
        }

        let json_path = dir.join("fixture.json");
        if json_path.exists() {
            let content = std::fs::read_to_string(&json_path)?;
            let config: FixtureConfig = serde_json::from_str(&content)?;
            return Ok(config);
        }

        Ok(FixtureConfig::default())
    }
}
