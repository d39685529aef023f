//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` under the
//! user's config directory, then `GAMELOG_*` environment variables. The
//! API key may also come from `GEMINI_API_KEY`, read after loading `.env`.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    cache::DEFAULT_CACHE_FILE,
    provider::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS},
};

/// Directory name under the platform config/data directories.
pub const APP_DIR: &str = "gamelog";
/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "GAMELOG";
/// Conventional variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backing file of the lookup cache.
    pub cache_path: PathBuf,
    /// Gemini API key; lookups fall back to default records without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// REST API base URL.
    pub api_base: String,
    /// Model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Load from the default config file location.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load using `path` as the config file. A missing file is fine.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        check_env_file(dotenvy::dotenv());

        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("cache_path", defaults.cache_path.to_string_lossy().to_string())?
            .set_default("api_base", defaults.api_base)?
            .set_default("model", defaults.model)?
            .set_default("timeout_secs", defaults.timeout_secs as i64)?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to load config {}", path.display()))?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))?;

        config.api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty()));
        Ok(config)
    }

    /// Whether lookups can reach the service at all.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Log a `.env` that exists but could not be loaded. A missing one is normal.
/// Returns the logged error.
fn check_env_file<T>(result: dotenvy::Result<T>) -> Option<dotenvy::Error> {
    match result {
        Ok(_) => None,
        Err(err) if err.not_found() => None,
        Err(err) => {
            warn!("ignoring .env file: {err}");
            Some(err)
        }
    }
}

/// Default config file path.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Default cache file path.
pub fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DEFAULT_CACHE_FILE)
}

/// Write a config file with default values if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let defaults = AppConfig::default();
    let contents = format!(
        "# gamelog configuration\n\
         # The API key is read from GEMINI_API_KEY when not set here.\n\
         # api_key = \"...\"\n\
         cache_path = {:?}\n\
         api_base = {:?}\n\
         model = {:?}\n\
         timeout_secs = {}\n",
        defaults.cache_path.to_string_lossy(),
        defaults.api_base,
        defaults.model,
        defaults.timeout_secs,
    );
    fs::write(path, contents)
        .with_context(|| format!("failed to write config {}", path.display()))
}
