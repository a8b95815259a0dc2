// ⚙️ Configuration - credentials and paths, loaded once at start
//
// Sources, lowest to highest priority:
//   1. built-in defaults
//   2. `.env` file in the working directory (via dotenv)
//   3. process environment
//   4. CLI flags (applied by main.rs through the `with_*` builders)

use anyhow::{anyhow, Result};
use std::fmt;
use std::path::PathBuf;

pub const TOKEN_VAR: &str = "TOKEN_GRANATUM";
pub const URL_VAR: &str = "URL";
pub const OUTPUT_DIR_VAR: &str = "TESOURARIA_OUTPUT_DIR";
pub const CACHE_PATH_VAR: &str = "TESOURARIA_CACHE";

pub const DEFAULT_OUTPUT_DIR: &str = "dados";
pub const DEFAULT_CACHE_PATH: &str = "granatum_cache.sqlite";

#[derive(Clone)]
pub struct Config {
    /// API access token, sent as the `access_token` query parameter
    pub token: String,

    /// API base URL, without trailing slash (e.g. "https://api.granatum.com.br/v1")
    pub base_url: String,

    /// Directory holding every table the pipeline writes
    pub output_dir: PathBuf,

    /// SQLite file for the response cache; None disables caching
    pub cache_path: Option<PathBuf>,
}

impl Config {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Config {
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            cache_path: Some(PathBuf::from(DEFAULT_CACHE_PATH)),
        }
    }

    /// Load `.env` (if any) and read the configuration from the environment
    pub fn from_env() -> Result<Self> {
        // A missing .env is fine, the variables may come from the shell
        if let Err(e) = dotenv::dotenv() {
            log::debug!("No .env loaded: {}", e);
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(TOKEN_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("{} not set", TOKEN_VAR))?;
        let base_url = lookup(URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("{} not set", URL_VAR))?;

        let mut config = Config::new(token, base_url);

        if let Some(dir) = lookup(OUTPUT_DIR_VAR).filter(|v| !v.is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup(CACHE_PATH_VAR).filter(|v| !v.is_empty()) {
            config.cache_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn with_cache_path(mut self, path: Option<PathBuf>) -> Self {
        self.cache_path = path;
        self
    }
}

// Token stays out of logs and panics
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("output_dir", &self.output_dir)
            .field("cache_path", &self.cache_path)
            .finish()
    }
}
