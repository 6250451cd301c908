//! # configs
//!
//! Typed runtime settings. Sources are layered, later ones winning:
//!
//! 1. built-in defaults
//! 2. `narou-ranking.toml` in the working directory, or an explicit file
//! 3. `NAROU_RANKING__<SECTION>__<KEY>` environment variables (a `.env` file is read first)

use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FILE: &str = "narou-ranking";
pub const ENV_PREFIX: &str = "NAROU_RANKING";

/// Backend limits the settings must stay within.
const MAX_BACKEND_LIMIT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("failed to read .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub search_url: String,
    pub r18_search_url: String,
    pub ranking_url: String,
    pub ranking_history_url: String,
    pub user_agent: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            search_url: "https://api.syosetu.com/novelapi/api/".into(),
            r18_search_url: "https://api.syosetu.com/novel18api/api/".into(),
            ranking_url: "https://api.syosetu.com/rank/rankget/".into(),
            ranking_history_url: "https://api.syosetu.com/rank/rankin/".into(),
            user_agent: "narou-ranking".into(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl BackendSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Records requested per backend call.
    pub chunk_size: usize,
    /// Records per page handed to callers.
    pub page_size: usize,
    /// Backend calls allowed per query. `0` means unbounded.
    pub max_backend_pages: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { chunk_size: 100, page_size: 10, max_backend_pages: 200 }
    }
}

impl PipelineSettings {
    pub fn max_backend_pages(&self) -> Option<usize> {
        (self.max_backend_pages > 0).then_some(self.max_backend_pages)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    pub max_batch_size: usize,
    /// Extra time a batch stays open after the first request. `0` dispatches on the next scheduler turn.
    pub batch_delay_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self { max_batch_size: MAX_BACKEND_LIMIT, batch_delay_ms: 0 }
    }
}

impl LoaderSettings {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 600, max_entries: 1024 }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing-subscriber` env-filter directive.
    pub filter: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { filter: "info".into(), json: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub pipeline: PipelineSettings,
    pub loader: LoaderSettings,
    pub cache: CacheSettings,
    pub log: LogSettings,
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded .env");
            Ok(())
        }
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

impl Settings {
    /// Loads settings from every source. An explicit `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        load_dotenv()?;
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        Self::from_builder(Self::defaults()?.add_source(file).add_source(environment()))
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder().add_source(Config::try_from(&Settings::default())?))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(1..=MAX_BACKEND_LIMIT).contains(&self.pipeline.chunk_size) {
            return invalid("pipeline.chunk_size must be between 1 and 500");
        }
        if self.pipeline.page_size == 0 {
            return invalid("pipeline.page_size must be positive");
        }
        if !(1..=MAX_BACKEND_LIMIT).contains(&self.loader.max_batch_size) {
            return invalid("loader.max_batch_size must be between 1 and 500");
        }
        if self.cache.max_entries == 0 {
            return invalid("cache.max_entries must be positive");
        }
        if self.backend.connect_timeout_ms == 0 || self.backend.request_timeout_ms == 0 {
            return invalid("backend timeouts must be positive");
        }
        Ok(())
    }
}
