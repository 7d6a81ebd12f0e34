use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::sitemap::FetchPolicy;

const CONFIG_ENV: &str = "SITEMAP_WATCH_CONFIG";
const MAX_FETCH_BACKOFF_MS: u64 = 10 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: u32,

    #[serde(default = "default_max_concurrent_crawls")]
    pub max_concurrent_crawls: usize,

    /// Upper bound on sub-sitemaps fetched at once while expanding an index.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_fetch_max_attempts")]
    pub fetch_max_attempts: u32,

    #[serde(default = "default_fetch_backoff")]
    pub fetch_backoff_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// How many levels of nested sitemap indexes are followed.
    #[serde(default = "default_max_index_depth")]
    pub max_index_depth: usize,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sitemap-watch");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("snapshots.db").to_string_lossy().to_string()
}

fn default_refresh_interval() -> u32 {
    60
}

fn default_max_concurrent_crawls() -> usize {
    5
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_fetch_max_attempts() -> u32 {
    3
}

fn default_fetch_backoff() -> u64 {
    1000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; SitemapMonitor/1.0;)".to_string()
}

fn default_max_index_depth() -> usize {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            refresh_interval_minutes: default_refresh_interval(),
            max_concurrent_crawls: default_max_concurrent_crawls(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fetch_timeout_secs: default_fetch_timeout(),
            fetch_max_attempts: default_fetch_max_attempts(),
            fetch_backoff_ms: default_fetch_backoff(),
            user_agent: default_user_agent(),
            max_index_depth: default_max_index_depth(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sitemap-watch")
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        if self.fetch_max_attempts == 0 {
            return Err(AppError::Config(
                "fetch_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_crawls == 0 {
            return Err(AppError::Config(
                "max_concurrent_crawls must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(AppError::Config(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if self.fetch_backoff_ms > MAX_FETCH_BACKOFF_MS {
            return Err(AppError::Config(format!(
                "fetch_backoff_ms must be at most {MAX_FETCH_BACKOFF_MS}"
            )));
        }
        if self.refresh_interval_minutes == 0 {
            return Err(AppError::Config(
                "refresh_interval_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_attempts: self.fetch_max_attempts,
            backoff_step: Duration::from_millis(self.fetch_backoff_ms),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.refresh_interval_minutes) * 60)
    }
}
