use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Sitemap(#[from] SitemapError),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a single HTTP attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// Errors produced by sitemap discovery and parsing.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// The site root is not an absolute http(s) URL.
    #[error("invalid site root {input:?}: {reason}")]
    InvalidInput { input: String, reason: String },

    /// A request exhausted all of its attempts.
    #[error("failed to fetch {url} after {attempts} attempts: {source}")]
    Fetch {
        url: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// No discovery strategy produced a sitemap.
    #[error("no sitemap found for {site_root}")]
    NotFound { site_root: String },

    /// The body looked like XML but could not be read as XML.
    #[error("malformed sitemap at {url}: {reason}")]
    Parse { url: String, reason: String },
}
