use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SitemapError;

/// Normalized base URL of a monitored website.
///
/// Always `http` or `https`, never ends in `/`, and carries no query or
/// fragment, so `{root}{path}` forms a valid URL for any absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteRoot(String);

impl SiteRoot {
    pub fn parse(input: &str) -> Result<Self, SitemapError> {
        let invalid = |reason: &str| SitemapError::InvalidInput {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty"));
        }

        let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(&format!("unsupported scheme {other:?}"))),
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;

        let mut normalized = format!("{}://{}", url.scheme(), host);
        if let Some(port) = url.port() {
            normalized.push_str(&format!(":{port}"));
        }
        normalized.push_str(url.path().trim_end_matches('/'));

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends an absolute path such as `/robots.txt`.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Display for SiteRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SiteRoot {
    type Error = SitemapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SiteRoot> for String {
    fn from(root: SiteRoot) -> Self {
        root.0
    }
}
