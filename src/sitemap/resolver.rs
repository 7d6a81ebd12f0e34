use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use url::Url;

use super::fetcher::{RetryFetcher, Transport};
use super::parser::SitemapDocument;
use super::robots;
use crate::error::SitemapError;
use crate::models::{SiteRoot, UrlCollection};

/// Tried in order after every robots.txt declaration has failed.
pub const CONVENTIONAL_PATHS: [&str; 10] = [
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/wp-sitemap.xml", // WordPress
    "/sitemap/sitemap.xml",
    "/sitemaps/sitemap.xml",
    "/sitemap/index.xml",
    "/sitemap.php",
    "/sitemap.txt",
    "/sitemap/",
];

/// Sub-sitemaps fetched at once unless configured otherwise.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

pub struct SitemapResolver<T> {
    fetcher: RetryFetcher<T>,
    max_index_depth: usize,
    fetch_concurrency: usize,
    // Shared by every level of index expansion.
    fetch_slots: Semaphore,
}

impl<T: Transport> SitemapResolver<T> {
    pub fn new(fetcher: RetryFetcher<T>, max_index_depth: usize) -> Self {
        Self {
            fetcher,
            max_index_depth,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            fetch_slots: Semaphore::new(DEFAULT_FETCH_CONCURRENCY),
        }
    }

    /// Caps how many sub-sitemaps are in flight while expanding indexes.
    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        let limit = limit.max(1);
        self.fetch_concurrency = limit;
        self.fetch_slots = Semaphore::new(limit);
        self
    }

    /// Validates `site_root` and resolves it.
    pub async fn resolve(&self, site_root: &str) -> Result<UrlCollection, SitemapError> {
        let root = SiteRoot::parse(site_root)?;
        self.resolve_root(&root).await
    }

    /// Finds the site's sitemap and flattens it into a set of page URLs.
    ///
    /// Candidates are tried one at a time: robots.txt declarations first,
    /// then [`CONVENTIONAL_PATHS`]. The first candidate that can be fetched
    /// and read wins. Failures of individual candidates are only logged.
    pub async fn resolve_root(&self, root: &SiteRoot) -> Result<UrlCollection, SitemapError> {
        let mut tried: Vec<String> = Vec::new();

        for candidate in self.robots_candidates(root).await {
            if let Some(urls) = self.try_candidate(&candidate, &mut tried).await {
                return Ok(urls);
            }
        }

        for path in CONVENTIONAL_PATHS {
            if let Some(urls) = self.try_candidate(&root.join(path), &mut tried).await {
                return Ok(urls);
            }
        }

        tracing::warn!("No sitemap found for {} after {} candidates", root, tried.len());
        Err(SitemapError::NotFound {
            site_root: root.to_string(),
        })
    }

    async fn robots_candidates(&self, root: &SiteRoot) -> Vec<String> {
        let robots_url = root.join("/robots.txt");
        match self.fetcher.fetch(&robots_url).await {
            Ok(body) => {
                let locations = robots::sitemap_locations(&body);
                tracing::debug!("{} declares {} sitemaps", robots_url, locations.len());
                locations
                    .iter()
                    .filter_map(|loc| absolute_candidate(&robots_url, loc))
                    .collect()
            }
            Err(e) => {
                tracing::debug!("No usable robots.txt for {}: {}", root, e);
                Vec::new()
            }
        }
    }

    async fn try_candidate(&self, candidate: &str, tried: &mut Vec<String>) -> Option<UrlCollection> {
        if tried.iter().any(|t| t == candidate) {
            return None;
        }
        tried.push(candidate.to_string());

        let body = match self.fetcher.fetch(candidate).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Skipping sitemap candidate: {}", e);
                return None;
            }
        };

        match self.collect(candidate.to_string(), body, 0).await {
            Ok(locations) => {
                let urls: UrlCollection = locations.iter().collect();
                tracing::info!("Resolved {} URLs from {}", urls.len(), candidate);
                Some(urls)
            }
            Err(e) => {
                tracing::warn!("Skipping sitemap candidate: {}", e);
                None
            }
        }
    }

    /// Interprets one fetched document, expanding sitemap indexes.
    ///
    /// `depth` counts how many indexes led here. Children of an index are
    /// fetched concurrently and a failing child only loses its own entries.
    fn collect<'a>(
        &'a self,
        location: String,
        body: String,
        depth: usize,
    ) -> BoxFuture<'a, Result<Vec<String>, SitemapError>> {
        async move {
            let document = SitemapDocument::parse(&location, &body)?;
            tracing::debug!("{} lists {} locations", location, document.location_count());

            match document {
                SitemapDocument::PlainText(locs) | SitemapDocument::UrlSet(locs) => Ok(locs),
                SitemapDocument::Unrecognized => {
                    tracing::debug!("{} is not a sitemap document", location);
                    Ok(Vec::new())
                }
                SitemapDocument::Index(children) => {
                    if depth >= self.max_index_depth {
                        tracing::warn!(
                            "Ignoring sitemap index {}: nested deeper than {} levels",
                            location,
                            self.max_index_depth
                        );
                        return Ok(Vec::new());
                    }

                    let mut unique: Vec<String> = Vec::with_capacity(children.len());
                    for child in children {
                        if !child.is_empty() && child != location && !unique.contains(&child) {
                            unique.push(child);
                        }
                    }

                    let merged: Vec<Vec<String>> = stream::iter(unique)
                        .map(|child| self.expand(child, depth + 1))
                        .buffer_unordered(self.fetch_concurrency)
                        .collect()
                        .await;

                    Ok(merged.into_iter().flatten().collect())
                }
            }
        }
        .boxed()
    }

    async fn expand(&self, location: String, depth: usize) -> Vec<String> {
        // The slot covers the download only, so nested expansions can't starve.
        let fetched = match self.fetch_slots.acquire().await {
            Ok(_slot) => self.fetcher.fetch(&location).await,
            Err(_) => return Vec::new(),
        };

        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Sub-sitemap contributed nothing: {}", e);
                return Vec::new();
            }
        };

        match self.collect(location, body, depth).await {
            Ok(locs) => locs,
            Err(e) => {
                tracing::warn!("Sub-sitemap contributed nothing: {}", e);
                Vec::new()
            }
        }
    }
}

/// Resolves a robots.txt `Sitemap:` value against the robots.txt URL.
fn absolute_candidate(robots_url: &str, location: &str) -> Option<String> {
    let resolved = Url::parse(robots_url).and_then(|base| base.join(location));
    match resolved {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url.into()),
        _ => {
            tracing::debug!("Ignoring robots.txt sitemap entry {:?}", location);
            None
        }
    }
}
