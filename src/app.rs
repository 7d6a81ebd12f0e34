use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::config::Config;
use crate::db::Repository;
use crate::diff;
use crate::error::Result;
use crate::models::{Page, SiteRoot, Snapshot, SnapshotSummary, SnapshotView, UrlCollection};
use crate::sitemap::{HttpTransport, RetryFetcher, SitemapResolver, Transport};

/// Outcome of one successful crawl.
#[derive(Debug)]
pub struct CrawlReport {
    pub snapshot: Snapshot,
    pub new_urls: UrlCollection,
}

/// Outcome of crawling every tracked site once.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub crawled: Vec<CrawlReport>,
    pub failed: Vec<(SiteRoot, String)>,
}

pub struct App<T> {
    pub repository: Repository,
    resolver: SitemapResolver<T>,
    max_concurrent_crawls: usize,
}

impl App<HttpTransport> {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let policy = config.fetch_policy();
        let fetcher = RetryFetcher::new(HttpTransport::new(&policy)?, &policy);
        let resolver = SitemapResolver::new(fetcher, config.max_index_depth)
            .with_fetch_concurrency(config.max_concurrent_fetches);

        Ok(Self::with_parts(
            repository,
            resolver,
            config.max_concurrent_crawls,
        ))
    }
}

impl<T: Transport> App<T> {
    pub fn with_parts(
        repository: Repository,
        resolver: SitemapResolver<T>,
        max_concurrent_crawls: usize,
    ) -> Self {
        Self {
            repository,
            resolver,
            max_concurrent_crawls: max_concurrent_crawls.max(1),
        }
    }

    /// Crawls one site and stores the result as a new snapshot.
    ///
    /// Nothing is written when the sitemap cannot be resolved.
    pub async fn crawl_site(&self, site_root: &str) -> Result<CrawlReport> {
        let root = SiteRoot::parse(site_root)?;
        self.crawl_root(&root).await
    }

    /// Resolves a site's sitemap without storing anything.
    pub async fn preview_site(&self, site_root: &str) -> Result<UrlCollection> {
        Ok(self.resolver.resolve(site_root).await?)
    }

    async fn crawl_root(&self, root: &SiteRoot) -> Result<CrawlReport> {
        let previous = self.repository.latest_snapshot(root).await?;
        let urls = self.resolver.resolve_root(root).await?;
        let snapshot = self.repository.insert_snapshot(root, &urls).await?;
        let new_urls = diff::new_urls(&snapshot.urls, previous.as_ref().map(|s| &s.urls));

        tracing::info!(
            "Crawled {}: {} URLs, {} new (snapshot {})",
            root,
            snapshot.urls.len(),
            new_urls.len(),
            snapshot.id
        );

        Ok(CrawlReport { snapshot, new_urls })
    }

    /// Crawls every tracked site with bounded concurrency. A site that
    /// fails is recorded in the report and does not affect the others.
    pub async fn crawl_all(&self) -> Result<BatchReport> {
        let roots = self.repository.list_tracked_site_roots().await?;

        let results: Vec<_> = stream::iter(roots)
            .map(|root| async move {
                let result = self.crawl_root(&root).await;
                (root, result)
            })
            .buffer_unordered(self.max_concurrent_crawls)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (root, result) in results {
            match result {
                Ok(crawl) => report.crawled.push(crawl),
                Err(e) => {
                    tracing::warn!("Failed to crawl {}: {}", root, e);
                    report.failed.push((root, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Repeats [`App::crawl_all`] every `interval` until Ctrl-C.
    pub async fn watch(&self, interval: Duration) -> Result<()> {
        self.watch_until(interval, tokio::signal::ctrl_c()).await;
        Ok(())
    }

    /// Runs batches until `shutdown` completes. A batch in progress is
    /// abandoned at shutdown; snapshots it already stored are kept.
    async fn watch_until<F: Future>(&self, interval: Duration, shutdown: F) {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => break,
            }

            tokio::select! {
                result = self.crawl_all() => match result {
                    Ok(report) => tracing::info!(
                        "Batch finished: {} crawled, {} failed",
                        report.crawled.len(),
                        report.failed.len()
                    ),
                    Err(e) => tracing::error!("Batch crawl failed: {}", e),
                },
                _ = &mut shutdown => {
                    tracing::info!("Interrupting batch crawl");
                    break;
                }
            }
        }

        tracing::info!("Stopping watch");
    }

    /// A snapshot with its derived predecessor and the URLs it added.
    pub async fn snapshot_view(&self, id: i64) -> Result<Option<SnapshotView>> {
        let Some(snapshot) = self.repository.get_snapshot(id).await? else {
            return Ok(None);
        };

        let history = self.repository.find_snapshots(&snapshot.site_root).await?;
        let previous = diff::previous_snapshot(&history, id);
        let new_urls = diff::new_urls(&snapshot.urls, previous.map(|s| &s.urls));
        let previous = previous.map(Snapshot::summary);

        Ok(Some(SnapshotView {
            snapshot,
            previous,
            new_urls,
        }))
    }

    pub async fn list_snapshots(&self, page: usize, page_size: usize) -> Result<Page<SnapshotSummary>> {
        self.repository.recent_snapshots(page, page_size).await
    }

    pub async fn delete_snapshot(&self, id: i64) -> Result<bool> {
        let deleted = self.repository.delete_snapshot(id).await?;
        if deleted {
            tracing::info!("Deleted snapshot {}", id);
        }
        Ok(deleted)
    }

    pub async fn count_sites(&self) -> Result<usize> {
        self.repository.count_site_roots().await
    }
}
