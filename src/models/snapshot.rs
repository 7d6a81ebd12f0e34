use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SiteRoot, UrlCollection};

/// One stored crawl result for a site root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub site_root: SiteRoot,
    pub created_at: DateTime<Utc>,
    pub urls: UrlCollection,
}

impl Snapshot {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id,
            site_root: self.site_root.clone(),
            created_at: self.created_at,
            url_count: self.urls.len(),
        }
    }
}

/// A snapshot without its URL payload, for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: i64,
    pub site_root: SiteRoot,
    pub created_at: DateTime<Utc>,
    pub url_count: usize,
}

/// A snapshot together with its derived predecessor and the URLs it added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotView {
    pub snapshot: Snapshot,
    pub previous: Option<SnapshotSummary>,
    pub new_urls: UrlCollection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: usize, page_size: usize, total: usize) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total.div_ceil(page_size)
        };
        Self {
            items,
            page,
            page_size,
            total,
            total_pages,
        }
    }
}

/// Groups summaries by site root, keeping the order in which each root
/// first appears.
pub fn group_by_site(summaries: &[SnapshotSummary]) -> Vec<(&SiteRoot, Vec<&SnapshotSummary>)> {
    let mut groups: Vec<(&SiteRoot, Vec<&SnapshotSummary>)> = Vec::new();
    for summary in summaries {
        match groups.iter_mut().find(|(root, _)| *root == &summary.site_root) {
            Some((_, members)) => members.push(summary),
            None => groups.push((&summary.site_root, vec![summary])),
        }
    }
    groups
}
