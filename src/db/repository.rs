use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Page, SiteRoot, Snapshot, SnapshotSummary, UrlCollection};

use super::schema::SCHEMA;

const SNAPSHOT_COLUMNS: &str = "id, site_root, created_at, urls";
const SUMMARY_COLUMNS: &str = "id, site_root, created_at, url_count";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Snapshot writes

    pub async fn insert_snapshot(&self, site_root: &SiteRoot, urls: &UrlCollection) -> Result<Snapshot> {
        let created_at = Utc::now().trunc_subsecs(6);
        let root = site_root.as_str().to_string();
        let encoded = urls.encode();
        let url_count = urls.len() as i64;
        let stamp = format_datetime(&created_at);

        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO snapshots (site_root, urls, url_count, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![root, encoded, url_count, stamp],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        Ok(Snapshot {
            id,
            site_root: site_root.clone(),
            created_at,
            urls: urls.clone(),
        })
    }

    /// Returns false when no snapshot had that id.
    pub async fn delete_snapshot(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .call(move |conn| {
                let rows = conn.execute("DELETE FROM snapshots WHERE id = ?1", params![id])?;
                Ok(rows > 0)
            })
            .await?;
        Ok(deleted)
    }

    // Snapshot reads

    /// All snapshots of one site, oldest first.
    pub async fn find_snapshots(&self, site_root: &SiteRoot) -> Result<Vec<Snapshot>> {
        let root = site_root.as_str().to_string();
        let snapshots = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE site_root = ?1 ORDER BY created_at, id"
                ))?;
                let snapshots = stmt
                    .query_map(params![root], snapshot_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(snapshots)
            })
            .await?;
        Ok(snapshots)
    }

    pub async fn get_snapshot(&self, id: i64) -> Result<Option<Snapshot>> {
        let snapshot = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE id = ?1"
                ))?;
                let snapshot = stmt
                    .query_row(params![id], snapshot_from_row)
                    .optional()?;
                Ok(snapshot)
            })
            .await?;
        Ok(snapshot)
    }

    pub async fn latest_snapshot(&self, site_root: &SiteRoot) -> Result<Option<Snapshot>> {
        let root = site_root.as_str().to_string();
        let snapshot = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE site_root = ?1
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                ))?;
                let snapshot = stmt
                    .query_row(params![root], snapshot_from_row)
                    .optional()?;
                Ok(snapshot)
            })
            .await?;
        Ok(snapshot)
    }

    /// Newest snapshots first, without their URL payload.
    pub async fn recent_snapshots(&self, page: usize, page_size: usize) -> Result<Page<SnapshotSummary>> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
        // None when the page lies beyond anything SQLite can address.
        let offset = (page - 1)
            .checked_mul(page_size)
            .and_then(|offset| i64::try_from(offset).ok());

        let (items, total) = self
            .conn
            .call(move |conn| {
                let total: i64 =
                    conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
                let Some(offset) = offset else {
                    return Ok((Vec::new(), total));
                };
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SUMMARY_COLUMNS} FROM snapshots
                     ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
                ))?;
                let items = stmt
                    .query_map(params![limit, offset], summary_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok((items, total))
            })
            .await?;

        Ok(Page::new(items, page, page_size, total.max(0) as usize))
    }

    // Tracked sites

    pub async fn list_tracked_site_roots(&self) -> Result<Vec<SiteRoot>> {
        let roots = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT DISTINCT site_root FROM snapshots ORDER BY site_root")?;
                let roots = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(roots)
            })
            .await?;

        let roots = roots
            .into_iter()
            .filter_map(|root| match SiteRoot::parse(&root) {
                Ok(root) => Some(root),
                Err(e) => {
                    tracing::warn!("Ignoring stored site root: {}", e);
                    None
                }
            })
            .collect();
        Ok(roots)
    }

    pub async fn count_site_roots(&self) -> Result<usize> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(DISTINCT site_root) FROM snapshots",
                    [],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count.max(0) as usize)
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn site_root_column(row: &Row, column: usize) -> rusqlite::Result<SiteRoot> {
    let raw: String = row.get(column)?;
    SiteRoot::parse(&raw).map_err(|e| conversion_error(column, e))
}

fn created_at_column(row: &Row, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn snapshot_from_row(row: &Row) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: row.get(0)?,
        site_root: site_root_column(row, 1)?,
        created_at: created_at_column(row, 2)?,
        urls: UrlCollection::decode(&row.get::<_, String>(3)?),
    })
}

fn summary_from_row(row: &Row) -> rusqlite::Result<SnapshotSummary> {
    Ok(SnapshotSummary {
        id: row.get(0)?,
        site_root: site_root_column(row, 1)?,
        created_at: created_at_column(row, 2)?,
        url_count: row.get::<_, i64>(3)?.max(0) as usize,
    })
}
