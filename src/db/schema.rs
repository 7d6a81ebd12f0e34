pub const SCHEMA: &str = r#"
-- one row per completed crawl; rows never reference each other
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_root TEXT NOT NULL,
    urls TEXT NOT NULL DEFAULT '',
    url_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_site_root_created_at ON snapshots(site_root, created_at);
CREATE INDEX IF NOT EXISTS idx_snapshots_created_at ON snapshots(created_at DESC);
"#;
