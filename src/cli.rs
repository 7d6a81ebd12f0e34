use clap::{Parser, Subcommand};

/// Largest page number `list` accepts.
pub const MAX_PAGE: u32 = 1_000_000;

#[derive(Debug, Parser)]
#[command(name = "sitemap-watch")]
#[command(about = "Tracks the URLs a website publishes in its sitemap")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Crawl a site now and start tracking it
    Add {
        /// Site root, e.g. https://example.com
        site_root: String,
    },

    /// Print a site's sitemap URLs without storing them
    Preview { site_root: String },

    /// Crawl every tracked site once
    Refresh,

    /// Crawl every tracked site on the configured interval
    Watch,

    /// List snapshots, newest first, grouped by site
    List {
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_PAGE as i64))]
        page: u32,

        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=1000))]
        page_size: u32,
    },

    /// Show a snapshot and the URLs it added
    Show {
        id: i64,

        /// Output as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Delete one snapshot
    Delete { id: i64 },

    /// Count tracked sites
    Sites,
}
