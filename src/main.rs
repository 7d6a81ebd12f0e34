mod app;
mod cli;
mod config;
mod db;
mod diff;
mod error;
mod models;
mod sitemap;

use app::{App, BatchReport};
use clap::Parser;
use cli::{Cli, Command};
use config::Config;
use error::Result;
use models::{group_by_site, Page, SnapshotSummary, SnapshotView};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info and above unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let app = App::new(&config).await?;

    match cli.command {
        Command::Add { site_root } => {
            let report = app.crawl_site(&site_root).await?;
            println!(
                "Snapshot {} for {}: {} URLs, {} new",
                report.snapshot.id,
                report.snapshot.site_root,
                report.snapshot.urls.len(),
                report.new_urls.len()
            );
            for url in &report.new_urls {
                println!("  + {}", url);
            }
        }
        Command::Preview { site_root } => {
            let urls = app.preview_site(&site_root).await?;
            for url in &urls {
                println!("{}", url);
            }
            tracing::info!("{} URLs in sitemap of {}", urls.len(), site_root);
        }
        Command::Refresh => {
            let report = app.crawl_all().await?;
            print_batch(&report);
        }
        Command::Watch => {
            tracing::info!(
                "Crawling tracked sites every {} minutes",
                config.refresh_interval_minutes
            );
            app.watch(config.refresh_interval()).await?;
        }
        Command::List { page, page_size } => {
            let page = app
                .list_snapshots(page as usize, page_size as usize)
                .await?;
            print_page(&page);
        }
        Command::Show { id, json } => match app.snapshot_view(id).await? {
            Some(view) if json => println!("{}", serde_json::to_string_pretty(&view)?),
            Some(view) => print_view(&view),
            None => return Err(anyhow::anyhow!("snapshot {} not found", id).into()),
        },
        Command::Delete { id } => {
            if !app.delete_snapshot(id).await? {
                return Err(anyhow::anyhow!("snapshot {} not found", id).into());
            }
            println!("Deleted snapshot {}", id);
        }
        Command::Sites => {
            println!("{}", app.count_sites().await?);
        }
    }

    Ok(())
}

fn print_batch(report: &BatchReport) {
    for crawl in &report.crawled {
        println!(
            "{}: {} URLs, {} new (snapshot {})",
            crawl.snapshot.site_root,
            crawl.snapshot.urls.len(),
            crawl.new_urls.len(),
            crawl.snapshot.id
        );
        for url in &crawl.new_urls {
            println!("  + {}", url);
        }
    }
    for (root, reason) in &report.failed {
        println!("{}: failed ({})", root, reason);
    }
    println!(
        "Refreshed {} sites, {} failed",
        report.crawled.len(),
        report.failed.len()
    );
}

fn print_page(page: &Page<SnapshotSummary>) {
    if page.items.is_empty() {
        println!("No snapshots on page {}", page.page);
        return;
    }

    for (root, snapshots) in group_by_site(&page.items) {
        println!("{}", root);
        for snapshot in snapshots {
            println!(
                "  #{:<6} {}  {} URLs",
                snapshot.id,
                snapshot.created_at.format("%Y-%m-%d %H:%M:%S"),
                snapshot.url_count
            );
        }
    }
    println!(
        "Page {} of {} ({} snapshots)",
        page.page, page.total_pages, page.total
    );
}

fn print_view(view: &SnapshotView) {
    let snapshot = &view.snapshot;
    println!("Snapshot {} for {}", snapshot.id, snapshot.site_root);
    println!(
        "Crawled {}: {} URLs",
        snapshot.created_at.format("%Y-%m-%d %H:%M:%S"),
        snapshot.urls.len()
    );

    match &view.previous {
        Some(previous) => println!(
            "Previous: snapshot {} from {} ({} URLs)",
            previous.id,
            previous.created_at.format("%Y-%m-%d %H:%M:%S"),
            previous.url_count
        ),
        None => println!("Previous: none (baseline crawl)"),
    }

    if !view.new_urls.is_empty() {
        println!("New URLs ({}):", view.new_urls.len());
        for url in &view.new_urls {
            println!("  + {}", url);
        }
    }
}
