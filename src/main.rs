//! # House Bill Scraper
//!
//! Collects house bill metadata and filed texts from a paginated
//! legislative-documents portal, resuming where earlier runs left off.
//!
//! ## Features
//!
//! - Drives the portal's listing in a Chromium tab (DevTools protocol)
//! - Skips pages and bills already present in `outputs/metadata.json`
//! - Downloads each new bill's PDF into the output directory
//! - Always rewrites the metadata file at the end of a run, even if the
//!   listing broke halfway through
//!
//! ## Usage
//!
//! ```sh
//! house_bill_scraper --headless -m outputs/metadata.json -d outputs/
//! ```
//!
//! ## Architecture
//!
//! 1. **Load**: read previously collected bills ([`outputs::json`])
//! 2. **Resume**: skip `collected / page_size` listing pages ([`paginator`])
//! 3. **Extract**: per page, scrape new bills and download their texts ([`extractor`], [`download`])
//! 4. **Save**: write the merged collection back ([`session`])

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod cli;
mod config;
mod download;
mod errors;
mod extractor;
mod models;
mod outputs;
mod paginator;
mod session;
mod utils;
mod wait;

#[cfg(test)]
mod testing;

use browser::chromium::{ChromiumListing, ChromiumOptions};
use cli::Cli;
use config::ScrapeSettings;
use download::HttpDownloader;
use session::run_session;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("house_bill_scraper starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Consumed by the separate upload step; only reported here.
    match (&args.aws_bucket_data_location, &args.aws_bucket_metadata_location) {
        (Some(data), Some(metadata)) => {
            info!(%data, %metadata, "Remote storage locations configured")
        }
        _ => debug!("Remote storage locations not configured"),
    }

    let settings = ScrapeSettings::from_cli(&args)?;

    // Early check: fail before launching a browser if outputs cannot be written
    if let Err(e) = ensure_writable_dir(&settings.download_dir).await {
        error!(
            path = %settings.download_dir.display(),
            error = %e,
            "Download directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let downloader = HttpDownloader::new(&settings.download_dir)?;
    let options = ChromiumOptions {
        headless: args.headless,
        congress: args.congress.clone(),
        page_size: settings.page_size,
    };

    let summary = run_session(
        &settings,
        || ChromiumListing::open(&settings.listing_url, &options),
        &downloader,
    )
    .await?;

    match &summary.run {
        Some(run) if run.failed() => warn!(
            termination = ?run.termination,
            extracted = run.pages_extracted,
            added = run.added,
            "Scraping stopped early; progress was saved"
        ),
        Some(run) => info!(
            termination = ?run.termination,
            skipped = run.pages_skipped,
            extracted = run.pages_extracted,
            added = run.added,
            duplicates = run.duplicates,
            downloaded = run.downloaded,
            "Scraping completed"
        ),
        None => warn!("Listing never opened; metadata rewritten unchanged"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        loaded = summary.loaded,
        saved = summary.saved,
        new = summary.saved - summary.loaded,
        "Execution complete"
    );

    Ok(())
}
