//! One scraping session: load, scrape, save.
//!
//! The metadata file is read once at the start and written once at the end.
//! Whatever happens in between (the browser failing to start, a navigation
//! error halfway through the listing) the bills collected so far are saved.
//! Only a failure to load or save the metadata itself is returned to the
//! caller.

use std::future::Future;

use tracing::{error, info, instrument, warn};

use crate::browser::ListingPage;
use crate::config::ScrapeSettings;
use crate::download::FileDownloader;
use crate::errors::ScrapeError;
use crate::outputs::json::{load_collection, save_collection};
use crate::paginator::{Paginator, RunReport};

/// Outcome of a session, for the final log line.
#[derive(Debug)]
pub struct SessionSummary {
    pub loaded: usize,
    pub saved: usize,
    /// `None` when the listing could not be opened.
    pub run: Option<RunReport>,
}

/// Run a full session against the listing produced by `open`.
///
/// # Errors
///
/// Returns an error only if the metadata file cannot be read or written.
#[instrument(level = "info", skip_all, fields(metadata = %settings.metadata_path.display()))]
pub async fn run_session<P, D, F, Fut>(
    settings: &ScrapeSettings,
    open: F,
    downloader: &D,
) -> Result<SessionSummary, ScrapeError>
where
    P: ListingPage,
    D: FileDownloader,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<P, ScrapeError>>,
{
    let mut collection = load_collection(&settings.metadata_path).await?;
    let loaded = collection.len();
    if collection.is_empty() {
        info!("No bills collected yet; starting from the first page");
    } else {
        info!(loaded, "Starting session");
    }

    let run = match open().await {
        Ok(mut page) => {
            let report = Paginator::new(&page, downloader, settings)
                .run(&mut collection)
                .await;
            if let Err(e) = page.close().await {
                warn!(error = %e, "Failed to close browser");
            }
            Some(report)
        }
        Err(e) => {
            error!(error = %e, "Could not open listing; saving progress");
            None
        }
    };

    save_collection(&settings.metadata_path, &collection).await?;
    let saved = collection.len();
    info!(loaded, saved, "Session finished");

    Ok(SessionSummary { loaded, saved, run })
}
