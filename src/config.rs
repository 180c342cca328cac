//! Runtime settings for a scraping session.
//!
//! [`ScrapeSettings`] gathers every tunable the core loop needs so the
//! paginator, extractor, and session can be driven with short timeouts in
//! tests and with the portal's real pacing in production.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::cli::Cli;
use crate::errors::ScrapeError;

/// Listing page size selected in the portal's pagination dropdown.
pub const PAGE_SIZE: usize = 100;
/// Highest page number the controller will extract.
pub const MAX_PAGES: usize = 79;

pub const FIELD_TIMEOUT: Duration = Duration::from_secs(1);
pub const TRANSITION_TIMEOUT: Duration = Duration::from_secs(15);
pub const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const SETTLE_DELAY: Duration = Duration::from_secs(3);
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Settings shared by the session, paginator, and extractor.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub listing_url: Url,
    pub metadata_path: PathBuf,
    pub download_dir: PathBuf,
    pub page_size: usize,
    pub max_pages: usize,
    /// How long a single labelled field may take to appear.
    pub field_timeout: Duration,
    /// How long to wait for the first bill number to change after clicking next.
    pub transition_timeout: Duration,
    pub network_idle_timeout: Duration,
    /// Fixed pause after a page transition before extracting.
    pub settle_delay: Duration,
    pub poll_interval: Duration,
}

impl ScrapeSettings {
    /// Default pacing for the given listing and output locations.
    pub fn new(
        listing_url: Url,
        metadata_path: impl Into<PathBuf>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            listing_url,
            metadata_path: metadata_path.into(),
            download_dir: download_dir.into(),
            page_size: PAGE_SIZE,
            max_pages: MAX_PAGES,
            field_timeout: FIELD_TIMEOUT,
            transition_timeout: TRANSITION_TIMEOUT,
            network_idle_timeout: NETWORK_IDLE_TIMEOUT,
            settle_delay: SETTLE_DELAY,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Build settings from parsed command-line arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self, ScrapeError> {
        let listing_url = Url::parse(&cli.listing_url)?;
        let mut settings = Self::new(listing_url, &cli.metadata, &cli.download_dir);
        // A zero page size would make every resume computation meaningless.
        settings.page_size = cli.page_size.max(1);
        settings.max_pages = cli.max_pages;
        Ok(settings)
    }
}
