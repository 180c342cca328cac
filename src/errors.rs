//! Error taxonomy for the scraper.
//!
//! Every failure the scraper can observe is one [`ScrapeError`] variant. The
//! split between failures that are handled where they happen (a missing field,
//! a failed download) and failures that end the pagination loop is declared
//! once, in [`ScrapeError::is_recoverable`].

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while scraping, downloading, or persisting bills.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// An element or value could not be found in an item's markup.
    #[error("element not found: {0}")]
    MissingElement(String),

    /// A record was built with a blank or placeholder bill number.
    #[error("invalid bill number: {0:?}")]
    InvalidIdentity(String),

    /// The remote server answered a file request with a non-success status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// A file URL could not be turned into a local file name.
    #[error("cannot download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The browser connection or a DevTools command failed.
    #[error("browser error: {0}")]
    Browser(String),

    /// Clicking through the listing did not behave as expected.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Neither the content-change poll nor the network-idle fallback settled.
    #[error("page did not settle within {0:?}")]
    TransitionTimeout(Duration),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Whether the failure is handled where it happens instead of ending the run.
    ///
    /// Recoverable failures degrade a single field, item, or download. Every
    /// other kind stops the pagination loop; persistence errors additionally
    /// propagate out of the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScrapeError::MissingElement(_)
                | ScrapeError::InvalidIdentity(_)
                | ScrapeError::HttpStatus { .. }
                | ScrapeError::Download { .. }
                | ScrapeError::Http(_)
        )
    }
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Browser(e.to_string())
    }
}
