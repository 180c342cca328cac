//! The listing-page capability the scraper drives.
//!
//! The core never talks to a browser directly. It needs only the handful of
//! operations in [`ListingPage`]; [`chromium`] provides them over the Chrome
//! DevTools protocol, and tests provide them from canned markup.
//!
//! | Operation | Used by |
//! |-----------|---------|
//! | `item_count` / `item_html` / `scroll_item_into_view` | page extractor |
//! | `has_next` / `click_next` / `wait_for_network_idle` | pagination controller |

use std::time::Duration;

use crate::errors::ScrapeError;

pub mod chromium;

/// A rendered, paginated listing of bill items.
pub trait ListingPage {
    /// Number of bill items on the current page.
    async fn item_count(&self) -> Result<usize, ScrapeError>;

    /// Scroll item `index` into view so visibility-triggered rendering runs.
    async fn scroll_item_into_view(&self, index: usize) -> Result<(), ScrapeError>;

    /// Current outer HTML of item `index`, or `None` if it does not exist.
    async fn item_html(&self, index: usize) -> Result<Option<String>, ScrapeError>;

    /// Whether an enabled "next" control is present.
    async fn has_next(&self) -> Result<bool, ScrapeError>;

    /// Activate the "next" control.
    async fn click_next(&self) -> Result<(), ScrapeError>;

    /// Wait until network activity has quieted down, up to `timeout`.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), ScrapeError>;

    /// Release the underlying browser session.
    async fn close(&mut self) -> Result<(), ScrapeError> {
        Ok(())
    }
}
