//! Pagination controller.
//!
//! Drives the listing from page to page as a small state machine:
//!
//! ```text
//! Resuming{n} --click next, no extraction--> Resuming{n-1} ... Resuming{0}
//!      |                                                          |
//!      +------------------------> Extracting <--------------------+
//!                                  |     ^
//!                          next?   v     | first bill number changed
//!                                Advancing   (or network idle fallback)
//!
//! Extracting --no next / page cap--> Done
//! any state  --error--------------> Failed
//! ```
//!
//! # Resume
//!
//! On startup `collected / page_size` pages are skipped. This assumes earlier
//! runs only ever finished whole pages and that the listing is append-only in
//! the same order; if the portal reorders or changes page size between runs
//! the resume point is only approximate.

use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::browser::ListingPage;
use crate::config::ScrapeSettings;
use crate::download::FileDownloader;
use crate::errors::ScrapeError;
use crate::extractor::{PageReport, bill_number, extract_page};
use crate::models::BillCollection;
use crate::wait::poll_until;

/// Number of listing pages to skip before extracting again.
pub fn resume_skip_pages(collected: usize, page_size: usize) -> usize {
    collected.checked_div(page_size).unwrap_or(0)
}

/// Why a run stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// The listing has no enabled "next" control.
    NoNextPage,
    /// The configured highest page was reached.
    PageCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Resuming { remaining: usize },
    Extracting,
    Advancing,
    Done(Stop),
    Failed,
}

#[derive(Debug)]
pub enum Termination {
    Completed(Stop),
    Failed(ScrapeError),
}

/// What a pagination run did.
#[derive(Debug)]
pub struct RunReport {
    pub pages_skipped: usize,
    pub pages_extracted: usize,
    pub added: usize,
    pub duplicates: usize,
    pub downloaded: usize,
    pub termination: Termination,
}

impl RunReport {
    pub fn failed(&self) -> bool {
        matches!(self.termination, Termination::Failed(_))
    }
}

#[derive(Debug, Default)]
struct Tally {
    pages_skipped: usize,
    pages_extracted: usize,
    added: usize,
    duplicates: usize,
    downloaded: usize,
}

impl Tally {
    fn record(&mut self, page: &PageReport) {
        self.pages_extracted += 1;
        self.added += page.added;
        self.duplicates += page.duplicates;
        self.downloaded += page.downloaded;
    }
}

/// Walks a [`ListingPage`] and feeds each page to the extractor.
pub struct Paginator<'a, P, D> {
    page: &'a P,
    downloader: &'a D,
    settings: &'a ScrapeSettings,
    state: PaginationState,
    /// 1-based number of the page currently shown.
    page_number: usize,
}

impl<'a, P, D> Paginator<'a, P, D>
where
    P: ListingPage,
    D: FileDownloader,
{
    pub fn new(page: &'a P, downloader: &'a D, settings: &'a ScrapeSettings) -> Self {
        Self {
            page,
            downloader,
            settings,
            state: PaginationState::Resuming { remaining: 0 },
            page_number: 1,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PaginationState {
        self.state
    }

    #[cfg(test)]
    pub fn page_number(&self) -> usize {
        self.page_number
    }

    /// Resume past already-collected pages, then extract until the listing
    /// ends, the page cap is hit, or something fails.
    ///
    /// Never returns an error: a failure ends the run and is reported in
    /// [`RunReport::termination`], with everything extracted so far left in
    /// `collection`.
    #[instrument(level = "info", skip_all, fields(collected = collection.len()))]
    pub async fn run(&mut self, collection: &mut BillCollection) -> RunReport {
        let skip = resume_skip_pages(collection.len(), self.settings.page_size);
        if skip > 0 {
            info!(pages = skip, "Resuming past already-collected pages");
        }
        self.state = PaginationState::Resuming { remaining: skip };
        let mut tally = Tally::default();

        let termination = loop {
            match self.state {
                PaginationState::Done(stop) => break Termination::Completed(stop),
                state => match self.step(state, collection, &mut tally).await {
                    Ok(next) => self.state = next,
                    Err(e) => {
                        error!(page = self.page_number, error = %e, "Pagination failed; keeping collected bills");
                        self.state = PaginationState::Failed;
                        break Termination::Failed(e);
                    }
                },
            }
        };

        info!(
            skipped = tally.pages_skipped,
            extracted = tally.pages_extracted,
            added = tally.added,
            duplicates = tally.duplicates,
            downloaded = tally.downloaded,
            ?termination,
            "Pagination finished"
        );
        RunReport {
            pages_skipped: tally.pages_skipped,
            pages_extracted: tally.pages_extracted,
            added: tally.added,
            duplicates: tally.duplicates,
            downloaded: tally.downloaded,
            termination,
        }
    }

    async fn step(
        &mut self,
        state: PaginationState,
        collection: &mut BillCollection,
        tally: &mut Tally,
    ) -> Result<PaginationState, ScrapeError> {
        match state {
            PaginationState::Resuming { remaining: 0 } => Ok(PaginationState::Extracting),
            PaginationState::Resuming { remaining } => {
                if !self.page.has_next().await? {
                    warn!(page = self.page_number, remaining, "Listing ended while resuming");
                    return Ok(PaginationState::Done(Stop::NoNextPage));
                }
                info!(page = self.page_number, "Skipping page");
                self.advance().await?;
                self.page_number += 1;
                tally.pages_skipped += 1;
                Ok(PaginationState::Resuming {
                    remaining: remaining - 1,
                })
            }
            PaginationState::Extracting => {
                if self.page_number > self.settings.max_pages {
                    return Ok(PaginationState::Done(Stop::PageCap));
                }
                let report =
                    extract_page(self.page, collection, self.downloader, self.settings).await?;
                tally.record(&report);
                info!(page = self.page_number, "Finished scraping page");

                if self.page_number >= self.settings.max_pages {
                    Ok(PaginationState::Done(Stop::PageCap))
                } else if self.page.has_next().await? {
                    Ok(PaginationState::Advancing)
                } else {
                    info!("No more pages available");
                    Ok(PaginationState::Done(Stop::NoNextPage))
                }
            }
            PaginationState::Advancing => {
                self.advance().await?;
                self.page_number += 1;
                Ok(PaginationState::Extracting)
            }
            PaginationState::Done(_) | PaginationState::Failed => Ok(state),
        }
    }

    async fn first_bill_number(&self) -> Result<Option<String>, ScrapeError> {
        Ok(self.page.item_html(0).await?.and_then(|html| bill_number(&html)))
    }

    /// Click next and wait until the new page has rendered.
    ///
    /// The first item's bill number changing is the primary signal; if it does
    /// not change within the transition timeout, network idle is the fallback.
    /// Either way a fixed settle delay follows.
    async fn advance(&self) -> Result<(), ScrapeError> {
        let before = self.first_bill_number().await?;
        self.page.click_next().await?;

        let changed = match before.as_deref() {
            Some(previous) => poll_until(
                self.settings.transition_timeout,
                self.settings.poll_interval,
                || async {
                    let current = self.first_bill_number().await?;
                    Ok::<_, ScrapeError>(current.filter(|n| n != previous))
                },
            )
            .await
            .is_some(),
            None => false,
        };

        if !changed {
            warn!(
                page = self.page_number,
                previous = ?before,
                "Content did not change in time; waiting for network idle"
            );
            self.page
                .wait_for_network_idle(self.settings.network_idle_timeout)
                .await?;
        }

        sleep(self.settings.settle_delay).await;
        Ok(())
    }
}
