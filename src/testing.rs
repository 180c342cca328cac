//! In-memory listing and downloader used by the scraper's tests.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::time::Duration;

use url::Url;

use crate::browser::ListingPage;
use crate::config::ScrapeSettings;
use crate::download::FileDownloader;
use crate::errors::ScrapeError;

/// Markup for one listing item, shaped like the portal's cards.
pub fn bill_item(number: &str, title: &str, fields: &[(&str, &str)], pdf: Option<&str>) -> String {
    let grid: String = fields
        .iter()
        .map(|(label, value)| format!("<div>{label}</div><div>{value}</div>"))
        .collect();
    let link = pdf
        .map(|href| format!(r#"<a href="{href}">Text as Filed</a>"#))
        .unwrap_or_default();
    format!(
        r#"<div class="cursor-pointer rounded-sm border">
  <span class="rounded border"><span><span>{number}</span></span></span>
  <span class="text-blue-500">{title}</span>
  <div class="grid gap-1 px-5">{grid}</div>
  {link}
</div>"#
    )
}

/// Item with every labelled field present.
pub fn full_item(number: &str, pdf: Option<&str>) -> String {
    bill_item(
        number,
        &format!("AN ACT {number}"),
        &[
            ("Session No. :", "1st Regular Session"),
            ("Significance :", "NATIONAL"),
            ("Date Filed :", "2025-07-01"),
            ("Principal Author/s :", "DELA CRUZ, JUAN"),
            ("Date Read :", "2025-07-29"),
            ("Primary Referral :", "APPROPRIATIONS"),
            ("Bill Status :", "Pending with the Committee"),
        ],
        pdf,
    )
}

/// Settings with every wait shortened for tests.
pub fn fast_settings(dir: &std::path::Path) -> ScrapeSettings {
    let mut s = ScrapeSettings::new(
        Url::parse("https://docs.example.org/legislative-documents/").unwrap(),
        dir.join("metadata.json"),
        dir.join("pdf"),
    );
    s.field_timeout = Duration::from_millis(20);
    s.transition_timeout = Duration::from_millis(50);
    s.network_idle_timeout = Duration::from_millis(50);
    s.settle_delay = Duration::ZERO;
    s.poll_interval = Duration::from_millis(5);
    s
}

/// A paginated listing served from canned pages.
#[derive(Debug, Default)]
pub struct FakeListing {
    pages: Vec<Vec<String>>,
    current: Cell<usize>,
    /// Clicking next while on this page (0-based) fails.
    fail_click_on: Option<usize>,
    /// Clicking next succeeds but the content never changes.
    frozen: bool,
    idle_fails: bool,
    pub clicks: Cell<usize>,
    pub idle_waits: Cell<usize>,
    pub closed: Cell<bool>,
    pub scrolled: RefCell<Vec<(usize, usize)>>,
}

impl FakeListing {
    pub fn new(pages: Vec<Vec<String>>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn failing_click_on(mut self, page: usize) -> Self {
        self.fail_click_on = Some(page);
        self
    }

    pub fn frozen(mut self, idle_fails: bool) -> Self {
        self.frozen = true;
        self.idle_fails = idle_fails;
        self
    }

    fn items(&self) -> &[String] {
        self.pages
            .get(self.current.get())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl ListingPage for FakeListing {
    async fn item_count(&self) -> Result<usize, ScrapeError> {
        Ok(self.items().len())
    }

    async fn scroll_item_into_view(&self, index: usize) -> Result<(), ScrapeError> {
        self.scrolled.borrow_mut().push((self.current.get(), index));
        Ok(())
    }

    async fn item_html(&self, index: usize) -> Result<Option<String>, ScrapeError> {
        Ok(self.items().get(index).cloned())
    }

    async fn has_next(&self) -> Result<bool, ScrapeError> {
        Ok(self.current.get() + 1 < self.pages.len())
    }

    async fn click_next(&self) -> Result<(), ScrapeError> {
        self.clicks.set(self.clicks.get() + 1);
        if self.fail_click_on == Some(self.current.get()) {
            return Err(ScrapeError::Navigation("next control detached".into()));
        }
        if !self.frozen {
            self.current.set(self.current.get() + 1);
        }
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), ScrapeError> {
        self.idle_waits.set(self.idle_waits.get() + 1);
        if self.idle_fails {
            return Err(ScrapeError::TransitionTimeout(timeout));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        self.closed.set(true);
        Ok(())
    }
}

/// Records requested URLs; URLs in `failing` report failure.
#[derive(Debug, Default)]
pub struct StubDownloader {
    pub requested: RefCell<Vec<String>>,
    failing: HashSet<String>,
}

impl StubDownloader {
    pub fn failing(urls: &[&str]) -> Self {
        Self {
            requested: RefCell::default(),
            failing: urls.iter().map(|u| u.to_string()).collect(),
        }
    }
}

impl FileDownloader for StubDownloader {
    async fn download(&self, url: &str) -> bool {
        self.requested.borrow_mut().push(url.to_string());
        !self.failing.contains(url)
    }
}
