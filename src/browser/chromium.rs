//! Chromium-backed [`ListingPage`] over the DevTools protocol.
//!
//! Opening the portal takes a few steps before the listing is usable:
//!
//! 1. Wait (up to 90 s) for the congress dropdown to become visible
//! 2. Select the largest page size in the second `select.form-select`
//! 3. Expand the congress dropdown
//! 4. Wait for the first bill card and scroll to the bottom of the page
//!
//! All DOM reads are small scripts evaluated in the page; clicks go through
//! DevTools input events so the portal's handlers see real clicks.

use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::ListingPage;
use crate::errors::ScrapeError;
use crate::wait::poll_until;

const ITEM: &str = ".cursor-pointer.rounded-sm.border";
const NEXT: &str = "li.next:not(.disabled) a";
const PAGE_SIZE_SELECT: &str = "select.form-select";

const READY_TIMEOUT: Duration = Duration::from_secs(90);
const ITEMS_TIMEOUT: Duration = Duration::from_secs(30);
const READY_POLL: Duration = Duration::from_millis(250);
/// Resource count must stay flat this long to count as network idle.
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// How to launch the browser and prepare the listing.
#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    pub headless: bool,
    /// `id` of the congress dropdown, e.g. `20th Congress`.
    pub congress: String,
    /// Value chosen in the page-size select.
    pub page_size: usize,
}

/// A live browser tab showing the listing.
pub struct ChromiumListing {
    browser: Browser,
    page: Page,
    handler: Option<JoinHandle<()>>,
}

/// JavaScript string literal for `s`.
fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// CSS attribute selector matching an element by exact `id`.
fn id_selector(id: &str) -> String {
    format!("[id={}]", js_str(id))
}

impl ChromiumListing {
    /// Launch a browser and open `listing_url`, ready for extraction.
    #[instrument(level = "info", skip_all, fields(%listing_url))]
    pub async fn open(listing_url: &Url, options: &ChromiumOptions) -> Result<Self, ScrapeError> {
        let mut builder = BrowserConfig::builder().window_size(1000, 500);
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(ScrapeError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "DevTools handler stopped");
                    break;
                }
            }
        });

        let page = browser.new_page(listing_url.as_str()).await?;
        let listing = Self {
            browser,
            page,
            handler: Some(handler),
        };
        listing.prepare(options).await?;
        info!("Listing ready");
        Ok(listing)
    }

    async fn prepare(&self, options: &ChromiumOptions) -> Result<(), ScrapeError> {
        let dropdown = id_selector(&options.congress);
        self.wait_visible(&dropdown, READY_TIMEOUT).await?;

        let selected: bool = self
            .eval(format!(
                r#"(() => {{
                    const select = document.querySelectorAll({sel})[1];
                    if (!select) return false;
                    select.value = {value};
                    select.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return true;
                }})()"#,
                sel = js_str(PAGE_SIZE_SELECT),
                value = js_str(&options.page_size.to_string()),
            ))
            .await?;
        if !selected {
            warn!("Page-size select not found; using the portal default");
        }

        self.page.find_element(dropdown.as_str()).await?.click().await?;
        self.wait_visible(ITEM, ITEMS_TIMEOUT).await?;
        let _: bool = self
            .eval("(() => { window.scrollTo(0, document.body.scrollHeight); return true; })()")
            .await?;
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, script: impl Into<String>) -> Result<T, ScrapeError> {
        let result = self.page.evaluate(script.into()).await?;
        Ok(result.into_value::<T>()?)
    }

    async fn wait_visible(&self, selector: &str, limit: Duration) -> Result<(), ScrapeError> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                return !!el && el.offsetParent !== null;
            }})()"#,
            sel = js_str(selector),
        );
        let visible = poll_until(limit, READY_POLL, || async {
            let shown: bool = self.eval(script.as_str()).await?;
            Ok::<_, ScrapeError>(shown.then_some(()))
        })
        .await;
        visible.ok_or_else(|| ScrapeError::Navigation(format!("{selector} not visible after {limit:?}")))
    }

    /// Script evaluating `expr` against item `index`.
    ///
    /// DevTools reports a bare `null` result as "no value", so the result is
    /// wrapped in an object that is empty when the item does not exist.
    fn item_script(index: usize, expr: &str) -> String {
        format!(
            r#"(() => {{
                const el = document.querySelectorAll({sel})[{index}];
                return el ? {{ value: ({expr}) }} : {{}};
            }})()"#,
            sel = js_str(ITEM),
        )
    }

    async fn eval_item<T: DeserializeOwned>(
        &self,
        index: usize,
        expr: &str,
    ) -> Result<Option<T>, ScrapeError> {
        let slot: Slot<T> = self.eval(Self::item_script(index, expr)).await?;
        Ok(slot.value)
    }
}

#[derive(Deserialize)]
struct Slot<T> {
    value: Option<T>,
}

impl ListingPage for ChromiumListing {
    async fn item_count(&self) -> Result<usize, ScrapeError> {
        self.eval(format!("document.querySelectorAll({}).length", js_str(ITEM)))
            .await
    }

    async fn scroll_item_into_view(&self, index: usize) -> Result<(), ScrapeError> {
        let found: Option<bool> = self
            .eval_item(index, "el.scrollIntoView({ block: 'center' }), true")
            .await?;
        found
            .map(|_| ())
            .ok_or_else(|| ScrapeError::MissingElement(format!("listing item {index}")))
    }

    async fn item_html(&self, index: usize) -> Result<Option<String>, ScrapeError> {
        self.eval_item(index, "el.outerHTML").await
    }

    async fn has_next(&self) -> Result<bool, ScrapeError> {
        self.eval(format!("document.querySelectorAll({}).length > 0", js_str(NEXT)))
            .await
    }

    async fn click_next(&self) -> Result<(), ScrapeError> {
        let next = self
            .page
            .find_element(NEXT)
            .await
            .map_err(|e| ScrapeError::Navigation(format!("next control: {e}")))?;
        next.click().await?;
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), ScrapeError> {
        let probe = r#"(() => [
            document.readyState,
            performance.getEntriesByType('resource').length
        ])()"#;
        let deadline = Instant::now() + timeout;
        let mut last: Option<(Instant, usize)> = None;

        while Instant::now() < deadline {
            let (state, resources): (String, usize) = self.eval(probe).await?;
            let now = Instant::now();
            match last {
                Some((since, count)) if count == resources => {
                    if state == "complete" && now.duration_since(since) >= IDLE_WINDOW {
                        return Ok(());
                    }
                }
                _ => last = Some((now, resources)),
            }
            sleep(READY_POLL).await;
        }
        Err(ScrapeError::TransitionTimeout(timeout))
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        self.browser.close().await?;
        if let Some(handler) = self.handler.take() {
            if let Err(e) = handler.await {
                warn!(error = %e, "DevTools handler task panicked");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes_quotes() {
        assert_eq!(js_str(r#"div:has("x")"#), r#""div:has(\"x\")""#);
        assert_eq!(js_str("20th Congress"), r#""20th Congress""#);
    }

    #[test]
    fn test_id_selector_quotes_spaces() {
        assert_eq!(id_selector("20th Congress"), r#"[id="20th Congress"]"#);
    }

    #[test]
    fn test_slot_without_value_is_none() {
        let empty: Slot<String> = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.value, None);
        let filled: Slot<usize> = serde_json::from_str(r#"{"value": 4}"#).unwrap();
        assert_eq!(filled.value, Some(4));
    }

    #[test]
    fn test_item_script_indexes_items() {
        let script = ChromiumListing::item_script(3, "el.outerHTML");
        assert!(script.contains(r#"document.querySelectorAll(".cursor-pointer.rounded-sm.border")[3]"#));
        assert!(script.contains("return el ? { value: (el.outerHTML) } : {};"));
    }
}
