//! Extraction of bill records from one rendered listing page.
//!
//! Each listing item is a card holding the bill number, the title, a grid of
//! labelled metadata, and (usually) a link to the filed text:
//!
//! ```text
//! div.cursor-pointer.rounded-sm.border
//! ├── span.rounded.border span span        -> bill number
//! ├── span.text-blue-500                   -> main title
//! ├── div.grid.gap-1.px-5
//! │   ├── div "Session No. :"  + div value
//! │   └── ...
//! └── a[href$=".pdf"]                      -> text as filed
//! ```
//!
//! Items whose bill number is already collected are skipped before any other
//! work. A labelled field that does not show up within the field timeout is
//! recorded as `"N/A"` rather than dropping the item.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

use crate::browser::ListingPage;
use crate::config::ScrapeSettings;
use crate::download::FileDownloader;
use crate::errors::ScrapeError;
use crate::models::{BillCollection, BillDetails, BillRecord, PLACEHOLDER, is_placeholder};
use crate::utils::truncate_for_log;
use crate::wait::poll_until;

static BILL_NUMBER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.rounded.border span span").unwrap());
static MAIN_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("span.text-blue-500").unwrap());
static META_GRID: Lazy<Selector> = Lazy::new(|| Selector::parse(".grid.gap-1.px-5").unwrap());
static DIV: Lazy<Selector> = Lazy::new(|| Selector::parse("div").unwrap());
static PDF_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href$=".pdf"]"#).unwrap());

/// Labels of the metadata grid, in [`BillDetails`] field order.
pub const SESSION_NUMBER: &str = "Session No. :";
pub const SIGNIFICANCE: &str = "Significance :";
pub const DATE_FILED: &str = "Date Filed :";
pub const PRINCIPAL_AUTHORS: &str = "Principal Author/s :";
pub const DATE_READ: &str = "Date Read :";
pub const PRIMARY_REFERRAL: &str = "Primary Referral :";
pub const BILL_STATUS: &str = "Bill Status :";

/// Per-page tally of what the extractor did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageReport {
    pub items: usize,
    pub added: usize,
    pub duplicates: usize,
    /// Items dropped because of a recoverable error (e.g. no bill number).
    pub skipped: usize,
    pub downloaded: usize,
}

enum ItemOutcome {
    Added { downloaded: bool },
    Duplicate,
}

/// Visible text of an element with whitespace runs collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(item_html: &str, selector: &Selector) -> Option<String> {
    let fragment = Html::parse_fragment(item_html);
    fragment.select(selector).next().map(element_text)
}

/// The bill number in an item's header, if it carries a real one.
pub fn bill_number(item_html: &str) -> Option<String> {
    first_text(item_html, &BILL_NUMBER).filter(|n| !is_placeholder(n))
}

pub fn main_title(item_html: &str) -> Option<String> {
    first_text(item_html, &MAIN_TITLE)
}

/// Value of the div immediately following the first div that contains `label`.
///
/// Only the innermost label div counts: a row wrapping both label and value
/// also contains the label text, but its sibling is the next row.
pub fn labeled_value(item_html: &str, label: &str) -> Option<String> {
    let holds_label = |div: ElementRef<'_>| element_text(div).contains(label);
    let fragment = Html::parse_fragment(item_html);
    for grid in fragment.select(&META_GRID) {
        for div in grid.select(&DIV) {
            if !holds_label(div) || div.select(&DIV).any(|inner| holds_label(inner)) {
                continue;
            }
            let sibling = div.next_siblings().find_map(ElementRef::wrap);
            if let Some(value) = sibling.filter(|s| s.value().name() == "div") {
                return Some(element_text(value));
            }
        }
    }
    None
}

/// `href` of the first link to a PDF.
pub fn pdf_link(item_html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(item_html);
    fragment
        .select(&PDF_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
}

/// Read one labelled field, re-reading the item until it appears or the
/// field timeout passes.
async fn field<P: ListingPage>(
    page: &P,
    index: usize,
    snapshot: &str,
    label: &str,
    settings: &ScrapeSettings,
) -> String {
    if let Some(value) = labeled_value(snapshot, label) {
        return value;
    }
    let found = poll_until(settings.field_timeout, settings.poll_interval, || async {
        let html = page.item_html(index).await?;
        Ok::<_, ScrapeError>(html.and_then(|h| labeled_value(&h, label)))
    })
    .await;
    found.unwrap_or_else(|| {
        debug!(index, label, "Field not found; using placeholder");
        PLACEHOLDER.to_string()
    })
}

async fn extract_item<P, D>(
    page: &P,
    index: usize,
    collection: &mut BillCollection,
    downloader: &D,
    settings: &ScrapeSettings,
) -> Result<ItemOutcome, ScrapeError>
where
    P: ListingPage,
    D: FileDownloader,
{
    page.scroll_item_into_view(index).await?;

    let html = page
        .item_html(index)
        .await?
        .ok_or_else(|| ScrapeError::MissingElement(format!("listing item {index}")))?;
    let number = bill_number(&html)
        .ok_or_else(|| ScrapeError::MissingElement(format!("bill number of item {index}")))?;

    if collection.contains(&number) {
        info!(%number, "Skipping: already collected");
        return Ok(ItemOutcome::Duplicate);
    }

    let title = main_title(&html).unwrap_or_else(|| PLACEHOLDER.to_string());
    debug!(%number, title = %truncate_for_log(&title, 80), "New bill");

    let link = match pdf_link(&html) {
        Some(href) => settings
            .listing_url
            .join(&href)
            .map(String::from)
            .unwrap_or(href),
        None => PLACEHOLDER.to_string(),
    };
    let downloaded = if is_placeholder(&link) {
        false
    } else {
        downloader.download(&link).await
    };

    let details = BillDetails {
        main_title: title,
        session_number: field(page, index, &html, SESSION_NUMBER, settings).await,
        significance: field(page, index, &html, SIGNIFICANCE, settings).await,
        date_filed: field(page, index, &html, DATE_FILED, settings).await,
        principal_authors: field(page, index, &html, PRINCIPAL_AUTHORS, settings).await,
        date_read: field(page, index, &html, DATE_READ, settings).await,
        primary_referral: field(page, index, &html, PRIMARY_REFERRAL, settings).await,
        bill_status: field(page, index, &html, BILL_STATUS, settings).await,
        text_filed: link,
    };

    collection.insert(BillRecord::new(number, details, downloaded)?);
    Ok(ItemOutcome::Added { downloaded })
}

/// Extract every item on the current page into `collection`.
///
/// # Errors
///
/// Recoverable item failures are logged and counted in
/// [`PageReport::skipped`]; anything else (e.g. the browser going away) is
/// returned and ends the page.
#[instrument(level = "info", skip_all)]
pub async fn extract_page<P, D>(
    page: &P,
    collection: &mut BillCollection,
    downloader: &D,
    settings: &ScrapeSettings,
) -> Result<PageReport, ScrapeError>
where
    P: ListingPage,
    D: FileDownloader,
{
    let items = page.item_count().await?;
    let mut report = PageReport {
        items,
        ..PageReport::default()
    };

    for index in 0..items {
        match extract_item(page, index, collection, downloader, settings).await {
            Ok(ItemOutcome::Added { downloaded }) => {
                report.added += 1;
                if downloaded {
                    report.downloaded += 1;
                }
            }
            Ok(ItemOutcome::Duplicate) => report.duplicates += 1,
            Err(e) if e.is_recoverable() => {
                warn!(index, error = %e, "Skipping item");
                report.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        items = report.items,
        added = report.added,
        duplicates = report.duplicates,
        skipped = report.skipped,
        downloaded = report.downloaded,
        "Extracted page"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeListing, StubDownloader, bill_item, fast_settings, full_item};

    #[test]
    fn test_parses_header_and_fields() {
        let html = full_item("HB00001", Some("https://docs.example.org/HB00001.pdf"));
        assert_eq!(bill_number(&html).as_deref(), Some("HB00001"));
        assert_eq!(main_title(&html).as_deref(), Some("AN ACT HB00001"));
        assert_eq!(labeled_value(&html, DATE_FILED).as_deref(), Some("2025-07-01"));
        assert_eq!(
            labeled_value(&html, PRINCIPAL_AUTHORS).as_deref(),
            Some("DELA CRUZ, JUAN")
        );
        assert_eq!(
            pdf_link(&html).as_deref(),
            Some("https://docs.example.org/HB00001.pdf")
        );
    }

    #[test]
    fn test_collapses_whitespace() {
        let html = bill_item(
            "\n   HB00009  ",
            "AN ACT\n      PROVIDING",
            &[("Bill Status :", "  Approved \n by  the House ")],
            None,
        );
        assert_eq!(bill_number(&html).as_deref(), Some("HB00009"));
        assert_eq!(main_title(&html).as_deref(), Some("AN ACT PROVIDING"));
        assert_eq!(
            labeled_value(&html, BILL_STATUS).as_deref(),
            Some("Approved by the House")
        );
    }

    #[test]
    fn test_labeled_value_inside_row_wrappers() {
        let html = r#"<div class="cursor-pointer rounded-sm border">
  <div class="grid gap-1 px-5">
    <div class="row"><div>Session No. :</div><div>1st Regular</div></div>
    <div class="row"><div>Significance :</div><div>NATIONAL</div></div>
  </div>
</div>"#;
        assert_eq!(labeled_value(html, SESSION_NUMBER).as_deref(), Some("1st Regular"));
        assert_eq!(labeled_value(html, SIGNIFICANCE).as_deref(), Some("NATIONAL"));
        assert_eq!(labeled_value(html, DATE_FILED), None);
    }

    #[test]
    fn test_missing_pieces() {
        let html = bill_item("N/A", "Title", &[], Some("/files/readme.txt"));
        assert_eq!(bill_number(&html), None);
        assert_eq!(labeled_value(&html, SIGNIFICANCE), None);
        assert_eq!(pdf_link(&html), None);
    }

    #[tokio::test]
    async fn test_extracts_new_items_and_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let page = FakeListing::new(vec![vec![
            full_item("HB00001", Some("https://docs.example.org/HB00001.pdf")),
            full_item("HB00002", Some("/legisdocs/basic_20/HB00002.pdf")),
        ]]);
        let downloader = StubDownloader::default();
        let mut collection = BillCollection::new();

        let report = extract_page(&page, &mut collection, &downloader, &settings)
            .await
            .unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(report.downloaded, 2);
        assert_eq!(collection.len(), 2);
        assert_eq!(
            *downloader.requested.borrow(),
            vec![
                "https://docs.example.org/HB00001.pdf".to_string(),
                "https://docs.example.org/legisdocs/basic_20/HB00002.pdf".to_string(),
            ]
        );

        let r = collection.get("HB00002").unwrap();
        assert_eq!(r.details().session_number, "1st Regular Session");
        assert_eq!(r.details().bill_status, "Pending with the Committee");
        assert_eq!(
            r.details().text_filed,
            "https://docs.example.org/legisdocs/basic_20/HB00002.pdf"
        );
        assert!(r.downloaded());
        assert_eq!(*page.scrolled.borrow(), vec![(0, 0), (0, 1)]);
    }

    #[tokio::test]
    async fn test_known_items_are_skipped_without_work() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let page = FakeListing::new(vec![vec![full_item(
            "HB00001",
            Some("https://docs.example.org/HB00001.pdf"),
        )]]);
        let downloader = StubDownloader::default();
        let mut collection = BillCollection::new();
        collection.insert(BillRecord::new("HB00001", BillDetails::default(), false).unwrap());

        let report = extract_page(&page, &mut collection, &downloader, &settings)
            .await
            .unwrap();

        assert_eq!(report.duplicates, 1);
        assert_eq!(report.added, 0);
        assert!(downloader.requested.borrow().is_empty());
        assert_eq!(collection.get("HB00001").unwrap().details().main_title, PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_missing_fields_and_link_degrade_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let page = FakeListing::new(vec![vec![bill_item(
            "HB00005",
            "AN ACT WITHOUT TEXT",
            &[("Significance :", "LOCAL")],
            None,
        )]]);
        let downloader = StubDownloader::default();
        let mut collection = BillCollection::new();

        let report = extract_page(&page, &mut collection, &downloader, &settings)
            .await
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.downloaded, 0);
        let r = collection.get("HB00005").unwrap();
        assert_eq!(r.details().significance, "LOCAL");
        assert_eq!(r.details().date_read, PLACEHOLDER);
        assert_eq!(r.details().text_filed, PLACEHOLDER);
        assert!(!r.downloaded());
        assert!(downloader.requested.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_failed_download_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let url = "https://docs.example.org/HB00003.pdf";
        let page = FakeListing::new(vec![vec![full_item("HB00003", Some(url))]]);
        let downloader = StubDownloader::failing(&[url]);
        let mut collection = BillCollection::new();

        let report = extract_page(&page, &mut collection, &downloader, &settings)
            .await
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.downloaded, 0);
        let r = collection.get("HB00003").unwrap();
        assert!(!r.downloaded());
        assert_eq!(r.details().text_filed, url);
    }

    #[tokio::test]
    async fn test_item_without_bill_number_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let page = FakeListing::new(vec![vec![
            r#"<div class="cursor-pointer rounded-sm border"><span class="text-blue-500">?</span></div>"#
                .to_string(),
            full_item("HB00004", None),
        ]]);
        let downloader = StubDownloader::default();
        let mut collection = BillCollection::new();

        let report = extract_page(&page, &mut collection, &downloader, &settings)
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.added, 1);
        assert!(collection.contains("HB00004"));
    }

    #[tokio::test]
    async fn test_duplicates_within_a_page_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let settings = fast_settings(dir.path());
        let page = FakeListing::new(vec![vec![
            full_item("HB00010", None),
            bill_item("HB00010", "A later copy", &[], None),
        ]]);
        let downloader = StubDownloader::default();
        let mut collection = BillCollection::new();

        let report = extract_page(&page, &mut collection, &downloader, &settings)
            .await
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(
            collection.get("HB00010").unwrap().details().main_title,
            "AN ACT HB00010"
        );
    }
}
