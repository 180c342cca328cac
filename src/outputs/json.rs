//! JSON persistence of the bill collection.
//!
//! The metadata file is a pretty-printed array of objects with human-readable
//! keys:
//!
//! ```text
//! [
//!     {
//!         "House Bill Number": "HB00001",
//!         "Main Title": "AN ACT ...",
//!         "Session Number": "...",
//!         "Significance": "NATIONAL",
//!         "Date Filed": "...",
//!         "Principal Authors": "...",
//!         "Date Read": "...",
//!         "Primary Referral": "...",
//!         "Bill Status": "...",
//!         "Text Filed": "https://.../HB00001.pdf"
//!     }
//! ]
//! ```
//!
//! # Downloaded flag
//!
//! The downloadability flag is read from a `"Downloaded"` key when present
//! but is never written, so it does not survive a save/load cycle. Only the
//! identity set is guaranteed to round-trip.

use std::io::ErrorKind;
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::errors::ScrapeError;
use crate::models::{BillCollection, BillDetails, BillRecord, PLACEHOLDER};

/// On-disk shape of one bill.
#[derive(Debug, Serialize, Deserialize)]
struct BillEntry {
    #[serde(rename = "House Bill Number", default = "placeholder", deserialize_with = "or_placeholder")]
    house_bill_number: String,
    #[serde(rename = "Main Title", default = "placeholder", deserialize_with = "or_placeholder")]
    main_title: String,
    #[serde(rename = "Session Number", default = "placeholder", deserialize_with = "or_placeholder")]
    session_number: String,
    #[serde(rename = "Significance", default = "placeholder", deserialize_with = "or_placeholder")]
    significance: String,
    #[serde(rename = "Date Filed", default = "placeholder", deserialize_with = "or_placeholder")]
    date_filed: String,
    #[serde(rename = "Principal Authors", default = "placeholder", deserialize_with = "or_placeholder")]
    principal_authors: String,
    #[serde(rename = "Date Read", default = "placeholder", deserialize_with = "or_placeholder")]
    date_read: String,
    #[serde(rename = "Primary Referral", default = "placeholder", deserialize_with = "or_placeholder")]
    primary_referral: String,
    #[serde(rename = "Bill Status", default = "placeholder", deserialize_with = "or_placeholder")]
    bill_status: String,
    #[serde(rename = "Text Filed", default = "placeholder", deserialize_with = "or_placeholder")]
    text_filed: String,
    #[serde(rename = "Downloaded", default, skip_serializing)]
    downloaded: Option<bool>,
}

fn placeholder() -> String {
    PLACEHOLDER.to_string()
}

/// Treat `null` the same as a missing key.
fn or_placeholder<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.unwrap_or_else(placeholder))
}

impl From<&BillRecord> for BillEntry {
    fn from(record: &BillRecord) -> Self {
        let d = record.details();
        Self {
            house_bill_number: record.number().to_string(),
            main_title: d.main_title.clone(),
            session_number: d.session_number.clone(),
            significance: d.significance.clone(),
            date_filed: d.date_filed.clone(),
            principal_authors: d.principal_authors.clone(),
            date_read: d.date_read.clone(),
            primary_referral: d.primary_referral.clone(),
            bill_status: d.bill_status.clone(),
            text_filed: d.text_filed.clone(),
            downloaded: Some(record.downloaded()),
        }
    }
}

impl TryFrom<BillEntry> for BillRecord {
    type Error = ScrapeError;

    fn try_from(entry: BillEntry) -> Result<Self, Self::Error> {
        let details = BillDetails {
            main_title: entry.main_title,
            session_number: entry.session_number,
            significance: entry.significance,
            date_filed: entry.date_filed,
            principal_authors: entry.principal_authors,
            date_read: entry.date_read,
            primary_referral: entry.primary_referral,
            bill_status: entry.bill_status,
            text_filed: entry.text_filed,
        };
        BillRecord::new(entry.house_bill_number, details, entry.downloaded.unwrap_or(false))
    }
}

/// Load the collection stored at `path`.
///
/// A missing file yields an empty collection. Entries without a usable bill
/// number are skipped, and later entries repeating a bill number are dropped.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is not a JSON
/// array of objects.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_collection(path: &Path) -> Result<BillCollection, ScrapeError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No existing metadata found; starting with an empty collection");
            return Ok(BillCollection::new());
        }
        Err(e) => return Err(e.into()),
    };

    let entries: Vec<BillEntry> = serde_json::from_str(&raw)?;
    let total = entries.len();
    let mut collection = BillCollection::new();
    for (index, entry) in entries.into_iter().enumerate() {
        match BillRecord::try_from(entry) {
            Ok(record) => {
                collection.insert(record);
            }
            Err(e) => warn!(index, error = %e, "Skipping stored entry without a bill number"),
        }
    }

    info!(entries = total, unique = collection.len(), "Loaded stored bills");
    Ok(collection)
}

/// Overwrite `path` with every record in `collection`, sorted by bill number.
///
/// The parent directory is created if needed.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = collection.len()))]
pub async fn save_collection(path: &Path, collection: &BillCollection) -> Result<(), ScrapeError> {
    let entries: Vec<BillEntry> = collection
        .iter()
        .sorted_by(|a, b| a.number().cmp(b.number()))
        .map(BillEntry::from)
        .collect();

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    entries.serialize(&mut ser)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, buf).await?;
    info!("Wrote metadata");
    Ok(())
}
