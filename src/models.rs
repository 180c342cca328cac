//! Data models for scraped house bills.
//!
//! This module defines the two structures the whole run revolves around:
//! - [`BillRecord`]: one house bill, identified by its bill number
//! - [`BillCollection`]: the set of bills collected so far, keyed by identity
//!
//! Identity is deliberately *not* expressed through `PartialEq`/`Hash` on the
//! record. The collection is handed an explicit key function instead, so the
//! "same bill number means same bill" policy is visible where it is applied.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::errors::ScrapeError;

/// Marker for data the portal did not provide.
pub const PLACEHOLDER: &str = "N/A";

/// Returns `true` when `value` carries no real data.
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == PLACEHOLDER
}

/// Descriptive metadata of a bill.
///
/// Every field defaults to [`PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillDetails {
    pub main_title: String,
    pub session_number: String,
    pub significance: String,
    pub date_filed: String,
    pub principal_authors: String,
    pub date_read: String,
    pub primary_referral: String,
    pub bill_status: String,
    /// URL of the filed text, or [`PLACEHOLDER`] when the item has no PDF link.
    pub text_filed: String,
}

impl Default for BillDetails {
    fn default() -> Self {
        Self {
            main_title: PLACEHOLDER.to_string(),
            session_number: PLACEHOLDER.to_string(),
            significance: PLACEHOLDER.to_string(),
            date_filed: PLACEHOLDER.to_string(),
            principal_authors: PLACEHOLDER.to_string(),
            date_read: PLACEHOLDER.to_string(),
            primary_referral: PLACEHOLDER.to_string(),
            bill_status: PLACEHOLDER.to_string(),
            text_filed: PLACEHOLDER.to_string(),
        }
    }
}

/// A single house bill as listed on the portal.
///
/// Fields are fixed at construction; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillRecord {
    number: String,
    details: BillDetails,
    downloaded: bool,
}

impl BillRecord {
    /// Build a record, trimming the bill number.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::InvalidIdentity`] if the bill number is blank or the
    /// placeholder value.
    pub fn new(
        number: impl Into<String>,
        details: BillDetails,
        downloaded: bool,
    ) -> Result<Self, ScrapeError> {
        let number = number.into();
        if is_placeholder(&number) {
            return Err(ScrapeError::InvalidIdentity(number));
        }
        Ok(Self {
            number: number.trim().to_string(),
            details,
            downloaded,
        })
    }

    /// The house bill number (e.g. `HB00001`).
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn details(&self) -> &BillDetails {
        &self.details
    }

    /// Whether the filed text was retrieved during the run that created this record.
    pub fn downloaded(&self) -> bool {
        self.downloaded
    }
}

/// Key function selecting the bill number as a record's identity.
pub fn bill_number_key(record: &BillRecord) -> &str {
    record.number()
}

/// Set of bills, unique by the key function it was built with.
///
/// The first record inserted for a key is kept; later ones are dropped and
/// never merged into it.
#[derive(Debug, Clone)]
pub struct BillCollection {
    records: HashMap<String, BillRecord>,
    key: fn(&BillRecord) -> &str,
}

impl Default for BillCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl BillCollection {
    /// An empty collection keyed by bill number.
    pub fn new() -> Self {
        Self::with_key(bill_number_key)
    }

    pub fn with_key(key: fn(&BillRecord) -> &str) -> Self {
        Self {
            records: HashMap::new(),
            key,
        }
    }

    /// Insert `record` unless its key is already present.
    ///
    /// Returns `true` if the record was added.
    pub fn insert(&mut self, record: BillRecord) -> bool {
        let key = (self.key)(&record).to_string();
        match self.records.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Whether a bill with this key has been collected.
    ///
    /// Placeholder keys never match, even if one slipped into the collection.
    pub fn contains(&self, key: &str) -> bool {
        !is_placeholder(key) && self.records.contains_key(key.trim())
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&BillRecord> {
        self.records.get(key.trim())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &BillRecord> {
        self.records.values()
    }

    #[cfg(test)]
    /// The set of keys, for comparing collections by identity.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}
