//! Index, alias and document naming.
//!
//! Everything here is pure. Physical index names embed a sanitized,
//! lower-cased collection ID and, in datetime mode, the partition start date:
//!
//! ```text
//! items_<collection>_<start>                  physical partition index
//! <collection>_<start>                        open item alias
//! <collection>_<start>-<end>                  closed item alias
//! items_<collection>                          collection alias
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{KairosError, Result};

pub const ITEMS_INDEX_PREFIX: &str = "items_";
pub const COLLECTIONS_INDEX: &str = "collections";
/// Catalog-wide pattern matching every item index.
pub const ITEM_INDICES: &str = "items_*,-*kibana*,-collections*";

/// Characters the engines reject in index names.
const UNSUPPORTED_INDEX_CHARS: &[char] = &[
    '\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':',
];

pub const DATE_FORMAT: &str = "%Y-%m-%d";

lazy_static! {
    static ref PARTITION_SUFFIX: Regex =
        Regex::new(r"_(\d{4}-\d{2}-\d{2})(?:-(\d{4}-\d{2}-\d{2}))?$").unwrap();
}

/// Strip characters that are not allowed in index names.
pub fn sanitize(collection_id: &str) -> String {
    collection_id
        .chars()
        .filter(|c| !UNSUPPORTED_INDEX_CHARS.contains(c))
        .collect()
}

/// Alias spanning every partition of a collection.
pub fn collection_alias(collection_id: &str) -> String {
    format!("{ITEMS_INDEX_PREFIX}{}", sanitize(collection_id))
}

/// Physical index of a collection when datetime partitioning is off.
///
/// The hex form of the raw ID keeps collections apart whose sanitized
/// names collide.
pub fn simple_index_name(collection_id: &str) -> String {
    let hex: String = collection_id
        .as_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    format!(
        "{ITEMS_INDEX_PREFIX}{}_{hex}-000001",
        sanitize(collection_id).to_lowercase()
    )
}

/// Physical index of the partition starting at `start`.
pub fn datetime_index_name(collection_id: &str, start: NaiveDate) -> String {
    format!(
        "{ITEMS_INDEX_PREFIX}{}_{}",
        sanitize(collection_id).to_lowercase(),
        start.format(DATE_FORMAT)
    )
}

/// Alias naming one physical partition; the index name minus the prefix.
pub fn item_alias(index_name: &str) -> &str {
    index_name
        .strip_prefix(ITEMS_INDEX_PREFIX)
        .unwrap_or(index_name)
}

/// Physical index behind an open item alias.
pub fn index_for_alias(alias: &str) -> String {
    format!("{ITEMS_INDEX_PREFIX}{alias}")
}

/// Alias an open alias is renamed to when its partition closes at `end`.
pub fn closed_alias(open_alias: &str, end: NaiveDate) -> String {
    format!("{open_alias}-{}", end.format(DATE_FORMAT))
}

/// Comma-joined collection aliases, or the catalog-wide pattern.
pub fn indices(collection_ids: Option<&[String]>) -> String {
    match collection_ids {
        Some(ids) if !ids.is_empty() => ids
            .iter()
            .map(|id| collection_alias(id))
            .collect::<Vec<_>>()
            .join(","),
        _ => ITEM_INDICES.to_string(),
    }
}

/// Engine document ID of an item.
pub fn item_document_id(item_id: &str, collection_id: &str) -> String {
    format!("{item_id}|{collection_id}")
}

/// Calendar date of an ISO-8601 datetime.
///
/// Offsets are honored as written: `2024-01-01T23:00:00-05:00` is
/// 2024-01-01, not the UTC date.
pub fn extract_date(datetime: &str) -> Result<NaiveDate> {
    let value = datetime.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| KairosError::invalid_argument(format!("invalid datetime {datetime:?}")))
}

/// Start and optional end date encoded in an item alias or index name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PartitionDates {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl PartitionDates {
    /// Parse the trailing `_<start>[-<end>]` of a name.
    ///
    /// Only the suffix is read, so collection IDs that contain dates of their
    /// own do not shift the partition boundaries.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = PARTITION_SUFFIX.captures(name)?;
        let parse =
            |m: regex::Match<'_>| NaiveDate::parse_from_str(m.as_str(), DATE_FORMAT).ok();
        let start = caps.get(1).and_then(parse)?;
        let end = match caps.get(2) {
            Some(m) => Some(parse(m)?),
            None => None,
        };
        Some(Self { start, end })
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// Start date embedded in a partition name.
pub fn extract_first_date(name: &str) -> Result<NaiveDate> {
    PartitionDates::parse(name)
        .map(|dates| dates.start)
        .ok_or_else(|| KairosError::invalid_argument(format!("no start date in {name:?}")))
}
