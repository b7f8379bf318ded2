//! Index selection for reads.
//!
//! A selector turns collection IDs and a datetime range into the
//! comma-joined index expression handed to the query layer.

pub mod datetime;
pub mod filter;
pub mod unfiltered;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::cache::AliasCache;
use crate::config::PartitionConfig;
use crate::engine::SearchEngineClient;
use crate::error::{KairosError, Result};
use crate::naming::extract_date;

pub use datetime::DatetimeIndexSelector;
pub use filter::filter_indexes_by_datetime;
pub use unfiltered::UnfilteredIndexSelector;

#[async_trait]
pub trait IndexSelector: Send + Sync + Debug {
    /// Indices to query for `collection_ids` within `range`.
    ///
    /// `None` or an empty list means "every collection".
    async fn select_indexes(
        &self,
        collection_ids: Option<&[String]>,
        range: &DatetimeRange,
    ) -> Result<String>;

    /// Drop cached engine metadata and reload it.
    async fn refresh_cache(&self) -> Result<()>;
}

/// Inclusive date range of a search; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatetimeRange {
    pub gte: Option<NaiveDate>,
    pub lte: Option<NaiveDate>,
}

impl DatetimeRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The single day `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            gte: Some(date),
            lte: Some(date),
        }
    }

    pub fn between(gte: Option<NaiveDate>, lte: Option<NaiveDate>) -> Self {
        Self { gte, lte }
    }

    /// Parse both bounds; `None`, `""` and `".."` leave a bound open.
    pub fn parse(gte: Option<&str>, lte: Option<&str>) -> Result<Self> {
        Ok(Self {
            gte: parse_bound(gte)?,
            lte: parse_bound(lte)?,
        })
    }

    /// Parse an ISO-8601 interval such as `2024-01-01T00:00:00Z/..` or a
    /// single instant.
    pub fn from_interval(interval: &str) -> Result<Self> {
        let mut parts = interval.split('/');
        let (start, end) = match (parts.next(), parts.next(), parts.next()) {
            (Some(single), None, None) => (Some(single), Some(single)),
            (Some(start), Some(end), None) => (Some(start), Some(end)),
            _ => {
                return Err(KairosError::invalid_argument(format!(
                    "invalid datetime interval {interval:?}"
                )));
            }
        };
        let range = Self::parse(start, end)?;
        if let (Some(gte), Some(lte)) = (range.gte, range.lte)
            && gte > lte
        {
            return Err(KairosError::invalid_argument(format!(
                "interval start is after its end: {interval:?}"
            )));
        }
        Ok(range)
    }

    pub fn is_unbounded(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }
}

fn parse_bound(bound: Option<&str>) -> Result<Option<NaiveDate>> {
    match bound.map(str::trim) {
        None | Some("") | Some("..") => Ok(None),
        Some(value) => extract_date(value).map(Some),
    }
}

/// Selector matching the configured strategy.
///
/// Every datetime selector built on the same `cache` shares its snapshot.
pub fn create_selector(
    config: &PartitionConfig,
    client: Arc<dyn SearchEngineClient>,
    cache: Arc<AliasCache>,
) -> Arc<dyn IndexSelector> {
    if config.datetime_partitioning {
        Arc::new(DatetimeIndexSelector::new(client, cache))
    } else {
        Arc::new(UnfilteredIndexSelector::new())
    }
}
