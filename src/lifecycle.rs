//! Partition lifecycle.
//!
//! A collection's partitions tile time without gaps: each covers
//! `[start, next_start)` and only the newest one is open. The
//! [`PartitionManager`] performs the three structural changes an incoming
//! item can cause:
//!
//! | Trigger                                  | Change                                               |
//! |------------------------------------------|------------------------------------------------------|
//! | collection has no partitions             | open a partition starting on the item's day          |
//! | item precedes the earliest partition     | add a partition closed the day before the old first  |
//! | open partition is over its size budget   | close it on the item's day, open one the day after   |
//!
//! Boundaries always fall between days. Items from the day a rollover is
//! decided stay in the old partition, which keeps same-day writes from
//! creating partitions in a loop.

pub mod size;

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde_json::Value;

use crate::engine::{SearchEngineAdapter, SearchEngineClient};
use crate::error::{KairosError, Result};
use crate::naming::{PartitionDates, extract_date, extract_first_date};

pub use size::IndexSizeMonitor;

/// Outcome of closing the open partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollover {
    /// Alias the old partition carries now.
    pub closed_alias: String,
    /// Open alias of the new partition.
    pub new_alias: String,
    /// Last day covered by the old partition.
    pub split_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct PartitionManager {
    client: Arc<dyn SearchEngineClient>,
    adapter: Arc<dyn SearchEngineAdapter>,
    size_monitor: IndexSizeMonitor,
}

impl PartitionManager {
    pub fn new(
        client: Arc<dyn SearchEngineClient>,
        adapter: Arc<dyn SearchEngineAdapter>,
        max_size_gb: f64,
    ) -> Self {
        let size_monitor = IndexSizeMonitor::new(Arc::clone(&client), max_size_gb);
        Self {
            client,
            adapter,
            size_monitor,
        }
    }

    pub fn size_monitor(&self) -> &IndexSizeMonitor {
        &self.size_monitor
    }

    /// Day an item is routed by, taken from `properties.datetime`.
    pub fn item_date(item: &Value) -> Result<NaiveDate> {
        let datetime = item
            .pointer("/properties/datetime")
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                KairosError::bad_request("item datetime is required for datetime partitioning")
            })?;
        extract_date(datetime)
    }

    /// Open the first partition of a collection.
    pub async fn handle_new_collection(&self, collection_id: &str, date: NaiveDate) -> Result<String> {
        let alias = self
            .adapter
            .create_datetime_index(self.client.as_ref(), collection_id, date)
            .await?;
        log::info!("opened first partition {alias} of collection {collection_id}");
        Ok(alias)
    }

    /// Add a partition for an item older than every existing partition.
    ///
    /// The new partition starts on `date` and is closed right away on the day
    /// before `earliest_start`.
    pub async fn handle_early_date(
        &self,
        collection_id: &str,
        date: NaiveDate,
        earliest_start: NaiveDate,
    ) -> Result<String> {
        let end = previous_day(earliest_start)?;
        let alias = self
            .adapter
            .create_datetime_index(self.client.as_ref(), collection_id, date)
            .await?;
        self.adapter
            .update_index_alias(self.client.as_ref(), end, &alias)
            .await
    }

    /// Close `open_alias` after `date` and open the next partition.
    pub async fn roll_over(
        &self,
        collection_id: &str,
        open_alias: &str,
        date: NaiveDate,
    ) -> Result<Rollover> {
        let next_start = next_day(date)?;
        let closed_alias = self
            .adapter
            .update_index_alias(self.client.as_ref(), date, open_alias)
            .await?;
        let new_alias = self
            .adapter
            .create_datetime_index(self.client.as_ref(), collection_id, next_start)
            .await?;
        log::info!("rolled over {open_alias} of collection {collection_id} into {new_alias}");
        Ok(Rollover {
            closed_alias,
            new_alias,
            split_date: date,
        })
    }

    /// Roll over an oversized open partition for an item dated `date`.
    ///
    /// Returns `None` when the item falls on the partition's first day or the
    /// alias is already closed; neither can be split.
    pub async fn handle_oversized_index(
        &self,
        collection_id: &str,
        target_alias: &str,
        date: NaiveDate,
    ) -> Result<Option<Rollover>> {
        let open = PartitionDates::parse(target_alias).is_some_and(|dates| dates.is_open());
        if !open || extract_first_date(target_alias)? == date {
            return Ok(None);
        }
        self.roll_over(collection_id, target_alias, date).await.map(Some)
    }
}

fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| KairosError::invalid_argument(format!("no day after {date}")))
}

fn previous_day(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(1))
        .ok_or_else(|| KairosError::invalid_argument(format!("no day before {date}")))
}
