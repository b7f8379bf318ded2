use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::cache::AliasCache;
use crate::engine::{BulkAction, SearchEngineAdapter, SearchEngineClient};
use crate::error::{KairosError, Result};
use crate::insertion::{IndexInserter, bulk_action};
use crate::lifecycle::{PartitionManager, Rollover};
use crate::naming::PartitionDates;
use crate::selection::{DatetimeIndexSelector, DatetimeRange, filter_indexes_by_datetime};

/// Routes items into time partitions, creating and rolling them over as
/// they fill.
///
/// Every topology change reloads the shared alias cache before the next
/// lookup.
#[derive(Debug, Clone)]
pub struct DatetimeIndexInserter {
    client: Arc<dyn SearchEngineClient>,
    adapter: Arc<dyn SearchEngineAdapter>,
    selector: DatetimeIndexSelector,
    manager: PartitionManager,
}

impl DatetimeIndexInserter {
    pub fn new(
        client: Arc<dyn SearchEngineClient>,
        adapter: Arc<dyn SearchEngineAdapter>,
        cache: Arc<AliasCache>,
        max_size_gb: f64,
    ) -> Self {
        let selector = DatetimeIndexSelector::new(Arc::clone(&client), cache);
        let manager = PartitionManager::new(Arc::clone(&client), Arc::clone(&adapter), max_size_gb);
        Self {
            client,
            adapter,
            selector,
            manager,
        }
    }

    pub fn manager(&self) -> &PartitionManager {
        &self.manager
    }

    /// Resolve the partition alias for an item dated `date`.
    ///
    /// With `check_size` an oversized open partition is rolled over first.
    async fn resolve(&self, collection_id: &str, date: NaiveDate, check_size: bool) -> Result<String> {
        let partitions = self.sorted_partitions(collection_id).await?;
        let (Some((earliest, _)), Some((_, latest))) = (partitions.first(), partitions.last()) else {
            let alias = self.manager.handle_new_collection(collection_id, date).await?;
            self.selector.reload().await?;
            return Ok(alias);
        };

        if date < *earliest {
            let alias = self
                .manager
                .handle_early_date(collection_id, date, *earliest)
                .await?;
            self.selector.reload().await?;
            return Ok(alias);
        }

        let aliases: Vec<String> = partitions.iter().map(|(_, alias)| alias.clone()).collect();
        let target = filter_indexes_by_datetime(&aliases, &DatetimeRange::on(date))
            .pop()
            .ok_or_else(|| {
                KairosError::internal(format!("no partition of {collection_id} covers {date}"))
            })?;

        if target != *latest || !check_size {
            return Ok(target);
        }

        if self.manager.size_monitor().is_oversized(&target).await?
            && let Some(rollover) = self
                .manager
                .handle_oversized_index(collection_id, &target, date)
                .await?
        {
            self.selector.reload().await?;
            return Ok(rollover.closed_alias);
        }
        Ok(target)
    }

    /// Like [`Self::resolve`], but reloads the cache and tries once more when
    /// the engine no longer knows an alias from the snapshot. Another context
    /// may have renamed it in a rollover.
    async fn resolve_fresh(&self, collection_id: &str, date: NaiveDate) -> Result<String> {
        match self.resolve(collection_id, date, true).await {
            Err(err) if err.is_engine_not_found() => {
                log::debug!("stale partition aliases for {collection_id}, reloading: {err}");
                self.selector.reload().await?;
                self.resolve(collection_id, date, true).await
            }
            other => other,
        }
    }

    /// Dated partition aliases of a collection, oldest first.
    async fn sorted_partitions(&self, collection_id: &str) -> Result<Vec<(NaiveDate, String)>> {
        let mut partitions: Vec<(NaiveDate, String)> = self
            .selector
            .collection_indexes(collection_id)
            .await?
            .into_iter()
            .filter_map(|alias| PartitionDates::parse(&alias).map(|dates| (dates.start, alias)))
            .collect();
        partitions.sort();
        Ok(partitions)
    }

    /// Roll over once for the whole batch when its first item lands in the
    /// oversized open partition.
    ///
    /// The old partition is closed on the first item's day, so items of that
    /// day stay in it and later ones go to the new partition.
    async fn split_point(&self, collection_id: &str, first_date: NaiveDate) -> Result<Option<Rollover>> {
        let first_target = self.resolve(collection_id, first_date, false).await?;
        let partitions = self.sorted_partitions(collection_id).await?;
        let is_latest = partitions
            .last()
            .is_some_and(|(_, latest)| *latest == first_target);
        let is_open = PartitionDates::parse(&first_target).is_some_and(|dates| dates.is_open());
        if !is_latest || !is_open {
            return Ok(None);
        }

        if !self.manager.size_monitor().is_oversized(&first_target).await? {
            return Ok(None);
        }

        let rollover = self
            .manager
            .roll_over(collection_id, &first_target, first_date)
            .await?;
        self.selector.reload().await?;
        log::debug!(
            "batch for {collection_id} splits after {}: later items go to {}",
            rollover.split_date,
            rollover.new_alias
        );
        Ok(Some(rollover))
    }
}

#[async_trait]
impl IndexInserter for DatetimeIndexInserter {
    async fn target_index(&self, collection_id: &str, item: &Value) -> Result<String> {
        let date = PartitionManager::item_date(item)?;
        self.resolve_fresh(collection_id, date).await
    }

    async fn prepare_bulk_actions(
        &self,
        collection_id: &str,
        items: &[Value],
    ) -> Result<Vec<BulkAction>> {
        // Reject bad items before touching the topology.
        let dates = items
            .iter()
            .map(PartitionManager::item_date)
            .collect::<Result<Vec<_>>>()?;
        let Some(&first_date) = dates.first() else {
            return Ok(Vec::new());
        };

        if self.selector.collection_indexes(collection_id).await?.is_empty() {
            self.manager
                .handle_new_collection(collection_id, first_date)
                .await?;
            self.selector.reload().await?;
        }

        let split = match self.split_point(collection_id, first_date).await {
            Err(err) if err.is_engine_not_found() => {
                log::debug!("stale partition aliases for {collection_id}, reloading: {err}");
                self.selector.reload().await?;
                self.split_point(collection_id, first_date).await?
            }
            other => other?,
        };

        let mut actions = Vec::with_capacity(items.len());
        for (item, date) in items.iter().zip(dates) {
            let target = match &split {
                Some(rollover) if date > rollover.split_date => rollover.new_alias.clone(),
                _ => self.resolve(collection_id, date, false).await?,
            };
            actions.push(bulk_action(target, collection_id, item)?);
        }
        Ok(actions)
    }

    fn should_create_collection_index(&self) -> bool {
        false
    }

    async fn create_simple_index(&self, collection_id: &str) -> Result<String> {
        self.adapter
            .create_simple_index(self.client.as_ref(), collection_id)
            .await
    }
}
