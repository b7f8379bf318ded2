use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{AliasCache, AliasLoader, AliasMap};
use crate::engine::SearchEngineClient;
use crate::error::Result;
use crate::naming::ITEM_INDICES;
use crate::selection::{DatetimeRange, IndexSelector, filter_indexes_by_datetime};

/// Selects the partitions of each requested collection whose dates intersect
/// the search range.
///
/// Partition lists come from the shared [`AliasCache`]; a fresh snapshot is
/// served without touching the engine. Without explicit collections the
/// catalog-wide pattern is returned unfiltered.
#[derive(Debug, Clone)]
pub struct DatetimeIndexSelector {
    loader: AliasLoader,
}

impl DatetimeIndexSelector {
    pub fn new(client: Arc<dyn SearchEngineClient>, cache: Arc<AliasCache>) -> Self {
        Self {
            loader: AliasLoader::new(client, cache),
        }
    }

    pub fn cache(&self) -> &Arc<AliasCache> {
        self.loader.cache()
    }

    /// Item aliases of every partition of a collection.
    pub async fn collection_indexes(&self, collection_id: &str) -> Result<Vec<String>> {
        self.loader.collection_indexes(collection_id).await
    }

    /// Reload the alias snapshot from the engine.
    pub async fn reload(&self) -> Result<Arc<AliasMap>> {
        self.loader.refresh_aliases().await
    }
}

#[async_trait]
impl IndexSelector for DatetimeIndexSelector {
    /// An empty string means the named collections have no matching
    /// partitions; it does not fall back to the catalog-wide pattern.
    async fn select_indexes(
        &self,
        collection_ids: Option<&[String]>,
        range: &DatetimeRange,
    ) -> Result<String> {
        let Some(ids) = collection_ids.filter(|ids| !ids.is_empty()) else {
            return Ok(ITEM_INDICES.to_string());
        };

        let mut selected = Vec::new();
        for collection_id in ids {
            let partitions = self.collection_indexes(collection_id).await?;
            selected.extend(filter_indexes_by_datetime(&partitions, range));
        }
        Ok(selected.join(","))
    }

    async fn refresh_cache(&self) -> Result<()> {
        self.reload().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::engine::memory::{EngineVerb, MemoryEngine};
    use crate::engine::{IndexBody, SearchEngineClient};

    async fn engine_with_partitions() -> Arc<MemoryEngine> {
        let engine = Arc::new(MemoryEngine::new());
        for (index, aliases) in [
            ("items_c1_2024-01-01", vec!["items_c1", "c1_2024-01-01-2024-01-31"]),
            ("items_c1_2024-02-01", vec!["items_c1", "c1_2024-02-01"]),
            ("items_c2_2024-01-01", vec!["items_c2", "c2_2024-01-01"]),
        ] {
            engine
                .create_index(index, IndexBody::with_aliases(aliases))
                .await
                .unwrap();
        }
        engine
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_filters_per_collection() {
        let engine = engine_with_partitions().await;
        let selector = DatetimeIndexSelector::new(engine.clone(), Arc::new(AliasCache::default()));
        let ids = vec!["c1".to_string(), "c2".to_string()];

        let selected = selector
            .select_indexes(Some(ids.as_slice()), &DatetimeRange::on(day(2024, 2, 10)))
            .await
            .unwrap();
        assert_eq!(selected, "c1_2024-02-01,c2_2024-01-01");

        let selected = selector
            .select_indexes(Some(ids.as_slice()), &DatetimeRange::on(day(2024, 1, 10)))
            .await
            .unwrap();
        assert_eq!(selected, "c1_2024-01-01-2024-01-31,c2_2024-01-01");

        assert_eq!(engine.call_count(EngineVerb::GetAlias), 1);
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_reloaded() {
        let engine = engine_with_partitions().await;
        let cache = Arc::new(AliasCache::new(std::time::Duration::from_millis(20)));
        let selector = DatetimeIndexSelector::new(engine.clone(), cache);

        assert_eq!(selector.collection_indexes("c1").await.unwrap().len(), 2);
        assert_eq!(engine.call_count(EngineVerb::GetAlias), 1);
        selector.collection_indexes("c1").await.unwrap();
        assert_eq!(engine.call_count(EngineVerb::GetAlias), 1);

        // A partition created meanwhile shows up once the TTL has passed.
        engine
            .create_index("items_c1_2024-03-01", IndexBody::with_aliases(["items_c1", "c1_2024-03-01"]))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        assert_eq!(selector.collection_indexes("c1").await.unwrap().len(), 3);
        assert_eq!(engine.call_count(EngineVerb::GetAlias), 2);
    }

    #[tokio::test]
    async fn test_without_collections_returns_wildcard() {
        let engine = engine_with_partitions().await;
        let selector = DatetimeIndexSelector::new(engine.clone(), Arc::new(AliasCache::default()));

        let selected = selector
            .select_indexes(None, &DatetimeRange::on(day(2024, 1, 10)))
            .await
            .unwrap();
        assert_eq!(selected, ITEM_INDICES);
        assert_eq!(engine.call_count(EngineVerb::GetAlias), 0);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_string() {
        let engine = engine_with_partitions().await;
        let selector = DatetimeIndexSelector::new(engine, Arc::new(AliasCache::default()));
        let ids = vec!["unknown".to_string()];

        let selected = selector
            .select_indexes(Some(ids.as_slice()), &DatetimeRange::unbounded())
            .await
            .unwrap();
        assert_eq!(selected, "");
    }

    #[tokio::test]
    async fn test_shared_cache_across_selectors() {
        let engine = engine_with_partitions().await;
        let cache = Arc::new(AliasCache::default());
        let first = DatetimeIndexSelector::new(engine.clone(), cache.clone());
        let second = DatetimeIndexSelector::new(engine.clone(), cache);

        first.collection_indexes("c1").await.unwrap();
        second.collection_indexes("c2").await.unwrap();
        assert_eq!(engine.call_count(EngineVerb::GetAlias), 1);

        second.refresh_cache().await.unwrap();
        first.collection_indexes("c1").await.unwrap();
        assert_eq!(engine.call_count(EngineVerb::GetAlias), 2);
    }
}
