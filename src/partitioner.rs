//! The caller-owned partitioning context.
//!
//! A [`Partitioner`] bundles the adapter, the alias cache, the selector and
//! the inserter for one engine. Build it once at startup and share it; every
//! clone and every request served through it sees the same cache.

use std::sync::Arc;

use serde_json::Value;

use crate::cache::AliasCache;
use crate::config::PartitionConfig;
use crate::engine::{
    BulkAction, BulkResponse, EngineKind, SearchEngineAdapter, SearchEngineClient, adapter_for,
};
use crate::error::Result;
use crate::insertion::{IndexInserter, create_inserter};
use crate::lifecycle::IndexSizeMonitor;
use crate::selection::{DatetimeRange, IndexSelector, create_selector};

#[derive(Debug, Clone)]
pub struct Partitioner {
    config: PartitionConfig,
    client: Arc<dyn SearchEngineClient>,
    adapter: Arc<dyn SearchEngineAdapter>,
    cache: Arc<AliasCache>,
    selector: Arc<dyn IndexSelector>,
    inserter: Arc<dyn IndexInserter>,
    size_monitor: IndexSizeMonitor,
}

impl Partitioner {
    /// Build the context for `client`.
    ///
    /// The engine flavor declared by the client wins over `config.engine`.
    pub fn new(client: Arc<dyn SearchEngineClient>, config: PartitionConfig) -> Result<Self> {
        config.validate()?;

        let kind = client.engine_kind().unwrap_or(config.engine);
        let adapter = adapter_for(kind);
        let cache = Arc::new(AliasCache::new(config.cache_ttl));
        let selector = create_selector(&config, Arc::clone(&client), Arc::clone(&cache));
        let inserter = create_inserter(
            &config,
            Arc::clone(&client),
            Arc::clone(&adapter),
            Arc::clone(&cache),
        );
        let size_monitor = IndexSizeMonitor::new(Arc::clone(&client), config.max_size_gb);

        log::info!(
            "partitioner ready: engine={kind}, datetime_partitioning={}, max_size_gb={}",
            config.datetime_partitioning,
            config.max_size_gb
        );

        Ok(Self {
            config,
            client,
            adapter,
            cache,
            selector,
            inserter,
            size_monitor,
        })
    }

    /// Build the context with configuration read from the environment.
    pub fn from_env(client: Arc<dyn SearchEngineClient>) -> Result<Self> {
        Self::new(client, PartitionConfig::from_env()?)
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    pub fn engine_kind(&self) -> EngineKind {
        self.adapter.kind()
    }

    pub fn client(&self) -> &Arc<dyn SearchEngineClient> {
        &self.client
    }

    pub fn adapter(&self) -> &Arc<dyn SearchEngineAdapter> {
        &self.adapter
    }

    pub fn cache(&self) -> &Arc<AliasCache> {
        &self.cache
    }

    pub fn selector(&self) -> &Arc<dyn IndexSelector> {
        &self.selector
    }

    pub fn inserter(&self) -> &Arc<dyn IndexInserter> {
        &self.inserter
    }

    /// Comma-joined indices to search for the given collections and range.
    pub async fn select_indexes(
        &self,
        collection_ids: Option<&[String]>,
        range: &DatetimeRange,
    ) -> Result<String> {
        self.selector.select_indexes(collection_ids, range).await
    }

    pub async fn refresh_cache(&self) -> Result<()> {
        self.selector.refresh_cache().await
    }

    pub async fn target_index(&self, collection_id: &str, item: &Value) -> Result<String> {
        self.inserter.target_index(collection_id, item).await
    }

    pub async fn prepare_bulk_actions(
        &self,
        collection_id: &str,
        items: &[Value],
    ) -> Result<Vec<BulkAction>> {
        self.inserter.prepare_bulk_actions(collection_id, items).await
    }

    /// Route `items` and write them in one bulk request.
    ///
    /// Per-item failures are reported in the response, not as an error.
    pub async fn bulk_insert(&self, collection_id: &str, items: &[Value]) -> Result<BulkResponse> {
        let actions = self.prepare_bulk_actions(collection_id, items).await?;
        if actions.is_empty() {
            return Ok(BulkResponse::default());
        }

        let response = self.client.bulk(actions).await?;
        if response.errors {
            let failed = response.items.iter().filter(|item| item.error.is_some()).count();
            log::warn!(
                "bulk insert into {collection_id}: {failed} of {} items failed",
                response.items.len()
            );
        }
        Ok(response)
    }

    /// Provision the index of a new collection when the strategy needs one.
    ///
    /// Returns the created index name, or `None` for datetime partitioning
    /// where partitions appear with the first item.
    pub async fn create_collection_index(&self, collection_id: &str) -> Result<Option<String>> {
        if !self.inserter.should_create_collection_index() {
            return Ok(None);
        }
        self.inserter.create_simple_index(collection_id).await.map(Some)
    }

    pub async fn index_size_gb(&self, index: &str) -> Result<f64> {
        self.size_monitor.size_in_gb(index).await
    }
}
