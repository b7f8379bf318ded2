//! Routing of items to their target index.

pub mod datetime;
pub mod simple;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::AliasCache;
use crate::config::PartitionConfig;
use crate::engine::{BulkAction, SearchEngineAdapter, SearchEngineClient};
use crate::error::{KairosError, Result};
use crate::naming::item_document_id;

pub use datetime::DatetimeIndexInserter;
pub use simple::SimpleIndexInserter;

#[async_trait]
pub trait IndexInserter: Send + Sync + Debug {
    /// Index or alias a single item is written to.
    ///
    /// May create or roll over partitions on the way.
    async fn target_index(&self, collection_id: &str, item: &Value) -> Result<String>;

    /// One bulk index action per item, in input order.
    async fn prepare_bulk_actions(
        &self,
        collection_id: &str,
        items: &[Value],
    ) -> Result<Vec<BulkAction>>;

    /// Whether collection creation should provision an index up front.
    fn should_create_collection_index(&self) -> bool;

    async fn create_simple_index(&self, collection_id: &str) -> Result<String>;
}

/// Inserter matching the configured strategy.
pub fn create_inserter(
    config: &PartitionConfig,
    client: Arc<dyn SearchEngineClient>,
    adapter: Arc<dyn SearchEngineAdapter>,
    cache: Arc<AliasCache>,
) -> Arc<dyn IndexInserter> {
    if config.datetime_partitioning {
        Arc::new(DatetimeIndexInserter::new(
            client,
            adapter,
            cache,
            config.max_size_gb,
        ))
    } else {
        Arc::new(SimpleIndexInserter::new(client, adapter))
    }
}

/// Bulk action writing `item` to `index`.
///
/// The document ID pairs the item's `id` with `collection_id`.
pub fn bulk_action(index: String, collection_id: &str, item: &Value) -> Result<BulkAction> {
    let item_id = item
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| KairosError::invalid_argument("item has no string id"))?;
    Ok(BulkAction {
        index,
        id: item_document_id(item_id, collection_id),
        source: item.clone(),
    })
}
