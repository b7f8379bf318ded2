use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::{BulkAction, SearchEngineAdapter, SearchEngineClient};
use crate::error::Result;
use crate::insertion::{IndexInserter, bulk_action};
use crate::naming::collection_alias;

/// Writes every item of a collection through its collection alias.
#[derive(Debug, Clone)]
pub struct SimpleIndexInserter {
    client: Arc<dyn SearchEngineClient>,
    adapter: Arc<dyn SearchEngineAdapter>,
}

impl SimpleIndexInserter {
    pub fn new(client: Arc<dyn SearchEngineClient>, adapter: Arc<dyn SearchEngineAdapter>) -> Self {
        Self { client, adapter }
    }
}

#[async_trait]
impl IndexInserter for SimpleIndexInserter {
    async fn target_index(&self, collection_id: &str, _item: &Value) -> Result<String> {
        Ok(collection_alias(collection_id))
    }

    async fn prepare_bulk_actions(
        &self,
        collection_id: &str,
        items: &[Value],
    ) -> Result<Vec<BulkAction>> {
        let target = collection_alias(collection_id);
        items
            .iter()
            .map(|item| bulk_action(target.clone(), collection_id, item))
            .collect()
    }

    fn should_create_collection_index(&self) -> bool {
        true
    }

    async fn create_simple_index(&self, collection_id: &str) -> Result<String> {
        self.adapter
            .create_simple_index(self.client.as_ref(), collection_id)
            .await
    }
}
