//! Engine-specific partition creation.
//!
//! Both flavors name partitions and aliases the same way; they only differ in
//! the body sent with a create-index request. Creation is idempotent: an
//! "already exists" answer from the engine counts as success so that
//! concurrent writers converge on the same partition.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::engine::mappings::{item_mappings, item_settings};
use crate::engine::{AliasAction, EngineKind, IndexBody, SearchEngineClient};
use crate::error::Result;
use crate::naming::{
    closed_alias, collection_alias, datetime_index_name, index_for_alias, item_alias,
    simple_index_name,
};

#[async_trait]
pub trait SearchEngineAdapter: Send + Sync + Debug {
    fn kind(&self) -> EngineKind;

    /// Create-index body carrying the given aliases.
    fn index_body(&self, aliases: &[String]) -> IndexBody;

    /// Create the single index of a collection in simple mode.
    ///
    /// Returns the physical index name.
    async fn create_simple_index(
        &self,
        client: &dyn SearchEngineClient,
        collection_id: &str,
    ) -> Result<String> {
        let index = simple_index_name(collection_id);
        let body = self.index_body(&[collection_alias(collection_id)]);
        create_ignoring_existing(client, &index, body).await?;
        Ok(index)
    }

    /// Create the partition of a collection starting at `start`.
    ///
    /// Returns the open item alias of the partition.
    async fn create_datetime_index(
        &self,
        client: &dyn SearchEngineClient,
        collection_id: &str,
        start: NaiveDate,
    ) -> Result<String> {
        let index = datetime_index_name(collection_id, start);
        let alias = item_alias(&index).to_string();
        let body = self.index_body(&[collection_alias(collection_id), alias.clone()]);
        create_ignoring_existing(client, &index, body).await?;
        Ok(alias)
    }

    /// Close a partition: swap its open alias for one ending at `end`.
    ///
    /// Remove and add go out in a single request, so readers never see the
    /// partition without an item alias.
    async fn update_index_alias(
        &self,
        client: &dyn SearchEngineClient,
        end: NaiveDate,
        old_alias: &str,
    ) -> Result<String> {
        let index = index_for_alias(old_alias);
        let new_alias = closed_alias(old_alias, end);
        client
            .update_aliases(vec![
                AliasAction::Remove {
                    index: index.clone(),
                    alias: old_alias.to_string(),
                },
                AliasAction::Add {
                    index,
                    alias: new_alias.clone(),
                },
            ])
            .await?;
        log::info!("closed partition alias {old_alias} as {new_alias}");
        Ok(new_alias)
    }
}

async fn create_ignoring_existing(
    client: &dyn SearchEngineClient,
    index: &str,
    body: IndexBody,
) -> Result<()> {
    match client.create_index(index, body).await {
        Ok(()) => {
            log::info!("created index {index}");
            Ok(())
        }
        Err(err) if err.is_already_exists() => {
            log::debug!("index {index} already exists");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Elasticsearch picks mappings up from server-side index templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticsearchAdapter;

impl SearchEngineAdapter for ElasticsearchAdapter {
    fn kind(&self) -> EngineKind {
        EngineKind::Elasticsearch
    }

    fn index_body(&self, aliases: &[String]) -> IndexBody {
        IndexBody::with_aliases(aliases.iter().cloned())
    }
}

/// OpenSearch receives mappings and settings with every create.
#[derive(Debug, Clone)]
pub struct OpenSearchAdapter {
    mappings: Value,
    settings: Value,
}

impl OpenSearchAdapter {
    pub fn new(mappings: Value, settings: Value) -> Self {
        Self { mappings, settings }
    }
}

impl Default for OpenSearchAdapter {
    fn default() -> Self {
        Self::new(item_mappings(), item_settings())
    }
}

impl SearchEngineAdapter for OpenSearchAdapter {
    fn kind(&self) -> EngineKind {
        EngineKind::OpenSearch
    }

    fn index_body(&self, aliases: &[String]) -> IndexBody {
        IndexBody {
            mappings: Some(self.mappings.clone()),
            settings: Some(self.settings.clone()),
            ..IndexBody::with_aliases(aliases.iter().cloned())
        }
    }
}

pub fn adapter_for(kind: EngineKind) -> Arc<dyn SearchEngineAdapter> {
    match kind {
        EngineKind::Elasticsearch => Arc::new(ElasticsearchAdapter),
        EngineKind::OpenSearch => Arc::new(OpenSearchAdapter::default()),
    }
}
