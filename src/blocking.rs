//! Blocking access to a [`Partitioner`].
//!
//! Each call is driven to completion on a small runtime owned by the facade,
//! so the routing logic is the same code the async API runs. Do not call
//! these methods from inside an async task.

use std::future::Future;
use std::sync::{Arc, mpsc};

use serde_json::Value;
use tokio::runtime::Builder as TokioRuntimeBuilder;

use crate::config::PartitionConfig;
use crate::engine::{BulkAction, BulkResponse, SearchEngineClient};
use crate::error::{KairosError, Result};
use crate::partitioner::Partitioner;
use crate::selection::DatetimeRange;

#[derive(Debug, Clone)]
pub struct BlockingPartitioner {
    inner: Arc<Partitioner>,
    runtime: Arc<tokio::runtime::Runtime>,
}

impl BlockingPartitioner {
    pub fn new(client: Arc<dyn SearchEngineClient>, config: PartitionConfig) -> Result<Self> {
        Self::from_partitioner(Arc::new(Partitioner::new(client, config)?))
    }

    /// Wrap an existing context; both sides share its alias cache.
    pub fn from_partitioner(inner: Arc<Partitioner>) -> Result<Self> {
        let runtime = TokioRuntimeBuilder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|err| {
                KairosError::internal(format!("failed to initialize blocking runtime: {err}"))
            })?;
        Ok(Self {
            inner,
            runtime: Arc::new(runtime),
        })
    }

    pub fn partitioner(&self) -> &Arc<Partitioner> {
        &self.inner
    }

    pub fn select_indexes(
        &self,
        collection_ids: Option<&[String]>,
        range: DatetimeRange,
    ) -> Result<String> {
        let inner = Arc::clone(&self.inner);
        let collection_ids = collection_ids.map(<[String]>::to_vec);
        self.run(async move { inner.select_indexes(collection_ids.as_deref(), &range).await })
    }

    pub fn refresh_cache(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        self.run(async move { inner.refresh_cache().await })
    }

    pub fn target_index(&self, collection_id: &str, item: &Value) -> Result<String> {
        let inner = Arc::clone(&self.inner);
        let collection_id = collection_id.to_string();
        let item = item.clone();
        self.run(async move { inner.target_index(&collection_id, &item).await })
    }

    pub fn prepare_bulk_actions(
        &self,
        collection_id: &str,
        items: &[Value],
    ) -> Result<Vec<BulkAction>> {
        let inner = Arc::clone(&self.inner);
        let collection_id = collection_id.to_string();
        let items = items.to_vec();
        self.run(async move { inner.prepare_bulk_actions(&collection_id, &items).await })
    }

    pub fn bulk_insert(&self, collection_id: &str, items: &[Value]) -> Result<BulkResponse> {
        let inner = Arc::clone(&self.inner);
        let collection_id = collection_id.to_string();
        let items = items.to_vec();
        self.run(async move { inner.bulk_insert(&collection_id, &items).await })
    }

    pub fn create_collection_index(&self, collection_id: &str) -> Result<Option<String>> {
        let inner = Arc::clone(&self.inner);
        let collection_id = collection_id.to_string();
        self.run(async move { inner.create_collection_index(&collection_id).await })
    }

    pub fn index_size_gb(&self, index: &str) -> Result<f64> {
        let inner = Arc::clone(&self.inner);
        let index = index.to_string();
        self.run(async move { inner.index_size_gb(&index).await })
    }

    fn run<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.runtime.handle().spawn(async move {
            let _ = tx.send(future.await);
        });
        rx.recv()
            .map_err(|err| KairosError::internal(format!("blocking task channel closed: {err}")))?
    }
}
