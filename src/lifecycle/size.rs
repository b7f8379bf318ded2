use std::sync::Arc;

use crate::engine::SearchEngineClient;
use crate::error::Result;

const BYTES_PER_GB: f64 = 1e9;

/// Reports partition sizes and compares them with the size budget.
#[derive(Debug, Clone)]
pub struct IndexSizeMonitor {
    client: Arc<dyn SearchEngineClient>,
    max_size_gb: f64,
}

impl IndexSizeMonitor {
    pub fn new(client: Arc<dyn SearchEngineClient>, max_size_gb: f64) -> Self {
        Self {
            client,
            max_size_gb,
        }
    }

    pub fn max_size_gb(&self) -> f64 {
        self.max_size_gb
    }

    /// Primary store size of an index or alias, in gigabytes.
    pub async fn size_in_gb(&self, index: &str) -> Result<f64> {
        let stats = self.client.index_stats(index).await?;
        Ok(stats.primary_store_size_bytes as f64 / BYTES_PER_GB)
    }

    pub async fn is_oversized(&self, index: &str) -> Result<bool> {
        let size_gb = self.size_in_gb(index).await?;
        log::debug!("index {index} holds {size_gb:.3} GB of {} GB", self.max_size_gb);
        Ok(size_gb > self.max_size_gb)
    }
}
