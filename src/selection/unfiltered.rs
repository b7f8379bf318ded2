use async_trait::async_trait;

use crate::error::Result;
use crate::naming::indices;
use crate::selection::{DatetimeRange, IndexSelector};

/// Selects every index of the requested collections and ignores dates.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnfilteredIndexSelector;

impl UnfilteredIndexSelector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IndexSelector for UnfilteredIndexSelector {
    async fn select_indexes(
        &self,
        collection_ids: Option<&[String]>,
        _range: &DatetimeRange,
    ) -> Result<String> {
        Ok(indices(collection_ids))
    }

    /// Nothing is cached.
    async fn refresh_cache(&self) -> Result<()> {
        Ok(())
    }
}
