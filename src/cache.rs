//! Cached view of collection aliases.
//!
//! The engine is the source of truth for which partitions exist. Reading it on
//! every request would cost one get-alias round-trip per write, so the mapping
//! `collection alias -> item aliases` is kept as a single snapshot with a TTL.
//!
//! The snapshot is replaced wholesale, never patched: a rollover removes one
//! alias and adds another, and a partial update could expose a mix of both
//! states. Anything that changes partition topology forces a reload instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::config::DEFAULT_CACHE_TTL;
use crate::engine::SearchEngineClient;
use crate::error::Result;
use crate::naming::{ITEMS_INDEX_PREFIX, collection_alias, item_alias};

/// Collection alias to the item aliases of its partitions. Item alias order
/// carries no meaning.
pub type AliasMap = HashMap<String, Vec<String>>;

#[derive(Debug, Default)]
struct CacheState {
    data: Option<Arc<AliasMap>>,
    loaded_at: Option<Instant>,
}

/// TTL cache holding at most one alias snapshot.
#[derive(Debug)]
pub struct AliasCache {
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl AliasCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_expired(&self) -> bool {
        let state = self.state.read();
        is_stale(&state, self.ttl)
    }

    /// The snapshot, if one is loaded and younger than the TTL.
    pub fn get(&self) -> Option<Arc<AliasMap>> {
        let state = self.state.read();
        if is_stale(&state, self.ttl) {
            return None;
        }
        state.data.clone()
    }

    /// Replace the snapshot and restart its TTL.
    pub fn set(&self, data: AliasMap) -> Arc<AliasMap> {
        let data = Arc::new(data);
        let mut state = self.state.write();
        state.data = Some(Arc::clone(&data));
        state.loaded_at = Some(Instant::now());
        data
    }

    pub fn clear(&self) {
        *self.state.write() = CacheState::default();
    }
}

impl Default for AliasCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

fn is_stale(state: &CacheState, ttl: Duration) -> bool {
    match state.loaded_at {
        Some(loaded_at) => loaded_at.elapsed() > ttl,
        None => true,
    }
}

/// Fills an [`AliasCache`] from engine alias metadata.
#[derive(Debug, Clone)]
pub struct AliasLoader {
    client: Arc<dyn SearchEngineClient>,
    cache: Arc<AliasCache>,
}

impl AliasLoader {
    pub fn new(client: Arc<dyn SearchEngineClient>, cache: Arc<AliasCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<AliasCache> {
        &self.cache
    }

    /// Read all item index aliases from the engine and store them.
    ///
    /// Per index, the aliases derived from the index name (the open alias and
    /// its closed `-<end>` forms) name that one partition; the remaining alias
    /// is the collection alias. Indices without item aliases (simple mode)
    /// are left out.
    pub async fn load_aliases(&self) -> Result<Arc<AliasMap>> {
        let response = self
            .client
            .get_alias(&format!("{ITEMS_INDEX_PREFIX}*"))
            .await?;

        let mut result = AliasMap::new();
        for (index_name, index_aliases) in &response {
            let open_alias = item_alias(index_name);
            let mut base_alias = None;
            let mut item_aliases = Vec::new();
            for alias in index_aliases.aliases.keys() {
                if is_partition_alias(alias, open_alias) {
                    item_aliases.push(alias.clone());
                } else {
                    base_alias = Some(alias.clone());
                }
            }

            if let Some(base) = base_alias
                && !item_aliases.is_empty()
            {
                result.entry(base).or_default().extend(item_aliases);
            }
        }

        log::debug!("loaded aliases for {} collections", result.len());
        Ok(self.cache.set(result))
    }

    /// Cached aliases, loading them when the cache is empty or expired.
    pub async fn get_aliases(&self) -> Result<Arc<AliasMap>> {
        match self.cache.get() {
            Some(cached) => Ok(cached),
            None => self.load_aliases().await,
        }
    }

    pub async fn refresh_aliases(&self) -> Result<Arc<AliasMap>> {
        self.load_aliases().await
    }

    /// Item aliases of one collection; empty when it has no partitions.
    pub async fn collection_indexes(&self, collection_id: &str) -> Result<Vec<String>> {
        let aliases = self.get_aliases().await?;
        Ok(aliases
            .get(&collection_alias(collection_id))
            .cloned()
            .unwrap_or_default())
    }
}

/// Whether `alias` names the partition whose open alias is `open_alias`.
fn is_partition_alias(alias: &str, open_alias: &str) -> bool {
    alias
        .strip_prefix(open_alias)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('-'))
}
