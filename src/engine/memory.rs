//! In-process search engine.
//!
//! [`MemoryEngine`] keeps indices, aliases and documents in memory and
//! answers the same verbs as a real cluster, including "already exists"
//! conflicts, atomic alias updates and alias resolution on bulk writes.
//! Index sizes can be pinned to simulate full partitions, and failures can be
//! injected per verb.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::engine::{
    AliasAction, AliasResponse, BulkAction, BulkItemResult, BulkResponse, EngineKind, IndexAliases,
    IndexBody, IndexStats, SearchEngineClient,
};
use crate::error::{KairosError, Result};

/// Engine verbs, used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineVerb {
    CreateIndex,
    UpdateAliases,
    GetAlias,
    IndexStats,
    Bulk,
}

impl EngineVerb {
    const ALL: [EngineVerb; 5] = [
        EngineVerb::CreateIndex,
        EngineVerb::UpdateAliases,
        EngineVerb::GetAlias,
        EngineVerb::IndexStats,
        EngineVerb::Bulk,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
struct MemoryIndex {
    aliases: BTreeSet<String>,
    body: IndexBody,
    documents: BTreeMap<String, Value>,
    pinned_size_bytes: Option<u64>,
}

impl MemoryIndex {
    fn size_bytes(&self) -> u64 {
        self.pinned_size_bytes.unwrap_or_else(|| {
            self.documents
                .values()
                .map(|doc| doc.to_string().len() as u64)
                .sum()
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryEngine {
    indices: RwLock<BTreeMap<String, MemoryIndex>>,
    calls: [AtomicUsize; 5],
    failures: Mutex<HashMap<EngineVerb, usize>>,
    kind: Option<EngineKind>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that declares its flavor to callers.
    pub fn with_kind(kind: EngineKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Pin the reported primary store size of an index or of the index
    /// behind an alias.
    pub fn set_index_size(&self, name: &str, size_bytes: u64) -> Result<()> {
        let mut indices = self.indices.write();
        let targets = resolve(&indices, name);
        if targets.is_empty() {
            return Err(KairosError::not_found(format!("index {name}")));
        }
        for target in targets {
            if let Some(index) = indices.get_mut(&target) {
                index.pinned_size_bytes = Some(size_bytes);
            }
        }
        Ok(())
    }

    /// Make the next call to `verb` fail with a 503.
    pub fn fail_next(&self, verb: EngineVerb) {
        *self.failures.lock().entry(verb).or_insert(0) += 1;
    }

    pub fn call_count(&self, verb: EngineVerb) -> usize {
        self.calls[verb.slot()].load(Ordering::SeqCst)
    }

    pub fn reset_call_counts(&self) {
        for verb in EngineVerb::ALL {
            self.calls[verb.slot()].store(0, Ordering::SeqCst);
        }
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indices.read().keys().cloned().collect()
    }

    pub fn aliases_of(&self, index: &str) -> Vec<String> {
        self.indices
            .read()
            .get(index)
            .map(|idx| idx.aliases.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Body the index was created with.
    pub fn index_body(&self, index: &str) -> Option<IndexBody> {
        self.indices.read().get(index).map(|idx| idx.body.clone())
    }

    /// Documents stored in an index, keyed by document ID.
    pub fn documents(&self, index: &str) -> BTreeMap<String, Value> {
        self.indices
            .read()
            .get(index)
            .map(|idx| idx.documents.clone())
            .unwrap_or_default()
    }

    fn enter(&self, verb: EngineVerb) -> Result<()> {
        self.calls[verb.slot()].fetch_add(1, Ordering::SeqCst);
        let mut failures = self.failures.lock();
        if let Some(pending) = failures.get_mut(&verb)
            && *pending > 0
        {
            *pending -= 1;
            return Err(KairosError::engine_status(
                503,
                format!("injected failure for {verb:?}"),
            ));
        }
        Ok(())
    }
}

/// Index names an index name or alias refers to.
fn resolve(indices: &BTreeMap<String, MemoryIndex>, name: &str) -> Vec<String> {
    if indices.contains_key(name) {
        return vec![name.to_string()];
    }
    indices
        .iter()
        .filter(|(_, idx)| idx.aliases.contains(name))
        .map(|(index_name, _)| index_name.clone())
        .collect()
}

/// Comma-separated glob patterns with `-` exclusions, as the engines accept them.
fn matches_pattern(pattern: &str, name: &str) -> bool {
    let mut included = false;
    for part in pattern.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some(excluded) = part.strip_prefix('-') {
            if glob_match(excluded, name) {
                included = false;
            }
        } else if glob_match(part, name) {
            included = true;
        }
    }
    included
}

fn glob_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }

    let mut rest = name;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(tail) => rest = tail,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

#[async_trait]
impl SearchEngineClient for MemoryEngine {
    async fn create_index(&self, name: &str, body: IndexBody) -> Result<()> {
        self.enter(EngineVerb::CreateIndex)?;
        let mut indices = self.indices.write();
        if indices.contains_key(name) {
            return Err(KairosError::already_exists(name));
        }
        let index = MemoryIndex {
            aliases: body.aliases.keys().cloned().collect(),
            body,
            ..MemoryIndex::default()
        };
        indices.insert(name.to_string(), index);
        Ok(())
    }

    async fn update_aliases(&self, actions: Vec<AliasAction>) -> Result<()> {
        self.enter(EngineVerb::UpdateAliases)?;
        let mut indices = self.indices.write();

        // Validate everything first so a failed request leaves no trace.
        for action in &actions {
            let (AliasAction::Add { index, .. } | AliasAction::Remove { index, .. }) = action;
            let Some(target) = indices.get(index) else {
                return Err(KairosError::engine_status(404, format!("no such index [{index}]")));
            };
            if let AliasAction::Remove { alias, .. } = action
                && !target.aliases.contains(alias)
            {
                return Err(KairosError::engine_status(
                    404,
                    format!("alias [{alias}] missing on [{index}]"),
                ));
            }
        }

        for action in actions {
            match action {
                AliasAction::Add { index, alias } => {
                    if let Some(target) = indices.get_mut(&index) {
                        target.aliases.insert(alias);
                    }
                }
                AliasAction::Remove { index, alias } => {
                    if let Some(target) = indices.get_mut(&index) {
                        target.aliases.remove(&alias);
                    }
                }
            }
        }
        Ok(())
    }

    async fn get_alias(&self, pattern: &str) -> Result<AliasResponse> {
        self.enter(EngineVerb::GetAlias)?;
        let indices = self.indices.read();
        Ok(indices
            .iter()
            .filter(|(name, _)| matches_pattern(pattern, name))
            .map(|(name, idx)| {
                let aliases = idx
                    .aliases
                    .iter()
                    .map(|alias| (alias.clone(), Value::Object(Default::default())))
                    .collect();
                (name.clone(), IndexAliases { aliases })
            })
            .collect())
    }

    async fn index_stats(&self, name: &str) -> Result<IndexStats> {
        self.enter(EngineVerb::IndexStats)?;
        let indices = self.indices.read();
        let targets = resolve(&indices, name);
        if targets.is_empty() {
            return Err(KairosError::engine_status(404, format!("no such index [{name}]")));
        }
        let primary_store_size_bytes = targets
            .iter()
            .filter_map(|target| indices.get(target))
            .map(MemoryIndex::size_bytes)
            .sum();
        Ok(IndexStats {
            primary_store_size_bytes,
        })
    }

    async fn bulk(&self, actions: Vec<BulkAction>) -> Result<BulkResponse> {
        self.enter(EngineVerb::Bulk)?;
        let mut indices = self.indices.write();
        let mut response = BulkResponse::default();

        for action in actions {
            let targets = resolve(&indices, &action.index);
            let result = match targets.as_slice() {
                [target] => {
                    if let Some(index) = indices.get_mut(target) {
                        index.documents.insert(action.id.clone(), action.source);
                    }
                    BulkItemResult {
                        index: target.clone(),
                        id: action.id,
                        status: 201,
                        error: None,
                    }
                }
                [] => BulkItemResult {
                    index: action.index.clone(),
                    id: action.id,
                    status: 404,
                    error: Some(format!("no such index [{}]", action.index)),
                },
                _ => BulkItemResult {
                    index: action.index.clone(),
                    id: action.id,
                    status: 400,
                    error: Some(format!(
                        "alias [{}] has more than one index and no write index",
                        action.index
                    )),
                },
            };
            response.errors |= result.error.is_some();
            response.items.push(result);
        }
        Ok(response)
    }

    fn engine_kind(&self) -> Option<EngineKind> {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_patterns() {
        let pattern = "items_*,-*kibana*,-collections*";
        assert!(matches_pattern(pattern, "items_c1_2024-01-01"));
        assert!(!matches_pattern(pattern, "items_kibana_x"));
        assert!(!matches_pattern(pattern, "collections"));
        assert!(!matches_pattern(pattern, "other"));
        assert!(glob_match("a*c*e", "abcde"));
        assert!(!glob_match("a*c*e", "abcd"));
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let engine = MemoryEngine::new();
        engine
            .create_index("items_a", IndexBody::default())
            .await
            .unwrap();
        let err = engine
            .create_index("items_a", IndexBody::default())
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_update_aliases_is_all_or_nothing() {
        let engine = MemoryEngine::new();
        engine
            .create_index("items_a", IndexBody::with_aliases(["a"]))
            .await
            .unwrap();

        let result = engine
            .update_aliases(vec![
                AliasAction::Add {
                    index: "items_a".into(),
                    alias: "b".into(),
                },
                AliasAction::Remove {
                    index: "items_a".into(),
                    alias: "missing".into(),
                },
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(engine.aliases_of("items_a"), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_bulk_through_alias_and_stats() {
        let engine = MemoryEngine::new();
        engine
            .create_index("items_a", IndexBody::with_aliases(["a", "all"]))
            .await
            .unwrap();
        engine
            .create_index("items_b", IndexBody::with_aliases(["all"]))
            .await
            .unwrap();

        let response = engine
            .bulk(vec![
                BulkAction {
                    index: "a".into(),
                    id: "1".into(),
                    source: json!({"id": "1"}),
                },
                BulkAction {
                    index: "all".into(),
                    id: "2".into(),
                    source: json!({"id": "2"}),
                },
            ])
            .await
            .unwrap();

        assert!(response.errors);
        assert_eq!(response.items[0].status, 201);
        assert_eq!(response.items[0].index, "items_a");
        assert_eq!(response.items[1].status, 400);
        assert_eq!(engine.documents("items_a").len(), 1);

        engine.set_index_size("a", 42).unwrap();
        let stats = engine.index_stats("a").await.unwrap();
        assert_eq!(stats.primary_store_size_bytes, 42);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let engine = MemoryEngine::new();
        engine.fail_next(EngineVerb::GetAlias);

        assert!(engine.get_alias("items_*").await.is_err());
        assert!(engine.get_alias("items_*").await.is_ok());
        assert_eq!(engine.call_count(EngineVerb::GetAlias), 2);
    }
}
