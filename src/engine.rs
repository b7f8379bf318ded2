//! Search engine boundary.
//!
//! Kairos never talks HTTP itself. It drives the engine through the five
//! verbs of [`SearchEngineClient`], and leaves connection pooling, retries
//! and timeouts to whoever implements that trait.

pub mod adapter;
pub mod mappings;
pub mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KairosError, Result};

pub use adapter::{ElasticsearchAdapter, OpenSearchAdapter, SearchEngineAdapter, adapter_for};
pub use memory::{EngineVerb, MemoryEngine};

/// Engine flavor. The flavors differ only in how new indices are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Elasticsearch,
    OpenSearch,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Elasticsearch => write!(f, "elasticsearch"),
            EngineKind::OpenSearch => write!(f, "opensearch"),
        }
    }
}

impl FromStr for EngineKind {
    type Err = KairosError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elasticsearch" | "es" => Ok(EngineKind::Elasticsearch),
            "opensearch" | "os" => Ok(EngineKind::OpenSearch),
            other => Err(KairosError::invalid_config(format!(
                "unknown search engine {other:?}"
            ))),
        }
    }
}

/// Body of a create-index request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexBody {
    pub aliases: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl IndexBody {
    pub fn with_aliases<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aliases: aliases
                .into_iter()
                .map(|alias| (alias.into(), Value::Object(Default::default())))
                .collect(),
            mappings: None,
            settings: None,
        }
    }
}

/// One entry of an update-aliases request.
///
/// Serializes to the engine shape `{"add": {"index": .., "alias": ..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

/// Aliases attached to one index in a get-alias response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexAliases {
    #[serde(default)]
    pub aliases: BTreeMap<String, Value>,
}

/// `{index_name: {"aliases": {alias_name: {..}}}}`
pub type AliasResponse = BTreeMap<String, IndexAliases>;

/// Primary store statistics of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub primary_store_size_bytes: u64,
}

impl IndexStats {
    /// Extract `_all.primaries.store.size_in_bytes` from a raw stats response.
    pub fn from_stats_response(response: &Value) -> Result<Self> {
        response
            .pointer("/_all/primaries/store/size_in_bytes")
            .and_then(Value::as_u64)
            .map(|primary_store_size_bytes| Self {
                primary_store_size_bytes,
            })
            .ok_or_else(|| {
                KairosError::engine("index stats response has no primaries.store.size_in_bytes")
            })
    }
}

/// A single index operation of a bulk request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkAction {
    /// Index or alias the document is written to.
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source")]
    pub source: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemResult {
    pub index: String,
    pub id: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub errors: bool,
    pub items: Vec<BulkItemResult>,
}

/// The engine verbs Kairos depends on.
///
/// Implementations must report a create on an existing index as
/// [`KairosError::IndexAlreadyExists`] and every other failure as
/// [`KairosError::Engine`].
#[async_trait]
pub trait SearchEngineClient: Send + Sync + fmt::Debug {
    async fn create_index(&self, name: &str, body: IndexBody) -> Result<()>;

    /// Apply all actions in one request.
    async fn update_aliases(&self, actions: Vec<AliasAction>) -> Result<()>;

    async fn get_alias(&self, pattern: &str) -> Result<AliasResponse>;

    /// Stats of an index, or of every index behind an alias.
    async fn index_stats(&self, name: &str) -> Result<IndexStats>;

    async fn bulk(&self, actions: Vec<BulkAction>) -> Result<BulkResponse>;

    /// Flavor the client was built for, if it knows.
    fn engine_kind(&self) -> Option<EngineKind> {
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!("OpenSearch".parse::<EngineKind>().unwrap(), EngineKind::OpenSearch);
        assert_eq!("es".parse::<EngineKind>().unwrap(), EngineKind::Elasticsearch);
        assert!("solr".parse::<EngineKind>().is_err());
        assert_eq!(EngineKind::OpenSearch.to_string(), "opensearch");
    }

    #[test]
    fn test_alias_action_wire_shape() {
        let actions = vec![
            AliasAction::Remove {
                index: "items_c1_2024-01-01".into(),
                alias: "c1_2024-01-01".into(),
            },
            AliasAction::Add {
                index: "items_c1_2024-01-01".into(),
                alias: "c1_2024-01-01-2024-01-31".into(),
            },
        ];
        assert_eq!(
            serde_json::to_value(&actions).unwrap(),
            json!([
                {"remove": {"index": "items_c1_2024-01-01", "alias": "c1_2024-01-01"}},
                {"add": {"index": "items_c1_2024-01-01", "alias": "c1_2024-01-01-2024-01-31"}}
            ])
        );
    }

    #[test]
    fn test_bulk_action_wire_shape() {
        let action = BulkAction {
            index: "c1_2024-01-01".into(),
            id: "item-1|c1".into(),
            source: json!({"id": "item-1"}),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"_index": "c1_2024-01-01", "_id": "item-1|c1", "_source": {"id": "item-1"}})
        );
    }

    #[test]
    fn test_index_stats_from_response() {
        let response = json!({"_all": {"primaries": {"store": {"size_in_bytes": 2_500_000_000u64}}}});
        let stats = IndexStats::from_stats_response(&response).unwrap();
        assert_eq!(stats.primary_store_size_bytes, 2_500_000_000);

        assert!(IndexStats::from_stats_response(&json!({"_all": {}})).is_err());
    }

    #[test]
    fn test_index_body_skips_empty_sections() {
        let body = IndexBody::with_aliases(["items_c1"]);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"aliases": {"items_c1": {}}})
        );
    }
}
