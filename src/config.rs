//! Partitioning configuration.
//!
//! Values are normally read from the process environment with
//! [`PartitionConfig::from_env`], but every field can also be set directly
//! through [`PartitionConfig::builder`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::EngineKind;
use crate::error::{KairosError, Result};

/// Selects the datetime-partitioned strategy and selector when true.
pub const ENV_ENABLE_DATETIME_FILTERING: &str = "ENABLE_DATETIME_INDEX_FILTERING";
/// Size budget of a single partition, in gigabytes.
pub const ENV_MAX_SIZE_GB: &str = "DATETIME_INDEX_MAX_SIZE_GB";
/// Lifetime of the alias cache, in seconds.
pub const ENV_CACHE_TTL_SECONDS: &str = "DATETIME_INDEX_CACHE_TTL_SECONDS";
/// Engine flavor, `elasticsearch` or `opensearch`.
pub const ENV_SEARCH_ENGINE: &str = "SEARCH_ENGINE";

pub const DEFAULT_MAX_SIZE_GB: f64 = 25.0;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Configuration for partition routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Route items into time-bounded partitions instead of one index per collection.
    pub datetime_partitioning: bool,
    /// Primary store size above which the open partition is rolled over.
    pub max_size_gb: f64,
    /// How long a loaded alias snapshot stays authoritative.
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,
    /// Engine flavor the adapter is chosen for.
    pub engine: EngineKind,
}

impl PartitionConfig {
    pub fn new() -> Self {
        Self {
            datetime_partitioning: false,
            max_size_gb: DEFAULT_MAX_SIZE_GB,
            cache_ttl: DEFAULT_CACHE_TTL,
            engine: EngineKind::Elasticsearch,
        }
    }

    pub fn builder() -> PartitionConfigBuilder {
        PartitionConfigBuilder::default()
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(raw) = lookup(ENV_ENABLE_DATETIME_FILTERING) {
            config.datetime_partitioning =
                parse_bool(ENV_ENABLE_DATETIME_FILTERING, &raw, false);
        }

        if let Some(raw) = lookup(ENV_MAX_SIZE_GB) {
            config.max_size_gb = raw.trim().parse::<f64>().map_err(|err| {
                KairosError::invalid_config(format!("{ENV_MAX_SIZE_GB}={raw:?}: {err}"))
            })?;
        }

        if let Some(raw) = lookup(ENV_CACHE_TTL_SECONDS) {
            let secs = raw.trim().parse::<u64>().map_err(|err| {
                KairosError::invalid_config(format!("{ENV_CACHE_TTL_SECONDS}={raw:?}: {err}"))
            })?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup(ENV_SEARCH_ENGINE) {
            config.engine = raw.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.max_size_gb.is_finite() || self.max_size_gb <= 0.0 {
            return Err(KairosError::invalid_config(format!(
                "max_size_gb must be a positive number, got {}",
                self.max_size_gb
            )));
        }
        Ok(())
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct PartitionConfigBuilder {
    datetime_partitioning: Option<bool>,
    max_size_gb: Option<f64>,
    cache_ttl: Option<Duration>,
    engine: Option<EngineKind>,
}

impl PartitionConfigBuilder {
    pub fn datetime_partitioning(mut self, enabled: bool) -> Self {
        self.datetime_partitioning = Some(enabled);
        self
    }

    pub fn max_size_gb(mut self, max_size_gb: f64) -> Self {
        self.max_size_gb = Some(max_size_gb);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn build(self) -> Result<PartitionConfig> {
        let defaults = PartitionConfig::new();
        let config = PartitionConfig {
            datetime_partitioning: self
                .datetime_partitioning
                .unwrap_or(defaults.datetime_partitioning),
            max_size_gb: self.max_size_gb.unwrap_or(defaults.max_size_gb),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            engine: self.engine.unwrap_or(defaults.engine),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Lenient boolean parsing for environment flags.
///
/// Unrecognized values fall back to `default` with a warning.
pub fn parse_bool(key: &str, raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => true,
        "false" | "0" | "no" | "n" | "off" => false,
        other => {
            log::warn!("{key}={other:?} is not a boolean, using default {default}");
            default
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PartitionConfig::from_lookup(lookup(&[])).unwrap();
        assert!(!config.datetime_partitioning);
        assert_eq!(config.max_size_gb, 25.0);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.engine, EngineKind::Elasticsearch);
    }

    #[test]
    fn test_from_lookup() {
        let config = PartitionConfig::from_lookup(lookup(&[
            (ENV_ENABLE_DATETIME_FILTERING, "True"),
            (ENV_MAX_SIZE_GB, "0.5"),
            (ENV_CACHE_TTL_SECONDS, "60"),
            (ENV_SEARCH_ENGINE, "opensearch"),
        ]))
        .unwrap();
        assert!(config.datetime_partitioning);
        assert_eq!(config.max_size_gb, 0.5);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.engine, EngineKind::OpenSearch);
    }

    #[test]
    fn test_unrecognized_bool_falls_back() {
        let config =
            PartitionConfig::from_lookup(lookup(&[(ENV_ENABLE_DATETIME_FILTERING, "maybe")]))
                .unwrap();
        assert!(!config.datetime_partitioning);
    }

    #[test]
    fn test_invalid_size_rejected() {
        let err = PartitionConfig::from_lookup(lookup(&[(ENV_MAX_SIZE_GB, "lots")])).unwrap_err();
        assert!(matches!(err, KairosError::InvalidConfig(_)));

        let err = PartitionConfig::builder().max_size_gb(0.0).build().unwrap_err();
        assert!(matches!(err, KairosError::InvalidConfig(_)));
    }

    #[test]
    fn test_serde_ttl_as_seconds() {
        let config = PartitionConfig::builder()
            .cache_ttl(Duration::from_secs(90))
            .build()
            .unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["cache_ttl"], 90);

        let back: PartitionConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
