use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;

use kairos::engine::EngineVerb;
use kairos::naming::ITEM_INDICES;
use kairos::{AliasCache, AliasMap, DatetimeRange, MemoryEngine, PartitionConfig, Partitioner};

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn seeded(engine: &Arc<MemoryEngine>) -> kairos::Result<Partitioner> {
    let config = PartitionConfig::builder()
        .datetime_partitioning(true)
        .max_size_gb(1.0)
        .build()?;
    let partitioner = Partitioner::new(engine.clone(), config)?;

    // Partitions for c1: [2024-01-01, 2024-01-11) and [2024-01-11, ..).
    let item = json!({"id": "a", "properties": {"datetime": "2024-01-01"}});
    partitioner.target_index("c1", &item).await?;
    engine.set_index_size("c1_2024-01-01", 2_000_000_000)?;
    let item = json!({"id": "b", "properties": {"datetime": "2024-01-10"}});
    partitioner.target_index("c1", &item).await?;

    let item = json!({"id": "x", "properties": {"datetime": "2023-06-01"}});
    partitioner.target_index("c2", &item).await?;
    Ok(partitioner)
}

#[tokio::test]
async fn test_datetime_selection_narrows_named_collections() -> kairos::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let partitioner = seeded(&engine).await?;
    let ids = vec!["c1".to_string(), "c2".to_string()];

    let selected = partitioner
        .select_indexes(Some(ids.as_slice()), &DatetimeRange::on(day("2024-01-05")))
        .await?;
    assert_eq!(selected, "c1_2024-01-01-2024-01-10,c2_2023-06-01");

    let selected = partitioner
        .select_indexes(
            Some(ids.as_slice()),
            &DatetimeRange::from_interval("2024-01-12T00:00:00Z/..")?,
        )
        .await?;
    assert_eq!(selected, "c1_2024-01-11,c2_2023-06-01");

    let before_everything = DatetimeRange::between(None, Some(day("2022-12-31")));
    let selected = partitioner
        .select_indexes(Some(&ids[..1]), &before_everything)
        .await?;
    assert_eq!(selected, "");

    let selected = partitioner
        .select_indexes(None, &DatetimeRange::on(day("2024-01-05")))
        .await?;
    assert_eq!(selected, ITEM_INDICES);
    Ok(())
}

#[tokio::test]
async fn test_unfiltered_selection_ignores_range() -> kairos::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let partitioner = Partitioner::new(engine.clone(), PartitionConfig::default())?;
    let ids = vec!["a".to_string(), "b".to_string()];

    let with_range = partitioner
        .select_indexes(
            Some(ids.as_slice()),
            &DatetimeRange::between(Some(day("2024-01-01")), Some(day("2024-02-01"))),
        )
        .await?;
    let without_range = partitioner
        .select_indexes(Some(ids.as_slice()), &DatetimeRange::unbounded())
        .await?;

    assert_eq!(with_range, "items_a,items_b");
    assert_eq!(with_range, without_range);
    assert_eq!(engine.call_count(EngineVerb::GetAlias), 0);
    Ok(())
}

#[tokio::test]
async fn test_fresh_cache_is_not_reloaded() -> kairos::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let partitioner = seeded(&engine).await?;
    let ids = vec!["c1".to_string()];
    engine.reset_call_counts();

    for _ in 0..5 {
        partitioner
            .select_indexes(Some(ids.as_slice()), &DatetimeRange::unbounded())
            .await?;
    }
    assert_eq!(engine.call_count(EngineVerb::GetAlias), 0);

    partitioner.refresh_cache().await?;
    assert_eq!(engine.call_count(EngineVerb::GetAlias), 1);
    Ok(())
}

#[tokio::test]
async fn test_foreign_topology_changes_need_refresh() -> kairos::Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let reader = Partitioner::new(
        engine.clone(),
        PartitionConfig::builder().datetime_partitioning(true).build()?,
    )?;
    let writer = seeded(&engine).await?;
    let ids = vec!["c3".to_string()];

    assert_eq!(
        reader
            .select_indexes(Some(ids.as_slice()), &DatetimeRange::unbounded())
            .await?,
        ""
    );

    // A second context with its own cache creates the partition.
    let item = json!({"id": "n", "properties": {"datetime": "2024-05-05"}});
    writer.target_index("c3", &item).await?;
    assert_eq!(
        reader
            .select_indexes(Some(ids.as_slice()), &DatetimeRange::unbounded())
            .await?,
        ""
    );

    reader.refresh_cache().await?;
    assert_eq!(
        reader
            .select_indexes(Some(ids.as_slice()), &DatetimeRange::unbounded())
            .await?,
        "c3_2024-05-05"
    );
    Ok(())
}

#[tokio::test]
async fn test_cache_expires_after_ttl() {
    let cache = AliasCache::new(Duration::from_millis(30));
    let mut data = AliasMap::new();
    data.insert("items_c1".to_string(), vec!["c1_2024-01-01".to_string()]);

    cache.set(data.clone());
    assert_eq!(cache.get().as_deref(), Some(&data));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(cache.get().is_none());
    assert!(cache.is_expired());
}
