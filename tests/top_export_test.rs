//! Top Statistics Export Integration Tests

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use topexporter::metrics::{MetricFamilyKind, MetricSample};
use topexporter::{
    CollectionStats, FileStatsSource, MetricsRegistry, OperationCategory, OperationCounter,
    StatsSnapshot, TopMetrics,
};

fn counter(time: f64, count: f64) -> OperationCounter {
    OperationCounter::new(time, count)
}

fn multi_namespace_snapshot() -> StatsSnapshot {
    let mut snapshot = StatsSnapshot::new();
    snapshot.insert(
        "mydb.orders",
        CollectionStats {
            total: counter(1_000_000.0, 4.0),
            insert: counter(500_000.0, 2.0),
            ..Default::default()
        },
    );
    snapshot.insert(
        "local.system.profile",
        CollectionStats {
            queries: counter(2_500_000.0, 9.0),
            ..Default::default()
        },
    );
    snapshot.insert(
        "onlydb",
        CollectionStats {
            commands: counter(42.0, 1.0),
            ..Default::default()
        },
    );
    snapshot
}

fn find<'a>(
    samples: &'a [MetricSample],
    family: MetricFamilyKind,
    category: OperationCategory,
    database: &str,
    collection: &str,
) -> Option<&'a MetricSample> {
    samples.iter().find(|s| {
        s.family == family
            && s.category == category
            && s.database == database
            && s.collection == collection
    })
}

#[test]
fn test_sample_count_matches_namespaces_and_categories() -> Result<()> {
    let metrics = TopMetrics::new("mongodb")?;
    let snapshot = multi_namespace_snapshot();

    let samples = metrics.export(&snapshot);
    assert_eq!(samples.len(), snapshot.len() * OperationCategory::ALL.len() * 2);

    let time_samples = samples
        .iter()
        .filter(|s| s.family == MetricFamilyKind::TimeSecondsTotal)
        .count();
    assert_eq!(time_samples, snapshot.len() * OperationCategory::ALL.len());
    Ok(())
}

#[test]
fn test_every_category_exported_for_every_namespace() -> Result<()> {
    let metrics = TopMetrics::new("mongodb")?;
    let samples = metrics.export(&multi_namespace_snapshot());

    for (database, collection) in [("mydb", "orders"), ("local", "system.profile"), ("onlydb", "")] {
        for family in MetricFamilyKind::ALL {
            let types: HashSet<_> = samples
                .iter()
                .filter(|s| s.family == family && s.database == database && s.collection == collection)
                .map(|s| s.category)
                .collect();
            assert_eq!(types.len(), 9, "{}.{} in {:?}", database, collection, family);
        }
    }
    Ok(())
}

#[test]
fn test_orders_scenario() -> Result<()> {
    let metrics = TopMetrics::new("mongodb")?;
    let samples = metrics.export(&multi_namespace_snapshot());

    let time = MetricFamilyKind::TimeSecondsTotal;
    let count = MetricFamilyKind::CountTotal;

    let total_time = find(&samples, time, OperationCategory::Total, "mydb", "orders").unwrap();
    let total_count = find(&samples, count, OperationCategory::Total, "mydb", "orders").unwrap();
    assert_eq!(total_time.value, 1.0);
    assert_eq!(total_count.value, 4.0);

    let insert_time = find(&samples, time, OperationCategory::Insert, "mydb", "orders").unwrap();
    let insert_count = find(&samples, count, OperationCategory::Insert, "mydb", "orders").unwrap();
    assert_eq!(insert_time.value, 0.5);
    assert_eq!(insert_count.value, 2.0);

    let zeroed = samples
        .iter()
        .filter(|s| s.database == "mydb" && s.collection == "orders")
        .filter(|s| !matches!(s.category, OperationCategory::Total | OperationCategory::Insert))
        .collect::<Vec<_>>();
    assert_eq!(zeroed.len(), 7 * 2);
    assert!(zeroed.iter().all(|s| s.value == 0.0));
    Ok(())
}

#[test]
fn test_time_converted_to_seconds() -> Result<()> {
    let metrics = TopMetrics::new("mongodb")?;
    metrics.export(&multi_namespace_snapshot());

    let value = metrics.value(
        MetricFamilyKind::TimeSecondsTotal,
        OperationCategory::Queries,
        "local",
        "system.profile",
    );
    assert_eq!(value, Some(2.5));

    let value = metrics.value(
        MetricFamilyKind::TimeSecondsTotal,
        OperationCategory::Commands,
        "onlydb",
        "",
    );
    assert_eq!(value, Some(42.0 / 1e6));
    Ok(())
}

#[test]
fn test_repeated_export_is_deterministic() -> Result<()> {
    let metrics = TopMetrics::new("mongodb")?;
    let snapshot = multi_namespace_snapshot();

    let first = metrics.export(&snapshot);
    let second = metrics.export(&snapshot);
    assert_eq!(first, second);
    assert_eq!(metrics.collect(), metrics.collect());
    Ok(())
}

#[test]
fn test_last_write_wins() -> Result<()> {
    let metrics = TopMetrics::new("mongodb")?;
    metrics.export(&multi_namespace_snapshot());

    let mut later = StatsSnapshot::new();
    later.insert(
        "mydb.orders",
        CollectionStats {
            insert: counter(600_000.0, 3.0),
            ..Default::default()
        },
    );
    metrics.export(&later);

    let count = MetricFamilyKind::CountTotal;
    assert_eq!(metrics.value(count, OperationCategory::Insert, "mydb", "orders"), Some(3.0));
    assert_eq!(metrics.value(count, OperationCategory::Total, "mydb", "orders"), Some(0.0));

    // Namespaces missing from the later snapshot keep their last value
    assert_eq!(
        metrics.value(count, OperationCategory::Queries, "local", "system.profile"),
        Some(9.0)
    );
    Ok(())
}

#[test]
fn test_file_source_scrape() -> Result<()> {
    let temp_dir = tempfile::TempDir::new()?;
    let path = temp_dir.path().join("top.json");
    std::fs::write(
        &path,
        r#"{
            "totals": {
                "note": "all times in microseconds",
                "inventory.items": {
                    "total": { "time": 2500000, "count": 10 },
                    "update": { "time": 1500000, "count": 6 }
                }
            },
            "ok": 1
        }"#,
    )?;

    let registry = MetricsRegistry::new("mongodb")?;
    registry.register_source(Arc::new(FileStatsSource::new(&path)))?;

    let output = registry.export_prometheus();
    assert!(output.contains(
        r#"mongodb_top_time_seconds_total{collection="items",database="inventory",type="Total"} 2.5"#
    ));
    assert!(output.contains(
        r#"mongodb_top_count_total{collection="items",database="inventory",type="Update"} 6"#
    ));

    // A broken file keeps the last good values
    std::fs::write(&path, "{ truncated")?;
    let output = registry.export_prometheus();
    assert!(output.contains(
        r#"mongodb_top_count_total{collection="items",database="inventory",type="Update"} 6"#
    ));
    Ok(())
}

#[test]
fn test_type_labels_in_exposition() -> Result<()> {
    let registry = MetricsRegistry::new("mongodb")?;
    let source = Arc::new(topexporter::StaticStatsSource::new(
        StatsSnapshot::from_top_response(
            r#"{ "totals": { "mydb.orders": { "readLock": { "time": 10, "count": 3 } } } }"#,
        )?,
    ));
    registry.register_source(source)?;

    let output = registry.export_prometheus();
    assert!(output.contains(
        r#"mongodb_top_count_total{collection="orders",database="mydb",type="ReadLock"} 3"#
    ));

    for label in [
        "Total", "ReadLock", "WriteLock", "Queries", "GetMore", "Insert", "Update", "Remove",
        "Commands",
    ] {
        let series = format!(
            r#"mongodb_top_count_total{{collection="orders",database="mydb",type="{}"}}"#,
            label
        );
        assert!(output.contains(&series), "missing {}", series);
    }
    assert!(!output.contains(r#"type="readLock""#));
    Ok(())
}
