//! Split descriptors, the split source and the background loader

mod test_data_gen;

use std::collections::HashSet;
use std::sync::Arc;

use colscan_core::config::ScanConfig;
use colscan_core::types::Value;
use colscan_predicate::{Domain, TupleDomain};
use colscan_split::{
    ByteRange, FileEntry, LoaderOptions, PartitionInfo, ScanSplit, SourceState, SplitDescriptor,
    SplitError, SplitFactory, SplitLoader, SplitSource, PATH_COLUMN,
};
use test_data_gen::{listed_file, partition, VecLister};

fn small_config() -> ScanConfig {
    ScanConfig {
        max_split_size: 1000,
        max_initial_split_size: 500,
        max_initial_splits: 2,
        ..ScanConfig::default()
    }
}

async fn drain(source: &SplitSource) -> Result<Vec<ScanSplit>, SplitError> {
    let mut splits = Vec::new();
    loop {
        let batch = source.next_batch(7).await?;
        if batch.is_empty() {
            return Ok(splits);
        }
        splits.extend(batch);
    }
}

#[test]
fn test_split_traversal() {
    let file = FileEntry::new("/warehouse/t/part-0", 25, 0, true);
    let mut split = SplitDescriptor::new(
        &file,
        0,
        25,
        Arc::new(PartitionInfo::default()),
        vec![ByteRange::new(0, 10, Vec::new()), ByteRange::new(10, 25, Vec::new())],
        false,
    )
    .expect("Failed to build descriptor");

    split.increase_start(10).unwrap();
    let current = split.current_range().unwrap();
    assert_eq!((current.start, current.end), (10, 25));
    assert!(!split.is_done());

    split.increase_start(15).unwrap();
    assert!(split.is_done());
    assert_eq!(split.current_range().unwrap_err(), SplitError::AllRangesConsumed);
}

#[test]
fn test_factory_builds_ranges_from_block_locations() {
    let factory = SplitFactory::new(partition(1), true);
    let listed = listed_file("/t/ds=1/a", 3000, 3);
    let descriptor = factory
        .create_for_file(&listed.file, &listed.locations)
        .unwrap()
        .expect("file should not be pruned");
    assert_eq!(descriptor.ranges().len(), 3);
    assert!(descriptor.force_local_scheduling());
    assert_eq!(descriptor.ranges()[1].addresses[0].to_string(), "node-1:9866");
}

#[tokio::test]
async fn test_source_covers_every_byte_exactly_once() {
    let source = SplitSource::new(&small_config());
    let factory = SplitFactory::new(partition(1), false);
    for (path, size, blocks) in [("/t/a", 3000, 3), ("/t/b", 10, 1), ("/t/c", 2500, 2)] {
        let listed = listed_file(path, size, blocks);
        let descriptor = factory
            .create_for_file(&listed.file, &listed.locations)
            .unwrap()
            .unwrap();
        source.add_to_queue(descriptor).await.unwrap();
    }
    source.no_more_splits();

    let splits = drain(&source).await.unwrap();
    for (path, size) in [("/t/a", 3000u64), ("/t/b", 10), ("/t/c", 2500)] {
        let mut pieces: Vec<(u64, u64)> = splits
            .iter()
            .filter(|s| s.path == path)
            .map(|s| (s.start, s.end()))
            .collect();
        pieces.sort();
        assert_eq!(pieces.first().map(|p| p.0), Some(0));
        assert_eq!(pieces.last().map(|p| p.1), Some(size));
        assert!(pieces.windows(2).all(|w| w[0].1 == w[1].0), "{} has gaps", path);
    }
    // initial splits are capped at the smaller size
    assert!(splits.iter().take(2).all(|s| s.length <= 500));
    assert!(splits.iter().all(|s| s.length <= 1000));

    let ids: HashSet<_> = splits.iter().map(|s| s.id).collect();
    assert_eq!(ids.len(), splits.len());
    assert!(source.is_finished());
    assert_eq!(source.buffered_bytes(), 0);
}

#[tokio::test]
async fn test_add_after_no_more_splits_is_rejected() {
    let source = SplitSource::new(&small_config());
    source.no_more_splits();
    let listed = listed_file("/t/a", 10, 1);
    let descriptor = SplitFactory::new(partition(1), false)
        .create_for_file(&listed.file, &listed.locations)
        .unwrap()
        .unwrap();
    let err = source.add_to_queue(descriptor).await.unwrap_err();
    assert!(matches!(err, SplitError::InvalidState { .. }));
    assert!(source.next_batch(5).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_loader_runs_concurrently_with_consumer() {
    let lister = Arc::new(VecLister {
        partitions: (0..6)
            .map(|ds| {
                let files = (0..5)
                    .map(|f| listed_file(&format!("/t/ds={}/f{}", ds, f), 4000, 4))
                    .collect();
                (partition(ds), files)
            })
            .collect(),
    });
    let config = ScanConfig {
        max_queued_descriptors: 2,
        ..small_config()
    };
    let source = Arc::new(SplitSource::new(&config));
    let loader = SplitLoader::start(Arc::clone(&source), lister, LoaderOptions::from_config(&config));

    let splits = drain(&source).await.unwrap();
    let total: u64 = splits.iter().map(|s| s.length).sum();
    assert_eq!(total, 6 * 5 * 4000);
    loader.join().await.unwrap();
    assert_eq!(source.state(), SourceState::NoMoreSplits);
}

#[tokio::test]
async fn test_loader_prunes_partitions_and_paths() {
    let lister = Arc::new(VecLister {
        partitions: vec![
            (partition(1), vec![listed_file("/t/ds=1/a", 10, 1), listed_file("/t/ds=1/b", 10, 1)]),
            (partition(2), vec![listed_file("/t/ds=2/a", 10, 1)]),
        ],
    });
    let predicate = TupleDomain::with_column_domains([
        ("ds".to_string(), Domain::single_value(Value::Long(1))),
        (
            PATH_COLUMN.to_string(),
            Domain::multiple_values(vec![
                Value::Varchar("/t/ds=1/a".into()),
                Value::Varchar("/t/ds=2/a".into()),
            ]),
        ),
    ]);
    let source = Arc::new(SplitSource::new(&small_config()));
    let loader = SplitLoader::start(
        Arc::clone(&source),
        lister,
        LoaderOptions {
            predicate,
            ..LoaderOptions::default()
        },
    );
    let splits = drain(&source).await.unwrap();
    let paths: Vec<&str> = splits.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(paths, vec!["/t/ds=1/a"]);
    loader.join().await.unwrap();
}

#[tokio::test]
async fn test_dropping_loader_mid_load_closes_source() {
    let lister = Arc::new(VecLister {
        partitions: vec![(
            partition(1),
            (0..50).map(|f| listed_file(&format!("/t/f{}", f), 100, 1)).collect(),
        )],
    });
    let config = ScanConfig {
        max_queued_descriptors: 1,
        ..small_config()
    };
    let source = Arc::new(SplitSource::new(&config));
    let loader = SplitLoader::start(Arc::clone(&source), lister, LoaderOptions::default());
    // take one batch so the loader is known to be running, then walk away
    let first = source.next_batch(1).await.unwrap();
    assert_eq!(first.len(), 1);
    drop(loader);
    assert_eq!(source.state(), SourceState::Closed);
    assert_eq!(source.next_batch(1).await.unwrap_err(), SplitError::Closed);
    assert_eq!(source.buffered_bytes(), 0);
}

#[tokio::test]
async fn test_buffer_limit_surfaces_to_consumer() {
    let lister = Arc::new(VecLister {
        partitions: vec![(partition(1), vec![listed_file("/t/a", 100, 1)])],
    });
    let config = ScanConfig {
        max_outstanding_splits_bytes: 16,
        ..small_config()
    };
    let source = Arc::new(SplitSource::new(&config));
    let _loader = SplitLoader::start(Arc::clone(&source), lister, LoaderOptions::default());
    let err = drain(&source).await.unwrap_err();
    assert!(matches!(err, SplitError::BufferLimitExceeded { limit: 16, .. }));
    assert!(!err.is_fatal());
}

#[test]
fn test_scan_split_serde_and_fingerprint() {
    let split = ScanSplit {
        id: colscan_core::id::SplitId::new(3),
        path: "/t/ds=1/a".into(),
        start: 0,
        length: 10,
        file_size: 10,
        modification_time: 1,
        partition: partition(1),
        addresses: Vec::new(),
        force_local_scheduling: false,
    };
    let json = serde_json::to_string(&split).unwrap();
    let back: ScanSplit = serde_json::from_str(&json).unwrap();
    assert_eq!(back, split);
    assert_eq!(back.fingerprint().unwrap(), split.fingerprint().unwrap());
    assert_eq!(back.partition_keys()[0].value, Some(Value::Long(1)));
}
