use std::sync::Arc;

use colscan_block::{BlockBuilder, Page};
use colscan_core::prelude::*;
use colscan_exec::{MemoryDecoder, ScanColumn, ScanPipeline};
use colscan_predicate::{Domain, Range, RowFilter, TupleDomain};
use colscan_split::{BlockLocation, FileEntry, HostAddress, PartitionInfo, ScanSplit, SplitFactory, SplitSource};
use criterion::{criterion_group, criterion_main, Criterion};

fn make_page(rows: usize) -> Page {
    let mut ids = BlockBuilder::new(ColumnType::BigInt, rows);
    let mut names = BlockBuilder::new(ColumnType::Varchar, rows);
    for i in 0..rows {
        ids.append_long(i as i64).unwrap();
        if i % 7 == 0 {
            names.append_null().unwrap();
        } else {
            names.append_str(&format!("name-{}", i % 100)).unwrap();
        }
    }
    Page::new(rows, vec![ids.build(), names.build()]).unwrap()
}

fn bench_block_builder(c: &mut Criterion) {
    let mut builder = BlockBuilder::new(ColumnType::BigInt, 4096);
    c.bench_function("block_builder_append_4096_longs", |b| {
        b.iter(|| {
            builder.reset();
            for i in 0..4096 {
                builder.append_long(i).unwrap();
            }
            builder.build()
        })
    });
}

fn bench_row_filter(c: &mut Criterion) {
    let page = make_page(4096);
    let predicate = TupleDomain::with_column_domains([
        (
            ColumnId::new(0),
            Domain::range(Range::between(Value::Long(1000), Value::Long(3000)).unwrap()),
        ),
        (ColumnId::new(1), Domain::not_null()),
    ]);
    let filter = RowFilter::new(predicate, &[ColumnType::BigInt, ColumnType::Varchar]).unwrap();
    c.bench_function("row_filter_4096_rows", |b| {
        b.iter(|| filter.filter_page(&page).unwrap())
    });
}

fn bench_split_carving(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let config = ScanConfig {
        max_split_size: 1024,
        max_initial_split_size: 512,
        ..ScanConfig::default()
    };
    let factory = SplitFactory::new(Arc::new(PartitionInfo::default()), false);
    let file = FileEntry::new("/bench/file", 1024 * 1024, 0, true);
    let locations: Vec<BlockLocation> = (0..16)
        .map(|i| BlockLocation::new(i * 65_536, 65_536, vec![HostAddress::new(format!("node-{}", i), None)]))
        .collect();
    c.bench_function("split_source_carve_1mib", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let source = SplitSource::new(&config);
                let descriptor = factory.create_for_file(&file, &locations).unwrap().unwrap();
                source.add_to_queue(descriptor).await.unwrap();
                source.no_more_splits();
                let mut count = 0;
                loop {
                    let batch = source.next_batch(256).await.unwrap();
                    if batch.is_empty() {
                        break count;
                    }
                    count += batch.len();
                }
            })
        })
    });
}

fn bench_pipeline_scan(c: &mut Criterion) {
    let split = ScanSplit {
        id: SplitId::new(0),
        path: "/bench/file".into(),
        start: 0,
        length: 1,
        file_size: 1,
        modification_time: 0,
        partition: Arc::new(PartitionInfo::default()),
        addresses: Vec::new(),
        force_local_scheduling: false,
    };
    let rows: Vec<Vec<Option<Value>>> = (0..8192)
        .map(|i| vec![Some(Value::Long(i)), Some(Value::Double(i as f64))])
        .collect();
    let predicate = TupleDomain::with_column_domains([(
        "id".to_string(),
        Domain::range(Range::less_than(Value::Long(4096))),
    )]);
    let pipeline = ScanPipeline::new(
        vec![
            ScanColumn::new("id", ColumnType::BigInt),
            ScanColumn::new("score", ColumnType::Double),
        ],
        predicate,
        ScanConfig::default(),
    );
    c.bench_function("pipeline_scan_8192_rows", |b| {
        b.iter(|| {
            let mut decoder = MemoryDecoder::new(vec!["id".into(), "score".into()], rows.clone());
            let scan = pipeline.scan(&split, &mut decoder).unwrap();
            scan.map(|page| page.unwrap().position_count()).sum::<usize>()
        })
    });
}

criterion_group!(
    benches,
    bench_block_builder,
    bench_row_filter,
    bench_split_carving,
    bench_pipeline_scan
);
criterion_main!(benches);
