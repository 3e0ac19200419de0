//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use colscan_block::{Block, BlockBuilder, Page};
use colscan_core::types::{ColumnType, Value};
use colscan_split::{
    BlockLocation, FileEntry, HostAddress, ListedFile, PartitionInfo, PartitionKey, PartitionLister,
};
use futures::stream::{self, BoxStream, StreamExt};

pub fn build_block(column_type: ColumnType, values: &[Option<Value>]) -> Block {
    let mut builder = BlockBuilder::new(column_type, values.len());
    for value in values {
        builder
            .append_value(value.as_ref())
            .expect("Failed to append value");
    }
    builder.build()
}

pub fn long_block(values: &[i64]) -> Block {
    let values: Vec<Option<Value>> = values.iter().map(|v| Some(Value::Long(*v))).collect();
    build_block(ColumnType::BigInt, &values)
}

/// `rows` rows of (id BIGINT, name VARCHAR); every fifth name is null.
pub fn sample_page(rows: usize) -> Page {
    let ids: Vec<Option<Value>> = (0..rows).map(|i| Some(Value::Long(i as i64))).collect();
    let names: Vec<Option<Value>> = (0..rows)
        .map(|i| (i % 5 != 4).then(|| Value::Varchar(format!("name-{}", i))))
        .collect();
    Page::new(
        rows,
        vec![
            build_block(ColumnType::BigInt, &ids),
            build_block(ColumnType::Varchar, &names),
        ],
    )
    .expect("Failed to build page")
}

pub fn partition(ds: i64) -> Arc<PartitionInfo> {
    Arc::new(PartitionInfo {
        name: format!("ds={}", ds),
        keys: vec![PartitionKey::new("ds", ColumnType::BigInt, Some(Value::Long(ds)))],
        bucket: None,
        schema: b"id:bigint,name:varchar".to_vec(),
    })
}

/// A splittable file stored as `blocks` equal storage blocks, each on its own host.
pub fn listed_file(path: &str, size: u64, blocks: u64) -> ListedFile {
    let block_len = size / blocks.max(1);
    let locations = (0..blocks)
        .map(|i| {
            let offset = i * block_len;
            let length = if i + 1 == blocks { size - offset } else { block_len };
            BlockLocation::new(offset, length, vec![HostAddress::new(format!("node-{}", i), Some(9866))])
        })
        .collect();
    ListedFile::new(FileEntry::new(path, size, 1_700_000_000_000, true), locations)
}

/// In-memory partition listing.
pub struct VecLister {
    pub partitions: Vec<(Arc<PartitionInfo>, Vec<ListedFile>)>,
}

impl PartitionLister for VecLister {
    fn partitions(&self) -> BoxStream<'static, colscan_split::Result<Arc<PartitionInfo>>> {
        let partitions: Vec<_> = self
            .partitions
            .iter()
            .map(|(p, _)| Ok(Arc::clone(p)))
            .collect();
        stream::iter(partitions).boxed()
    }

    fn files(&self, partition: &Arc<PartitionInfo>) -> BoxStream<'static, colscan_split::Result<ListedFile>> {
        let files: Vec<_> = self
            .partitions
            .iter()
            .filter(|(p, _)| Arc::ptr_eq(p, partition))
            .flat_map(|(_, files)| files.iter().cloned().map(Ok))
            .collect();
        stream::iter(files).boxed()
    }
}
