//! Immutable unit of scan work handed to a reader.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use colscan_core::hash::{hash_serde, Hash256};
use colscan_core::id::SplitId;

use crate::address::HostAddress;
use crate::descriptor::{PartitionInfo, PartitionKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSplit {
    pub id: SplitId,
    pub path: String,
    pub start: u64,
    pub length: u64,
    pub file_size: u64,
    pub modification_time: i64,
    pub partition: Arc<PartitionInfo>,
    pub addresses: Vec<HostAddress>,
    pub force_local_scheduling: bool,
}

#[derive(Serialize)]
struct Fingerprint<'a> {
    path: &'a str,
    start: u64,
    length: u64,
    file_size: u64,
    modification_time: i64,
    partition_name: &'a str,
    keys: &'a [PartitionKey],
    bucket: Option<u32>,
}

impl ScanSplit {
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    pub fn partition_keys(&self) -> &[PartitionKey] {
        &self.partition.keys
    }

    pub fn bucket(&self) -> Option<u32> {
        self.partition.bucket
    }

    /// Opaque schema bytes carried from the partition.
    pub fn schema(&self) -> &[u8] {
        &self.partition.schema
    }

    /// Stable identity of the data this split reads, independent of its id
    /// and placement; equal for duplicate splits.
    pub fn fingerprint(&self) -> colscan_core::error::Result<Hash256> {
        hash_serde(&Fingerprint {
            path: &self.path,
            start: self.start,
            length: self.length,
            file_size: self.file_size,
            modification_time: self.modification_time,
            partition_name: &self.partition.name,
            keys: &self.partition.keys,
            bucket: self.partition.bucket,
        })
    }
}
