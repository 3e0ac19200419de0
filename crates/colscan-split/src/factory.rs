//! Turns listed files and their storage block locations into descriptors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use colscan_core::types::Value;
use colscan_predicate::Domain;

use crate::address::{ByteRange, HostAddress};
use crate::descriptor::{FileEntry, PartitionInfo, SplitDescriptor};
use crate::error::{Result, SplitError};

/// A storage block of a file and the hosts holding a replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLocation {
    pub offset: u64,
    pub length: u64,
    pub hosts: Vec<HostAddress>,
}

impl BlockLocation {
    pub fn new(offset: u64, length: u64, hosts: Vec<HostAddress>) -> Self {
        Self {
            offset,
            length,
            hosts,
        }
    }

    fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

#[derive(Debug, Clone)]
pub struct SplitFactory {
    partition: Arc<PartitionInfo>,
    path_domain: Domain,
    force_local_scheduling: bool,
}

impl SplitFactory {
    pub fn new(partition: Arc<PartitionInfo>, force_local_scheduling: bool) -> Self {
        Self {
            partition,
            path_domain: Domain::all(),
            force_local_scheduling,
        }
    }

    /// Only files whose path the domain admits produce descriptors.
    pub fn with_path_domain(mut self, path_domain: Domain) -> Self {
        self.path_domain = path_domain;
        self
    }

    pub fn partition(&self) -> &Arc<PartitionInfo> {
        &self.partition
    }

    /// Descriptor over the whole file.
    pub fn create_for_file(
        &self,
        file: &FileEntry,
        locations: &[BlockLocation],
    ) -> Result<Option<SplitDescriptor>> {
        self.create(file, 0, file.size, locations)
    }

    /// Descriptor over `[start, start + length)` of `file`, or `None` when the
    /// path is pruned.
    pub fn create(
        &self,
        file: &FileEntry,
        start: u64,
        length: u64,
        locations: &[BlockLocation],
    ) -> Result<Option<SplitDescriptor>> {
        if !self.path_admitted(&file.path) {
            #[cfg(feature = "tracing")]
            tracing::debug!(path = %file.path, "file pruned by path predicate");
            return Ok(None);
        }
        let end = start.checked_add(length).ok_or_else(|| {
            SplitError::InvalidSplitArguments(format!(
                "{}: start {} + length {} overflows",
                file.path, start, length
            ))
        })?;

        let first_hosts = || locations.first().map(|l| l.hosts.clone()).unwrap_or_default();
        let ranges = if !file.splittable {
            vec![ByteRange::new(start, end, first_hosts())]
        } else if length == 0 {
            vec![ByteRange::new(start, start, first_hosts())]
        } else {
            let clipped: Vec<ByteRange> = locations
                .iter()
                .filter_map(|location| {
                    let s = location.offset.max(start);
                    let e = location.end().min(end);
                    (s < e).then(|| ByteRange::new(s, e, location.hosts.clone()))
                })
                .collect();
            if clipped.is_empty() {
                vec![ByteRange::new(start, end, Vec::new())]
            } else {
                clipped
            }
        };

        let force_local = self.force_local_scheduling && ranges.iter().all(|r| !r.addresses.is_empty());
        SplitDescriptor::new(
            file,
            start,
            end,
            Arc::clone(&self.partition),
            ranges,
            force_local,
        )
        .map(Some)
    }

    fn path_admitted(&self, path: &str) -> bool {
        self.path_domain.is_all()
            || self
                .path_domain
                .includes_value(Some(&Value::Varchar(path.to_string())))
    }
}
