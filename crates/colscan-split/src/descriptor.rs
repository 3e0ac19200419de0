//! Split descriptors: a byte span of one file plus a resumable read cursor.
//!
//! A descriptor owns an ordered, contiguous list of [`ByteRange`]s covering
//! `[start, end)`. Consumers carve work off the front with
//! [`SplitDescriptor::increase_start`]; the cursor moves within the current
//! range and rolls to the next one exactly at a range boundary. The cursor is
//! plain mutable state: one consumer drives a descriptor to completion.

use std::mem::size_of;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use colscan_core::types::{ColumnType, Value};

use crate::address::ByteRange;
use crate::error::{Result, SplitError};

/// One partition column assignment, e.g. `ds=2024-01-01`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKey {
    pub name: String,
    pub column_type: ColumnType,
    /// `None` is the null partition.
    pub value: Option<Value>,
}

impl PartitionKey {
    pub fn new(name: impl Into<String>, column_type: ColumnType, value: Option<Value>) -> Self {
        Self {
            name: name.into(),
            column_type,
            value,
        }
    }

    pub fn estimated_size_in_bytes(&self) -> usize {
        size_of::<Self>()
            + self.name.len()
            + self
                .value
                .as_ref()
                .map_or(0, Value::estimated_size_in_bytes)
    }
}

/// Metadata shared by every split of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub name: String,
    pub keys: Vec<PartitionKey>,
    pub bucket: Option<u32>,
    /// Format-specific schema and properties; never interpreted here.
    pub schema: Vec<u8>,
}

impl PartitionInfo {
    pub fn unpartitioned(schema: Vec<u8>) -> Self {
        Self {
            name: "<unpartitioned>".to_string(),
            schema,
            ..Self::default()
        }
    }

    pub fn key(&self, name: &str) -> Option<&PartitionKey> {
        self.keys.iter().find(|k| k.name == name)
    }

    pub fn estimated_size_in_bytes(&self) -> usize {
        size_of::<Self>()
            + self.name.len()
            + self.schema.len()
            + self
                .keys
                .iter()
                .map(PartitionKey::estimated_size_in_bytes)
                .sum::<usize>()
    }
}

/// A file as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    /// Milliseconds since the epoch.
    pub modification_time: i64,
    pub splittable: bool,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, size: u64, modification_time: i64, splittable: bool) -> Self {
        Self {
            path: path.into(),
            size,
            modification_time,
            splittable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SplitDescriptor {
    path: String,
    start: u64,
    end: u64,
    file_size: u64,
    modification_time: i64,
    partition: Arc<PartitionInfo>,
    ranges: Vec<ByteRange>,
    current_index: usize,
    splittable: bool,
    force_local_scheduling: bool,
    // Fixed after construction.
    estimated_size_in_bytes: usize,
}

impl SplitDescriptor {
    const INSTANCE_SIZE: usize = size_of::<Self>();

    /// `ranges` must be non-empty, ordered and contiguous, starting at `start`
    /// and ending at `end`. A non-splittable descriptor has exactly one range.
    pub fn new(
        file: &FileEntry,
        start: u64,
        end: u64,
        partition: Arc<PartitionInfo>,
        ranges: Vec<ByteRange>,
        force_local_scheduling: bool,
    ) -> Result<Self> {
        validate(file, start, end, &ranges)?;
        let estimated_size_in_bytes = Self::INSTANCE_SIZE
            + file.path.len()
            + partition.estimated_size_in_bytes()
            + ranges
                .iter()
                .map(ByteRange::estimated_size_in_bytes)
                .sum::<usize>();
        Ok(Self {
            path: file.path.clone(),
            start,
            end,
            file_size: file.size,
            modification_time: file.modification_time,
            partition,
            ranges,
            current_index: 0,
            splittable: file.splittable,
            force_local_scheduling,
            estimated_size_in_bytes,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read cursor: the first byte not yet handed out.
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn modification_time(&self) -> i64 {
        self.modification_time
    }

    pub fn partition(&self) -> &Arc<PartitionInfo> {
        &self.partition
    }

    pub fn ranges(&self) -> &[ByteRange] {
        &self.ranges
    }

    pub fn is_splittable(&self) -> bool {
        self.splittable
    }

    pub fn force_local_scheduling(&self) -> bool {
        self.force_local_scheduling
    }

    pub fn is_done(&self) -> bool {
        self.current_index == self.ranges.len()
    }

    pub fn current_range(&self) -> Result<&ByteRange> {
        self.ranges
            .get(self.current_index)
            .ok_or(SplitError::AllRangesConsumed)
    }

    /// Advance the cursor by `n` bytes within the current range.
    pub fn increase_start(&mut self, n: u64) -> Result<()> {
        let range_end = self.current_range()?.end;
        let next = self
            .start
            .checked_add(n)
            .filter(|next| *next <= range_end)
            .ok_or_else(|| {
                SplitError::CorruptSplit(format!(
                    "{}: advancing {} bytes from {} passes range end {}",
                    self.path, n, self.start, range_end
                ))
            })?;
        self.start = next;
        if next < range_end {
            return Ok(());
        }
        self.current_index += 1;
        match self.ranges.get(self.current_index) {
            None => Ok(()),
            Some(range) if range.start == next => Ok(()),
            Some(range) => Err(SplitError::CorruptSplit(format!(
                "{}: cursor {} does not match next range start {}",
                self.path, next, range.start
            ))),
        }
    }

    /// Fixed at construction; cheap to call on every queue operation.
    pub fn estimated_size_in_bytes(&self) -> usize {
        self.estimated_size_in_bytes
    }
}

fn validate(file: &FileEntry, start: u64, end: u64, ranges: &[ByteRange]) -> Result<()> {
    let invalid = |msg: String| Err(SplitError::InvalidSplitArguments(format!("{}: {}", file.path, msg)));
    if end < start {
        return invalid(format!("end {} before start {}", end, start));
    }
    let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
        return invalid("no ranges".to_string());
    };
    if !file.splittable && ranges.len() != 1 {
        return invalid(format!("non-splittable file with {} ranges", ranges.len()));
    }
    if first.start != start || last.end != end {
        return invalid(format!(
            "ranges cover [{}, {}), split is [{}, {})",
            first.start, last.end, start, end
        ));
    }
    for range in ranges {
        if range.end < range.start {
            return invalid(format!("range [{}, {}) is reversed", range.start, range.end));
        }
    }
    for pair in ranges.windows(2) {
        if pair[0].end != pair[1].start {
            return invalid(format!(
                "range ending at {} followed by range starting at {}",
                pair[0].end, pair[1].start
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(ranges: Vec<(u64, u64)>) -> Result<SplitDescriptor> {
        let file = FileEntry::new("/warehouse/t/part-0", 25, 0, true);
        let start = ranges.first().map_or(0, |r| r.0);
        let end = ranges.last().map_or(0, |r| r.1);
        SplitDescriptor::new(
            &file,
            start,
            end,
            Arc::new(PartitionInfo::default()),
            ranges
                .into_iter()
                .map(|(s, e)| ByteRange::new(s, e, Vec::new()))
                .collect(),
            false,
        )
    }

    #[test]
    fn test_traversal_rolls_over_at_range_end() {
        let mut d = descriptor(vec![(0, 10), (10, 25)]).unwrap();
        d.increase_start(10).unwrap();
        assert_eq!((d.current_range().unwrap().start, d.current_range().unwrap().end), (10, 25));
        assert!(!d.is_done());
        d.increase_start(15).unwrap();
        assert!(d.is_done());
        assert_eq!(d.current_range().unwrap_err(), SplitError::AllRangesConsumed);
        assert!(d.increase_start(0).is_err());
    }

    #[test]
    fn test_advancing_past_range_is_corrupt() {
        let mut d = descriptor(vec![(0, 10), (10, 25)]).unwrap();
        d.increase_start(4).unwrap();
        let err = d.increase_start(7).unwrap_err();
        assert!(matches!(err, SplitError::CorruptSplit(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_gaps_and_reversed_ranges_rejected() {
        let gap = descriptor(vec![(0, 10), (12, 25)]).unwrap_err();
        assert!(matches!(gap, SplitError::InvalidSplitArguments(_)));
        assert!(!gap.is_fatal());
        assert!(descriptor(vec![(0, 10), (10, 5), (5, 25)]).is_err());
        assert!(descriptor(Vec::new()).is_err());
    }

    #[test]
    fn test_zero_width_range_completes_on_zero_advance() {
        let mut d = descriptor(vec![(0, 0)]).unwrap();
        assert!(!d.is_done());
        d.increase_start(0).unwrap();
        assert!(d.is_done());
    }

    #[test]
    fn test_estimated_size_counts_path_and_ranges() {
        let one = descriptor(vec![(0, 25)]).unwrap();
        let two = descriptor(vec![(0, 10), (10, 25)]).unwrap();
        assert!(one.estimated_size_in_bytes() > "/warehouse/t/part-0".len());
        assert_eq!(
            two.estimated_size_in_bytes() - one.estimated_size_in_bytes(),
            size_of::<ByteRange>()
        );
    }
}
