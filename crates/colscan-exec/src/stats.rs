//! Per-split scan counters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Splits skipped because their partition or path was not admitted.
    pub splits_pruned_by_partition: u64,
    /// Splits skipped on min/max/null-count statistics without opening them.
    pub splits_pruned_by_statistics: u64,
    pub splits_scanned: u64,
    pub rows_decoded: u64,
    pub rows_emitted: u64,
    pub pages_emitted: u64,
    /// Pages in which the row filter rejected every row.
    pub pages_filtered_out: u64,
    /// Sum of the retained sizes of emitted pages.
    pub bytes_emitted: u64,
}

impl ScanStats {
    pub fn merge(&mut self, other: &ScanStats) {
        self.splits_pruned_by_partition += other.splits_pruned_by_partition;
        self.splits_pruned_by_statistics += other.splits_pruned_by_statistics;
        self.splits_scanned += other.splits_scanned;
        self.rows_decoded += other.rows_decoded;
        self.rows_emitted += other.rows_emitted;
        self.pages_emitted += other.pages_emitted;
        self.pages_filtered_out += other.pages_filtered_out;
        self.bytes_emitted += other.bytes_emitted;
    }

    pub fn splits_pruned(&self) -> u64 {
        self.splits_pruned_by_partition + self.splits_pruned_by_statistics
    }
}
