//! The seam between the scan pipeline and a file format reader.

use colscan_block::BlockBuilder;
use colscan_core::types::{ColumnType, Value};
use colscan_predicate::StatisticsSet;
use colscan_split::ScanSplit;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// A column requested from a scan, by name and declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanColumn {
    pub name: String,
    pub column_type: ColumnType,
}

impl ScanColumn {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Reads the rows of one split of a file format.
///
/// The pipeline asks for statistics first, opens the decoder only if the split
/// survives pruning, then pulls rows in batches until `decode_rows` returns 0.
pub trait SplitDecoder: Send {
    /// Statistics over the split's data, keyed by column name, if the format
    /// keeps any.
    fn statistics(&mut self, _split: &ScanSplit) -> Result<Option<StatisticsSet<String>>> {
        Ok(None)
    }

    /// Prepare to read `columns`; `decode_rows` gets one builder per column,
    /// in the same order.
    fn open(&mut self, split: &ScanSplit, columns: &[ScanColumn]) -> Result<()>;

    /// Append the same number of rows (at most `max_rows`) to every builder
    /// and return it. Zero means the split is exhausted.
    fn decode_rows(&mut self, builders: &mut [BlockBuilder], max_rows: usize) -> Result<usize>;
}

/// Decoder over rows held in memory: the whole row set is the content of the
/// split it is opened for.
#[derive(Debug, Clone, Default)]
pub struct MemoryDecoder {
    columns: Vec<String>,
    rows: Vec<Vec<Option<Value>>>,
    statistics: Option<StatisticsSet<String>>,
    projection: Vec<usize>,
    cursor: usize,
}

impl MemoryDecoder {
    /// Every row holds one value per entry of `columns`.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<Value>>>) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    pub fn with_statistics(mut self, statistics: StatisticsSet<String>) -> Self {
        self.statistics = Some(statistics);
        self
    }

    /// Rows handed out since `open`.
    pub fn rows_read(&self) -> usize {
        self.cursor
    }
}

impl SplitDecoder for MemoryDecoder {
    fn statistics(&mut self, _split: &ScanSplit) -> Result<Option<StatisticsSet<String>>> {
        Ok(self.statistics.clone())
    }

    fn open(&mut self, _split: &ScanSplit, columns: &[ScanColumn]) -> Result<()> {
        self.projection = columns
            .iter()
            .map(|column| {
                self.columns
                    .iter()
                    .position(|name| *name == column.name)
                    .ok_or_else(|| ScanError::Decode(format!("column '{}' not present", column.name)))
            })
            .collect::<Result<_>>()?;
        self.cursor = 0;
        Ok(())
    }

    fn decode_rows(&mut self, builders: &mut [BlockBuilder], max_rows: usize) -> Result<usize> {
        let end = self.rows.len().min(self.cursor + max_rows);
        for row in &self.rows[self.cursor..end] {
            for (builder, index) in builders.iter_mut().zip(&self.projection) {
                let value = row.get(*index).ok_or_else(|| {
                    ScanError::Decode(format!("row has {} values, column {} missing", row.len(), index))
                })?;
                builder.append_value(value.as_ref())?;
            }
        }
        let decoded = end - self.cursor;
        self.cursor = end;
        Ok(decoded)
    }
}
