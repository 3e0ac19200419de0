//! ScanPipeline: one split in, filtered pages out.
//!
//! For each split the pipeline
//! 1. tests partition keys and the file path against the predicate,
//! 2. asks the decoder for statistics and skips the split if they rule it out,
//! 3. opens the decoder for the data columns and pulls at most
//!    `target_page_rows` rows at a time through [`BlockBuilder`]s,
//! 4. fills partition-key and path columns with run-length constants,
//! 5. drops rows the predicate rejects, and
//! 6. accounts every emitted page against the memory budget until the caller
//!    drops it.
//!
//! Pruning in steps 1 and 2 may keep data that ends up matching nothing but
//! never drops data that matches; step 5 is exact.

use colscan_block::{Block, BlockBuilder, Page, RunLengthBlock};
use colscan_core::config::ScanConfig;
use colscan_core::id::ColumnId;
use colscan_core::types::{ColumnType, Value};
use colscan_mem::{BudgetGuardImpl, MemoryBudgetImpl};
use colscan_predicate::{matches_statistics, Observed, RowFilter, TupleDomain};
use colscan_split::{ScanSplit, PATH_COLUMN};

use crate::decoder::{ScanColumn, SplitDecoder};
use crate::error::{Result, ScanError};
use crate::stats::ScanStats;

const PAGE_TAG: &str = "scan-page";

/// A page plus the budget bytes it holds. Dropping it returns them.
#[derive(Debug)]
pub struct ScannedPage {
    page: Page,
    _guard: BudgetGuardImpl,
}

impl ScannedPage {
    pub fn page(&self) -> &Page {
        &self.page
    }
}

impl std::ops::Deref for ScannedPage {
    type Target = Page;

    fn deref(&self) -> &Page {
        &self.page
    }
}

enum ColumnSource {
    /// Index into the decoder's builders.
    Decoded(usize),
    /// Single-position block repeated for every row.
    Constant(Block),
}

#[derive(Debug, Clone)]
pub struct ScanPipeline {
    columns: Vec<ScanColumn>,
    predicate: TupleDomain<String>,
    config: ScanConfig,
    budget: MemoryBudgetImpl,
}

impl ScanPipeline {
    /// `predicate` is keyed by column name. Every column it constrains must be
    /// one of `columns`, a partition key, or [`PATH_COLUMN`].
    pub fn new(columns: Vec<ScanColumn>, predicate: TupleDomain<String>, config: ScanConfig) -> Self {
        let budget = MemoryBudgetImpl::new(config.mem_cap_bytes);
        Self {
            columns,
            predicate,
            config,
            budget,
        }
    }

    /// Share a budget with other pipelines.
    pub fn with_budget(mut self, budget: MemoryBudgetImpl) -> Self {
        self.budget = budget;
        self
    }

    pub fn columns(&self) -> &[ScanColumn] {
        &self.columns
    }

    pub fn predicate(&self) -> &TupleDomain<String> {
        &self.predicate
    }

    pub fn budget(&self) -> &MemoryBudgetImpl {
        &self.budget
    }

    /// Start scanning `split`. Pruned splits yield no pages and never open the
    /// decoder.
    pub fn scan<'a>(&'a self, split: &ScanSplit, decoder: &'a mut dyn SplitDecoder) -> Result<SplitScan<'a>> {
        let mut stats = ScanStats::default();

        if !self.partition_admitted(split) {
            #[cfg(feature = "tracing")]
            tracing::debug!(path = %split.path, start = split.start, "split pruned by partition predicate");
            stats.splits_pruned_by_partition = 1;
            return Ok(SplitScan::exhausted(self, decoder, stats));
        }
        if let Some(statistics) = decoder.statistics(split)? {
            if !matches_statistics(&self.predicate, &statistics) {
                #[cfg(feature = "tracing")]
                tracing::debug!(path = %split.path, start = split.start, "split pruned by statistics");
                stats.splits_pruned_by_statistics = 1;
                return Ok(SplitScan::exhausted(self, decoder, stats));
            }
        }

        let mut sources = Vec::with_capacity(self.columns.len());
        let mut decoded = Vec::new();
        for column in &self.columns {
            match constant_value(split, &column.name) {
                Some(value) => {
                    let mut builder = BlockBuilder::new(column.column_type, 1);
                    builder.append_value(value.as_ref())?;
                    sources.push(ColumnSource::Constant(builder.build()));
                }
                None => {
                    sources.push(ColumnSource::Decoded(decoded.len()));
                    decoded.push(column.clone());
                }
            }
        }

        let filter = self.row_filter(split)?;
        decoder.open(split, &decoded)?;
        stats.splits_scanned = 1;
        let capacity = self
            .config
            .expected_block_entries
            .min(self.config.target_page_rows.max(1));
        let builders = decoded
            .iter()
            .map(|c| BlockBuilder::new(c.column_type, capacity))
            .collect();

        Ok(SplitScan {
            pipeline: self,
            decoder,
            sources,
            builders,
            filter: Some(filter),
            stats,
            done: false,
        })
    }

    fn partition_admitted(&self, split: &ScanSplit) -> bool {
        let path = Value::Varchar(split.path.clone());
        self.predicate.is_satisfied_by(|name| {
            if name == PATH_COLUMN {
                return Observed::Value(Some(&path));
            }
            match split.partition.key(name) {
                Some(key) => Observed::Value(key.value.as_ref()),
                None => Observed::Missing,
            }
        })
    }

    /// Row filter over page channels for the columns the decoder produces.
    /// Constant columns were settled by `partition_admitted`.
    fn row_filter(&self, split: &ScanSplit) -> Result<RowFilter> {
        let decoded_only = self
            .predicate
            .filter_columns(|name| constant_value(split, name).is_none());
        let by_channel = decoded_only.transform(|name| {
            self.columns
                .iter()
                .position(|c| c.name == *name)
                .map(|channel| ColumnId::new(channel as u64))
        })?;
        let types: Vec<ColumnType> = self.columns.iter().map(|c| c.column_type).collect();
        Ok(RowFilter::new(by_channel, &types)?)
    }
}

/// Value of a column that is constant over the whole split, if it is one.
fn constant_value(split: &ScanSplit, name: &str) -> Option<Option<Value>> {
    if name == PATH_COLUMN {
        return Some(Some(Value::Varchar(split.path.clone())));
    }
    split.partition.key(name).map(|key| key.value.clone())
}

/// Pages of one split, pulled with [`SplitScan::next_page`] or by iterating.
pub struct SplitScan<'a> {
    pipeline: &'a ScanPipeline,
    decoder: &'a mut dyn SplitDecoder,
    sources: Vec<ColumnSource>,
    builders: Vec<BlockBuilder>,
    filter: Option<RowFilter>,
    stats: ScanStats,
    done: bool,
}

impl<'a> SplitScan<'a> {
    fn exhausted(pipeline: &'a ScanPipeline, decoder: &'a mut dyn SplitDecoder, stats: ScanStats) -> Self {
        Self {
            pipeline,
            decoder,
            sources: Vec::new(),
            builders: Vec::new(),
            filter: None,
            stats,
            done: true,
        }
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Next non-empty page, or `None` once the split is exhausted. After an
    /// error the scan is over.
    pub fn next_page(&mut self) -> Result<Option<ScannedPage>> {
        if self.done {
            return Ok(None);
        }
        let next = self.pull();
        if !matches!(next, Ok(Some(_))) {
            self.done = true;
            #[cfg(feature = "tracing")]
            tracing::debug!(
                rows_decoded = self.stats.rows_decoded,
                rows_emitted = self.stats.rows_emitted,
                pages = self.stats.pages_emitted,
                failed = next.is_err(),
                "split scan finished"
            );
        }
        next
    }

    fn pull(&mut self) -> Result<Option<ScannedPage>> {
        let Some(filter) = &self.filter else {
            return Ok(None);
        };
        let target = self.pipeline.config.target_page_rows.max(1);
        loop {
            for builder in &mut self.builders {
                builder.reset();
            }
            let rows = self.decoder.decode_rows(&mut self.builders, target)?;
            if rows == 0 {
                return Ok(None);
            }
            if rows > target {
                return Err(ScanError::Decode(format!(
                    "decoder returned {} rows for a batch of at most {}",
                    rows, target
                )));
            }

            let mut blocks = Vec::with_capacity(self.sources.len());
            for source in &self.sources {
                blocks.push(match source {
                    ColumnSource::Decoded(index) => self.builders[*index].build(),
                    ColumnSource::Constant(value) => {
                        Block::RunLength(RunLengthBlock::new(value.clone(), rows)?)
                    }
                });
            }
            let page = Page::new(rows, blocks)?;
            self.stats.rows_decoded += rows as u64;

            let page = filter.filter_page(&page)?;
            if page.position_count() == 0 {
                #[cfg(feature = "tracing")]
                tracing::trace!(rows, "page filtered out");
                self.stats.pages_filtered_out += 1;
                continue;
            }

            let bytes = page.retained_size_in_bytes();
            let guard = self.pipeline.budget.reserve(bytes as usize, PAGE_TAG)?;
            self.stats.pages_emitted += 1;
            self.stats.rows_emitted += page.position_count() as u64;
            self.stats.bytes_emitted += bytes;
            return Ok(Some(ScannedPage { page, _guard: guard }));
        }
    }
}

impl Iterator for SplitScan<'_> {
    type Item = Result<ScannedPage>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_page().transpose()
    }
}
