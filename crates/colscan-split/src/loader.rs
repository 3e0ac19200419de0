//! Background enumeration of partitions and files into a [`SplitSource`].
//!
//! The loader runs on a tokio task so listing overlaps with consumption. Up to
//! `concurrency` partitions are listed at once; each listed file goes through
//! the [`SplitFactory`] and, unless pruned, into the source, waiting there when
//! the queue is full.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use tokio::task::JoinHandle;

use colscan_core::config::ScanConfig;
use colscan_predicate::{Domain, Observed, TupleDomain};

use crate::descriptor::{FileEntry, PartitionInfo};
use crate::error::{Result, SplitError};
use crate::factory::{BlockLocation, SplitFactory};
use crate::source::{SourceState, SplitSource};

/// Pseudo-column holding a file's path; predicates on it prune files.
pub const PATH_COLUMN: &str = "$path";

/// A file and the storage blocks it is made of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub file: FileEntry,
    pub locations: Vec<BlockLocation>,
}

impl ListedFile {
    pub fn new(file: FileEntry, locations: Vec<BlockLocation>) -> Self {
        Self { file, locations }
    }
}

/// Source of partitions and their files, backed by a metastore and a
/// filesystem outside this crate. Streams are dropped as soon as the loader
/// stops, which must release any listing handle they hold.
pub trait PartitionLister: Send + Sync + 'static {
    fn partitions(&self) -> BoxStream<'static, Result<Arc<PartitionInfo>>>;

    fn files(&self, partition: &Arc<PartitionInfo>) -> BoxStream<'static, Result<ListedFile>>;
}

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Keyed by column name. Partition keys and [`PATH_COLUMN`] are used for
    /// pruning; other columns are ignored here.
    pub predicate: TupleDomain<String>,
    pub force_local_scheduling: bool,
    /// Partitions listed concurrently.
    pub concurrency: usize,
}

impl LoaderOptions {
    /// Unconstrained options taking `concurrency` from `loader_concurrency`.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            predicate: TupleDomain::all(),
            force_local_scheduling: false,
            concurrency: config.loader_concurrency.max(1),
        }
    }

    pub fn with_predicate(mut self, predicate: TupleDomain<String>) -> Self {
        self.predicate = predicate;
        self
    }
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

pub struct SplitLoader {
    source: Arc<SplitSource>,
    task: Option<JoinHandle<()>>,
}

impl SplitLoader {
    /// Spawn the loader on the current tokio runtime.
    pub fn start(
        source: Arc<SplitSource>,
        lister: Arc<dyn PartitionLister>,
        options: LoaderOptions,
    ) -> Self {
        let task_source = Arc::clone(&source);
        let task = tokio::spawn(async move {
            #[cfg(feature = "tracing")]
            tracing::debug!(concurrency = options.concurrency, "split loader started");
            let outcome = load(&task_source, lister.as_ref(), &options).await;
            match outcome {
                Ok(()) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("split loader finished");
                    task_source.no_more_splits();
                }
                // Someone closed the source; nothing left to report to.
                Err(SplitError::Closed) => {}
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, "split loader failed");
                    task_source.fail(e);
                }
            }
        });
        Self {
            source,
            task: Some(task),
        }
    }

    pub fn source(&self) -> &Arc<SplitSource> {
        &self.source
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loader task to finish.
    pub async fn join(mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| SplitError::Enumeration(format!("split loader task: {}", e)))?;
        }
        Ok(())
    }

    /// Abort enumeration and close the source; buffered descriptors are
    /// dropped along with the listing streams.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("split loader cancelled");
        self.source.close();
    }
}

impl Drop for SplitLoader {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort();
        if self.source.state() == SourceState::Loading {
            #[cfg(feature = "tracing")]
            tracing::debug!("split loader dropped while loading");
            self.source.close();
        }
    }
}

async fn load(source: &SplitSource, lister: &dyn PartitionLister, options: &LoaderOptions) -> Result<()> {
    if options.predicate.is_none() {
        return Ok(());
    }
    let path_domain = options.predicate.domain(&PATH_COLUMN.to_string());
    lister
        .partitions()
        .try_for_each_concurrent(options.concurrency.max(1), |partition| {
            load_partition(source, lister, options, partition, path_domain.clone())
        })
        .await
}

async fn load_partition(
    source: &SplitSource,
    lister: &dyn PartitionLister,
    options: &LoaderOptions,
    partition: Arc<PartitionInfo>,
    path_domain: Domain,
) -> Result<()> {
    if !partition_admitted(&options.predicate, &partition) {
        #[cfg(feature = "tracing")]
        tracing::debug!(partition = %partition.name, "partition pruned by predicate");
        return Ok(());
    }
    let factory = SplitFactory::new(Arc::clone(&partition), options.force_local_scheduling)
        .with_path_domain(path_domain);
    let mut files = lister.files(&partition);
    while let Some(listed) = files.next().await {
        let listed = listed?;
        if let Some(descriptor) = factory.create_for_file(&listed.file, &listed.locations)? {
            source.add_to_queue(descriptor).await?;
        }
    }
    Ok(())
}

fn partition_admitted(predicate: &TupleDomain<String>, partition: &PartitionInfo) -> bool {
    predicate.is_satisfied_by(|column| match partition.key(column) {
        Some(key) => Observed::Value(key.value.as_ref()),
        None => Observed::Missing,
    })
}
