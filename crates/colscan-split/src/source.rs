//! Buffered, async queue of split descriptors that scan splits are carved from.
//!
//! Producers (the [`SplitLoader`](crate::loader::SplitLoader)) push
//! descriptors with [`SplitSource::add_to_queue`]; consumers pull batches of
//! [`ScanSplit`]s with [`SplitSource::next_batch`]. Both sides run
//! concurrently. Every buffered descriptor holds a memory guard for its
//! estimated size; exceeding `max_outstanding_splits_bytes` fails the source.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use colscan_core::config::ScanConfig;
use colscan_core::id::SplitId;
use colscan_mem::{BudgetGuardImpl, MemoryBudgetImpl};

use crate::descriptor::SplitDescriptor;
use crate::error::{Result, SplitError};
use crate::scan_split::ScanSplit;

const BUFFER_TAG: &str = "split-buffer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceState {
    /// Descriptors may still arrive.
    Loading,
    /// The producer is done; the queue drains.
    NoMoreSplits,
    Failed(SplitError),
    Closed,
}

impl SourceState {
    fn name(&self) -> &'static str {
        match self {
            SourceState::Loading => "loading",
            SourceState::NoMoreSplits => "no-more-splits",
            SourceState::Failed(_) => "failed",
            SourceState::Closed => "closed",
        }
    }
}

struct Queued {
    descriptor: SplitDescriptor,
    _guard: BudgetGuardImpl,
}

struct Inner {
    state: SourceState,
    queue: VecDeque<Queued>,
    carved: usize,
    next_id: u64,
}

pub struct SplitSource {
    inner: Mutex<Inner>,
    // Wakes consumers waiting for descriptors and producers waiting for room.
    changed: Notify,
    budget: MemoryBudgetImpl,
    max_split_size: u64,
    max_initial_split_size: u64,
    max_initial_splits: usize,
    max_queued_descriptors: usize,
    batch_size: usize,
}

impl std::fmt::Debug for SplitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitSource")
            .field("buffered_bytes", &self.buffered_bytes())
            .field("budget", &self.budget)
            .finish()
    }
}

impl SplitSource {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SourceState::Loading,
                queue: VecDeque::new(),
                carved: 0,
                next_id: 0,
            }),
            changed: Notify::new(),
            budget: MemoryBudgetImpl::new(config.max_outstanding_splits_bytes),
            max_split_size: config.max_split_size.max(1),
            max_initial_split_size: config.max_initial_split_size.max(1),
            max_initial_splits: config.max_initial_splits,
            max_queued_descriptors: config.max_queued_descriptors.max(1),
            batch_size: config.split_batch_size.max(1),
        }
    }

    // A panic while holding the lock cannot leave `Inner` half-updated in a
    // way later calls would misread, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SourceState {
        self.lock().state.clone()
    }

    /// Estimated bytes of the descriptors currently buffered.
    pub fn buffered_bytes(&self) -> usize {
        use colscan_core::budget::MemoryBudget;
        self.budget.used_bytes()
    }

    pub fn queued_descriptors(&self) -> usize {
        self.lock().queue.len()
    }

    /// Buffer one descriptor, waiting while the queue holds
    /// `max_queued_descriptors`.
    pub async fn add_to_queue(&self, descriptor: SplitDescriptor) -> Result<()> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut inner = self.lock();
                match &inner.state {
                    SourceState::Loading => {}
                    SourceState::Failed(e) => return Err(e.clone()),
                    SourceState::Closed => return Err(SplitError::Closed),
                    SourceState::NoMoreSplits => {
                        return Err(SplitError::InvalidState {
                            state: inner.state.name(),
                            operation: "add_to_queue",
                        })
                    }
                }
                if inner.queue.len() < self.max_queued_descriptors {
                    let bytes = descriptor.estimated_size_in_bytes();
                    let guard = match self.budget.reserve(bytes, BUFFER_TAG) {
                        Ok(guard) => guard,
                        Err(colscan_mem::Error::BudgetExceeded { requested, capacity, used, .. }) => {
                            let err = SplitError::BufferLimitExceeded {
                                requested,
                                used,
                                limit: capacity,
                            };
                            #[cfg(feature = "tracing")]
                            tracing::warn!(error = %err, path = descriptor.path(), "split buffering limit exceeded");
                            self.fail_locked(&mut inner, err.clone());
                            return Err(err);
                        }
                    };
                    inner.queue.push_back(Queued {
                        descriptor,
                        _guard: guard,
                    });
                    drop(inner);
                    self.changed.notify_waiters();
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    /// Configured `split_batch_size`, at least one.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// [`SplitSource::next_batch`] with the configured batch size.
    pub async fn next_default_batch(&self) -> Result<Vec<ScanSplit>> {
        self.next_batch(self.batch_size).await
    }

    /// Next batch of at most `max_size` splits. Waits while the queue is empty
    /// and more descriptors may arrive; an empty batch means the source is
    /// finished.
    pub async fn next_batch(&self, max_size: usize) -> Result<Vec<ScanSplit>> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut inner = self.lock();
                match &inner.state {
                    SourceState::Failed(e) => return Err(e.clone()),
                    SourceState::Closed => return Err(SplitError::Closed),
                    SourceState::Loading | SourceState::NoMoreSplits => {}
                }
                if !inner.queue.is_empty() || max_size == 0 {
                    let batch = self.carve(&mut inner, max_size);
                    drop(inner);
                    self.changed.notify_waiters();
                    return batch;
                }
                if inner.state == SourceState::NoMoreSplits {
                    return Ok(Vec::new());
                }
            }
            notified.await;
        }
    }

    fn carve(&self, inner: &mut Inner, max_size: usize) -> Result<Vec<ScanSplit>> {
        let mut batch = Vec::with_capacity(max_size.min(inner.queue.len() * 2));
        while batch.len() < max_size {
            let target = if inner.carved < self.max_initial_splits {
                self.max_initial_split_size
            } else {
                self.max_split_size
            };
            let Some(front) = inner.queue.front_mut() else {
                break;
            };
            let descriptor = &mut front.descriptor;
            let carved = carve_one(descriptor, target, SplitId::new(inner.next_id));
            let split = match carved {
                Ok(split) => split,
                Err(e) => {
                    self.fail_locked(inner, e.clone());
                    return Err(e);
                }
            };
            let done = descriptor.is_done();
            inner.next_id += 1;
            inner.carved += 1;
            batch.push(split);
            if done {
                // Dropping the entry releases its buffer bytes.
                inner.queue.pop_front();
            }
        }
        Ok(batch)
    }

    /// Stop accepting descriptors; consumers drain what is buffered.
    pub fn no_more_splits(&self) {
        let mut inner = self.lock();
        if inner.state == SourceState::Loading {
            inner.state = SourceState::NoMoreSplits;
            #[cfg(feature = "tracing")]
            tracing::debug!(queued = inner.queue.len(), "split source: no more splits");
            drop(inner);
            self.changed.notify_waiters();
        }
    }

    /// Fail the source: pending and future calls return `error`. Ignored once
    /// the source is closed, failed, or fully drained.
    pub fn fail(&self, error: SplitError) {
        let mut inner = self.lock();
        self.fail_locked(&mut inner, error);
    }

    fn fail_locked(&self, inner: &mut Inner, error: SplitError) {
        let drained = inner.state == SourceState::NoMoreSplits && inner.queue.is_empty();
        if matches!(inner.state, SourceState::Failed(_) | SourceState::Closed) || drained {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(error = %error, from = inner.state.name(), "split source failed");
        inner.state = SourceState::Failed(error);
        inner.queue.clear();
        self.changed.notify_waiters();
    }

    /// Drop everything buffered and wake all waiters.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.state != SourceState::Closed {
            #[cfg(feature = "tracing")]
            tracing::debug!(from = inner.state.name(), "split source closed");
            inner.state = SourceState::Closed;
            inner.queue.clear();
            drop(inner);
            self.changed.notify_waiters();
        }
    }

    pub fn is_finished(&self) -> bool {
        let inner = self.lock();
        match inner.state {
            SourceState::Closed => true,
            SourceState::NoMoreSplits => inner.queue.is_empty(),
            SourceState::Loading | SourceState::Failed(_) => false,
        }
    }
}

/// Carve the next split off the front of `descriptor`.
fn carve_one(descriptor: &mut SplitDescriptor, target: u64, id: SplitId) -> Result<ScanSplit> {
    let range = descriptor.current_range()?;
    let addresses = range.addresses.clone();
    let start = descriptor.start();
    let length = if descriptor.is_splittable() {
        let remaining = range.end - start;
        if remaining <= target {
            remaining
        } else if remaining <= target.saturating_mul(2) {
            // Second to last split of this range: make the last two even.
            remaining / 2
        } else {
            target
        }
    } else {
        descriptor.end() - start
    };
    descriptor.increase_start(length)?;
    Ok(ScanSplit {
        id,
        path: descriptor.path().to_string(),
        start,
        length,
        file_size: descriptor.file_size(),
        modification_time: descriptor.modification_time(),
        partition: Arc::clone(descriptor.partition()),
        addresses,
        force_local_scheduling: descriptor.force_local_scheduling(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ByteRange;
    use crate::descriptor::{FileEntry, PartitionInfo};

    fn config() -> ScanConfig {
        ScanConfig {
            max_split_size: 100,
            max_initial_split_size: 40,
            max_initial_splits: 2,
            ..ScanConfig::default()
        }
    }

    fn descriptor(size: u64, splittable: bool) -> SplitDescriptor {
        let file = FileEntry::new("/t/f", size, 0, splittable);
        SplitDescriptor::new(
            &file,
            0,
            size,
            Arc::new(PartitionInfo::default()),
            vec![ByteRange::new(0, size, Vec::new())],
            false,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_initial_splits_then_even_tail() {
        let source = SplitSource::new(&config());
        source.add_to_queue(descriptor(330, true)).await.unwrap();
        source.no_more_splits();
        let batch = source.next_batch(100).await.unwrap();
        let lengths: Vec<u64> = batch.iter().map(|s| s.length).collect();
        // two initial 40-byte splits, one full 100, then 150 left halves to 75 + 75
        assert_eq!(lengths, vec![40, 40, 100, 75, 75]);
        assert_eq!(batch.iter().map(|s| s.length).sum::<u64>(), 330);
        assert!(source.is_finished());
        assert_eq!(source.buffered_bytes(), 0);
    }

    #[tokio::test]
    async fn test_non_splittable_is_one_split() {
        let source = SplitSource::new(&config());
        source.add_to_queue(descriptor(1000, false)).await.unwrap();
        let batch = source.next_batch(10).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].length, 1000);
    }

    #[tokio::test]
    async fn test_buffer_limit_fails_source() {
        let cfg = ScanConfig {
            max_outstanding_splits_bytes: 1,
            ..config()
        };
        let source = SplitSource::new(&cfg);
        let err = source.add_to_queue(descriptor(10, true)).await.unwrap_err();
        assert!(matches!(err, SplitError::BufferLimitExceeded { .. }));
        assert!(matches!(source.state(), SourceState::Failed(_)));
        assert_eq!(source.next_batch(1).await.unwrap_err(), err);
    }

    #[tokio::test]
    async fn test_batch_size_limits_and_ids_increase() {
        let source = SplitSource::new(&config());
        source.add_to_queue(descriptor(1000, true)).await.unwrap();
        let first = source.next_batch(2).await.unwrap();
        let second = source.next_batch(2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert!(first[1].id < second[0].id);
        assert_eq!(second[0].start, first[1].end());
    }

    #[tokio::test]
    async fn test_default_batch_uses_configured_size() {
        let cfg = ScanConfig {
            split_batch_size: 3,
            ..config()
        };
        let source = SplitSource::new(&cfg);
        assert_eq!(source.batch_size(), 3);
        source.add_to_queue(descriptor(1000, true)).await.unwrap();
        source.no_more_splits();
        assert_eq!(source.next_default_batch().await.unwrap().len(), 3);

        let zero = SplitSource::new(&ScanConfig {
            split_batch_size: 0,
            ..config()
        });
        assert_eq!(zero.batch_size(), 1);
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_consumer() {
        let source = Arc::new(SplitSource::new(&config()));
        let waiter = {
            let source = Arc::clone(&source);
            tokio::spawn(async move { source.next_batch(1).await })
        };
        tokio::task::yield_now().await;
        source.close();
        assert_eq!(waiter.await.unwrap().unwrap_err(), SplitError::Closed);
        assert!(source.is_finished());
    }
}
