//! MemoryBudget + RAII guard implementations.
//!
//! A guard holds bytes against a shared cap; dropping it returns them. Split
//! sources hold one guard per buffered descriptor and scan pipelines one per
//! resident page.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use colscan_core::budget::{BudgetGuard, MemoryBudget};

use crate::error::{Error, Result};
use crate::tracking::PeakTracker;

struct BudgetState {
    capacity: usize,
    used: AtomicUsize,
    peak: PeakTracker,
}

impl BudgetState {
    fn reserve(&self, bytes: usize) -> bool {
        let reserved = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                cur.checked_add(bytes).filter(|next| *next <= self.capacity)
            });
        match reserved {
            Ok(prev) => {
                self.peak.record_used(prev + bytes);
                true
            }
            Err(_) => false,
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Concrete MemoryBudget. Cloning shares the same cap.
#[derive(Clone)]
pub struct MemoryBudgetImpl {
    state: Arc<BudgetState>,
}

impl std::fmt::Debug for MemoryBudgetImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBudgetImpl")
            .field("capacity", &self.state.capacity)
            .field("used", &self.used_bytes())
            .finish()
    }
}

impl MemoryBudgetImpl {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            state: Arc::new(BudgetState {
                capacity: capacity_bytes,
                used: AtomicUsize::new(0),
                peak: PeakTracker::new(),
            }),
        }
    }

    /// Like `try_acquire`, but reports the shortfall as an error.
    pub fn reserve(&self, bytes: usize, tag: &'static str) -> Result<BudgetGuardImpl> {
        self.try_acquire(bytes, tag)
            .ok_or_else(|| Error::BudgetExceeded {
                tag,
                requested: bytes,
                capacity: self.state.capacity,
                used: self.used_bytes(),
            })
    }

    pub fn available_bytes(&self) -> usize {
        self.state.capacity.saturating_sub(self.used_bytes())
    }

    /// Highest `used_bytes` observed since creation.
    pub fn peak_bytes(&self) -> usize {
        self.state.peak.peak()
    }
}

impl MemoryBudget for MemoryBudgetImpl {
    type Guard = BudgetGuardImpl;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard> {
        if bytes > 0 && !self.state.reserve(bytes) {
            return None;
        }
        Some(BudgetGuardImpl {
            state: Arc::clone(&self.state),
            bytes,
            tag,
        })
    }

    fn capacity_bytes(&self) -> usize {
        self.state.capacity
    }

    fn used_bytes(&self) -> usize {
        self.state.used.load(Ordering::Acquire)
    }
}

/// RAII guard that accounts for a number of bytes.
pub struct BudgetGuardImpl {
    state: Arc<BudgetState>,
    bytes: usize,
    tag: &'static str,
}

impl std::fmt::Debug for BudgetGuardImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetGuardImpl")
            .field("bytes", &self.bytes)
            .field("tag", &self.tag)
            .finish()
    }
}

impl Drop for BudgetGuardImpl {
    fn drop(&mut self) {
        if self.bytes > 0 {
            // No logging here: drop runs on the hot path.
            self.state.release(self.bytes);
            self.bytes = 0;
        }
    }
}

impl BudgetGuard for BudgetGuardImpl {
    fn bytes(&self) -> usize {
        self.bytes
    }

    fn tag(&self) -> &'static str {
        self.tag
    }

    fn try_resize(&mut self, new_bytes: usize) -> bool {
        if new_bytes <= self.bytes {
            self.state.release(self.bytes - new_bytes);
            self.bytes = new_bytes;
            return true;
        }
        if self.state.reserve(new_bytes - self.bytes) {
            self.bytes = new_bytes;
            true
        } else {
            false
        }
    }
}
