//! Abstract memory budget interfaces.
//!
//! The concrete implementation lives in `colscan-mem`. Only the traits live here
//! so the split and exec crates can account buffered splits and resident pages
//! without depending on the guard implementation.

/// Bytes held against a budget. Releases them on Drop.
///
/// The concrete type lives in `colscan-mem`. It must be RAII, `Send`, and
/// panic-safe.
pub trait BudgetGuard: Send {
    /// Number of bytes currently accounted for by this guard.
    fn bytes(&self) -> usize;

    /// Optional debug tag for tracing.
    fn tag(&self) -> &'static str {
        "guard"
    }

    /// Grow or shrink the accounted bytes. Shrinking always succeeds; growing
    /// fails (returns false) when the budget has no room left.
    fn try_resize(&mut self, new_bytes: usize) -> bool;
}

/// A hard cap on bytes that may be held at once.
///
/// Split sources acquire `estimated_size_in_bytes` per buffered descriptor and
/// scan pipelines acquire `retained_size_in_bytes` per emitted page. When
/// `try_acquire` returns `None` the caller must fail or back off; it must never
/// allocate anyway.
pub trait MemoryBudget: Send + Sync + 'static {
    type Guard: BudgetGuard;

    /// Attempt to acquire `bytes` from the live budget.
    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity (bytes).
    fn capacity_bytes(&self) -> usize;

    /// Currently held bytes (advisory).
    fn used_bytes(&self) -> usize;
}
