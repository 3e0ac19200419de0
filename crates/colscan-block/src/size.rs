//! Retained-size accounting constants.
//!
//! Shared backing arrays are `Arc<Vec<T>>`: one heap allocation for the Arc
//! (two counters + the Vec header) and one for the elements. These are the
//! exact byte counts the allocator is asked for, computed without allocating.

use std::mem::size_of;
use std::sync::Arc;

/// Strong + weak counters in front of every `Arc` allocation.
pub const ARC_COUNTERS_BYTES: usize = 2 * size_of::<usize>();

/// Bytes of the `Arc<Vec<T>>` allocation itself (counters + Vec header).
pub const SHARED_VEC_OVERHEAD_BYTES: usize = ARC_COUNTERS_BYTES + size_of::<Vec<u8>>();

/// Heap bytes retained by a shared backing array, counting its full capacity.
pub fn shared_vec_retained<T>(v: &Arc<Vec<T>>) -> u64 {
    (SHARED_VEC_OVERHEAD_BYTES + v.capacity() * size_of::<T>()) as u64
}

/// Bytes of one null flag in `size_in_bytes`.
pub const NULL_FLAG_BYTES: usize = size_of::<bool>();

/// Bytes of one variable-width offset entry.
pub const OFFSET_BYTES: usize = size_of::<u32>();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retained_counts_capacity() {
        let mut v = Vec::<i64>::with_capacity(16);
        v.push(1);
        let shared = Arc::new(v);
        assert_eq!(
            shared_vec_retained(&shared),
            (SHARED_VEC_OVERHEAD_BYTES + 16 * 8) as u64
        );
    }
}
