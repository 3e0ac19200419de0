//! 96-bit values split into a 64-bit high word and a 32-bit low word.
//!
//! Readers address the words by byte offset within the value: the high word at
//! offset 0 via `get_long`, the low word at offset 8 via `get_int`.

use std::mem::size_of;
use std::sync::Arc;

use super::{check_position, check_region, compact, gather, selected_positions, shared_eq};
use crate::error::{BlockError, Result};
use crate::size::{shared_vec_retained, NULL_FLAG_BYTES};

pub const HIGH_WORD_OFFSET: usize = 0;
pub const LOW_WORD_OFFSET: usize = 8;
const VALUE_BYTES: usize = size_of::<i64>() + size_of::<i32>();

#[derive(Debug, Clone)]
pub struct Int96ArrayBlock {
    position_offset: usize,
    position_count: usize,
    nulls: Option<Arc<Vec<bool>>>,
    high: Arc<Vec<i64>>,
    low: Arc<Vec<i32>>,
    retained_size_in_bytes: u64,
}

impl Int96ArrayBlock {
    const INSTANCE_SIZE: usize = size_of::<Self>();

    pub fn new(high: Vec<i64>, low: Vec<i32>, nulls: Option<Vec<bool>>) -> Result<Self> {
        let count = high.len();
        Self::from_shared(0, count, nulls.map(Arc::new), Arc::new(high), Arc::new(low))
    }

    pub fn from_shared(
        position_offset: usize,
        position_count: usize,
        nulls: Option<Arc<Vec<bool>>>,
        high: Arc<Vec<i64>>,
        low: Arc<Vec<i32>>,
    ) -> Result<Self> {
        let end = position_offset
            .checked_add(position_count)
            .ok_or_else(|| BlockError::InvalidArguments("position range overflows".into()))?;
        let shortest = high
            .len()
            .min(low.len())
            .min(nulls.as_ref().map_or(usize::MAX, |n| n.len()));
        if shortest < end {
            return Err(BlockError::InvalidArguments(format!(
                "int96 arrays hold {} entries, need {}",
                shortest, end
            )));
        }
        Ok(Self::from_parts(position_offset, position_count, nulls, high, low))
    }

    pub(crate) fn from_parts(
        position_offset: usize,
        position_count: usize,
        nulls: Option<Arc<Vec<bool>>>,
        high: Arc<Vec<i64>>,
        low: Arc<Vec<i32>>,
    ) -> Self {
        let retained_size_in_bytes = Self::INSTANCE_SIZE as u64
            + shared_vec_retained(&high)
            + shared_vec_retained(&low)
            + nulls.as_ref().map_or(0, shared_vec_retained);
        Self {
            position_offset,
            position_count,
            nulls,
            high,
            low,
            retained_size_in_bytes,
        }
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    /// High word; `offset` must be 0.
    pub fn get_long(&self, position: usize, offset: usize) -> Result<i64> {
        check_position(position, self.position_count)?;
        if offset != HIGH_WORD_OFFSET {
            return Err(BlockError::InvalidOffset {
                offset,
                layout: "int96",
            });
        }
        Ok(self.high[self.position_offset + position])
    }

    /// Low word; `offset` must be 8.
    pub fn get_int(&self, position: usize, offset: usize) -> Result<i32> {
        check_position(position, self.position_count)?;
        if offset != LOW_WORD_OFFSET {
            return Err(BlockError::InvalidOffset {
                offset,
                layout: "int96",
            });
        }
        Ok(self.low[self.position_offset + position])
    }

    pub fn is_null(&self, position: usize) -> Result<bool> {
        check_position(position, self.position_count)?;
        Ok(self
            .nulls
            .as_ref()
            .is_some_and(|n| n[self.position_offset + position]))
    }

    pub fn may_have_null(&self) -> bool {
        self.nulls.is_some()
    }

    pub fn high_words(&self) -> &[i64] {
        &self.high[self.position_offset..self.position_offset + self.position_count]
    }

    pub fn low_words(&self) -> &[i32] {
        &self.low[self.position_offset..self.position_offset + self.position_count]
    }

    pub fn nulls(&self) -> Option<&[bool]> {
        self.nulls
            .as_ref()
            .map(|n| &n[self.position_offset..self.position_offset + self.position_count])
    }

    pub fn size_in_bytes(&self) -> u64 {
        bytes_for(self.position_count)
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> Result<u64> {
        check_region(offset, length, self.position_count)?;
        Ok(bytes_for(length))
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> Result<u64> {
        Ok(bytes_for(selected_positions(selected, self.position_count)?))
    }

    pub fn retained_size_in_bytes(&self) -> u64 {
        self.retained_size_in_bytes
    }

    pub fn get_region(&self, offset: usize, length: usize) -> Result<Self> {
        check_region(offset, length, self.position_count)?;
        Ok(Self::from_parts(
            self.position_offset + offset,
            length,
            self.nulls.clone(),
            Arc::clone(&self.high),
            Arc::clone(&self.low),
        ))
    }

    pub fn copy_region(&self, offset: usize, length: usize) -> Result<Self> {
        check_region(offset, length, self.position_count)?;
        let start = self.position_offset + offset;
        let high = compact(&self.high, start, length);
        let low = compact(&self.low, start, length);
        let nulls = self.nulls.as_ref().map(|n| compact(n, start, length));
        if Arc::ptr_eq(&high, &self.high)
            && Arc::ptr_eq(&low, &self.low)
            && shared_eq(&nulls, &self.nulls)
        {
            return Ok(self.clone());
        }
        Ok(Self::from_parts(0, length, nulls, high, low))
    }

    pub fn copy_positions(&self, positions: &[usize], offset: usize, length: usize) -> Result<Self> {
        let positions = super::check_positions(positions, offset, length, self.position_count)?;
        let base = self.position_offset;
        let nulls = self
            .nulls
            .as_ref()
            .map(|n| Arc::new(gather(n, base, positions)));
        Ok(Self::from_parts(
            0,
            length,
            nulls,
            Arc::new(gather(&self.high, base, positions)),
            Arc::new(gather(&self.low, base, positions)),
        ))
    }

    pub fn single_value(&self, position: usize) -> Result<Self> {
        check_position(position, self.position_count)?;
        let index = self.position_offset + position;
        let nulls = self.nulls.as_ref().map(|n| Arc::new(vec![n[index]]));
        Ok(Self::from_parts(
            0,
            1,
            nulls,
            Arc::new(vec![self.high[index]]),
            Arc::new(vec![self.low[index]]),
        ))
    }

    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.high, &other.high) && Arc::ptr_eq(&self.low, &other.low)
    }

    pub fn same_view(&self, other: &Self) -> bool {
        self.shares_storage(other)
            && shared_eq(&self.nulls, &other.nulls)
            && self.position_offset == other.position_offset
            && self.position_count == other.position_count
    }
}

fn bytes_for(positions: usize) -> u64 {
    ((VALUE_BYTES + NULL_FLAG_BYTES) * positions) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Int96ArrayBlock {
        Int96ArrayBlock::new(vec![1, 2, 3], vec![-1, 0, 7], None).unwrap()
    }

    #[test]
    fn test_word_offsets() {
        let b = block();
        assert_eq!(b.get_long(0, 0).unwrap(), 1);
        assert_eq!(b.get_int(0, 8).unwrap(), -1);
        assert_eq!(
            b.get_long(0, 8),
            Err(BlockError::InvalidOffset {
                offset: 8,
                layout: "int96"
            })
        );
        assert!(matches!(
            b.get_int(1, 4),
            Err(BlockError::InvalidOffset { offset: 4, .. })
        ));
    }

    #[test]
    fn test_position_checked_before_offset() {
        assert!(matches!(
            block().get_long(3, 8),
            Err(BlockError::IndexOutOfRange { position: 3, .. })
        ));
    }

    #[test]
    fn test_size_in_bytes_is_thirteen_per_position() {
        assert_eq!(block().size_in_bytes(), 39);
    }

    #[test]
    fn test_copy_positions_keeps_word_pairs_together() {
        let copy = block().copy_positions(&[2, 0, 2], 0, 3).unwrap();
        assert_eq!(copy.high_words(), &[3, 1, 3]);
        assert_eq!(copy.low_words(), &[7, -1, 7]);
    }

    #[test]
    fn test_mismatched_word_arrays_are_rejected() {
        assert!(Int96ArrayBlock::new(vec![1, 2], vec![1], None).is_err());
    }
}
