//! Variable-width values (varchar, varbinary) packed into one byte buffer.
//!
//! Position `i` of the backing arrays spans `bytes[offsets[i]..offsets[i + 1]]`;
//! null positions have zero length.

use std::mem::size_of;
use std::sync::Arc;

use super::{check_position, check_region, gather, selected_positions, shared_eq};
use crate::error::{BlockError, Result};
use crate::size::{shared_vec_retained, NULL_FLAG_BYTES, OFFSET_BYTES};

#[derive(Debug, Clone)]
pub struct VariableWidthBlock {
    position_offset: usize,
    position_count: usize,
    nulls: Option<Arc<Vec<bool>>>,
    offsets: Arc<Vec<u32>>,
    bytes: Arc<Vec<u8>>,
    retained_size_in_bytes: u64,
}

impl VariableWidthBlock {
    const INSTANCE_SIZE: usize = size_of::<Self>();

    /// Block over every entry described by `offsets` (`offsets.len() - 1` positions).
    pub fn new(bytes: Vec<u8>, offsets: Vec<u32>, nulls: Option<Vec<bool>>) -> Result<Self> {
        let count = offsets.len().checked_sub(1).ok_or_else(|| {
            BlockError::InvalidArguments("offsets must contain at least one entry".into())
        })?;
        Self::from_shared(
            0,
            count,
            nulls.map(Arc::new),
            Arc::new(offsets),
            Arc::new(bytes),
        )
    }

    pub fn from_shared(
        position_offset: usize,
        position_count: usize,
        nulls: Option<Arc<Vec<bool>>>,
        offsets: Arc<Vec<u32>>,
        bytes: Arc<Vec<u8>>,
    ) -> Result<Self> {
        let end = position_offset
            .checked_add(position_count)
            .ok_or_else(|| BlockError::InvalidArguments("position range overflows".into()))?;
        if offsets.len() <= end {
            return Err(BlockError::InvalidArguments(format!(
                "offsets hold {} entries, need {}",
                offsets.len(),
                end + 1
            )));
        }
        if let Some(n) = &nulls {
            if n.len() < end {
                return Err(BlockError::InvalidArguments(format!(
                    "null flags have {} entries, need {}",
                    n.len(),
                    end
                )));
            }
        }
        let window = &offsets[position_offset..=end];
        if window.windows(2).any(|w| w[0] > w[1]) {
            return Err(BlockError::InvalidArguments(
                "offsets must be non-decreasing".into(),
            ));
        }
        if offsets[end] as usize > bytes.len() {
            return Err(BlockError::InvalidArguments(format!(
                "offset {} points past {} data bytes",
                offsets[end],
                bytes.len()
            )));
        }
        Ok(Self::from_parts(position_offset, position_count, nulls, offsets, bytes))
    }

    pub(crate) fn from_parts(
        position_offset: usize,
        position_count: usize,
        nulls: Option<Arc<Vec<bool>>>,
        offsets: Arc<Vec<u32>>,
        bytes: Arc<Vec<u8>>,
    ) -> Self {
        let retained_size_in_bytes = Self::INSTANCE_SIZE as u64
            + shared_vec_retained(&offsets)
            + shared_vec_retained(&bytes)
            + nulls.as_ref().map_or(0, shared_vec_retained);
        Self {
            position_offset,
            position_count,
            nulls,
            offsets,
            bytes,
            retained_size_in_bytes,
        }
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    fn span(&self, index: usize) -> (usize, usize) {
        (self.offsets[index] as usize, self.offsets[index + 1] as usize)
    }

    pub fn slice(&self, position: usize) -> Result<&[u8]> {
        check_position(position, self.position_count)?;
        let (start, end) = self.span(self.position_offset + position);
        Ok(&self.bytes[start..end])
    }

    pub fn slice_length(&self, position: usize) -> Result<usize> {
        check_position(position, self.position_count)?;
        let (start, end) = self.span(self.position_offset + position);
        Ok(end - start)
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

    fn data_len(&self, first: usize, length: usize) -> usize {
        let start = self.position_offset + first;
        (self.offsets[start + length] - self.offsets[start]) as usize
    }

    pub fn size_in_bytes(&self) -> u64 {
        (self.data_len(0, self.position_count)
            + (OFFSET_BYTES + NULL_FLAG_BYTES) * self.position_count) as u64
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> Result<u64> {
        check_region(offset, length, self.position_count)?;
        Ok((self.data_len(offset, length) + (OFFSET_BYTES + NULL_FLAG_BYTES) * length) as u64)
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> Result<u64> {
        let used = selected_positions(selected, self.position_count)?;
        let data: usize = selected
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| self.data_len(i, 1))
            .sum();
        Ok((data + (OFFSET_BYTES + NULL_FLAG_BYTES) * used) as u64)
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
            Arc::clone(&self.offsets),
            Arc::clone(&self.bytes),
        ))
    }

    fn spans_whole_storage(&self) -> bool {
        let count = self.position_count;
        self.position_offset == 0
            && self.offsets.len() == count + 1
            && self.offsets[0] == 0
            && self.offsets[count] as usize == self.bytes.len()
            && self.nulls.as_ref().map_or(true, |n| n.len() == count)
    }

    pub fn copy_region(&self, offset: usize, length: usize) -> Result<Self> {
        check_region(offset, length, self.position_count)?;
        if offset == 0 && length == self.position_count && self.spans_whole_storage() {
            return Ok(self.clone());
        }
        let start = self.position_offset + offset;
        let base = self.offsets[start];
        let offsets: Vec<u32> = self.offsets[start..=start + length]
            .iter()
            .map(|o| o - base)
            .collect();
        let bytes = self.bytes[base as usize..self.offsets[start + length] as usize].to_vec();
        let nulls = self
            .nulls
            .as_ref()
            .map(|n| Arc::new(n[start..start + length].to_vec()));
        Ok(Self::from_parts(
            0,
            length,
            nulls,
            Arc::new(offsets),
            Arc::new(bytes),
        ))
    }

    pub fn copy_positions(&self, positions: &[usize], offset: usize, length: usize) -> Result<Self> {
        let positions = super::check_positions(positions, offset, length, self.position_count)?;
        let data: usize = positions.iter().map(|p| self.data_len(*p, 1)).sum();
        let mut bytes = Vec::with_capacity(data);
        let mut offsets = Vec::with_capacity(length + 1);
        offsets.push(0u32);
        for p in positions {
            let (start, end) = self.span(self.position_offset + p);
            bytes.extend_from_slice(&self.bytes[start..end]);
            offsets.push(data_offset(bytes.len())?);
        }
        let nulls = self
            .nulls
            .as_ref()
            .map(|n| Arc::new(gather(n, self.position_offset, positions)));
        Ok(Self::from_parts(
            0,
            length,
            nulls,
            Arc::new(offsets),
            Arc::new(bytes),
        ))
    }

    pub fn single_value(&self, position: usize) -> Result<Self> {
        self.copy_positions(&[position], 0, 1)
    }

    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes) && Arc::ptr_eq(&self.offsets, &other.offsets)
    }

    pub fn same_view(&self, other: &Self) -> bool {
        self.shares_storage(other)
            && shared_eq(&self.nulls, &other.nulls)
            && self.position_offset == other.position_offset
            && self.position_count == other.position_count
    }
}

/// A data length as a stored `u32` offset.
pub(crate) fn data_offset(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        BlockError::InvalidArguments(format!(
            "variable-width block would exceed {} data bytes",
            u32::MAX
        ))
    })
}
