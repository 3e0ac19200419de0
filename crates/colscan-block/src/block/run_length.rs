//! One value repeated for every position. Used for constant columns such as
//! partition keys.

use std::mem::size_of;
use std::sync::Arc;

use super::{check_position, check_region, selected_positions, Block};
use crate::error::{BlockError, Result};

#[derive(Debug, Clone)]
pub struct RunLengthBlock {
    value: Arc<Block>,
    position_count: usize,
}

impl RunLengthBlock {
    const INSTANCE_SIZE: usize = size_of::<Self>();

    /// `value` must hold exactly one position.
    pub fn new(value: Block, position_count: usize) -> Result<Self> {
        if value.position_count() != 1 {
            return Err(BlockError::InvalidArguments(format!(
                "run-length value must have one position, got {}",
                value.position_count()
            )));
        }
        Ok(Self {
            value: Arc::new(value),
            position_count,
        })
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    /// The single-position block every position resolves to.
    pub fn value(&self) -> &Block {
        &self.value
    }

    pub fn check(&self, position: usize) -> Result<()> {
        check_position(position, self.position_count)
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.value.size_in_bytes()
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> Result<u64> {
        check_region(offset, length, self.position_count)?;
        Ok(self.value.size_in_bytes())
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> Result<u64> {
        let used = selected_positions(selected, self.position_count)?;
        Ok(if used == 0 { 0 } else { self.value.size_in_bytes() })
    }

    pub fn retained_size_in_bytes(&self) -> u64 {
        Self::INSTANCE_SIZE as u64 + self.value.retained_size_in_bytes()
    }

    fn with_count(&self, position_count: usize) -> Self {
        Self {
            value: Arc::clone(&self.value),
            position_count,
        }
    }

    pub fn get_region(&self, offset: usize, length: usize) -> Result<Self> {
        check_region(offset, length, self.position_count)?;
        Ok(self.with_count(length))
    }

    /// There is no per-position storage to compact, so any region shares the value.
    pub fn copy_region(&self, offset: usize, length: usize) -> Result<Self> {
        check_region(offset, length, self.position_count)?;
        if length == self.position_count {
            return Ok(self.clone());
        }
        Ok(self.with_count(length))
    }

    pub fn copy_positions(&self, positions: &[usize], offset: usize, length: usize) -> Result<Self> {
        super::check_positions(positions, offset, length, self.position_count)?;
        Ok(self.with_count(length))
    }

    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    pub fn same_view(&self, other: &Self) -> bool {
        self.shares_storage(other) && self.position_count == other.position_count
    }
}
