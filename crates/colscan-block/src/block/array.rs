//! Fixed-width blocks backed by one primitive array.

use std::fmt;
use std::mem::size_of;
use std::sync::Arc;

use super::{check_position, check_region, compact, gather, selected_positions, shared_eq};
use crate::error::{BlockError, Result};
use crate::size::{shared_vec_retained, NULL_FLAG_BYTES};

/// Primitive element types an [`ArrayBlock`] can hold.
pub trait FixedWidth: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const LAYOUT: &'static str;
    const WIDTH: usize = size_of::<Self>();
}

impl FixedWidth for i8 {
    const LAYOUT: &'static str = "byte";
}

impl FixedWidth for i16 {
    const LAYOUT: &'static str = "short";
}

impl FixedWidth for i32 {
    const LAYOUT: &'static str = "int";
}

impl FixedWidth for i64 {
    const LAYOUT: &'static str = "long";
}

/// Values for positions `[position_offset, position_offset + position_count)`
/// of a shared primitive array, with optional null flags over the same range.
#[derive(Debug, Clone)]
pub struct ArrayBlock<T> {
    position_offset: usize,
    position_count: usize,
    nulls: Option<Arc<Vec<bool>>>,
    values: Arc<Vec<T>>,
    retained_size_in_bytes: u64,
}

impl<T: FixedWidth> ArrayBlock<T> {
    const INSTANCE_SIZE: usize = size_of::<Self>();

    /// Block over all of `values`. `nulls`, when given, must be the same length.
    pub fn new(values: Vec<T>, nulls: Option<Vec<bool>>) -> Result<Self> {
        let count = values.len();
        Self::from_shared(0, count, nulls.map(Arc::new), Arc::new(values))
    }

    /// View over already shared arrays; validates the array bounds.
    pub fn from_shared(
        position_offset: usize,
        position_count: usize,
        nulls: Option<Arc<Vec<bool>>>,
        values: Arc<Vec<T>>,
    ) -> Result<Self> {
        let end = position_offset
            .checked_add(position_count)
            .ok_or_else(|| BlockError::InvalidArguments("position range overflows".into()))?;
        if values.len() < end {
            return Err(BlockError::InvalidArguments(format!(
                "{} values array has {} entries, need {}",
                T::LAYOUT,
                values.len(),
                end
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
        Ok(Self::from_parts(position_offset, position_count, nulls, values))
    }

    pub(crate) fn from_parts(
        position_offset: usize,
        position_count: usize,
        nulls: Option<Arc<Vec<bool>>>,
        values: Arc<Vec<T>>,
    ) -> Self {
        let retained_size_in_bytes = Self::INSTANCE_SIZE as u64
            + shared_vec_retained(&values)
            + nulls.as_ref().map_or(0, shared_vec_retained);
        Self {
            position_offset,
            position_count,
            nulls,
            values,
            retained_size_in_bytes,
        }
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    pub fn value(&self, position: usize) -> Result<T> {
        check_position(position, self.position_count)?;
        Ok(self.values[self.position_offset + position])
    }

    pub fn is_null(&self, position: usize) -> Result<bool> {
        check_position(position, self.position_count)?;
        Ok(match &self.nulls {
            None => false,
            Some(nulls) => nulls[self.position_offset + position],
        })
    }

    pub fn may_have_null(&self) -> bool {
        self.nulls.is_some()
    }

    /// Logical values of this view.
    pub fn values(&self) -> &[T] {
        &self.values[self.position_offset..self.position_offset + self.position_count]
    }

    /// Logical null flags of this view, `None` when the block has no nulls.
    pub fn nulls(&self) -> Option<&[bool]> {
        self.nulls
            .as_ref()
            .map(|n| &n[self.position_offset..self.position_offset + self.position_count])
    }

    pub fn size_in_bytes(&self) -> u64 {
        Self::bytes_for(self.position_count)
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> Result<u64> {
        check_region(offset, length, self.position_count)?;
        Ok(Self::bytes_for(length))
    }

    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> Result<u64> {
        let used = selected_positions(selected, self.position_count)?;
        Ok(Self::bytes_for(used))
    }

    pub fn retained_size_in_bytes(&self) -> u64 {
        self.retained_size_in_bytes
    }

    fn bytes_for(positions: usize) -> u64 {
        ((T::WIDTH + NULL_FLAG_BYTES) * positions) as u64
    }

    pub fn get_region(&self, offset: usize, length: usize) -> Result<Self> {
        check_region(offset, length, self.position_count)?;
        Ok(Self::from_parts(
            self.position_offset + offset,
            length,
            self.nulls.clone(),
            Arc::clone(&self.values),
        ))
    }

    pub fn copy_region(&self, offset: usize, length: usize) -> Result<Self> {
        check_region(offset, length, self.position_count)?;
        let start = self.position_offset + offset;
        let values = compact(&self.values, start, length);
        let nulls = self.nulls.as_ref().map(|n| compact(n, start, length));
        if Arc::ptr_eq(&values, &self.values) && shared_eq(&nulls, &self.nulls) {
            return Ok(self.clone());
        }
        Ok(Self::from_parts(0, length, nulls, values))
    }

    pub fn copy_positions(&self, positions: &[usize], offset: usize, length: usize) -> Result<Self> {
        let positions = super::check_positions(positions, offset, length, self.position_count)?;
        let values = gather(&self.values, self.position_offset, positions);
        let nulls = self
            .nulls
            .as_ref()
            .map(|n| Arc::new(gather(n, self.position_offset, positions)));
        Ok(Self::from_parts(0, length, nulls, Arc::new(values)))
    }

    pub fn single_value(&self, position: usize) -> Result<Self> {
        check_position(position, self.position_count)?;
        let index = self.position_offset + position;
        let nulls = self.nulls.as_ref().map(|n| Arc::new(vec![n[index]]));
        Ok(Self::from_parts(0, 1, nulls, Arc::new(vec![self.values[index]])))
    }

    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    pub fn same_view(&self, other: &Self) -> bool {
        self.shares_storage(other)
            && shared_eq(&self.nulls, &other.nulls)
            && self.position_offset == other.position_offset
            && self.position_count == other.position_count
    }
}
