//! The `Block` type: one column's values for a contiguous run of positions.
//!
//! Physical layouts are variants of one enum so callers dispatch once per
//! block, not once per value. Cloning a `Block` clones `Arc` handles only;
//! two clones are "the same block" in the sense of [`Block::ptr_eq`].
//!
//! Accessors take a byte offset within the value for multi-word layouts. Single
//! word layouts accept only offset 0; int96 accepts 0 (high word, `get_long`)
//! and 8 (low word, `get_int`).

mod array;
mod dictionary;
mod int96;
mod run_length;
mod variable;

use std::sync::Arc;

use colscan_core::types::{ColumnType, PhysicalLayout, Value};

use crate::error::{BlockError, Result};

pub use array::{ArrayBlock, FixedWidth};
pub use dictionary::DictionaryBlock;
pub use int96::{Int96ArrayBlock, HIGH_WORD_OFFSET, LOW_WORD_OFFSET};
pub use run_length::RunLengthBlock;
pub use variable::VariableWidthBlock;
pub(crate) use variable::data_offset;

#[derive(Debug, Clone)]
pub enum Block {
    Byte(ArrayBlock<i8>),
    Short(ArrayBlock<i16>),
    Int(ArrayBlock<i32>),
    Long(ArrayBlock<i64>),
    Int96(Int96ArrayBlock),
    VariableWidth(VariableWidthBlock),
    Dictionary(DictionaryBlock),
    RunLength(RunLengthBlock),
}

/// Apply the same expression to whichever layout is inside.
macro_rules! each_layout {
    ($block:expr, $b:ident => $e:expr) => {
        match $block {
            Block::Byte($b) => $e,
            Block::Short($b) => $e,
            Block::Int($b) => $e,
            Block::Long($b) => $e,
            Block::Int96($b) => $e,
            Block::VariableWidth($b) => $e,
            Block::Dictionary($b) => $e,
            Block::RunLength($b) => $e,
        }
    };
}

/// Apply an expression producing the same layout and re-wrap it.
macro_rules! map_layout {
    ($block:expr, $b:ident => $e:expr) => {
        Ok(match $block {
            Block::Byte($b) => Block::Byte($e?),
            Block::Short($b) => Block::Short($e?),
            Block::Int($b) => Block::Int($e?),
            Block::Long($b) => Block::Long($e?),
            Block::Int96($b) => Block::Int96($e?),
            Block::VariableWidth($b) => Block::VariableWidth($e?),
            Block::Dictionary($b) => Block::Dictionary($e?),
            Block::RunLength($b) => Block::RunLength($e?),
        })
    };
}

fn expect_offset(offset: usize, layout: &'static str) -> Result<()> {
    if offset == 0 {
        Ok(())
    } else {
        Err(BlockError::InvalidOffset { offset, layout })
    }
}

impl Block {
    pub fn position_count(&self) -> usize {
        each_layout!(self, b => b.position_count())
    }

    /// Name of the physical encoding, stable across releases.
    pub fn encoding_name(&self) -> &'static str {
        match self {
            Block::Byte(_) => "BYTE_ARRAY",
            Block::Short(_) => "SHORT_ARRAY",
            Block::Int(_) => "INT_ARRAY",
            Block::Long(_) => "LONG_ARRAY",
            Block::Int96(_) => "INT96_ARRAY",
            Block::VariableWidth(_) => "VARIABLE_WIDTH",
            Block::Dictionary(_) => "DICTIONARY",
            Block::RunLength(_) => "RLE",
        }
    }

    /// Layout that values resolve to, looking through dictionary and run-length wrappers.
    pub fn value_layout(&self) -> PhysicalLayout {
        match self {
            Block::Byte(_) => PhysicalLayout::Byte,
            Block::Short(_) => PhysicalLayout::Short,
            Block::Int(_) => PhysicalLayout::Int,
            Block::Long(_) => PhysicalLayout::Long,
            Block::Int96(_) => PhysicalLayout::Int96,
            Block::VariableWidth(_) => PhysicalLayout::VariableWidth,
            Block::Dictionary(d) => d.dictionary().value_layout(),
            Block::RunLength(r) => r.value().value_layout(),
        }
    }

    /// O(1); false without a lookup when the block carries no null flags.
    pub fn is_null(&self, position: usize) -> Result<bool> {
        match self {
            Block::Byte(b) => b.is_null(position),
            Block::Short(b) => b.is_null(position),
            Block::Int(b) => b.is_null(position),
            Block::Long(b) => b.is_null(position),
            Block::Int96(b) => b.is_null(position),
            Block::VariableWidth(b) => b.is_null(position),
            Block::Dictionary(d) => d.dictionary().is_null(d.id(position)?),
            Block::RunLength(r) => {
                r.check(position)?;
                r.value().is_null(0)
            }
        }
    }

    /// False guarantees that no position is null.
    pub fn may_have_null(&self) -> bool {
        match self {
            Block::Byte(b) => b.may_have_null(),
            Block::Short(b) => b.may_have_null(),
            Block::Int(b) => b.may_have_null(),
            Block::Long(b) => b.may_have_null(),
            Block::Int96(b) => b.may_have_null(),
            Block::VariableWidth(b) => b.may_have_null(),
            Block::Dictionary(d) => d.dictionary().may_have_null(),
            Block::RunLength(r) => matches!(r.value().is_null(0), Ok(true)),
        }
    }

    fn unsupported<T>(&self, operation: &'static str) -> Result<T> {
        Err(BlockError::UnsupportedAccess {
            operation,
            layout: self.encoding_name(),
        })
    }

    pub fn get_byte(&self, position: usize, offset: usize) -> Result<i8> {
        match self {
            Block::Byte(b) => {
                let v = b.value(position)?;
                expect_offset(offset, "byte")?;
                Ok(v)
            }
            Block::Dictionary(d) => d.dictionary().get_byte(d.id(position)?, offset),
            Block::RunLength(r) => {
                r.check(position)?;
                r.value().get_byte(0, offset)
            }
            _ => self.unsupported("get_byte"),
        }
    }

    pub fn get_short(&self, position: usize, offset: usize) -> Result<i16> {
        match self {
            Block::Short(b) => {
                let v = b.value(position)?;
                expect_offset(offset, "short")?;
                Ok(v)
            }
            Block::Dictionary(d) => d.dictionary().get_short(d.id(position)?, offset),
            Block::RunLength(r) => {
                r.check(position)?;
                r.value().get_short(0, offset)
            }
            _ => self.unsupported("get_short"),
        }
    }

    pub fn get_int(&self, position: usize, offset: usize) -> Result<i32> {
        match self {
            Block::Int(b) => {
                let v = b.value(position)?;
                expect_offset(offset, "int")?;
                Ok(v)
            }
            Block::Int96(b) => b.get_int(position, offset),
            Block::Dictionary(d) => d.dictionary().get_int(d.id(position)?, offset),
            Block::RunLength(r) => {
                r.check(position)?;
                r.value().get_int(0, offset)
            }
            _ => self.unsupported("get_int"),
        }
    }

    pub fn get_long(&self, position: usize, offset: usize) -> Result<i64> {
        match self {
            Block::Long(b) => {
                let v = b.value(position)?;
                expect_offset(offset, "long")?;
                Ok(v)
            }
            Block::Int96(b) => b.get_long(position, offset),
            Block::Dictionary(d) => d.dictionary().get_long(d.id(position)?, offset),
            Block::RunLength(r) => {
                r.check(position)?;
                r.value().get_long(0, offset)
            }
            _ => self.unsupported("get_long"),
        }
    }

    /// Bytes of a variable-width value.
    pub fn get_slice(&self, position: usize) -> Result<&[u8]> {
        match self {
            Block::VariableWidth(b) => b.slice(position),
            Block::Dictionary(d) => d.dictionary().get_slice(d.id(position)?),
            Block::RunLength(r) => {
                r.check(position)?;
                r.value().get_slice(0)
            }
            _ => self.unsupported("get_slice"),
        }
    }

    pub fn get_slice_length(&self, position: usize) -> Result<usize> {
        match self {
            Block::VariableWidth(b) => b.slice_length(position),
            Block::Dictionary(d) => d.dictionary().get_slice_length(d.id(position)?),
            Block::RunLength(r) => {
                r.check(position)?;
                r.value().get_slice_length(0)
            }
            _ => self.unsupported("get_slice_length"),
        }
    }

    /// Decode `position` as a value of `column_type`; `None` for null.
    pub fn get_value(&self, position: usize, column_type: ColumnType) -> Result<Option<Value>> {
        if self.is_null(position)? {
            return Ok(None);
        }
        let value = match column_type {
            ColumnType::Boolean => Value::Boolean(self.get_byte(position, 0)? != 0),
            ColumnType::TinyInt => Value::Long(self.get_byte(position, 0)? as i64),
            ColumnType::SmallInt => Value::Long(self.get_short(position, 0)? as i64),
            ColumnType::Integer | ColumnType::Date => {
                Value::Long(self.get_int(position, 0)? as i64)
            }
            ColumnType::Real => {
                Value::Double(f32::from_bits(self.get_int(position, 0)? as u32) as f64)
            }
            ColumnType::BigInt | ColumnType::Timestamp => Value::Long(self.get_long(position, 0)?),
            ColumnType::Double => Value::Double(f64::from_bits(self.get_long(position, 0)? as u64)),
            ColumnType::Int96Timestamp => Value::Int96 {
                high: self.get_long(position, HIGH_WORD_OFFSET)?,
                low: self.get_int(position, LOW_WORD_OFFSET)?,
            },
            ColumnType::Varchar => {
                let bytes = self.get_slice(position)?;
                let s = std::str::from_utf8(bytes).map_err(|e| {
                    BlockError::Corrupt(format!("varchar at position {}: {}", position, e))
                })?;
                Value::Varchar(s.to_string())
            }
            ColumnType::Varbinary => Value::Varbinary(self.get_slice(position)?.to_vec()),
        };
        Ok(Some(value))
    }

    /// Logical footprint: value bytes + one null-flag byte per position.
    pub fn size_in_bytes(&self) -> u64 {
        each_layout!(self, b => b.size_in_bytes())
    }

    pub fn region_size_in_bytes(&self, offset: usize, length: usize) -> Result<u64> {
        each_layout!(self, b => b.region_size_in_bytes(offset, length))
    }

    /// Footprint of the positions flagged in `selected` (one flag per position).
    pub fn positions_size_in_bytes(&self, selected: &[bool]) -> Result<u64> {
        each_layout!(self, b => b.positions_size_in_bytes(selected))
    }

    /// Heap bytes held by this block's backing arrays. Precomputed; never allocates.
    pub fn retained_size_in_bytes(&self) -> u64 {
        each_layout!(self, b => b.retained_size_in_bytes())
    }

    /// Zero-copy view of `length` positions starting at `offset`.
    pub fn get_region(&self, offset: usize, length: usize) -> Result<Block> {
        map_layout!(self, b => b.get_region(offset, length))
    }

    /// Region in freshly allocated minimal storage, or this block itself when
    /// the region already spans the whole backing storage.
    pub fn copy_region(&self, offset: usize, length: usize) -> Result<Block> {
        map_layout!(self, b => b.copy_region(offset, length))
    }

    /// Gather `positions[offset..offset + length]` (in order, repeats allowed)
    /// into a new compact block.
    pub fn copy_positions(&self, positions: &[usize], offset: usize, length: usize) -> Result<Block> {
        map_layout!(self, b => b.copy_positions(positions, offset, length))
    }

    /// One-position block holding a copy of `position`'s value.
    pub fn single_value_block(&self, position: usize) -> Result<Block> {
        match self {
            Block::Byte(b) => Ok(Block::Byte(b.single_value(position)?)),
            Block::Short(b) => Ok(Block::Short(b.single_value(position)?)),
            Block::Int(b) => Ok(Block::Int(b.single_value(position)?)),
            Block::Long(b) => Ok(Block::Long(b.single_value(position)?)),
            Block::Int96(b) => Ok(Block::Int96(b.single_value(position)?)),
            Block::VariableWidth(b) => Ok(Block::VariableWidth(b.single_value(position)?)),
            Block::Dictionary(d) => d.dictionary().single_value_block(d.id(position)?),
            Block::RunLength(r) => {
                r.check(position)?;
                r.value().single_value_block(0)
            }
        }
    }

    /// Same backing storage and same view: the identity `copy_region` preserves.
    pub fn ptr_eq(&self, other: &Block) -> bool {
        match (self, other) {
            (Block::Byte(a), Block::Byte(b)) => a.same_view(b),
            (Block::Short(a), Block::Short(b)) => a.same_view(b),
            (Block::Int(a), Block::Int(b)) => a.same_view(b),
            (Block::Long(a), Block::Long(b)) => a.same_view(b),
            (Block::Int96(a), Block::Int96(b)) => a.same_view(b),
            (Block::VariableWidth(a), Block::VariableWidth(b)) => a.same_view(b),
            (Block::Dictionary(a), Block::Dictionary(b)) => a.same_view(b),
            (Block::RunLength(a), Block::RunLength(b)) => a.same_view(b),
            _ => false,
        }
    }

    /// Whether both blocks read from the same backing allocation, e.g. a block
    /// and a region of it.
    pub fn shares_storage(&self, other: &Block) -> bool {
        match (self, other) {
            (Block::Byte(a), Block::Byte(b)) => a.shares_storage(b),
            (Block::Short(a), Block::Short(b)) => a.shares_storage(b),
            (Block::Int(a), Block::Int(b)) => a.shares_storage(b),
            (Block::Long(a), Block::Long(b)) => a.shares_storage(b),
            (Block::Int96(a), Block::Int96(b)) => a.shares_storage(b),
            (Block::VariableWidth(a), Block::VariableWidth(b)) => a.shares_storage(b),
            (Block::Dictionary(a), Block::Dictionary(b)) => a.shares_storage(b),
            (Block::RunLength(a), Block::RunLength(b)) => a.shares_storage(b),
            _ => false,
        }
    }
}

pub(crate) fn check_position(position: usize, position_count: usize) -> Result<()> {
    if position >= position_count {
        return Err(BlockError::IndexOutOfRange {
            position,
            position_count,
        });
    }
    Ok(())
}

pub(crate) fn check_region(offset: usize, length: usize, position_count: usize) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= position_count => Ok(()),
        _ => Err(BlockError::InvalidRange {
            offset,
            length,
            position_count,
        }),
    }
}

/// Validate `positions[offset..offset + length]` and every position in it.
pub(crate) fn check_positions(
    positions: &[usize],
    offset: usize,
    length: usize,
    position_count: usize,
) -> Result<&[usize]> {
    check_region(offset, length, positions.len())?;
    let window = &positions[offset..offset + length];
    for position in window {
        check_position(*position, position_count)?;
    }
    Ok(window)
}

/// Count of selected positions; `selected` must carry one flag per position.
pub(crate) fn selected_positions(selected: &[bool], position_count: usize) -> Result<usize> {
    if selected.len() != position_count {
        return Err(BlockError::InvalidArguments(format!(
            "selection has {} flags for {} positions",
            selected.len(),
            position_count
        )));
    }
    Ok(selected.iter().filter(|s| **s).count())
}

/// `shared[index..index + length]`, reusing `shared` when that is all of it.
pub(crate) fn compact<T: Clone>(shared: &Arc<Vec<T>>, index: usize, length: usize) -> Arc<Vec<T>> {
    if index == 0 && length == shared.len() {
        Arc::clone(shared)
    } else {
        Arc::new(shared[index..index + length].to_vec())
    }
}

pub(crate) fn gather<T: Copy>(source: &[T], base: usize, positions: &[usize]) -> Vec<T> {
    positions.iter().map(|p| source[base + p]).collect()
}

pub(crate) fn shared_eq<T>(a: &Option<Arc<Vec<T>>>, b: &Option<Arc<Vec<T>>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}
