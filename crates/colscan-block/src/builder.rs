//! Append-only, single-writer builder for Blocks.
//!
//! Backing arrays are `Arc<Vec<_>>` shared with every published block. Appends
//! go through `Arc::make_mut`: while a block from `build()` is still alive, the
//! next append copies the storage first, so published blocks never change.
//! Once those blocks are dropped the builder writes in place again. `Vec`
//! growth is geometric.

use std::sync::Arc;

use colscan_core::types::{ColumnType, PhysicalLayout, Value};

use crate::block::{ArrayBlock, Block, Int96ArrayBlock, VariableWidthBlock};
use crate::error::{BlockError, Result};
use crate::size::{shared_vec_retained, NULL_FLAG_BYTES, OFFSET_BYTES};

#[derive(Debug, Clone)]
enum Storage {
    Byte(Arc<Vec<i8>>),
    Short(Arc<Vec<i16>>),
    Int(Arc<Vec<i32>>),
    Long(Arc<Vec<i64>>),
    Int96 {
        high: Arc<Vec<i64>>,
        low: Arc<Vec<i32>>,
    },
    VariableWidth {
        offsets: Arc<Vec<u32>>,
        bytes: Arc<Vec<u8>>,
    },
}

impl Storage {
    fn with_capacity(layout: PhysicalLayout, entries: usize) -> Self {
        match layout {
            PhysicalLayout::Byte => Storage::Byte(Arc::new(Vec::with_capacity(entries))),
            PhysicalLayout::Short => Storage::Short(Arc::new(Vec::with_capacity(entries))),
            PhysicalLayout::Int => Storage::Int(Arc::new(Vec::with_capacity(entries))),
            PhysicalLayout::Long => Storage::Long(Arc::new(Vec::with_capacity(entries))),
            PhysicalLayout::Int96 => Storage::Int96 {
                high: Arc::new(Vec::with_capacity(entries)),
                low: Arc::new(Vec::with_capacity(entries)),
            },
            PhysicalLayout::VariableWidth => {
                let mut offsets = Vec::with_capacity(entries + 1);
                offsets.push(0);
                Storage::VariableWidth {
                    offsets: Arc::new(offsets),
                    bytes: Arc::new(Vec::new()),
                }
            }
        }
    }

    fn retained(&self) -> u64 {
        match self {
            Storage::Byte(v) => shared_vec_retained(v),
            Storage::Short(v) => shared_vec_retained(v),
            Storage::Int(v) => shared_vec_retained(v),
            Storage::Long(v) => shared_vec_retained(v),
            Storage::Int96 { high, low } => shared_vec_retained(high) + shared_vec_retained(low),
            Storage::VariableWidth { offsets, bytes } => {
                shared_vec_retained(offsets) + shared_vec_retained(bytes)
            }
        }
    }
}

/// Clear a shared array for reuse: in place when nothing else holds it,
/// otherwise swap in a fresh allocation of the same capacity.
fn clear_shared<T>(shared: &mut Arc<Vec<T>>) {
    match Arc::get_mut(shared) {
        Some(v) => v.clear(),
        None => *shared = Arc::new(Vec::with_capacity(shared.capacity())),
    }
}

#[derive(Debug, Clone)]
pub struct BlockBuilder {
    column_type: ColumnType,
    expected_entries: usize,
    storage: Storage,
    nulls: Arc<Vec<bool>>,
    has_null: bool,
    position_count: usize,
    // Only variable-width data bytes; fixed widths are derived from the count.
    data_bytes: usize,
}

impl BlockBuilder {
    pub fn new(column_type: ColumnType, expected_entries: usize) -> Self {
        Self {
            column_type,
            expected_entries,
            storage: Storage::with_capacity(column_type.layout(), expected_entries),
            nulls: Arc::new(Vec::with_capacity(expected_entries)),
            has_null: false,
            position_count: 0,
            data_bytes: 0,
        }
    }

    /// Empty builder of the same type, sized for what this one has seen.
    pub fn new_block_builder_like(&self) -> Self {
        Self::new(
            self.column_type,
            self.expected_entries.max(self.position_count),
        )
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    pub fn is_empty(&self) -> bool {
        self.position_count == 0
    }

    /// Logical footprint of the appended values, as the built block reports it.
    pub fn size_in_bytes(&self) -> u64 {
        let per_position = match self.column_type.fixed_width() {
            Some(width) => width + NULL_FLAG_BYTES,
            None => OFFSET_BYTES + NULL_FLAG_BYTES,
        };
        (self.data_bytes + per_position * self.position_count) as u64
    }

    pub fn retained_size_in_bytes(&self) -> u64 {
        std::mem::size_of::<Self>() as u64 + self.storage.retained() + shared_vec_retained(&self.nulls)
    }

    fn mismatch(&self, got: &'static str) -> BlockError {
        BlockError::UnsupportedAppendType {
            column_type: self.column_type,
            got,
        }
    }

    fn push_flag(&mut self, is_null: bool) {
        Arc::make_mut(&mut self.nulls).push(is_null);
        self.has_null |= is_null;
        self.position_count += 1;
    }

    pub fn append_null(&mut self) -> Result<()> {
        match &mut self.storage {
            Storage::Byte(v) => Arc::make_mut(v).push(0),
            Storage::Short(v) => Arc::make_mut(v).push(0),
            Storage::Int(v) => Arc::make_mut(v).push(0),
            Storage::Long(v) => Arc::make_mut(v).push(0),
            Storage::Int96 { high, low } => {
                Arc::make_mut(high).push(0);
                Arc::make_mut(low).push(0);
            }
            Storage::VariableWidth { offsets, .. } => {
                let end = offsets.last().copied().unwrap_or(0);
                Arc::make_mut(offsets).push(end);
            }
        }
        self.push_flag(true);
        Ok(())
    }

    pub fn append_bool(&mut self, value: bool) -> Result<()> {
        if self.column_type != ColumnType::Boolean {
            return Err(self.mismatch("boolean"));
        }
        self.push_byte(value as i8)
    }

    pub fn append_byte(&mut self, value: i8) -> Result<()> {
        if self.column_type != ColumnType::TinyInt {
            return Err(self.mismatch("byte"));
        }
        self.push_byte(value)
    }

    fn push_byte(&mut self, value: i8) -> Result<()> {
        match &mut self.storage {
            Storage::Byte(v) => Arc::make_mut(v).push(value),
            _ => return Err(self.mismatch("byte")),
        }
        self.push_flag(false);
        Ok(())
    }

    pub fn append_short(&mut self, value: i16) -> Result<()> {
        match &mut self.storage {
            Storage::Short(v) => Arc::make_mut(v).push(value),
            _ => return Err(self.mismatch("short")),
        }
        self.push_flag(false);
        Ok(())
    }

    pub fn append_int(&mut self, value: i32) -> Result<()> {
        if !matches!(self.column_type, ColumnType::Integer | ColumnType::Date) {
            return Err(self.mismatch("int"));
        }
        self.push_int(value)
    }

    pub fn append_float(&mut self, value: f32) -> Result<()> {
        if self.column_type != ColumnType::Real {
            return Err(self.mismatch("float"));
        }
        self.push_int(value.to_bits() as i32)
    }

    fn push_int(&mut self, value: i32) -> Result<()> {
        match &mut self.storage {
            Storage::Int(v) => Arc::make_mut(v).push(value),
            _ => return Err(self.mismatch("int")),
        }
        self.push_flag(false);
        Ok(())
    }

    pub fn append_long(&mut self, value: i64) -> Result<()> {
        if !matches!(self.column_type, ColumnType::BigInt | ColumnType::Timestamp) {
            return Err(self.mismatch("long"));
        }
        self.push_long(value)
    }

    pub fn append_double(&mut self, value: f64) -> Result<()> {
        if self.column_type != ColumnType::Double {
            return Err(self.mismatch("double"));
        }
        self.push_long(value.to_bits() as i64)
    }

    fn push_long(&mut self, value: i64) -> Result<()> {
        match &mut self.storage {
            Storage::Long(v) => Arc::make_mut(v).push(value),
            _ => return Err(self.mismatch("long")),
        }
        self.push_flag(false);
        Ok(())
    }

    pub fn append_int96(&mut self, high: i64, low: i32) -> Result<()> {
        match &mut self.storage {
            Storage::Int96 { high: h, low: l } => {
                Arc::make_mut(h).push(high);
                Arc::make_mut(l).push(low);
            }
            _ => return Err(self.mismatch("int96")),
        }
        self.push_flag(false);
        Ok(())
    }

    pub fn append_str(&mut self, value: &str) -> Result<()> {
        if self.column_type != ColumnType::Varchar {
            return Err(self.mismatch("string"));
        }
        self.push_slice(value.as_bytes())
    }

    pub fn append_bytes(&mut self, value: &[u8]) -> Result<()> {
        if self.column_type != ColumnType::Varbinary {
            return Err(self.mismatch("bytes"));
        }
        self.push_slice(value)
    }

    fn push_slice(&mut self, value: &[u8]) -> Result<()> {
        let end = self
            .data_bytes
            .checked_add(value.len())
            .and_then(|end| u32::try_from(end).ok())
            .ok_or_else(|| {
                BlockError::InvalidArguments(format!(
                    "variable-width block would exceed {} data bytes",
                    u32::MAX
                ))
            })?;
        match &mut self.storage {
            Storage::VariableWidth { offsets, bytes } => {
                Arc::make_mut(bytes).extend_from_slice(value);
                Arc::make_mut(offsets).push(end);
            }
            _ => return Err(self.mismatch("bytes")),
        }
        self.data_bytes = end as usize;
        self.push_flag(false);
        Ok(())
    }

    /// Append a typed scalar, narrowing integers to the column's width.
    /// `None` appends a null.
    pub fn append_value(&mut self, value: Option<&Value>) -> Result<()> {
        let Some(value) = value else {
            return self.append_null();
        };
        let out_of_range =
            |v: i64, ty: ColumnType| BlockError::InvalidArguments(format!("{} does not fit in {}", v, ty.name()));
        match (value, self.column_type) {
            (Value::Boolean(v), _) => self.append_bool(*v),
            (Value::Long(v), ColumnType::TinyInt) => {
                self.append_byte(i8::try_from(*v).map_err(|_| out_of_range(*v, ColumnType::TinyInt))?)
            }
            (Value::Long(v), ColumnType::SmallInt) => {
                self.append_short(i16::try_from(*v).map_err(|_| out_of_range(*v, ColumnType::SmallInt))?)
            }
            (Value::Long(v), ty @ (ColumnType::Integer | ColumnType::Date)) => {
                self.append_int(i32::try_from(*v).map_err(|_| out_of_range(*v, ty))?)
            }
            (Value::Long(v), _) => self.append_long(*v),
            (Value::Double(v), ColumnType::Real) => self.append_float(*v as f32),
            (Value::Double(v), _) => self.append_double(*v),
            (Value::Int96 { high, low }, _) => self.append_int96(*high, *low),
            (Value::Varchar(s), _) => self.append_str(s),
            (Value::Varbinary(b), _) => self.append_bytes(b),
        }
    }

    /// Freeze the current contents. The block shares this builder's arrays;
    /// later appends copy them first.
    pub fn build(&self) -> Block {
        let count = self.position_count;
        let nulls = self.has_null.then(|| Arc::clone(&self.nulls));
        match &self.storage {
            Storage::Byte(v) => Block::Byte(ArrayBlock::from_parts(0, count, nulls, Arc::clone(v))),
            Storage::Short(v) => Block::Short(ArrayBlock::from_parts(0, count, nulls, Arc::clone(v))),
            Storage::Int(v) => Block::Int(ArrayBlock::from_parts(0, count, nulls, Arc::clone(v))),
            Storage::Long(v) => Block::Long(ArrayBlock::from_parts(0, count, nulls, Arc::clone(v))),
            Storage::Int96 { high, low } => Block::Int96(Int96ArrayBlock::from_parts(
                0,
                count,
                nulls,
                Arc::clone(high),
                Arc::clone(low),
            )),
            Storage::VariableWidth { offsets, bytes } => {
                Block::VariableWidth(VariableWidthBlock::from_parts(
                    0,
                    count,
                    nulls,
                    Arc::clone(offsets),
                    Arc::clone(bytes),
                ))
            }
        }
    }

    /// Drop all contents, keeping allocations that no published block holds.
    pub fn reset(&mut self) {
        match &mut self.storage {
            Storage::Byte(v) => clear_shared(v),
            Storage::Short(v) => clear_shared(v),
            Storage::Int(v) => clear_shared(v),
            Storage::Long(v) => clear_shared(v),
            Storage::Int96 { high, low } => {
                clear_shared(high);
                clear_shared(low);
            }
            Storage::VariableWidth { offsets, bytes } => {
                clear_shared(offsets);
                clear_shared(bytes);
                Arc::make_mut(offsets).push(0);
            }
        }
        clear_shared(&mut self.nulls);
        self.has_null = false;
        self.position_count = 0;
        self.data_bytes = 0;
    }
}
