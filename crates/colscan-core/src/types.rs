//! Column types and typed scalar values.
//!
//! `ColumnType` is the declared (logical) type of a column; `PhysicalLayout` is
//! how a Block stores it. Several logical types share a layout: `Real` lives in
//! an int array as raw `f32` bits and `Double` in a long array as raw `f64` bits,
//! so round-trips are bit-exact (NaN payloads included).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    /// Days since epoch.
    Date,
    Real,
    BigInt,
    /// Microseconds since epoch.
    Timestamp,
    Double,
    /// Legacy 96-bit timestamp: 64-bit high word + 32-bit low word.
    Int96Timestamp,
    Varchar,
    Varbinary,
}

/// Physical storage layout used by a Block for a `ColumnType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalLayout {
    Byte,
    Short,
    Int,
    Long,
    Int96,
    VariableWidth,
}

impl ColumnType {
    pub fn layout(self) -> PhysicalLayout {
        match self {
            ColumnType::Boolean | ColumnType::TinyInt => PhysicalLayout::Byte,
            ColumnType::SmallInt => PhysicalLayout::Short,
            ColumnType::Integer | ColumnType::Date | ColumnType::Real => PhysicalLayout::Int,
            ColumnType::BigInt | ColumnType::Timestamp | ColumnType::Double => {
                PhysicalLayout::Long
            }
            ColumnType::Int96Timestamp => PhysicalLayout::Int96,
            ColumnType::Varchar | ColumnType::Varbinary => PhysicalLayout::VariableWidth,
        }
    }

    /// Width in bytes of one value, `None` for variable-width types.
    pub fn fixed_width(self) -> Option<usize> {
        self.layout().fixed_width()
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::TinyInt => "tinyint",
            ColumnType::SmallInt => "smallint",
            ColumnType::Integer => "integer",
            ColumnType::Date => "date",
            ColumnType::Real => "real",
            ColumnType::BigInt => "bigint",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Double => "double",
            ColumnType::Int96Timestamp => "int96_timestamp",
            ColumnType::Varchar => "varchar",
            ColumnType::Varbinary => "varbinary",
        }
    }
}

impl PhysicalLayout {
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            PhysicalLayout::Byte => Some(1),
            PhysicalLayout::Short => Some(2),
            PhysicalLayout::Int => Some(4),
            PhysicalLayout::Long => Some(8),
            PhysicalLayout::Int96 => Some(12),
            PhysicalLayout::VariableWidth => None,
        }
    }
}

/// A single non-null typed value.
///
/// All integer-family types (tinyint..bigint, date, timestamp) normalize to
/// `Long`, and `Real` widens to `Double`; widening is exact so comparisons in
/// predicates agree with comparisons on the stored type.
///
/// `Value` has a total order: doubles compare with `f64::total_cmp` (so NaN is
/// orderable and equal to itself), and values of different variants compare by
/// variant rank. Predicates never mix variants for one column in practice, but
/// the order must stay total for sorted range sets. Membership tests use
/// [`Value::sql_cmp`] instead, where `-0.0 == 0.0` and NaN is unordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Long(i64),
    Double(f64),
    Int96 { high: i64, low: i32 },
    Varchar(String),
    Varbinary(Vec<u8>),
}

impl Value {
    /// Whether this value can be stored in a column of type `ty`.
    pub fn is_compatible(&self, ty: ColumnType) -> bool {
        matches!(
            (self, ty),
            (Value::Boolean(_), ColumnType::Boolean)
                | (
                    Value::Long(_),
                    ColumnType::TinyInt
                        | ColumnType::SmallInt
                        | ColumnType::Integer
                        | ColumnType::Date
                        | ColumnType::BigInt
                        | ColumnType::Timestamp
                )
                | (Value::Double(_), ColumnType::Real | ColumnType::Double)
                | (Value::Int96 { .. }, ColumnType::Int96Timestamp)
                | (Value::Varchar(_), ColumnType::Varchar)
                | (Value::Varbinary(_), ColumnType::Varbinary)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Int96 { .. } => "int96",
            Value::Varchar(_) => "varchar",
            Value::Varbinary(_) => "varbinary",
        }
    }

    /// Rough heap + inline footprint, used by split size estimation.
    pub fn estimated_size_in_bytes(&self) -> usize {
        let inline = std::mem::size_of::<Value>();
        match self {
            Value::Varchar(s) => inline + s.len(),
            Value::Varbinary(b) => inline + b.len(),
            _ => inline,
        }
    }

    /// Comparison with SQL semantics: doubles compare numerically, so the two
    /// zeros are equal and NaN is unordered against everything, itself included.
    /// Every other pair falls back to the total order.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            _ => Some(self.cmp(other)),
        }
    }

    pub fn sql_eq(&self, other: &Value) -> bool {
        self.sql_cmp(other) == Some(Ordering::Equal)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Double(v) if v.is_nan())
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Long(_) => 1,
            Value::Double(_) => 2,
            Value::Int96 { .. } => 3,
            Value::Varchar(_) => 4,
            Value::Varbinary(_) => 5,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Long(a), Long(b)) => a.cmp(b),
            (Double(a), Double(b)) => a.total_cmp(b),
            (Int96 { high: ah, low: al }, Int96 { high: bh, low: bl }) => {
                // The low word is an unsigned continuation of the high word.
                ah.cmp(bh).then((*al as u32).cmp(&(*bl as u32)))
            }
            (Varchar(a), Varchar(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Varbinary(a), Varbinary(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Long(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Varchar(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Varchar(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_mapping() {
        assert_eq!(ColumnType::Real.layout(), PhysicalLayout::Int);
        assert_eq!(ColumnType::Double.layout(), PhysicalLayout::Long);
        assert_eq!(ColumnType::Int96Timestamp.fixed_width(), Some(12));
        assert_eq!(ColumnType::Varchar.fixed_width(), None);
    }

    #[test]
    fn test_double_total_order_handles_nan() {
        let nan = Value::Double(f64::NAN);
        assert_eq!(nan, Value::Double(f64::NAN));
        assert!(Value::Double(f64::INFINITY) < nan);
        assert!(Value::Double(-0.0) < Value::Double(0.0));
    }

    #[test]
    fn test_sql_cmp_treats_zeros_equal_and_nan_unordered() {
        let nan = Value::Double(f64::NAN);
        assert!(Value::Double(-0.0).sql_eq(&Value::Double(0.0)));
        assert_eq!(nan.sql_cmp(&nan), None);
        assert_eq!(nan.sql_cmp(&Value::Double(f64::INFINITY)), None);
        assert_eq!(
            Value::Double(f64::NEG_INFINITY).sql_cmp(&Value::Double(-1.0)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Long(2).sql_cmp(&Value::Long(1)), Some(Ordering::Greater));
        assert!(nan.is_nan());
        assert!(!Value::Double(f64::INFINITY).is_nan());
    }

    #[test]
    fn test_int96_low_word_is_unsigned() {
        let a = Value::Int96 { high: 1, low: 1 };
        let b = Value::Int96 { high: 1, low: -1 };
        assert!(a < b);
        assert!(Value::Int96 { high: 0, low: -1 } < Value::Int96 { high: 1, low: 0 });
    }

    #[test]
    fn test_compatibility() {
        assert!(Value::Long(3).is_compatible(ColumnType::Date));
        assert!(!Value::Long(3).is_compatible(ColumnType::Varchar));
        assert!(Value::Double(1.5).is_compatible(ColumnType::Real));
    }
}
