//! Scalar values — a single typed cell read out of a row.

use crate::error::{ExecError, ExecResult};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanBuilder, Float64Builder, Int32Builder, Int64Builder,
    StringBuilder,
};
use arrow::datatypes::{DataType, Float64Type, Int32Type, Int64Type};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Represents a scalar value that can be stored in a column.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    Boolean(bool),
}

impl ScalarValue {
    /// Get the Arrow DataType for this value.
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Null => DataType::Null,
            ScalarValue::Int32(_) => DataType::Int32,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float64(_) => DataType::Float64,
            ScalarValue::Utf8(_) => DataType::Utf8,
            ScalarValue::Boolean(_) => DataType::Boolean,
        }
    }

    /// Extract a value from an Arrow array at the given index.
    pub fn from_array(array: &ArrayRef, idx: usize) -> ExecResult<Self> {
        if idx >= array.len() {
            return Err(ExecError::InvalidArgument(format!(
                "index {idx} out of range ({})",
                array.len()
            )));
        }
        if array.is_null(idx) {
            return Ok(ScalarValue::Null);
        }
        match array.data_type() {
            DataType::Int32 => Ok(ScalarValue::Int32(
                array.as_primitive::<Int32Type>().value(idx),
            )),
            DataType::Int64 => Ok(ScalarValue::Int64(
                array.as_primitive::<Int64Type>().value(idx),
            )),
            DataType::Float64 => Ok(ScalarValue::Float64(
                array.as_primitive::<Float64Type>().value(idx),
            )),
            DataType::Boolean => Ok(ScalarValue::Boolean(array.as_boolean().value(idx))),
            DataType::Utf8 => Ok(ScalarValue::Utf8(
                array.as_string::<i32>().value(idx).to_string(),
            )),
            dt => Err(ExecError::TypeMismatch {
                expected: "Int32|Int64|Float64|Boolean|Utf8".to_string(),
                actual: format!("{dt:?}"),
            }),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Integer view (Int32 widened), `None` for other types.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int32(v) => Some(i64::from(*v)),
            ScalarValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view used for mixed int/float comparison.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int32(v) => Some(f64::from(*v)),
            ScalarValue::Int64(v) => Some(*v as f64),
            ScalarValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// SQL-style comparison. Null or incompatible types compare as `None`.
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (ScalarValue::Null, _) | (_, ScalarValue::Null) => None,
            (ScalarValue::Utf8(a), ScalarValue::Utf8(b)) => Some(a.cmp(b)),
            (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
            },
        }
    }
}

/// Build an Arrow array of `data_type` from scalar values.
///
/// Int32 values widen into Int64 columns and integers widen into Float64
/// columns; any other mismatch is an error.
pub fn build_array(values: &[ScalarValue], data_type: &DataType) -> ExecResult<ArrayRef> {
    let mismatch = |expected: &str, other: &ScalarValue| ExecError::TypeMismatch {
        expected: expected.to_string(),
        actual: format!("{other:?}"),
    };
    match data_type {
        DataType::Int32 => {
            let mut builder = Int32Builder::with_capacity(values.len());
            for value in values {
                match value {
                    ScalarValue::Int32(v) => builder.append_value(*v),
                    ScalarValue::Null => builder.append_null(),
                    other => return Err(mismatch("Int32", other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    ScalarValue::Null => builder.append_null(),
                    other => match other.as_i64() {
                        Some(v) => builder.append_value(v),
                        None => return Err(mismatch("Int64", other)),
                    },
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    ScalarValue::Null => builder.append_null(),
                    other => match other.as_f64() {
                        Some(v) => builder.append_value(v),
                        None => return Err(mismatch("Float64", other)),
                    },
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Utf8 => {
            let mut builder = StringBuilder::with_capacity(values.len(), 256);
            for value in values {
                match value {
                    ScalarValue::Utf8(v) => builder.append_value(v),
                    ScalarValue::Null => builder.append_null(),
                    other => return Err(mismatch("Utf8", other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    ScalarValue::Boolean(v) => builder.append_value(*v),
                    ScalarValue::Null => builder.append_null(),
                    other => return Err(mismatch("Boolean", other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        dt => Err(ExecError::TypeMismatch {
            expected: "Int32|Int64|Float64|Boolean|Utf8".to_string(),
            actual: format!("{dt:?}"),
        }),
    }
}

// Int32과 Int64는 같은 값이면 같은 해시: 폭이 다른 키도 같은 파티션으로 간다.
// Float64는 -0.0을 0.0으로, 모든 NaN을 하나의 비트 패턴으로 맞춘 뒤 해시한다.
impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ScalarValue::Null => 0_u8.hash(state),
            ScalarValue::Int32(v) => {
                1_u8.hash(state);
                i64::from(*v).hash(state);
            }
            ScalarValue::Int64(v) => {
                1_u8.hash(state);
                v.hash(state);
            }
            ScalarValue::Float64(v) => {
                2_u8.hash(state);
                canonical_f64_bits(*v).hash(state);
            }
            ScalarValue::Utf8(v) => {
                3_u8.hash(state);
                v.hash(state);
            }
            ScalarValue::Boolean(v) => {
                4_u8.hash(state);
                v.hash(state);
            }
        }
    }
}

/// Bit pattern under which equal floats hash alike (`0.0 == -0.0`).
fn canonical_f64_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0.0_f64.to_bits()
    } else {
        v.to_bits()
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Int32(v) => write!(f, "{v}"),
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::Float64(v) => write!(f, "{v}"),
            ScalarValue::Utf8(v) => write!(f, "'{v}'"),
            ScalarValue::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int64(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Int32(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float64(v)
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Boolean(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Utf8(v.to_string())
    }
}
