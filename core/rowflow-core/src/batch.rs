//! Row / RowBatch — the unit of data flow between operators.
//!
//! A [`RowBatch`] wraps an Arrow `RecordBatch`. Batches are immutable and
//! `Arc`-shared: an operator never overwrites a batch it already handed out,
//! it builds a new one (or slices / clones the shared buffers). Consumers may
//! therefore keep clones for as long as they like.
//!
//! A [`Row`] is a borrowed `(batch, position)` view; positions are addressed
//! in `[0, num_rows)`.

use crate::error::{ExecError, ExecResult};
use crate::value::ScalarValue;
use arrow::array::{ArrayRef, Int64Array, UInt32Array};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use std::fmt;
use std::sync::Arc;

/// 불변 row batch
#[derive(Debug, Clone)]
pub struct RowBatch {
    batch: RecordBatch,
}

impl RowBatch {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Zero-row batch. Valid output meaning "no rows this round".
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            batch: RecordBatch::new_empty(schema),
        }
    }

    /// Single non-nullable Int64 column named `name`.
    pub fn from_int64(name: &str, values: &[i64]) -> ExecResult<Self> {
        let schema = Arc::new(Schema::new(vec![Field::new(name, DataType::Int64, false)]));
        let column: ArrayRef = Arc::new(Int64Array::from(values.to_vec()));
        Ok(Self::new(RecordBatch::try_new(schema, vec![column])?))
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_record_batch(self) -> RecordBatch {
        self.batch
    }

    /// Row view at `index`.
    pub fn row(&self, index: usize) -> ExecResult<Row<'_>> {
        if index >= self.num_rows() {
            return Err(ExecError::InvalidArgument(format!(
                "row {index} out of range ({})",
                self.num_rows()
            )));
        }
        Ok(Row {
            batch: &self.batch,
            index,
        })
    }

    /// Rows in batch order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        (0..self.num_rows()).map(move |index| Row {
            batch: &self.batch,
            index,
        })
    }

    /// New batch made of the rows at `indices`, in the given order.
    pub fn take(&self, indices: &[usize]) -> ExecResult<RowBatch> {
        let mut positions = Vec::with_capacity(indices.len());
        for &idx in indices {
            if idx >= self.num_rows() {
                return Err(ExecError::InvalidArgument(format!(
                    "row {idx} out of range ({})",
                    self.num_rows()
                )));
            }
            positions.push(idx as u32);
        }
        let positions = UInt32Array::from(positions);
        Ok(Self::new(compute::take_record_batch(&self.batch, &positions)?))
    }

    /// Zero-copy slice `[offset, offset + len)`.
    pub fn slice(&self, offset: usize, len: usize) -> ExecResult<RowBatch> {
        if offset + len > self.num_rows() {
            return Err(ExecError::InvalidArgument(format!(
                "slice {offset}..{} out of range ({})",
                offset + len,
                self.num_rows()
            )));
        }
        Ok(Self::new(self.batch.slice(offset, len)))
    }

    /// Keep only the columns at `indices`.
    pub fn project(&self, indices: &[usize]) -> ExecResult<RowBatch> {
        Ok(Self::new(self.batch.project(indices)?))
    }

    /// Concatenate batches sharing `schema`.
    pub fn concat(schema: &SchemaRef, batches: &[RowBatch]) -> ExecResult<RowBatch> {
        if batches.len() == 1 {
            return Ok(batches[0].clone());
        }
        let merged = compute::concat_batches(schema, batches.iter().map(|b| &b.batch))?;
        Ok(Self::new(merged))
    }

    /// All values of one column, top to bottom.
    pub fn column_values(&self, column: usize) -> ExecResult<Vec<ScalarValue>> {
        self.rows().map(|row| row.value(column)).collect()
    }
}

impl From<RecordBatch> for RowBatch {
    fn from(batch: RecordBatch) -> Self {
        Self::new(batch)
    }
}

impl fmt::Display for RowBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match pretty_format_batches(std::slice::from_ref(&self.batch)) {
            Ok(table) => write!(f, "{table}"),
            Err(_) => write!(f, "<{} rows>", self.num_rows()),
        }
    }
}

/// 행 뷰 — batch 안의 한 위치
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    batch: &'a RecordBatch,
    index: usize,
}

impl<'a> Row<'a> {
    /// Position within the owning batch.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn value(&self, column: usize) -> ExecResult<ScalarValue> {
        if column >= self.batch.num_columns() {
            return Err(ExecError::InvalidArgument(format!(
                "column {column} out of range ({})",
                self.batch.num_columns()
            )));
        }
        ScalarValue::from_array(self.batch.column(column), self.index)
    }

    pub fn values(&self) -> ExecResult<Vec<ScalarValue>> {
        (0..self.num_columns()).map(|c| self.value(c)).collect()
    }

    /// One-row batch sharing the parent's buffers.
    pub fn to_batch(&self) -> RowBatch {
        RowBatch::new(self.batch.slice(self.index, 1))
    }
}
