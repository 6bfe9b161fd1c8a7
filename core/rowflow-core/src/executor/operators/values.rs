//! Values Operator — sequential RowBatch emission

use crate::batch::RowBatch;
use crate::context::QueryContext;
use crate::error::{ExecError, ExecResult};
use crate::executor::operators::{Exec, ExecCore, IterationResult};
use arrow::datatypes::SchemaRef;

/// 값 소스 연산자 — 미리 적재된 RowBatch를 순차적으로 반환
///
/// Empty input batches are skipped; the last non-empty batch is reported
/// with `FetchedDone`. Never waits.
pub struct ValuesExec {
    core: ExecCore,
    /// Pre-loaded data batches to emit
    data: Vec<RowBatch>,
    /// Current position in data
    position: usize,
}

impl ValuesExec {
    pub fn new(schema: SchemaRef, batches: Vec<RowBatch>) -> ExecResult<Self> {
        for batch in &batches {
            if batch.schema().fields() != schema.fields() {
                return Err(ExecError::InvalidArgument(format!(
                    "batch schema {:?} does not match source schema {:?}",
                    batch.schema(),
                    schema
                )));
            }
        }
        let data = batches.into_iter().filter(|b| !b.is_empty()).collect();
        Ok(Self {
            core: ExecCore::new("values", schema),
            data,
            position: 0,
        })
    }

    /// Single Int64 column, one batch per slice.
    pub fn from_int64(name: &str, batches: &[&[i64]]) -> ExecResult<Self> {
        let schema = RowBatch::from_int64(name, &[])?.schema();
        let batches = batches
            .iter()
            .map(|values| RowBatch::from_int64(name, values))
            .collect::<ExecResult<Vec<_>>>()?;
        Self::new(schema, batches)
    }

    fn advance_inner(&mut self) -> ExecResult<IterationResult> {
        if self.position >= self.data.len() {
            return Ok(self.core.done());
        }
        let batch = self.data[self.position].clone();
        self.position += 1;
        let last = self.position == self.data.len();
        Ok(self.core.emit(batch, last))
    }
}

impl Exec for ValuesExec {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn schema(&self) -> SchemaRef {
        self.core.schema()
    }

    fn advance(&mut self, ctx: &QueryContext) -> ExecResult<IterationResult> {
        if let Some(result) = self.core.begin(ctx)? {
            return Ok(result);
        }
        let result = self.advance_inner();
        self.core.finish(result)
    }

    fn current_batch(&self) -> &RowBatch {
        self.core.current_batch()
    }
}
