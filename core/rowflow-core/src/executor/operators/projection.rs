//! Projection Operator — SELECT column selection and computation

use crate::batch::RowBatch;
use crate::context::QueryContext;
use crate::error::{ExecError, ExecResult};
use crate::executor::expr::Expr;
use crate::executor::operators::{Exec, ExecCore, IterationResult, pull};
use crate::value::{ScalarValue, build_array};
use arrow::array::ArrayRef;
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

enum Projection {
    /// Column subset, zero-copy
    Columns(Vec<usize>),
    /// Expressions evaluated per row
    Exprs(Vec<Expr>),
}

/// Projection 연산자 (SELECT 컬럼 선택/계산)
pub struct ProjectExec {
    core: ExecCore,
    input: Box<dyn Exec>,
    projection: Projection,
}

impl ProjectExec {
    /// Keep the input columns at `indices`, in that order.
    pub fn columns(input: Box<dyn Exec>, indices: Vec<usize>) -> ExecResult<Self> {
        let schema = Arc::new(input.schema().project(&indices)?);
        Ok(Self {
            core: ExecCore::new("project", schema),
            input,
            projection: Projection::Columns(indices),
        })
    }

    /// Compute one output column per `(expr, field)` pair.
    pub fn exprs(input: Box<dyn Exec>, exprs: Vec<(Expr, Field)>) -> ExecResult<Self> {
        if exprs.is_empty() {
            return Err(ExecError::InvalidArgument(
                "projection needs at least one expression".into(),
            ));
        }
        let (exprs, fields): (Vec<_>, Vec<_>) = exprs.into_iter().unzip();
        Ok(Self {
            core: ExecCore::new("project", Arc::new(Schema::new(fields))),
            input,
            projection: Projection::Exprs(exprs),
        })
    }

    fn project(&mut self, ctx: &QueryContext, batch: &RowBatch) -> ExecResult<RowBatch> {
        match &self.projection {
            Projection::Columns(indices) => batch.project(indices),
            Projection::Exprs(exprs) => {
                let schema = self.core.schema();
                let mut columns: Vec<Vec<ScalarValue>> = exprs
                    .iter()
                    .map(|_| Vec::with_capacity(batch.num_rows()))
                    .collect();
                for row in batch.rows() {
                    self.core.tick(ctx)?;
                    for (expr, column) in exprs.iter().zip(columns.iter_mut()) {
                        let value = expr.evaluate(ctx, &row).map_err(|err| {
                            if err.is_cancellation() {
                                return err;
                            }
                            ExecError::Evaluation {
                                operator: self.core.name().to_string(),
                                row: row.index(),
                                message: err.to_string(),
                            }
                        })?;
                        column.push(value);
                    }
                }
                let arrays = columns
                    .iter()
                    .zip(schema.fields())
                    .map(|(values, field)| build_array(values, field.data_type()))
                    .collect::<ExecResult<Vec<ArrayRef>>>()?;
                Ok(RowBatch::new(RecordBatch::try_new(schema, arrays)?))
            }
        }
    }

    fn advance_inner(&mut self, ctx: &QueryContext) -> ExecResult<IterationResult> {
        loop {
            let result = pull(self.input.as_mut(), ctx, self.core.name())?;
            if result == IterationResult::Wait {
                return Ok(IterationResult::Wait);
            }
            let batch = self.input.current_batch().clone();
            if batch.is_empty() {
                if result.is_done() {
                    return Ok(self.core.done());
                }
                continue;
            }
            let projected = self.project(ctx, &batch)?;
            return Ok(self.core.emit(projected, result.is_done()));
        }
    }
}

impl Exec for ProjectExec {
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
        let result = self.advance_inner(ctx);
        self.core.finish(result)
    }

    fn current_batch(&self) -> &RowBatch {
        self.core.current_batch()
    }
}
