//! Filter Operator — WHERE clause evaluation

use crate::batch::RowBatch;
use crate::context::QueryContext;
use crate::error::{ExecError, ExecResult};
use crate::executor::operators::{Exec, ExecCore, IterationResult, pull};
use crate::executor::predicate::Predicate;
use arrow::datatypes::SchemaRef;

/// 필터 연산자 (WHERE 조건) — 행 단위 predicate 평가
///
/// Scans the current upstream batch in row order and emits the matching
/// rows. One call emits at most `batch_size` matches and never mixes rows
/// of two upstream batches, so an upstream `Wait` is only ever observed
/// between batches and no partially scanned state is lost.
pub struct FilterExec {
    core: ExecCore,
    upstream: Box<dyn Exec>,
    predicate: Box<dyn Predicate>,
    /// Last upstream batch
    cur_batch: Option<RowBatch>,
    /// Next row to examine in `cur_batch`
    cur_pos: usize,
    /// Whether upstream operator is finished
    upstream_done: bool,
}

impl FilterExec {
    pub fn new(upstream: Box<dyn Exec>, predicate: impl Predicate + 'static) -> Self {
        let schema = upstream.schema();
        Self {
            core: ExecCore::new("filter", schema),
            upstream,
            predicate: Box::new(predicate),
            cur_batch: None,
            cur_pos: 0,
            upstream_done: false,
        }
    }

    fn advance_inner(&mut self, ctx: &QueryContext) -> ExecResult<IterationResult> {
        loop {
            // No batch -> need to fetch one
            if self.cur_batch.is_none() {
                if self.upstream_done {
                    return Ok(self.core.done());
                }

                match pull(self.upstream.as_mut(), ctx, self.core.name())? {
                    IterationResult::Wait => return Ok(IterationResult::Wait),
                    result @ (IterationResult::Fetched | IterationResult::FetchedDone) => {
                        self.upstream_done = result.is_done();
                        let batch = self.upstream.current_batch();
                        if !batch.is_empty() {
                            self.cur_batch = Some(batch.clone());
                            self.cur_pos = 0;
                        }
                        continue;
                    }
                }
            }

            if let Some(result) = self.scan_current_batch(ctx)? {
                return Ok(result);
            }
        }
    }

    /// Scan forward from the last consumed position.
    ///
    /// Returns `None` when the batch held no further match and upstream may
    /// still produce rows.
    fn scan_current_batch(&mut self, ctx: &QueryContext) -> ExecResult<Option<IterationResult>> {
        let Some(batch) = self.cur_batch.take() else {
            return Ok(None);
        };
        let limit = ctx.config().batch_limit();
        let row_count = batch.num_rows();

        let mut matches = Vec::new();
        let mut pos = self.cur_pos;
        while pos < row_count && matches.len() < limit {
            self.core.tick(ctx)?;
            let row = batch.row(pos)?;
            let keep = self
                .predicate
                .eval(ctx, &row)
                .map_err(|err| self.evaluation_error(&batch, pos, err))?;
            if keep {
                matches.push(pos);
            }
            pos += 1;
        }

        let exhausted = pos == row_count;
        let output = if matches.is_empty() {
            None
        } else if matches.len() == row_count {
            Some(batch.clone())
        } else {
            Some(batch.take(&matches)?)
        };

        if !exhausted {
            self.cur_batch = Some(batch);
            self.cur_pos = pos;
        }

        match output {
            Some(output) => Ok(Some(
                self.core.emit(output, exhausted && self.upstream_done),
            )),
            // Shifted behind with no match
            None if self.upstream_done && exhausted => Ok(Some(self.core.done())),
            None => Ok(None),
        }
    }

    fn evaluation_error(&self, batch: &RowBatch, pos: usize, err: ExecError) -> ExecError {
        if err.is_cancellation() {
            return err;
        }
        let values = batch
            .row(pos)
            .and_then(|row| row.values())
            .map(|values| {
                values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        ExecError::Evaluation {
            operator: self.core.name().to_string(),
            row: pos,
            message: format!("{err} (row: [{values}])"),
        }
    }
}

impl Exec for FilterExec {
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
        if result.is_err() {
            self.cur_batch = None;
        }
        self.core.finish(result)
    }

    fn current_batch(&self) -> &RowBatch {
        self.core.current_batch()
    }
}
