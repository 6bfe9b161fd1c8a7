//! Exec Trait — cooperative pull execution model
//!
//! Every operator is driven through [`Exec::advance`], which never blocks:
//! when progress depends on an external event it returns
//! [`IterationResult::Wait`] and the driver polls again later. An `Err` is
//! the fourth, terminal outcome.

use crate::batch::RowBatch;
use crate::context::QueryContext;
use crate::error::{ExecError, ExecResult};
use arrow::datatypes::SchemaRef;

/// `advance()` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationResult {
    /// No progress possible right now; poll again later.
    Wait,
    /// A new batch is available; more may follow.
    Fetched,
    /// The final (possibly empty) batch is available.
    FetchedDone,
}

impl IterationResult {
    pub fn is_done(self) -> bool {
        self == IterationResult::FetchedDone
    }

    /// True when `current_batch()` is valid.
    pub fn has_batch(self) -> bool {
        self != IterationResult::Wait
    }
}

/// 연산자 트레이트 — 협력적 Pull 실행 모델
///
/// Operators are polled from one thread at a time. `Send` lets a tree move
/// between threads between polls.
pub trait Exec: Send {
    /// Operator label used in diagnostics.
    fn name(&self) -> &str;

    /// 출력 스키마 반환
    fn schema(&self) -> SchemaRef;

    /// Drive the operator one step.
    ///
    /// After `FetchedDone` every later call returns `FetchedDone` with an
    /// empty batch without touching upstream. After an `Err` every later
    /// call fails with [`ExecError::OperatorFailed`].
    fn advance(&mut self, ctx: &QueryContext) -> ExecResult<IterationResult>;

    /// Batch produced by the most recent `Fetched`/`FetchedDone`.
    fn current_batch(&self) -> &RowBatch;
}

/// 연산자 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    Running,
    Done,
    Failed,
}

/// Shared bookkeeping every operator embeds.
///
/// Owns the published batch and the terminal state so that idempotent
/// completion, fail-stop behavior and cancellation checks are identical
/// across operators. Typical use:
///
/// ```ignore
/// fn advance(&mut self, ctx: &QueryContext) -> ExecResult<IterationResult> {
///     if let Some(result) = self.core.begin(ctx)? {
///         return Ok(result);
///     }
///     let result = self.advance_inner(ctx);
///     self.core.finish(result)
/// }
/// ```
#[derive(Debug)]
pub struct ExecCore {
    name: String,
    schema: SchemaRef,
    state: ExecState,
    batch: RowBatch,
    rows_emitted: u64,
    batches_emitted: u64,
    rows_since_check: usize,
}

impl ExecCore {
    pub fn new(name: impl Into<String>, schema: SchemaRef) -> Self {
        let batch = RowBatch::empty(schema.clone());
        Self {
            name: name.into(),
            schema,
            state: ExecState::Running,
            batch,
            rows_emitted: 0,
            batches_emitted: 0,
            rows_since_check: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    pub fn current_batch(&self) -> &RowBatch {
        &self.batch
    }

    pub fn rows_emitted(&self) -> u64 {
        self.rows_emitted
    }

    pub fn batches_emitted(&self) -> u64 {
        self.batches_emitted
    }

    /// Entry check for `advance`.
    ///
    /// Returns `Some(FetchedDone)` once done, `OperatorFailed` once failed,
    /// `Cancelled` if the query was cancelled, and `None` when the operator
    /// should run.
    pub fn begin(&mut self, ctx: &QueryContext) -> ExecResult<Option<IterationResult>> {
        match self.state {
            ExecState::Done => {
                if !self.batch.is_empty() {
                    self.batch = RowBatch::empty(self.schema.clone());
                }
                return Ok(Some(IterationResult::FetchedDone));
            }
            ExecState::Failed => {
                return Err(ExecError::OperatorFailed {
                    operator: self.name.clone(),
                });
            }
            ExecState::Running => {}
        }
        if let Err(err) = ctx.check_cancelled() {
            self.fail(&err);
            return Err(err);
        }
        Ok(None)
    }

    /// Cancellation check inside row loops, every `cancel_check_interval` rows.
    pub fn tick(&mut self, ctx: &QueryContext) -> ExecResult<()> {
        self.rows_since_check += 1;
        if self.rows_since_check >= ctx.config().cancel_check_interval {
            self.rows_since_check = 0;
            ctx.check_cancelled()?;
        }
        Ok(())
    }

    /// Publish `batch`; `FetchedDone` when `last`.
    pub fn emit(&mut self, batch: RowBatch, last: bool) -> IterationResult {
        self.rows_emitted += batch.num_rows() as u64;
        self.batches_emitted += 1;
        tracing::trace!(
            target: "exec",
            operator = %self.name,
            rows = batch.num_rows(),
            last,
            "batch emitted"
        );
        self.batch = batch;
        if last {
            IterationResult::FetchedDone
        } else {
            IterationResult::Fetched
        }
    }

    /// Publish an empty final batch.
    pub fn done(&mut self) -> IterationResult {
        self.batch = RowBatch::empty(self.schema.clone());
        IterationResult::FetchedDone
    }

    /// Record the outcome of one `advance` step.
    pub fn finish(&mut self, result: ExecResult<IterationResult>) -> ExecResult<IterationResult> {
        match &result {
            Ok(IterationResult::FetchedDone) => {
                self.state = ExecState::Done;
                tracing::debug!(
                    target: "exec",
                    operator = %self.name,
                    rows = self.rows_emitted,
                    batches = self.batches_emitted,
                    "operator done"
                );
            }
            Err(err) => self.fail(err),
            Ok(_) => {}
        }
        result
    }

    fn fail(&mut self, err: &ExecError) {
        self.state = ExecState::Failed;
        self.batch = RowBatch::empty(self.schema.clone());
        if err.is_cancellation() {
            tracing::debug!(target: "exec", operator = %self.name, "operator cancelled");
        } else {
            tracing::warn!(target: "exec", operator = %self.name, error = %err, "operator failed");
        }
    }
}

/// Poll `upstream`, wrapping its failure with the caller's name.
pub fn pull(
    upstream: &mut dyn Exec,
    ctx: &QueryContext,
    operator: &str,
) -> ExecResult<IterationResult> {
    upstream
        .advance(ctx)
        .map_err(|err| ExecError::upstream(operator, err))
}
