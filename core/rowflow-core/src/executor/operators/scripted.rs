//! Scripted Operator — replays a fixed sequence of outcomes.
//!
//! Stands in for a network-backed or otherwise flaky upstream in tests and
//! benchmarks: each `advance` consumes one scripted step.

use crate::batch::RowBatch;
use crate::context::QueryContext;
use crate::error::{ExecError, ExecResult};
use crate::executor::operators::{Exec, ExecCore, IterationResult};
use arrow::datatypes::SchemaRef;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 스크립트 단계
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Wait,
    Fetched(RowBatch),
    FetchedDone(RowBatch),
    /// Source failure with the given message.
    Fail(String),
}

/// 스크립트 재생 연산자
pub struct ScriptedExec {
    core: ExecCore,
    steps: VecDeque<ScriptStep>,
    polls: Arc<AtomicUsize>,
}

impl ScriptedExec {
    pub fn new(schema: SchemaRef, steps: Vec<ScriptStep>) -> Self {
        Self {
            core: ExecCore::new("scripted", schema),
            steps: steps.into(),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Int64 column `v`; handy for tests.
    pub fn int64(steps: Vec<ScriptStep>) -> ExecResult<Self> {
        let schema = RowBatch::from_int64("v", &[])?.schema();
        Ok(Self::new(schema, steps))
    }

    /// Shared counter of every `advance` call, including terminal ones.
    pub fn poll_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.polls)
    }

    pub fn remaining_steps(&self) -> usize {
        self.steps.len()
    }

    fn advance_inner(&mut self) -> ExecResult<IterationResult> {
        match self.steps.pop_front() {
            Some(ScriptStep::Wait) => Ok(IterationResult::Wait),
            Some(ScriptStep::Fetched(batch)) => Ok(self.core.emit(batch, false)),
            Some(ScriptStep::FetchedDone(batch)) => Ok(self.core.emit(batch, true)),
            Some(ScriptStep::Fail(message)) => Err(ExecError::Source {
                operator: self.core.name().to_string(),
                message,
            }),
            None => Err(ExecError::Source {
                operator: self.core.name().to_string(),
                message: "script exhausted without a final batch".to_string(),
            }),
        }
    }
}

impl Exec for ScriptedExec {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn schema(&self) -> SchemaRef {
        self.core.schema()
    }

    fn advance(&mut self, ctx: &QueryContext) -> ExecResult<IterationResult> {
        self.polls.fetch_add(1, Ordering::Relaxed);
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
