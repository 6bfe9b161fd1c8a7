//! Query Driver — polls an operator tree to completion
//!
//! The driver owns the root of one operator tree and the query's shared
//! context. It is the only caller of the root's `advance`, so the tree is
//! never polled from two threads at once. On failure it cancels the context
//! and drops the tree before reporting the error.

use crate::batch::RowBatch;
use crate::context::QueryContext;
use crate::error::{ExecError, ExecResult};
use crate::executor::operators::{Exec, IterationResult};
use rayon::prelude::*;
use std::sync::Arc;
use std::thread;

/// Outcome of a single [`QueryDriver::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    /// The root returned `Wait`.
    Pending,
    /// A batch was produced; more may follow.
    Progress,
    /// The root completed; all output is collected.
    Finished,
}

/// 쿼리 드라이버 — 루트 연산자를 반복 호출
pub struct QueryDriver {
    root: Option<Box<dyn Exec>>,
    root_name: String,
    ctx: Arc<QueryContext>,
    batches: Vec<RowBatch>,
    finished: bool,
    polls: u64,
    waits: u64,
}

impl QueryDriver {
    pub fn new(root: Box<dyn Exec>, ctx: Arc<QueryContext>) -> ExecResult<Self> {
        ctx.config().validate()?;
        let root_name = root.name().to_string();
        tracing::debug!(
            target: "exec",
            query_id = ctx.query_id(),
            root = %root_name,
            "driver created"
        );
        Ok(Self {
            root: Some(root),
            root_name,
            ctx,
            batches: Vec::new(),
            finished: false,
            polls: 0,
            waits: 0,
        })
    }

    pub fn context(&self) -> &Arc<QueryContext> {
        &self.ctx
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Non-empty batches produced so far, in order.
    pub fn batches(&self) -> &[RowBatch] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<RowBatch> {
        self.batches
    }

    pub fn row_count(&self) -> usize {
        self.batches.iter().map(RowBatch::num_rows).sum()
    }

    /// Number of `advance` calls on the root.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Number of those calls that returned `Wait`.
    pub fn waits(&self) -> u64 {
        self.waits
    }

    /// Advance the root once.
    pub fn poll(&mut self) -> ExecResult<DriverStatus> {
        if self.finished {
            return Ok(DriverStatus::Finished);
        }
        let Some(root) = self.root.as_mut() else {
            return Err(ExecError::OperatorFailed {
                operator: self.root_name.clone(),
            });
        };

        self.polls += 1;
        match root.advance(&self.ctx) {
            Ok(IterationResult::Wait) => {
                self.waits += 1;
                Ok(DriverStatus::Pending)
            }
            Ok(result) => {
                let batch = root.current_batch();
                if !batch.is_empty() {
                    self.batches.push(batch.clone());
                }
                if result.is_done() {
                    self.finished = true;
                    self.root = None;
                    tracing::debug!(
                        target: "exec",
                        query_id = self.ctx.query_id(),
                        rows = self.row_count(),
                        polls = self.polls,
                        waits = self.waits,
                        "query finished"
                    );
                    Ok(DriverStatus::Finished)
                } else {
                    Ok(DriverStatus::Progress)
                }
            }
            Err(err) => {
                self.abort(&err);
                Err(err)
            }
        }
    }

    /// Poll until finished, calling `on_wait` after every `Pending`.
    pub fn run<F>(&mut self, mut on_wait: F) -> ExecResult<()>
    where
        F: FnMut(&QueryContext) -> ExecResult<()>,
    {
        loop {
            match self.poll()? {
                DriverStatus::Finished => return Ok(()),
                DriverStatus::Progress => {}
                DriverStatus::Pending => {
                    if let Err(err) = on_wait(&self.ctx) {
                        self.abort(&err);
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Run independent drivers in parallel on the rayon pool.
    ///
    /// Drivers must not depend on each other: a driver waiting on another
    /// one that is queued behind it would spin. Use [`run_interleaved`]
    /// for dependent trees.
    ///
    /// [`run_interleaved`]: QueryDriver::run_interleaved
    pub fn run_all(drivers: Vec<QueryDriver>) -> Vec<ExecResult<Vec<RowBatch>>> {
        drivers
            .into_par_iter()
            .map(|mut driver| {
                driver.run(|_| {
                    thread::yield_now();
                    Ok(())
                })?;
                Ok(driver.into_batches())
            })
            .collect()
    }

    /// Poll dependent drivers round-robin on the current thread.
    ///
    /// `on_idle` runs after a full round in which no driver produced a batch
    /// or finished. The first error cancels every driver's context.
    pub fn run_interleaved<F>(drivers: &mut [QueryDriver], mut on_idle: F) -> ExecResult<()>
    where
        F: FnMut() -> ExecResult<()>,
    {
        loop {
            let mut all_finished = true;
            let mut progressed = false;
            for index in 0..drivers.len() {
                if drivers[index].is_finished() {
                    continue;
                }
                all_finished = false;
                match drivers[index].poll() {
                    Ok(DriverStatus::Pending) => {}
                    Ok(_) => progressed = true,
                    Err(err) => {
                        for driver in drivers.iter_mut() {
                            driver.abort(&err);
                        }
                        return Err(err);
                    }
                }
            }
            if all_finished {
                return Ok(());
            }
            if !progressed {
                if let Err(err) = on_idle() {
                    for driver in drivers.iter_mut() {
                        driver.abort(&err);
                    }
                    return Err(err);
                }
            }
        }
    }

    fn abort(&mut self, err: &ExecError) {
        if self.finished || self.root.is_none() {
            return;
        }
        self.ctx.cancel();
        self.root = None;
        if err.is_cancellation() {
            tracing::debug!(target: "exec", query_id = self.ctx.query_id(), "query cancelled");
        } else {
            tracing::warn!(
                target: "exec",
                query_id = self.ctx.query_id(),
                error = %err,
                "query failed"
            );
        }
    }
}
