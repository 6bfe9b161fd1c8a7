//! In-process exchange channel.
//!
//! A bounded queue connecting a [`LocalOutbox`] (sender side, owned by a
//! `SendExec`) to a [`ReceiveExec`] (receiver side, a leaf of another
//! operator tree). Both sides are cooperative: a full queue makes the sender
//! `Wait`, an empty one makes the receiver `Wait`.

use crate::batch::{Row, RowBatch};
use crate::config::ExecConfig;
use crate::context::QueryContext;
use crate::error::{ExecError, ExecResult};
use crate::exchange::outbox::{OfferOutcome, Outbox};
use crate::executor::operators::{Exec, ExecCore, IterationResult};
use arrow::datatypes::SchemaRef;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct ChannelState {
    /// One-row batches in arrival order
    rows: VecDeque<RowBatch>,
    closed: bool,
    accepted: u64,
    delivered: u64,
}

/// Constructor for local exchange channels.
pub struct LocalExchange;

impl LocalExchange {
    /// New channel buffering at most `capacity` rows.
    pub fn channel(schema: SchemaRef, capacity: usize) -> ExecResult<(LocalOutbox, ReceiveExec)> {
        if capacity == 0 {
            return Err(ExecError::InvalidArgument(
                "local exchange capacity must be positive".to_string(),
            ));
        }
        let state = Arc::new(Mutex::new(ChannelState::default()));
        let outbox = LocalOutbox {
            state: Arc::clone(&state),
            capacity,
        };
        let receiver = ReceiveExec {
            core: ExecCore::new("receive", schema),
            state,
        };
        Ok((outbox, receiver))
    }

    /// Channel sized by `config.outbox_capacity`.
    pub fn from_config(
        schema: SchemaRef,
        config: &ExecConfig,
    ) -> ExecResult<(LocalOutbox, ReceiveExec)> {
        Self::channel(schema, config.outbox_capacity)
    }
}

/// 로컬 outbox — 용량이 찬 경우 `Full`
pub struct LocalOutbox {
    state: Arc<Mutex<ChannelState>>,
    capacity: usize,
}

impl LocalOutbox {
    /// Rows accepted but not yet taken by the receiver.
    pub fn pending(&self) -> usize {
        self.state.lock().rows.len()
    }

    pub fn accepted(&self) -> u64 {
        self.state.lock().accepted
    }

    /// Rows the receiver has taken (receipt confirmed).
    pub fn delivered(&self) -> u64 {
        self.state.lock().delivered
    }
}

impl Outbox for LocalOutbox {
    fn offer(&mut self, row: &Row<'_>) -> ExecResult<OfferOutcome> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ExecError::InvalidArgument(
                "offer on a closed outbox".to_string(),
            ));
        }
        if state.rows.len() >= self.capacity {
            return Ok(OfferOutcome::Full);
        }
        state.rows.push_back(row.to_batch());
        state.accepted += 1;
        Ok(OfferOutcome::Accepted)
    }

    fn close(&mut self) -> ExecResult<()> {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            tracing::trace!(target: "exchange", accepted = state.accepted, "local outbox closed");
        }
        Ok(())
    }
}

/// 수신 연산자 — 로컬 채널에서 행을 꺼낸다
pub struct ReceiveExec {
    core: ExecCore,
    state: Arc<Mutex<ChannelState>>,
}

impl ReceiveExec {
    fn advance_inner(&mut self, ctx: &QueryContext) -> ExecResult<IterationResult> {
        let mut state = self.state.lock();
        if state.rows.is_empty() {
            if state.closed {
                drop(state);
                return Ok(self.core.done());
            }
            return Ok(IterationResult::Wait);
        }

        let take = state.rows.len().min(ctx.config().batch_limit());
        let rows: Vec<RowBatch> = state.rows.drain(..take).collect();
        state.delivered += take as u64;
        let last = state.closed && state.rows.is_empty();
        drop(state);

        let batch = RowBatch::concat(&self.core.schema(), &rows)?;
        Ok(self.core.emit(batch, last))
    }
}

impl Exec for ReceiveExec {
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
