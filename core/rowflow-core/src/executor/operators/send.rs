//! Send Operator — routes upstream rows into outboxes

use crate::batch::RowBatch;
use crate::context::QueryContext;
use crate::error::{ExecError, ExecResult};
use crate::exchange::{OfferOutcome, Outbox, OutboxId, SendPartitioner};
use crate::executor::operators::{Exec, ExecCore, IterationResult, pull};
use arrow::datatypes::SchemaRef;

/// 전송 연산자 — 행마다 파티셔너로 outbox를 골라 보낸다
///
/// A sink: it publishes no rows and reports `FetchedDone` with an empty
/// batch once every upstream row was accepted and all outboxes are closed.
/// An outbox reporting `Full` makes the operator `Wait`; the refused row is
/// re-offered to the same outbox on the next poll.
pub struct SendExec {
    core: ExecCore,
    upstream: Box<dyn Exec>,
    partitioner: Box<dyn SendPartitioner>,
    outboxes: Vec<Box<dyn Outbox>>,
    cur_batch: Option<RowBatch>,
    cur_pos: usize,
    /// Destination of the row at `cur_pos`, already mapped but not accepted
    pending: Option<OutboxId>,
    upstream_done: bool,
    rows_sent: Vec<u64>,
}

impl SendExec {
    pub fn new(
        upstream: Box<dyn Exec>,
        partitioner: Box<dyn SendPartitioner>,
        outboxes: Vec<Box<dyn Outbox>>,
    ) -> ExecResult<Self> {
        if outboxes.is_empty() {
            return Err(ExecError::Routing {
                message: "send operator has no outboxes".to_string(),
            });
        }
        if partitioner.outbox_count() != outboxes.len() {
            return Err(ExecError::Routing {
                message: format!(
                    "partitioner routes into {} outboxes but {} were given",
                    partitioner.outbox_count(),
                    outboxes.len()
                ),
            });
        }
        let schema = upstream.schema();
        let rows_sent = vec![0; outboxes.len()];
        Ok(Self {
            core: ExecCore::new("send", schema),
            upstream,
            partitioner,
            outboxes,
            cur_batch: None,
            cur_pos: 0,
            pending: None,
            upstream_done: false,
            rows_sent,
        })
    }

    /// Rows accepted per outbox so far.
    pub fn rows_sent(&self) -> &[u64] {
        &self.rows_sent
    }

    fn advance_inner(&mut self, ctx: &QueryContext) -> ExecResult<IterationResult> {
        loop {
            if let Some(batch) = self.cur_batch.take() {
                if self.send_batch(ctx, &batch)? {
                    continue;
                }
                self.cur_batch = Some(batch);
                return Ok(IterationResult::Wait);
            }

            if self.upstream_done {
                for outbox in &mut self.outboxes {
                    outbox.close()?;
                }
                tracing::debug!(
                    target: "exchange",
                    operator = %self.core.name(),
                    rows_sent = ?self.rows_sent,
                    "send complete"
                );
                return Ok(self.core.done());
            }

            match pull(self.upstream.as_mut(), ctx, self.core.name())? {
                IterationResult::Wait => return Ok(IterationResult::Wait),
                result => {
                    self.upstream_done = result.is_done();
                    let batch = self.upstream.current_batch();
                    if !batch.is_empty() {
                        self.cur_batch = Some(batch.clone());
                        self.cur_pos = 0;
                    }
                }
            }
        }
    }

    /// Offer rows from `cur_pos`; `false` when an outbox pushed back.
    fn send_batch(&mut self, ctx: &QueryContext, batch: &RowBatch) -> ExecResult<bool> {
        while self.cur_pos < batch.num_rows() {
            let row = batch.row(self.cur_pos)?;
            let target = match self.pending {
                Some(target) => target,
                None => {
                    self.core.tick(ctx)?;
                    let target = self.partitioner.map(ctx, &row)?;
                    if target.0 >= self.outboxes.len() {
                        return Err(ExecError::Routing {
                            message: format!(
                                "partitioner chose {target} but only {} outboxes exist",
                                self.outboxes.len()
                            ),
                        });
                    }
                    target
                }
            };
            match self.outboxes[target.0].offer(&row)? {
                OfferOutcome::Accepted => {
                    self.rows_sent[target.0] += 1;
                    self.pending = None;
                    self.cur_pos += 1;
                }
                OfferOutcome::Full => {
                    tracing::trace!(
                        target: "exchange",
                        outbox = %target,
                        row = self.cur_pos,
                        "outbox full, backing off"
                    );
                    self.pending = Some(target);
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

impl Exec for SendExec {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{HashPartitioner, LocalExchange, RoundRobinPartitioner};
    use crate::executor::operators::{ScriptStep, ScriptedExec, ValuesExec};
    use crate::batch::Row;
    use std::sync::Arc;
    use parking_lot::Mutex;

    fn ints(values: &[i64]) -> RowBatch {
        RowBatch::from_int64("v", values).unwrap()
    }

    /// Records every accepted row; reports `Full` on scripted offers.
    struct RecordingOutbox {
        rows: Arc<Mutex<Vec<i64>>>,
        refusals: usize,
        closed: Arc<Mutex<bool>>,
    }

    impl Outbox for RecordingOutbox {
        fn offer(&mut self, row: &Row<'_>) -> ExecResult<OfferOutcome> {
            if self.refusals > 0 {
                self.refusals -= 1;
                return Ok(OfferOutcome::Full);
            }
            self.rows.lock().push(row.value(0)?.as_i64().unwrap_or(-1));
            Ok(OfferOutcome::Accepted)
        }

        fn close(&mut self) -> ExecResult<()> {
            *self.closed.lock() = true;
            Ok(())
        }
    }

    fn recording(refusals: usize) -> (RecordingOutbox, Arc<Mutex<Vec<i64>>>, Arc<Mutex<bool>>) {
        let rows = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));
        let outbox = RecordingOutbox {
            rows: Arc::clone(&rows),
            refusals,
            closed: Arc::clone(&closed),
        };
        (outbox, rows, closed)
    }

    #[test]
    fn every_row_lands_in_exactly_one_outbox() {
        let ctx = QueryContext::new(1);
        let values: Vec<i64> = (0..300).collect();
        let upstream = ValuesExec::from_int64("v", &[&values[..150], &values[150..]]).unwrap();
        let (a, rows_a, closed_a) = recording(0);
        let (b, rows_b, _) = recording(0);
        let (c, rows_c, _) = recording(0);
        let mut send = SendExec::new(
            Box::new(upstream),
            Box::new(HashPartitioner::new(&[0], 3).unwrap()),
            vec![Box::new(a), Box::new(b), Box::new(c)],
        )
        .unwrap();

        assert_eq!(send.advance(&ctx).unwrap(), IterationResult::FetchedDone);
        assert!(send.current_batch().is_empty());
        assert!(*closed_a.lock());

        let mut all: Vec<i64> = [rows_a, rows_b, rows_c]
            .iter()
            .flat_map(|rows| rows.lock().clone())
            .collect();
        all.sort_unstable();
        assert_eq!(all, values);
        assert_eq!(send.rows_sent().iter().sum::<u64>(), 300);
    }

    #[test]
    fn full_outbox_waits_and_retries_same_row() {
        let ctx = QueryContext::new(1);
        let upstream = ValuesExec::from_int64("v", &[&[1, 2, 3, 4]]).unwrap();
        let (a, rows_a, _) = recording(0);
        let (b, rows_b, _) = recording(2);
        let mut send = SendExec::new(
            Box::new(upstream),
            Box::new(RoundRobinPartitioner::new(2).unwrap()),
            vec![Box::new(a), Box::new(b)],
        )
        .unwrap();

        assert_eq!(send.advance(&ctx).unwrap(), IterationResult::Wait);
        assert_eq!(send.advance(&ctx).unwrap(), IterationResult::Wait);
        assert_eq!(send.advance(&ctx).unwrap(), IterationResult::FetchedDone);

        // round robin is consulted once per row, so refusals do not shift routing
        assert_eq!(*rows_a.lock(), vec![1, 3]);
        assert_eq!(*rows_b.lock(), vec![2, 4]);
    }

    #[test]
    fn local_channel_backpressure() {
        let ctx = QueryContext::new(1);
        let upstream = ValuesExec::from_int64("v", &[&[1, 2, 3, 4, 5]]).unwrap();
        let (outbox, mut receiver) = LocalExchange::channel(upstream.schema(), 2).unwrap();
        let mut send = SendExec::new(
            Box::new(upstream),
            Box::new(RoundRobinPartitioner::new(1).unwrap()),
            vec![Box::new(outbox)],
        )
        .unwrap();

        let mut received = Vec::new();
        loop {
            let sent = send.advance(&ctx).unwrap();
            match receiver.advance(&ctx).unwrap() {
                IterationResult::Wait => {}
                result => {
                    for value in receiver.current_batch().column_values(0).unwrap() {
                        received.push(value.as_i64().unwrap());
                    }
                    if result.is_done() {
                        break;
                    }
                }
            }
            assert!(sent != IterationResult::Fetched);
        }
        assert_eq!(received, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn mismatched_outbox_count_rejected() {
        let upstream = ValuesExec::from_int64("v", &[&[1]]).unwrap();
        let (a, _, _) = recording(0);
        let result = SendExec::new(
            Box::new(upstream),
            Box::new(HashPartitioner::new(&[0], 2).unwrap()),
            vec![Box::new(a)],
        );
        assert!(matches!(result, Err(ExecError::Routing { .. })));
    }

    #[test]
    fn upstream_wait_and_failure() {
        let ctx = QueryContext::new(1);
        let upstream = ScriptedExec::int64(vec![
            ScriptStep::Wait,
            ScriptStep::Fetched(ints(&[1])),
            ScriptStep::Fail("peer lost".into()),
        ])
        .unwrap();
        let (a, rows_a, closed_a) = recording(0);
        let mut send = SendExec::new(
            Box::new(upstream),
            Box::new(RoundRobinPartitioner::new(1).unwrap()),
            vec![Box::new(a)],
        )
        .unwrap();

        assert_eq!(send.advance(&ctx).unwrap(), IterationResult::Wait);
        let err = send.advance(&ctx).unwrap_err();
        assert!(matches!(err, ExecError::UpstreamFailure { .. }));
        assert_eq!(*rows_a.lock(), vec![1]);
        assert!(!*closed_a.lock());
    }
}
