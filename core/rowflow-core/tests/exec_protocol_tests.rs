// Exec 프로토콜 통합 테스트
//
// Section 1: FilterExec 시나리오 (Wait / Fetched / FetchedDone)
// Section 2: 종료 후 멱등성, 실패 후 OperatorFailed
// Section 3: 취소
// Section 4: 속성 기반 테스트 (순서 보존, Wait 경계에서 유실 없음)

use proptest::prelude::*;
use rowflow_core::exchange::{LocalExchange, OfferOutcome, Outbox, RoundRobinPartitioner};
use rowflow_core::executor::{
    Exec, Expr, FilterExec, IterationResult, ProjectExec, ScriptStep, ScriptedExec, SendExec,
    ValuesExec, predicate_fn,
};
use rowflow_core::{ExecConfig, ExecError, ExecResult, QueryContext, QueryDriver, Row, RowBatch};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn ints(values: &[i64]) -> RowBatch {
    RowBatch::from_int64("v", values).unwrap()
}

fn values_of(batch: &RowBatch) -> Vec<i64> {
    batch
        .column_values(0)
        .unwrap()
        .into_iter()
        .map(|value| value.as_i64().unwrap())
        .collect()
}

fn is_even() -> Expr {
    Expr::col(0).modulo(Expr::lit(2_i64)).eq(Expr::lit(0_i64))
}

// ═══════════════════════════════════════════════════════════════════════════
// Section 1: FilterExec scenarios
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn filter_emits_matches_per_upstream_batch() {
    let ctx = QueryContext::new(1);
    let upstream = ScriptedExec::int64(vec![
        ScriptStep::Fetched(ints(&[1, 2, 3])),
        ScriptStep::Fetched(ints(&[4, 5])),
        ScriptStep::FetchedDone(ints(&[])),
    ])
    .unwrap();
    let mut filter = FilterExec::new(Box::new(upstream), is_even());

    assert_eq!(filter.advance(&ctx).unwrap(), IterationResult::Fetched);
    assert_eq!(values_of(filter.current_batch()), vec![2]);
    assert_eq!(filter.advance(&ctx).unwrap(), IterationResult::Fetched);
    assert_eq!(values_of(filter.current_batch()), vec![4]);
    assert_eq!(filter.advance(&ctx).unwrap(), IterationResult::FetchedDone);
    assert!(filter.current_batch().is_empty());
}

#[test]
fn filter_over_exhausted_upstream_polls_once() {
    let ctx = QueryContext::new(1);
    let upstream = ScriptedExec::int64(vec![ScriptStep::FetchedDone(ints(&[]))]).unwrap();
    let polls = upstream.poll_counter();
    let mut filter = FilterExec::new(Box::new(upstream), is_even());

    assert_eq!(filter.advance(&ctx).unwrap(), IterationResult::FetchedDone);
    assert_eq!(filter.advance(&ctx).unwrap(), IterationResult::FetchedDone);
    assert_eq!(polls.load(Ordering::SeqCst), 1);
}

#[test]
fn filter_propagates_waits() {
    let ctx = QueryContext::new(1);
    let upstream = ScriptedExec::int64(vec![
        ScriptStep::Wait,
        ScriptStep::Wait,
        ScriptStep::Wait,
        ScriptStep::FetchedDone(ints(&[10, 11])),
    ])
    .unwrap();
    let eleven = Expr::col(0).eq(Expr::lit(11_i64));
    let mut filter = FilterExec::new(Box::new(upstream), eleven);

    for _ in 0..3 {
        assert_eq!(filter.advance(&ctx).unwrap(), IterationResult::Wait);
    }
    assert_eq!(filter.advance(&ctx).unwrap(), IterationResult::FetchedDone);
    assert_eq!(values_of(filter.current_batch()), vec![11]);
}

#[test]
fn filter_then_project_pipeline() {
    let scan = ValuesExec::from_int64("v", &[&[1, 2, 3, 4], &[5, 6]]).unwrap();
    let filter = FilterExec::new(Box::new(scan), is_even());
    let project = ProjectExec::columns(Box::new(filter), vec![0]).unwrap();
    let mut driver =
        QueryDriver::new(Box::new(project), QueryContext::new(1).into_shared()).unwrap();
    driver.run(|_| Ok(())).unwrap();

    let rows: Vec<i64> = driver.batches().iter().flat_map(values_of).collect();
    assert_eq!(rows, vec![2, 4, 6]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Section 2: terminal states
// ═══════════════════════════════════════════════════════════════════════════

/// Accepts every row and counts `close` calls.
struct CountingOutbox {
    accepted: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Outbox for CountingOutbox {
    fn offer(&mut self, _row: &Row<'_>) -> ExecResult<OfferOutcome> {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        Ok(OfferOutcome::Accepted)
    }

    fn close(&mut self) -> ExecResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn every_operator_stays_done() {
    let ctx = QueryContext::new(1);

    let accepted = Arc::new(AtomicUsize::new(0));
    let closes = Arc::new(AtomicUsize::new(0));
    let send = SendExec::new(
        Box::new(ValuesExec::from_int64("v", &[&[1, 2, 3]]).unwrap()),
        Box::new(RoundRobinPartitioner::new(1).unwrap()),
        vec![Box::new(CountingOutbox {
            accepted: Arc::clone(&accepted),
            closes: Arc::clone(&closes),
        })],
    )
    .unwrap();

    let rows = ints(&[7, 8]);
    let (mut outbox, receiver) = LocalExchange::channel(rows.schema(), 4).unwrap();
    for row in rows.rows() {
        outbox.offer(&row).unwrap();
    }
    outbox.close().unwrap();

    let operators: Vec<Box<dyn Exec>> = vec![
        Box::new(send),
        Box::new(receiver),
        Box::new(ValuesExec::from_int64("v", &[&[1, 2]]).unwrap()),
        Box::new(FilterExec::new(
            Box::new(ValuesExec::from_int64("v", &[&[1, 2]]).unwrap()),
            is_even(),
        )),
        Box::new(
            ProjectExec::columns(
                Box::new(ValuesExec::from_int64("v", &[&[1, 2]]).unwrap()),
                vec![0],
            )
            .unwrap(),
        ),
    ];

    for mut op in operators {
        let mut result = op.advance(&ctx).unwrap();
        while !result.is_done() {
            result = op.advance(&ctx).unwrap();
        }
        for _ in 0..3 {
            assert_eq!(op.advance(&ctx).unwrap(), IterationResult::FetchedDone);
            assert!(op.current_batch().is_empty(), "{} re-emitted rows", op.name());
        }
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_operator_never_repolls_upstream() {
    let ctx = QueryContext::new(1);
    let upstream = ScriptedExec::int64(vec![
        ScriptStep::Fail("connection reset".into()),
        ScriptStep::FetchedDone(ints(&[2])),
    ])
    .unwrap();
    let polls = upstream.poll_counter();
    let mut filter = FilterExec::new(Box::new(upstream), is_even());

    let err = filter.advance(&ctx).unwrap_err();
    assert!(matches!(err, ExecError::UpstreamFailure { .. }));
    assert!(err.root_cause().to_string().contains("connection reset"));

    assert!(matches!(
        filter.advance(&ctx),
        Err(ExecError::OperatorFailed { .. })
    ));
    assert_eq!(polls.load(Ordering::SeqCst), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Section 3: cancellation
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn cancellation_before_poll() {
    let ctx = QueryContext::new(5);
    let scan = ValuesExec::from_int64("v", &[&[1, 2, 3]]).unwrap();
    let mut filter = FilterExec::new(Box::new(scan), is_even());
    ctx.cancel();

    let err = filter.advance(&ctx).unwrap_err();
    assert!(err.is_cancellation());
    assert!(matches!(
        filter.advance(&ctx),
        Err(ExecError::OperatorFailed { .. })
    ));
}

#[test]
fn cancellation_mid_scan_is_bounded() {
    let ctx = QueryContext::new(5)
        .with_config(ExecConfig::new().with_cancel_check_interval(4))
        .into_shared();
    let values: Vec<i64> = (0..1000).collect();
    let scan = ValuesExec::from_int64("v", &[&values[..]]).unwrap();
    let filter = FilterExec::new(
        Box::new(scan),
        predicate_fn(|ctx: &QueryContext, row: &Row<'_>| {
            if row.index() == 10 {
                ctx.cancel();
            }
            Ok(true)
        }),
    );
    let mut driver = QueryDriver::new(Box::new(filter), ctx).unwrap();

    let err = driver.run(|_| Ok(())).unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(driver.row_count(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Section 4: properties
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Feed {
    batches: Vec<Vec<i64>>,
    waits_before: Vec<u8>,
    last_carries_rows: bool,
}

fn arb_feed() -> impl Strategy<Value = Feed> {
    (
        prop::collection::vec(prop::collection::vec(-50_i64..50, 0..8), 1..6),
        prop::collection::vec(0_u8..3, 6),
        any::<bool>(),
    )
        .prop_map(|(batches, waits_before, last_carries_rows)| Feed {
            batches,
            waits_before,
            last_carries_rows,
        })
}

fn script(feed: &Feed) -> Vec<ScriptStep> {
    let mut steps = Vec::new();
    let count = feed.batches.len();
    for (i, batch) in feed.batches.iter().enumerate() {
        for _ in 0..feed.waits_before[i] {
            steps.push(ScriptStep::Wait);
        }
        let is_last = i + 1 == count;
        if is_last && feed.last_carries_rows {
            steps.push(ScriptStep::FetchedDone(ints(batch)));
        } else {
            steps.push(ScriptStep::Fetched(ints(batch)));
        }
    }
    if !feed.last_carries_rows {
        steps.push(ScriptStep::Wait);
        steps.push(ScriptStep::FetchedDone(ints(&[])));
    }
    steps
}

proptest! {
    #[test]
    fn filter_output_is_ordered_subsequence(feed in arb_feed(), batch_size in 1_usize..5) {
        let ctx = QueryContext::new(1)
            .with_config(ExecConfig::new().with_batch_size(batch_size))
            .into_shared();
        let upstream = ScriptedExec::int64(script(&feed)).unwrap();
        let filter = FilterExec::new(Box::new(upstream), is_even());
        let mut driver = QueryDriver::new(Box::new(filter), ctx).unwrap();
        driver.run(|_| Ok(())).unwrap();

        let expected: Vec<i64> = feed
            .batches
            .iter()
            .flatten()
            .copied()
            .filter(|v| v % 2 == 0)
            .collect();
        let actual: Vec<i64> = driver.batches().iter().flat_map(values_of).collect();
        prop_assert_eq!(actual, expected);
        for batch in driver.batches() {
            prop_assert!(batch.num_rows() <= batch_size);
        }
    }

    #[test]
    fn waits_never_lose_or_duplicate_rows(feed in arb_feed()) {
        let ctx = QueryContext::new(1);
        let upstream = ScriptedExec::int64(script(&feed)).unwrap();
        let mut filter = FilterExec::new(Box::new(upstream), predicate_fn(|_: &QueryContext, _: &Row<'_>| Ok(true)));

        let mut seen = Vec::new();
        loop {
            match filter.advance(&ctx).unwrap() {
                IterationResult::Wait => {}
                IterationResult::Fetched => seen.extend(values_of(filter.current_batch())),
                IterationResult::FetchedDone => {
                    seen.extend(values_of(filter.current_batch()));
                    break;
                }
            }
        }
        let expected: Vec<i64> = feed.batches.iter().flatten().copied().collect();
        prop_assert_eq!(seen, expected);
    }
}
