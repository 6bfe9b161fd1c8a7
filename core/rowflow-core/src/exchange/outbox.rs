//! Outbox contract — a sink for rows bound to one destination.

use crate::batch::Row;
use crate::error::ExecResult;
use std::fmt;

/// Index into the fixed outbox set of a send operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutboxId(pub usize);

impl fmt::Display for OutboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "outbox#{}", self.0)
    }
}

/// Result of offering a row to an outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Row taken for eventual delivery (not a confirmation of remote receipt).
    Accepted,
    /// No capacity right now; the row was not taken and must be re-offered.
    Full,
}

/// 전송 대상 하나에 대한 싱크
///
/// Delivery may be asynchronous. An outbox either accepts a row or reports
/// `Full`; it never drops one silently.
pub trait Outbox: Send {
    fn offer(&mut self, row: &Row<'_>) -> ExecResult<OfferOutcome>;

    /// No more rows will be offered.
    fn close(&mut self) -> ExecResult<()>;
}
