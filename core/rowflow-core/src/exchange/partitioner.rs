//! Send partitioners — decide which outbox receives a row.
//!
//! Routing policy is separate from delivery: a partitioner only names an
//! [`OutboxId`] from the fixed set the send operator was built with. Failing
//! to resolve a destination is a [`ExecError::Routing`] error, never a silent
//! fallback to some default outbox.

use crate::batch::Row;
use crate::context::{MemberId, QueryContext};
use crate::error::{ExecError, ExecResult};
use crate::exchange::outbox::OutboxId;
use crate::value::ScalarValue;
use ahash::AHashMap;
use smallvec::SmallVec;
use std::cmp::Ordering as CmpOrdering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Partitioner which decides where to send a specific row.
pub trait SendPartitioner: Send {
    /// Size of the outbox set this partitioner routes into.
    fn outbox_count(&self) -> usize;

    /// Map a row to its outbox. Must succeed for every valid row.
    fn map(&self, ctx: &QueryContext, row: &Row<'_>) -> ExecResult<OutboxId>;
}

type KeyColumns = SmallVec<[usize; 4]>;

fn require_outboxes(count: usize) -> ExecResult<()> {
    if count == 0 {
        return Err(ExecError::Routing {
            message: "partitioner configured with zero destinations".to_string(),
        });
    }
    Ok(())
}

fn require_keys(keys: &[usize]) -> ExecResult<()> {
    if keys.is_empty() {
        return Err(ExecError::InvalidArgument(
            "hash partitioning needs at least one key column".to_string(),
        ));
    }
    Ok(())
}

/// Hash of the key columns of `row`.
///
/// Uses SipHash with fixed keys so every node of the cluster running the
/// same build agrees on a row's destination.
pub fn hash_key(row: &Row<'_>, keys: &[usize]) -> ExecResult<u64> {
    let mut hasher = DefaultHasher::new();
    for &column in keys {
        row.value(column)?.hash(&mut hasher);
    }
    Ok(hasher.finish())
}

/// 해시 파티셔너 — hash(key) % N
pub struct HashPartitioner {
    keys: KeyColumns,
    outbox_count: usize,
}

impl HashPartitioner {
    pub fn new(keys: &[usize], outbox_count: usize) -> ExecResult<Self> {
        require_outboxes(outbox_count)?;
        require_keys(keys)?;
        Ok(Self {
            keys: keys.iter().copied().collect(),
            outbox_count,
        })
    }
}

impl SendPartitioner for HashPartitioner {
    fn outbox_count(&self) -> usize {
        self.outbox_count
    }

    fn map(&self, _ctx: &QueryContext, row: &Row<'_>) -> ExecResult<OutboxId> {
        let hash = hash_key(row, &self.keys)?;
        Ok(OutboxId((hash % self.outbox_count as u64) as usize))
    }
}

/// 라운드 로빈 파티셔너
///
/// Not a pure function of the row; the send operator maps each row exactly
/// once, so a row re-offered after backpressure keeps its destination.
pub struct RoundRobinPartitioner {
    outbox_count: usize,
    next: AtomicUsize,
}

impl RoundRobinPartitioner {
    pub fn new(outbox_count: usize) -> ExecResult<Self> {
        require_outboxes(outbox_count)?;
        Ok(Self {
            outbox_count,
            next: AtomicUsize::new(0),
        })
    }
}

impl SendPartitioner for RoundRobinPartitioner {
    fn outbox_count(&self) -> usize {
        self.outbox_count
    }

    fn map(&self, _ctx: &QueryContext, _row: &Row<'_>) -> ExecResult<OutboxId> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed);
        Ok(OutboxId(slot % self.outbox_count))
    }
}

/// 범위 파티셔너
///
/// `bounds` are ascending split points on one column; outbox `i` receives
/// values in `[bounds[i-1], bounds[i])`. NULL keys go to outbox 0.
pub struct RangePartitioner {
    column: usize,
    bounds: Vec<ScalarValue>,
}

impl RangePartitioner {
    pub fn new(column: usize, bounds: Vec<ScalarValue>) -> ExecResult<Self> {
        for pair in bounds.windows(2) {
            if pair[0].compare(&pair[1]) != Some(CmpOrdering::Less) {
                return Err(ExecError::InvalidArgument(format!(
                    "range bounds must be strictly ascending: {} then {}",
                    pair[0], pair[1]
                )));
            }
        }
        if bounds.iter().any(ScalarValue::is_null) {
            return Err(ExecError::InvalidArgument(
                "range bounds must not be NULL".to_string(),
            ));
        }
        Ok(Self { column, bounds })
    }
}

impl SendPartitioner for RangePartitioner {
    fn outbox_count(&self) -> usize {
        self.bounds.len() + 1
    }

    fn map(&self, _ctx: &QueryContext, row: &Row<'_>) -> ExecResult<OutboxId> {
        let value = row.value(self.column)?;
        if value.is_null() {
            return Ok(OutboxId(0));
        }
        for (idx, bound) in self.bounds.iter().enumerate() {
            match value.compare(bound) {
                Some(CmpOrdering::Less) => return Ok(OutboxId(idx)),
                Some(_) => {}
                None => {
                    return Err(ExecError::Routing {
                        message: format!("value {value} not comparable with range bound {bound}"),
                    });
                }
            }
        }
        Ok(OutboxId(self.bounds.len()))
    }
}

/// Everything to one outbox (gather to a coordinator).
pub struct SingleOutboxPartitioner {
    target: OutboxId,
    outbox_count: usize,
}

impl SingleOutboxPartitioner {
    pub fn new(target: OutboxId, outbox_count: usize) -> ExecResult<Self> {
        require_outboxes(outbox_count)?;
        if target.0 >= outbox_count {
            return Err(ExecError::Routing {
                message: format!("{target} outside {outbox_count} outboxes"),
            });
        }
        Ok(Self {
            target,
            outbox_count,
        })
    }
}

impl SendPartitioner for SingleOutboxPartitioner {
    fn outbox_count(&self) -> usize {
        self.outbox_count
    }

    fn map(&self, _ctx: &QueryContext, _row: &Row<'_>) -> ExecResult<OutboxId> {
        Ok(self.target)
    }
}

/// 파티션 소유자 파티셔너
///
/// key hash → partition id (from the context's partition table) → owning
/// member → that member's outbox. An unowned partition or an owner without
/// an outbox means the table is stale and routing fails.
pub struct OwnerPartitioner {
    keys: KeyColumns,
    outboxes: AHashMap<MemberId, OutboxId>,
    outbox_count: usize,
}

impl OwnerPartitioner {
    /// `members[i]` is served by outbox `i`.
    pub fn new(keys: &[usize], members: &[MemberId]) -> ExecResult<Self> {
        require_outboxes(members.len())?;
        require_keys(keys)?;
        let mut outboxes = AHashMap::with_capacity(members.len());
        for (idx, member) in members.iter().enumerate() {
            if outboxes.insert(*member, OutboxId(idx)).is_some() {
                return Err(ExecError::InvalidArgument(format!(
                    "{member} listed twice"
                )));
            }
        }
        Ok(Self {
            keys: keys.iter().copied().collect(),
            outboxes,
            outbox_count: members.len(),
        })
    }
}

impl SendPartitioner for OwnerPartitioner {
    fn outbox_count(&self) -> usize {
        self.outbox_count
    }

    fn map(&self, ctx: &QueryContext, row: &Row<'_>) -> ExecResult<OutboxId> {
        let table = ctx.partition_table().ok_or_else(|| ExecError::Routing {
            message: "query context has no partition table".to_string(),
        })?;
        if table.partition_count() == 0 {
            return Err(ExecError::Routing {
                message: "partition table is empty".to_string(),
            });
        }
        let hash = hash_key(row, &self.keys)?;
        let partition = (hash % table.partition_count() as u64) as usize;
        let owner = table.owner(partition).ok_or_else(|| ExecError::Routing {
            message: format!(
                "partition {partition} has no owner (table version {})",
                table.version()
            ),
        })?;
        self.outboxes
            .get(&owner)
            .copied()
            .ok_or_else(|| ExecError::Routing {
                message: format!(
                    "no outbox for {owner}, owner of partition {partition} (table version {})",
                    table.version()
                ),
            })
    }
}
