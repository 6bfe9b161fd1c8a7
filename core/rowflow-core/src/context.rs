//! QueryContext — per-query state shared by the whole operator tree.
//!
//! One context exists per query execution, shared as `Arc<QueryContext>`.
//! Operators only read it; the one mutable piece is the cancellation flag,
//! which callers set and operators observe.

use crate::config::ExecConfig;
use crate::error::{ExecError, ExecResult};
use crate::value::ScalarValue;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cluster member identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member-{}", self.0)
    }
}

/// Cloneable handle to a query's cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// 파티션 소유 테이블 — 파티션 id → 소유 멤버
///
/// Snapshot of cluster partition ownership taken when the query started.
/// `None` marks a partition with no known owner (e.g. mid-migration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTable {
    version: u64,
    owners: Vec<Option<MemberId>>,
}

impl PartitionTable {
    pub fn new(version: u64, owners: Vec<Option<MemberId>>) -> Self {
        Self { version, owners }
    }

    /// Assign `partition_count` partitions to `members` round-robin.
    pub fn uniform(version: u64, partition_count: usize, members: &[MemberId]) -> Self {
        let owners = (0..partition_count)
            .map(|p| {
                if members.is_empty() {
                    None
                } else {
                    Some(members[p % members.len()])
                }
            })
            .collect();
        Self { version, owners }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn partition_count(&self) -> usize {
        self.owners.len()
    }

    pub fn owner(&self, partition: usize) -> Option<MemberId> {
        self.owners.get(partition).copied().flatten()
    }
}

/// 쿼리 컨텍스트
#[derive(Debug)]
pub struct QueryContext {
    query_id: u64,
    params: Vec<ScalarValue>,
    partitions: Option<PartitionTable>,
    config: ExecConfig,
    cancel: CancellationToken,
}

impl QueryContext {
    pub fn new(query_id: u64) -> Self {
        Self {
            query_id,
            params: Vec::new(),
            partitions: None,
            config: ExecConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Query parameters referenced by `Expr::Param`.
    pub fn with_params(mut self, params: Vec<ScalarValue>) -> Self {
        self.params = params;
        self
    }

    pub fn with_config(mut self, config: ExecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_partition_table(mut self, table: PartitionTable) -> Self {
        self.partitions = Some(table);
        self
    }

    /// Share an existing cancellation token (e.g. one owned by a session).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn query_id(&self) -> u64 {
        self.query_id
    }

    pub fn params(&self) -> &[ScalarValue] {
        &self.params
    }

    pub fn param(&self, index: usize) -> ExecResult<&ScalarValue> {
        self.params.get(index).ok_or_else(|| {
            ExecError::InvalidArgument(format!(
                "parameter ${index} not bound ({} bound)",
                self.params.len()
            ))
        })
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Partition ownership snapshot, if this query runs distributed.
    pub fn partition_table(&self) -> Option<&PartitionTable> {
        self.partitions.as_ref()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(target: "exec", query_id = self.query_id, "cancellation requested");
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check_cancelled(&self) -> ExecResult<()> {
        if self.is_cancelled() {
            return Err(ExecError::Cancelled {
                query_id: self.query_id,
            });
        }
        Ok(())
    }
}
