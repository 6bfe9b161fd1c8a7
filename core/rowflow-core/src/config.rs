//! Execution configuration.

use crate::error::{ExecError, ExecResult};
use serde::{Deserialize, Serialize};

/// 기본 출력 batch 크기 (행 수)
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// 기본 취소 확인 간격 (행 수)
pub const DEFAULT_CANCEL_CHECK_INTERVAL: usize = 256;

/// 기본 로컬 outbox 용량 (행 수)
pub const DEFAULT_OUTBOX_CAPACITY: usize = 4096;

/// 쿼리 실행 설정
///
/// `QueryContext`에 담겨 모든 연산자가 읽는다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Maximum rows an operator puts into one output batch.
    pub batch_size: usize,
    /// Rows scanned between two cancellation checks.
    pub cancel_check_interval: usize,
    /// Rows a local outbox buffers before it reports `Full`.
    pub outbox_capacity: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cancel_check_interval: DEFAULT_CANCEL_CHECK_INTERVAL,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}

impl ExecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 출력 batch 크기 설정
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// 취소 확인 간격 설정
    pub fn with_cancel_check_interval(mut self, interval: usize) -> Self {
        self.cancel_check_interval = interval;
        self
    }

    /// outbox 용량 설정
    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity;
        self
    }

    /// Rows per output batch, never below one.
    ///
    /// Operators read the limit through here so a context built with an
    /// unvalidated config still makes progress on every `advance`.
    pub fn batch_limit(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Reject zero-sized limits.
    pub fn validate(&self) -> ExecResult<()> {
        if self.batch_size == 0 {
            return Err(ExecError::Config("batch_size must be positive".into()));
        }
        if self.cancel_check_interval == 0 {
            return Err(ExecError::Config(
                "cancel_check_interval must be positive".into(),
            ));
        }
        if self.outbox_capacity == 0 {
            return Err(ExecError::Config("outbox_capacity must be positive".into()));
        }
        Ok(())
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> ExecResult<Self> {
        let config: ExecConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> ExecResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
