//! Error types for the rowflow execution core.
//!
//! All public APIs return `ExecResult<T>`.
//! An `Err` from [`Exec::advance`](crate::executor::Exec::advance) is the
//! terminal failure outcome of the iteration protocol.

use thiserror::Error;

/// Unified error type for all execution operations.
#[derive(Debug, Error)]
pub enum ExecError {
    /// An upstream operator failed; carries the upstream error.
    #[error("upstream failure in '{operator}': {source}")]
    UpstreamFailure {
        operator: String,
        #[source]
        source: Box<ExecError>,
    },

    /// A data source could not produce rows (I/O, deserialization, ...)
    #[error("source '{operator}' failed: {message}")]
    Source { operator: String, message: String },

    /// Predicate or expression evaluation failed for a specific row
    #[error("evaluation error in '{operator}' at row {row}: {message}")]
    Evaluation {
        operator: String,
        row: usize,
        message: String,
    },

    /// A partitioner could not resolve a destination
    #[error("routing failure: {message}")]
    Routing { message: String },

    /// Query was cancelled (not a fault)
    #[error("query {query_id} cancelled")]
    Cancelled { query_id: u64 },

    /// Operator was polled after it had already failed
    #[error("operator '{operator}' already failed")]
    OperatorFailed { operator: String },

    /// Type mismatch between expected and actual values
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Apache Arrow error (RecordBatch operations)
    #[error("arrow error: {source}")]
    Arrow {
        #[from]
        source: arrow::error::ArrowError,
    },
}

/// Result type alias for all execution operations.
pub type ExecResult<T> = Result<T, ExecError>;

impl ExecError {
    /// Wrap an error returned by an upstream operator.
    ///
    /// 취소는 장애가 아니므로 감싸지 않고 그대로 전달한다.
    pub fn upstream(operator: impl Into<String>, source: ExecError) -> Self {
        if source.is_cancellation() {
            return source;
        }
        ExecError::UpstreamFailure {
            operator: operator.into(),
            source: Box::new(source),
        }
    }

    /// True if this error is a controlled abort rather than a fault.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ExecError::Cancelled { .. })
    }

    /// Innermost error of an upstream failure chain.
    pub fn root_cause(&self) -> &ExecError {
        let mut current = self;
        while let ExecError::UpstreamFailure { source, .. } = current {
            current = source.as_ref();
        }
        current
    }
}

impl From<serde_json::Error> for ExecError {
    fn from(err: serde_json::Error) -> Self {
        ExecError::Config(err.to_string())
    }
}
