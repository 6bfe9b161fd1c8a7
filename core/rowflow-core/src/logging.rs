//! Logging — tracing subscriber setup for rowflow hosts and tests
//!
//! rowflow itself only emits `tracing` events. Operator transitions and
//! driver lifecycle go to the `exec` target, partitioner and outbox traffic
//! to `exchange`. A host that already installs its own subscriber never
//! needs this module; everything here is a no-op without the `logging`
//! feature.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// 기본 로깅 초기화 (`info`)
///
/// `RUST_LOG` overrides the level, e.g. `RUST_LOG=exec=debug,exchange=trace`
/// to follow one query's operators and routing.
///
/// # Example
/// ```rust
/// rowflow_core::logging::init();
/// ```
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level("info")
}

/// 지정 레벨로 로깅 초기화
///
/// `level` is any `EnvFilter` directive: a bare level (`debug`) or per
/// target (`exec=trace`). A second call is ignored.
///
/// # Example
/// ```rust
/// rowflow_core::logging::init_with_level("exchange=debug");
/// ```
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init();
}

/// 테스트용 로깅 — `exec`, `exchange` 모두 trace
///
/// Output goes through the libtest writer, so it only shows for failing
/// tests or with `--nocapture`.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("exec=trace,exchange=trace"))
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
