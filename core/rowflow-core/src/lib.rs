//! # rowflow — Pull-based Row-Batch Execution Core
//!
//! rowflow는 분산 SQL 엔진의 행 배치 실행 코어입니다.
//! 모든 연산자는 협력적(non-blocking) Pull 프로토콜을 따르며, 외부 이벤트를
//! 기다려야 할 때는 블로킹 대신 `Wait`를 반환합니다.
//!
//! ## 주요 특징
//!
//! - **Exec 프로토콜**: `Wait` / `Fetched` / `FetchedDone` + 에러
//! - **Apache Arrow 기반**: `RowBatch`는 불변 `RecordBatch` 래퍼
//! - **FilterExec**: 배치 단위 행 필터, 순서 보존
//! - **Exchange**: `SendPartitioner`로 목적지를 고르고 `Outbox`로 전송
//!
//! ## 빠른 시작
//!
//! ```rust
//! use rowflow_core::executor::{Expr, FilterExec, ValuesExec};
//! use rowflow_core::{QueryContext, QueryDriver};
//!
//! # fn main() -> rowflow_core::ExecResult<()> {
//! let scan = ValuesExec::from_int64("v", &[&[1, 2, 3], &[4, 5]])?;
//! let even = Expr::col(0).modulo(Expr::lit(2_i64)).eq(Expr::lit(0_i64));
//! let filter = FilterExec::new(Box::new(scan), even);
//!
//! let mut driver = QueryDriver::new(Box::new(filter), QueryContext::new(1).into_shared())?;
//! driver.run(|_| Ok(()))?;
//! assert_eq!(driver.row_count(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## 실행 모델
//!
//! ```text
//! QueryDriver ─poll→ root.advance() ─pull→ child.advance() ─pull→ leaf
//!                       │
//!                       └─ SendExec ─map→ SendPartitioner ─offer→ Outbox
//! ```
//!
//! ## 모듈 구조
//!
//! - [`batch`] — `RowBatch` / `Row`
//! - [`context`] — 쿼리 컨텍스트, 취소 토큰, 파티션 테이블
//! - [`executor`] — Exec 프로토콜, 연산자, 표현식
//! - [`exchange`] — 파티셔너, Outbox, 로컬 채널
//! - [`driver`] — 쿼리 드라이버
//! - [`config`] — 실행 설정

pub mod batch;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod exchange;
pub mod executor;
pub mod value;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use batch::{Row, RowBatch};
pub use config::ExecConfig;
pub use context::{CancellationToken, MemberId, PartitionTable, QueryContext};
pub use driver::{DriverStatus, QueryDriver};
pub use error::{ExecError, ExecResult};
pub use executor::{Exec, IterationResult};
pub use value::ScalarValue;
