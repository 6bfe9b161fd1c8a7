//! Predicate contract consumed by `FilterExec`.

use crate::batch::Row;
use crate::context::QueryContext;
use crate::error::{ExecError, ExecResult};
use crate::executor::expr::Expr;
use crate::value::ScalarValue;

/// Row predicate: `eval(context, row) -> bool`.
///
/// Must be side-effect free with respect to the pipeline; it may read
/// query parameters from the context. An `Err` aborts the query.
pub trait Predicate: Send + Sync {
    fn eval(&self, ctx: &QueryContext, row: &Row<'_>) -> ExecResult<bool>;
}

/// WHERE semantics: NULL does not match.
impl Predicate for Expr {
    fn eval(&self, ctx: &QueryContext, row: &Row<'_>) -> ExecResult<bool> {
        match self.evaluate(ctx, row)? {
            ScalarValue::Boolean(b) => Ok(b),
            ScalarValue::Null => Ok(false),
            other => Err(ExecError::TypeMismatch {
                expected: "Boolean".to_string(),
                actual: format!("{:?}", other.data_type()),
            }),
        }
    }
}

/// Closure-backed predicate.
pub struct FnPredicate<F> {
    f: F,
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&QueryContext, &Row<'_>) -> ExecResult<bool> + Send + Sync,
{
    fn eval(&self, ctx: &QueryContext, row: &Row<'_>) -> ExecResult<bool> {
        (self.f)(ctx, row)
    }
}

/// Wrap a closure as a [`Predicate`].
pub fn predicate_fn<F>(f: F) -> FnPredicate<F>
where
    F: Fn(&QueryContext, &Row<'_>) -> ExecResult<bool> + Send + Sync,
{
    FnPredicate { f }
}
