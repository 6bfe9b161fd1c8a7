//! Scalar Expression Evaluation
//!
//! Row-at-a-time evaluation of compiled expressions. Comparisons and
//! arithmetic follow SQL null semantics: a NULL operand yields NULL, and
//! AND/OR use three-valued logic.

use crate::batch::Row;
use crate::context::QueryContext;
use crate::error::{ExecError, ExecResult};
use crate::value::ScalarValue;
use std::cmp::Ordering;

/// 물리 표현식 — 컬럼, 리터럴, 파라미터, 연산자
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// 컬럼 참조 (인덱스)
    Column(usize),
    /// 리터럴 값
    Literal(ScalarValue),
    /// 쿼리 파라미터 (`QueryContext::params`)
    Param(usize),
    /// 이항 연산
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// NOT
    Not(Box<Expr>),
    /// IS NULL
    IsNull(Box<Expr>),
    /// IS NOT NULL
    IsNotNull(Box<Expr>),
}

/// 이항 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // 산술
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    // 비교
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // 논리
    And,
    Or,
}

impl BinaryOperator {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}

impl Expr {
    pub fn col(index: usize) -> Self {
        Expr::Column(index)
    }

    pub fn lit(value: impl Into<ScalarValue>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn param(index: usize) -> Self {
        Expr::Param(index)
    }

    pub fn binary(self, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn eq(self, right: Expr) -> Self {
        self.binary(BinaryOperator::Eq, right)
    }

    pub fn not_eq(self, right: Expr) -> Self {
        self.binary(BinaryOperator::NotEq, right)
    }

    pub fn lt(self, right: Expr) -> Self {
        self.binary(BinaryOperator::Lt, right)
    }

    pub fn gt(self, right: Expr) -> Self {
        self.binary(BinaryOperator::Gt, right)
    }

    pub fn gt_eq(self, right: Expr) -> Self {
        self.binary(BinaryOperator::GtEq, right)
    }

    pub fn and(self, right: Expr) -> Self {
        self.binary(BinaryOperator::And, right)
    }

    pub fn or(self, right: Expr) -> Self {
        self.binary(BinaryOperator::Or, right)
    }

    pub fn modulo(self, right: Expr) -> Self {
        self.binary(BinaryOperator::Modulo, right)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Self {
        Expr::IsNull(Box::new(self))
    }

    /// Evaluate against one row.
    pub fn evaluate(&self, ctx: &QueryContext, row: &Row<'_>) -> ExecResult<ScalarValue> {
        match self {
            Expr::Column(idx) => row.value(*idx),
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Param(idx) => ctx.param(*idx).cloned(),
            Expr::BinaryOp { left, op, right } => {
                let l = left.evaluate(ctx, row)?;
                // AND/OR 단락 평가
                match (op, &l) {
                    (BinaryOperator::And, ScalarValue::Boolean(false)) => {
                        return Ok(ScalarValue::Boolean(false));
                    }
                    (BinaryOperator::Or, ScalarValue::Boolean(true)) => {
                        return Ok(ScalarValue::Boolean(true));
                    }
                    _ => {}
                }
                let r = right.evaluate(ctx, row)?;
                evaluate_binary_op(&l, *op, &r)
            }
            Expr::Not(expr) => match expr.evaluate(ctx, row)? {
                ScalarValue::Boolean(b) => Ok(ScalarValue::Boolean(!b)),
                ScalarValue::Null => Ok(ScalarValue::Null),
                other => Err(type_mismatch("Boolean", &other)),
            },
            Expr::IsNull(expr) => Ok(ScalarValue::Boolean(expr.evaluate(ctx, row)?.is_null())),
            Expr::IsNotNull(expr) => {
                Ok(ScalarValue::Boolean(!expr.evaluate(ctx, row)?.is_null()))
            }
        }
    }
}

fn type_mismatch(expected: &str, actual: &ScalarValue) -> ExecError {
    ExecError::TypeMismatch {
        expected: expected.to_string(),
        actual: format!("{:?}", actual.data_type()),
    }
}

/// Evaluate a binary operation on two scalars.
fn evaluate_binary_op(
    left: &ScalarValue,
    op: BinaryOperator,
    right: &ScalarValue,
) -> ExecResult<ScalarValue> {
    match op {
        BinaryOperator::Eq
        | BinaryOperator::NotEq
        | BinaryOperator::Lt
        | BinaryOperator::LtEq
        | BinaryOperator::Gt
        | BinaryOperator::GtEq => comparison_op(left, op, right),

        BinaryOperator::And | BinaryOperator::Or => logical_op(left, op, right),

        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => arithmetic_op(left, op, right),
    }
}

fn comparison_op(
    left: &ScalarValue,
    op: BinaryOperator,
    right: &ScalarValue,
) -> ExecResult<ScalarValue> {
    if left.is_null() || right.is_null() {
        return Ok(ScalarValue::Null);
    }
    let ordering = left.compare(right).ok_or_else(|| ExecError::TypeMismatch {
        expected: format!("{:?}-comparable operand for {}", left.data_type(), op.symbol()),
        actual: format!("{:?}", right.data_type()),
    })?;
    let result = match op {
        BinaryOperator::Eq => ordering == Ordering::Equal,
        BinaryOperator::NotEq => ordering != Ordering::Equal,
        BinaryOperator::Lt => ordering == Ordering::Less,
        BinaryOperator::LtEq => ordering != Ordering::Greater,
        BinaryOperator::Gt => ordering == Ordering::Greater,
        BinaryOperator::GtEq => ordering != Ordering::Less,
        _ => unreachable!(),
    };
    Ok(ScalarValue::Boolean(result))
}

fn logical_op(
    left: &ScalarValue,
    op: BinaryOperator,
    right: &ScalarValue,
) -> ExecResult<ScalarValue> {
    let as_bool = |v: &ScalarValue| match v {
        ScalarValue::Boolean(b) => Ok(Some(*b)),
        ScalarValue::Null => Ok(None),
        other => Err(type_mismatch("Boolean", other)),
    };
    let (l, r) = (as_bool(left)?, as_bool(right)?);
    let result = match op {
        BinaryOperator::And => match (l, r) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        BinaryOperator::Or => match (l, r) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        _ => unreachable!(),
    };
    Ok(result.map_or(ScalarValue::Null, ScalarValue::Boolean))
}

fn arithmetic_op(
    left: &ScalarValue,
    op: BinaryOperator,
    right: &ScalarValue,
) -> ExecResult<ScalarValue> {
    if left.is_null() || right.is_null() {
        return Ok(ScalarValue::Null);
    }
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        let result = match op {
            BinaryOperator::Plus => l.checked_add(r),
            BinaryOperator::Minus => l.checked_sub(r),
            BinaryOperator::Multiply => l.checked_mul(r),
            BinaryOperator::Divide | BinaryOperator::Modulo if r == 0 => {
                return Err(ExecError::InvalidArgument("division by zero".into()));
            }
            BinaryOperator::Divide => l.checked_div(r),
            BinaryOperator::Modulo => l.checked_rem(r),
            _ => unreachable!(),
        };
        return result.map(ScalarValue::Int64).ok_or_else(|| {
            ExecError::InvalidArgument(format!("integer overflow in {l} {} {r}", op.symbol()))
        });
    }
    let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
        let offending = if left.as_f64().is_none() { left } else { right };
        return Err(type_mismatch("numeric", offending));
    };
    let result = match op {
        BinaryOperator::Plus => l + r,
        BinaryOperator::Minus => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => l / r,
        BinaryOperator::Modulo => l % r,
        _ => unreachable!(),
    };
    Ok(ScalarValue::Float64(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::RowBatch;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn make_test_batch() -> RowBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, false),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![Some(4), None])),
            Arc::new(StringArray::from(vec!["a", "b"])),
        ];
        RowBatch::new(RecordBatch::try_new(schema, columns).unwrap())
    }

    fn eval(expr: &Expr, row: usize) -> ExecResult<ScalarValue> {
        let ctx = QueryContext::new(1).with_params(vec![ScalarValue::Int64(2)]);
        let batch = make_test_batch();
        let row = batch.row(row).unwrap();
        expr.evaluate(&ctx, &row)
    }

    #[test]
    fn modulo_with_param() {
        let expr = Expr::col(0).modulo(Expr::param(0)).eq(Expr::lit(0_i64));
        assert_eq!(eval(&expr, 0).unwrap(), ScalarValue::Boolean(true));
    }

    #[test]
    fn null_propagates_through_comparison() {
        let expr = Expr::col(0).gt(Expr::lit(1_i64));
        assert_eq!(eval(&expr, 1).unwrap(), ScalarValue::Null);
        assert_eq!(
            eval(&Expr::col(0).is_null(), 1).unwrap(),
            ScalarValue::Boolean(true)
        );
    }

    #[test]
    fn three_valued_logic() {
        let null_cmp = Expr::col(0).gt(Expr::lit(1_i64));
        let false_expr = Expr::lit(false);
        assert_eq!(
            eval(&null_cmp.clone().and(false_expr.clone()), 1).unwrap(),
            ScalarValue::Boolean(false)
        );
        assert_eq!(
            eval(&null_cmp.clone().or(false_expr), 1).unwrap(),
            ScalarValue::Null
        );
        assert_eq!(
            eval(&null_cmp.or(Expr::lit(true)), 1).unwrap(),
            ScalarValue::Boolean(true)
        );
    }

    #[test]
    fn string_compare_and_not() {
        let expr = Expr::col(1).eq(Expr::lit("b")).not();
        assert_eq!(eval(&expr, 0).unwrap(), ScalarValue::Boolean(true));
    }

    #[test]
    fn type_mismatch_is_error() {
        let expr = Expr::col(1).gt(Expr::lit(1_i64));
        assert!(matches!(
            eval(&expr, 0),
            Err(ExecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn division_by_zero_is_error() {
        let expr = Expr::col(0).binary(BinaryOperator::Divide, Expr::lit(0_i64));
        assert!(eval(&expr, 0).is_err());
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        let expr = Expr::col(0).binary(BinaryOperator::Plus, Expr::lit(0.5));
        assert_eq!(eval(&expr, 0).unwrap(), ScalarValue::Float64(4.5));
    }

    #[test]
    fn unbound_param_is_error() {
        assert!(eval(&Expr::param(3), 0).is_err());
    }
}
