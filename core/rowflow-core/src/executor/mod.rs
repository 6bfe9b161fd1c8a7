//! Query Executor Module

pub mod expr;
pub mod operators;
pub mod predicate;

pub use expr::{BinaryOperator, Expr};
pub use operators::{
    Exec, ExecCore, ExecState, FilterExec, IterationResult, ProjectExec, ScriptStep,
    ScriptedExec, SendExec, ValuesExec,
};
pub use predicate::{FnPredicate, Predicate, predicate_fn};
