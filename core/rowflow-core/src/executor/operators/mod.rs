//! Physical Operators Module

mod exec;
mod filter;
mod projection;
mod scripted;
mod send;
mod values;

pub use exec::{Exec, ExecCore, ExecState, IterationResult, pull};
pub use filter::FilterExec;
pub use projection::ProjectExec;
pub use scripted::{ScriptStep, ScriptedExec};
pub use send::SendExec;
pub use values::ValuesExec;
