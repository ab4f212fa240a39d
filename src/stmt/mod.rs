//! stmt/mod.rs - Statement synthesizer dispatch.
//!
//! One function per statement kind, split across three files the way the
//! statement kinds group naturally: plain mutations ([`assign`]: swap,
//! unary, accumulate-assign), control flow ([`control`]: if, for), and
//! module activation ([`call`]: call, uncall). [`on_statement`] is the
//! single dispatch point everything else (loops, branches, module bodies)
//! recurses back through.

mod assign;
mod call;
mod control;

use crate::ast::{LoopMap, Statement};
use crate::error::SynthesisError;
use crate::synthesizer::{Bindings, Synthesizer};

pub(crate) fn on_statement(synth: &mut Synthesizer, bindings: &mut Bindings, loop_map: &LoopMap, stmt: &Statement) -> Result<(), SynthesisError> {
    match stmt {
        Statement::Swap(a, b) => assign::on_swap(synth, bindings, loop_map, a, b),
        Statement::Unary(op, access) => assign::on_unary(synth, bindings, loop_map, *op, access),
        Statement::Assign(op, lhs, rhs) => assign::on_assign(synth, bindings, loop_map, *op, lhs, rhs),
        Statement::If { condition, then_branch, else_branch } => control::on_if(synth, bindings, loop_map, condition, then_branch, else_branch),
        Statement::For { from, to, step, loop_var, body } => control::on_for(synth, bindings, loop_map, from, to, step, loop_var, body),
        Statement::Call { target, actuals } => call::on_call(synth, bindings, target, actuals),
        Statement::Uncall { target, actuals } => call::on_uncall(synth, bindings, target, actuals),
        Statement::Skip => Ok(()),
    }
}
