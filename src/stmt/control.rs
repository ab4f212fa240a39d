//! stmt/control.rs - If and for statements.
//!
//! `if` supports both realizations named in [`IfRealization`]:
//! - `Controlled` pushes the condition line onto the [`Cct`] stack, runs
//!   both branches as ordinary (control-oblivious) statement synthesis,
//!   and lets the CCT merge the pushed control onto every gate either
//!   branch emitted when the branch finishes.
//! - `Duplication` instead rebinds each variable the branch writes to a
//!   fresh zero-ancilla shadow, runs the branch against the shadow
//!   unconditionally, conditionally swaps the shadow into the real
//!   variable under a single Fredkin per bit, then drives the shadow back
//!   to a releasable constant zero with two complementary controlled
//!   passes — the branch forward under the condition, its reverse replay
//!   under the negated condition. See [`duplication_pass`].
//!
//! `for` just unrolls: each iteration gets its own [`LoopMap`] binding, no
//! gates of its own.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expression, LoopMap, NumericExpr, Statement, Variable, VariableAccess};
use crate::circuit::LineIndex;
use crate::config::IfRealization;
use crate::error::SynthesisError;
use crate::expr;
use crate::synthesizer::{Bindings, Synthesizer};

pub(crate) fn on_if(
    synth: &mut Synthesizer,
    bindings: &Bindings,
    loop_map: &LoopMap,
    condition: &Expression,
    then_branch: &[Statement],
    else_branch: &[Statement],
) -> Result<(), SynthesisError> {
    match synth.config.if_realization {
        IfRealization::Controlled => on_if_controlled(synth, bindings, loop_map, condition, then_branch, else_branch),
        IfRealization::Duplication => on_if_duplication(synth, bindings, loop_map, condition, then_branch, else_branch),
    }
}

fn on_if_controlled(
    synth: &mut Synthesizer,
    bindings: &Bindings,
    loop_map: &LoopMap,
    condition: &Expression,
    then_branch: &[Statement],
    else_branch: &[Statement],
) -> Result<(), SynthesisError> {
    let cond_result = expr::on_expression(&mut synth.circuit, &mut synth.alloc, bindings, loop_map, condition, 1)?;
    let cond_line = cond_result.lines()[0];
    let mut owned_bindings = bindings.clone();

    run_under_control(synth, &mut owned_bindings, loop_map, cond_line, then_branch)?;

    if !else_branch.is_empty() {
        synth.circuit.append_not(cond_line);
        run_under_control(synth, &mut owned_bindings, loop_map, cond_line, else_branch)?;
        synth.circuit.append_not(cond_line);
    }

    expr::finish(&mut synth.circuit, &mut synth.alloc, cond_result);
    Ok(())
}

fn run_under_control(synth: &mut Synthesizer, bindings: &mut Bindings, loop_map: &LoopMap, control: LineIndex, body: &[Statement]) -> Result<(), SynthesisError> {
    synth.cct.push_control(control);
    let start = synth.circuit.gate_count();
    let result = synth.run_statements(body, bindings, loop_map);
    // Swap the cost model out so it can be borrowed immutably alongside
    // `circuit`/`alloc` without fighting the borrow checker over one field.
    let cost = std::mem::replace(&mut synth.cost_model, Box::new(crate::cct::GateCountCost));
    synth.cct.merge_captured(&mut synth.circuit, &mut synth.alloc, cost.as_ref(), start);
    synth.cost_model = cost;
    synth.cct.pop_control();
    result
}

/// Variables written anywhere in `stmts` (by declaration identity, deduped),
/// the set [`on_if_duplication`] needs to know which storage to shadow.
fn written_variables(stmts: &[Statement], out: &mut Vec<Rc<Variable>>) {
    for stmt in stmts {
        match stmt {
            Statement::Swap(a, b) => {
                push_unique(out, &a.variable);
                push_unique(out, &b.variable);
            }
            Statement::Unary(_, access) => push_unique(out, &access.variable),
            Statement::Assign(_, lhs, _) => push_unique(out, &lhs.variable),
            Statement::If { then_branch, else_branch, .. } => {
                written_variables(then_branch, out);
                written_variables(else_branch, out);
            }
            Statement::For { body, .. } => written_variables(body, out),
            Statement::Call { .. } | Statement::Uncall { .. } | Statement::Skip => {}
        }
    }
}

fn push_unique(out: &mut Vec<Rc<Variable>>, var: &Rc<Variable>) {
    if !out.iter().any(|v| Rc::ptr_eq(v, var)) {
        out.push(var.clone());
    }
}

fn on_if_duplication(
    synth: &mut Synthesizer,
    bindings: &Bindings,
    loop_map: &LoopMap,
    condition: &Expression,
    then_branch: &[Statement],
    else_branch: &[Statement],
) -> Result<(), SynthesisError> {
    let cond_result = expr::on_expression(&mut synth.circuit, &mut synth.alloc, bindings, loop_map, condition, 1)?;
    let cond_line = cond_result.lines()[0];

    let mut then_written = Vec::new();
    written_variables(then_branch, &mut then_written);
    duplication_pass(synth, bindings, loop_map, then_branch, cond_line, &then_written)?;

    if !else_branch.is_empty() {
        synth.circuit.append_not(cond_line);
        let mut else_written = Vec::new();
        written_variables(else_branch, &mut else_written);
        duplication_pass(synth, bindings, loop_map, else_branch, cond_line, &else_written)?;
        synth.circuit.append_not(cond_line);
    }

    expr::finish(&mut synth.circuit, &mut synth.alloc, cond_result);
    Ok(())
}

/// Run `branch` against shadow copies of every variable in `written`, swap
/// the branch's result into real storage under `control`, then drive the
/// shadow back to constant zero.
///
/// Let `x` be the pre-branch value and `F = branch(x)`.
/// 1. `shadow = x` (plain copy), then `shadow = branch(shadow) = F` — run
///    once, unconditionally, so the branch's own gates never carry an
///    extra control.
/// 2. `Fredkin(control, real, shadow)`: when `control` is 1, swaps the
///    result into `real` (`real = F`, `shadow = x`); when 0, leaves
///    `real = x`, `shadow = F`.
/// 3. Re-run `branch` forward on `shadow`, controlled on `control`. Fires
///    only where `shadow` still holds the pre-branch value (`control = 1`,
///    `shadow = x`), bringing it to `F` so it now matches `real`.
/// 4. Re-run `branch`'s gates *reversed* on `shadow`, controlled on the
///    negated `control`. Fires only where `shadow` still holds the
///    post-branch value (`control = 0`, `shadow = F`), and — because every
///    gate `branch` is built from (NOT, CNOT, Toffoli, Fredkin) is its own
///    inverse — replaying its gates in reverse order computes exactly
///    `branch⁻¹`, bringing `shadow` back to `x` to match `real`.
///
/// After step 4, `shadow` equals `real` in both cases, so a final
/// unconditional `CNOT(real, shadow)` zeroes it and the ancilla lines can
/// be released.
fn duplication_pass(
    synth: &mut Synthesizer,
    bindings: &Bindings,
    loop_map: &LoopMap,
    branch: &[Statement],
    control: LineIndex,
    written: &[Rc<Variable>],
) -> Result<(), SynthesisError> {
    if written.is_empty() {
        return Ok(());
    }

    let mut shadow_bindings: HashMap<String, Vec<LineIndex>> = bindings.clone();
    let mut shadows = Vec::with_capacity(written.len());

    for var in written {
        let real = bindings.get(&var.name).ok_or_else(|| SynthesisError::UnresolvedParameter(var.name.clone()))?.clone();
        let width = real.len();
        let shadow = synth.alloc.alloc_const_vector(&mut synth.circuit, width, 0);
        crate::gates::basic::bitwise_cnot(&mut synth.circuit, &real, &shadow);
        shadow_bindings.insert(var.name.clone(), shadow.clone());
        shadows.push((var.clone(), real, shadow));
    }

    synth.run_statements(branch, &mut shadow_bindings, loop_map)?;

    for (_, real, shadow) in &shadows {
        for (&r, &s) in real.iter().zip(shadow.iter()) {
            synth.circuit.append_fredkin(&[control], r, s);
        }
    }

    run_under_control(synth, &mut shadow_bindings, loop_map, control, branch)?;

    synth.circuit.append_not(control);
    run_branch_reversed_under_control(synth, &mut shadow_bindings, loop_map, control, branch)?;
    synth.circuit.append_not(control);

    for (var, real, shadow) in shadows {
        crate::gates::basic::bitwise_cnot(&mut synth.circuit, &real, &shadow);
        for &s in &shadow {
            synth.alloc.release_const(&mut synth.circuit, s, false);
        }
        let _ = var;
    }
    Ok(())
}

/// Run `body` forward into a capture, then replay its gates in reverse
/// order — the same reverse-replay principle `uncall` uses — merging
/// `control` onto the replayed (inverted) cascade rather than the forward
/// one.
fn run_branch_reversed_under_control(synth: &mut Synthesizer, bindings: &mut Bindings, loop_map: &LoopMap, control: LineIndex, body: &[Statement]) -> Result<(), SynthesisError> {
    let capture_start = synth.circuit.gate_count();
    synth.run_statements(body, bindings, loop_map)?;
    let gates = synth.circuit.gates_since(capture_start);
    synth.circuit.truncate_gates(capture_start);

    synth.cct.push_control(control);
    let merge_start = synth.circuit.gate_count();
    for gate in gates.into_iter().rev() {
        synth.circuit.append_raw_gate(gate);
    }
    let cost = std::mem::replace(&mut synth.cost_model, Box::new(crate::cct::GateCountCost));
    synth.cct.merge_captured(&mut synth.circuit, &mut synth.alloc, cost.as_ref(), merge_start);
    synth.cost_model = cost;
    synth.cct.pop_control();
    Ok(())
}

pub(crate) fn on_for(
    synth: &mut Synthesizer,
    bindings: &Bindings,
    loop_map: &LoopMap,
    from: &Option<NumericExpr>,
    to: &NumericExpr,
    step: &Option<NumericExpr>,
    loop_var: &str,
    body: &[Statement],
) -> Result<(), SynthesisError> {
    let from_val = from.as_ref().map(|e| e.evaluate(loop_map)).unwrap_or(0);
    let to_val = to.evaluate(loop_map);
    let step_val = step.as_ref().map(|e| e.evaluate(loop_map)).unwrap_or(1).max(1);
    let mut owned_bindings = bindings.clone();

    let mut i = from_val;
    while i < to_val {
        let inner_loop_map = loop_map.bind(loop_var.to_string(), i);
        synth.run_statements(body, &mut owned_bindings, &inner_loop_map)?;
        i += step_val;
    }
    Ok(())
}
