//! expr.rs - Expression synthesizer.
//!
//! Lowers an `Expression` into the circuit lines holding its value. A
//! static variable access returns a view directly onto that variable's
//! persistent storage (nothing to clean up); a dynamic access returns a
//! view produced by [`access::resolve`]'s swap cascade (undone later via
//! `access::unget`); a numeric literal or a binary/shift node allocates
//! fresh ancilla and returns it for the caller to release once consumed.
//!
//! Every sub-expression is finished (`finish`) as soon as its parent has
//! consumed it — the recursive call stack doubles as the "sub-expression
//! stack" that keeps ancilla usage bounded to the depth of the expression
//! tree rather than its size.

use std::collections::HashMap;

use crate::access;
use crate::ast::{BinaryOp, Expression, LoopMap, ShiftOp};
use crate::circuit::{Circuit, Gate, LineIndex};
use crate::error::SynthesisError;
use crate::gates::arithmetic;
use crate::gates::basic::{bitwise_cnot, conjunction, disjunction, equals, greater_equals, greater_than,
    less_equals, less_than, not_equals, reduce_or};
use crate::line_alloc::LineAllocator;

/// What `finish` needs to do once a result's lines are no longer needed.
enum Cleanup {
    /// Real, persistent variable storage: never touched.
    None,
    /// A dynamic array access's swap cascade, undone via [`access::unget`].
    DynamicAccess(access::ResolvedAccess),
    /// Freshly allocated, constant-valued operand lines that were never
    /// used as a gate target afterward: released directly.
    Constants(Vec<LineIndex>),
    /// A freshly allocated result register mutated by `gates`: reverse the
    /// gates to return every line to zero, then release them.
    Ancilla { lines: Vec<LineIndex>, gates: Vec<Gate> },
}

/// The lines an expression evaluated to, plus how to reclaim them.
pub struct ExprResult {
    lines: Vec<LineIndex>,
    cleanup: Cleanup,
}

impl ExprResult {
    pub fn lines(&self) -> &[LineIndex] {
        &self.lines
    }
}

/// Release `result`'s resources: undo any dynamic-access permutation, or
/// reverse-and-release any ancilla this expression allocated.
pub fn finish(circuit: &mut Circuit, alloc: &mut LineAllocator, result: ExprResult) {
    match result.cleanup {
        Cleanup::None => {}
        Cleanup::DynamicAccess(resolved) => access::unget(circuit, alloc, &resolved),
        Cleanup::Constants(lines) => {
            for line in lines {
                let value = circuit.lines[line].is_constant.unwrap_or(false);
                alloc.release_const(circuit, line, value);
            }
        }
        Cleanup::Ancilla { lines, gates } => {
            for gate in gates.into_iter().rev() {
                circuit.append_raw_gate(gate);
            }
            for line in lines {
                alloc.release_const(circuit, line, false);
            }
        }
    }
}

/// Lower `expr` to its circuit lines. `width_hint` sizes a bare numeric
/// literal (which carries no width of its own); every other variant
/// carries its own width.
pub fn on_expression(
    circuit: &mut Circuit,
    alloc: &mut LineAllocator,
    bindings: &HashMap<String, Vec<LineIndex>>,
    loop_map: &LoopMap,
    expr: &Expression,
    width_hint: usize,
) -> Result<ExprResult, SynthesisError> {
    match expr {
        Expression::Numeric(n) => {
            let value = n.evaluate(loop_map);
            let lines = alloc.alloc_const_vector(circuit, width_hint, value);
            Ok(ExprResult { lines: lines.clone(), cleanup: Cleanup::Constants(lines) })
        }
        Expression::Variable(access) => {
            let resolved = access::resolve(circuit, alloc, bindings, loop_map, access)?;
            let lines = resolved.lines().to_vec();
            let cleanup = if is_dynamic(access) { Cleanup::DynamicAccess(resolved) } else { Cleanup::None };
            Ok(ExprResult { lines, cleanup })
        }
        Expression::Binary { op, lhs, rhs, bitwidth } => {
            let lhs_res = on_expression(circuit, alloc, bindings, loop_map, lhs, *bitwidth)?;
            let rhs_res = on_expression(circuit, alloc, bindings, loop_map, rhs, *bitwidth)?;
            let result = lower_binary(circuit, alloc, *op, lhs_res.lines(), rhs_res.lines(), *bitwidth)?;
            finish(circuit, alloc, lhs_res);
            finish(circuit, alloc, rhs_res);
            Ok(result)
        }
        Expression::Shift { op, lhs, amount, bitwidth } => {
            let lhs_res = on_expression(circuit, alloc, bindings, loop_map, lhs, *bitwidth)?;
            let shift_amount = amount.evaluate(loop_map) as usize;
            let gate_start = circuit.gate_count();
            let result_lines = match op {
                ShiftOp::Left => arithmetic::left_shift(circuit, alloc, lhs_res.lines(), shift_amount),
                ShiftOp::Right => arithmetic::right_shift(circuit, alloc, lhs_res.lines(), shift_amount),
            };
            let gates = circuit.gates_since(gate_start);
            finish(circuit, alloc, lhs_res);
            Ok(ExprResult { lines: result_lines.clone(), cleanup: Cleanup::Ancilla { lines: result_lines, gates } })
        }
    }
}

fn is_dynamic(access: &crate::ast::VariableAccess) -> bool {
    !access.is_fully_static() && !access.indices.is_empty()
}

fn lower_binary(
    circuit: &mut Circuit,
    alloc: &mut LineAllocator,
    op: BinaryOp,
    a: &[LineIndex],
    b: &[LineIndex],
    bitwidth: usize,
) -> Result<ExprResult, SynthesisError> {
    let gate_start = circuit.gate_count();

    let lines = match op {
        BinaryOp::Add => arithmetic::increase_new(circuit, alloc, a, b)?,
        BinaryOp::Subtract => arithmetic::decrease_new(circuit, alloc, a, b)?,
        BinaryOp::Exor => {
            let result = alloc.alloc_const_vector(circuit, bitwidth, 0);
            bitwise_cnot(circuit, a, &result);
            bitwise_cnot(circuit, b, &result);
            result
        }
        BinaryOp::Multiply => arithmetic::multiplication(circuit, alloc, a, b)?,
        BinaryOp::Divide => {
            let mut a_copy = alloc.alloc_const_vector(circuit, a.len(), 0);
            bitwise_cnot(circuit, a, &a_copy);
            let quotient = arithmetic::division(circuit, alloc, &mut a_copy, b)?;
            let mut combined = quotient;
            combined.extend(a_copy);
            combined
        }
        BinaryOp::Modulo => {
            let mut a_copy = alloc.alloc_const_vector(circuit, a.len(), 0);
            bitwise_cnot(circuit, a, &a_copy);
            arithmetic::modulo(circuit, alloc, &mut a_copy, b)?;
            a_copy
        }
        BinaryOp::FracDivide => {
            let mut wide = alloc.alloc_const_vector(circuit, a.len() + bitwidth, 0);
            bitwise_cnot(circuit, a, &wide[bitwidth..]);
            let quotient = arithmetic::division(circuit, alloc, &mut wide, b)?;
            let mut combined = quotient;
            combined.extend(wide);
            combined
        }
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
            let a_bit = alloc.alloc_const(circuit, false);
            let b_bit = alloc.alloc_const(circuit, false);
            reduce_or(circuit, a, a_bit);
            reduce_or(circuit, b, b_bit);
            let mut result = alloc.alloc_const_vector(circuit, bitwidth, 0);
            if op == BinaryOp::LogicalAnd {
                conjunction(circuit, a_bit, b_bit, result[0]);
            } else {
                disjunction(circuit, a_bit, b_bit, result[0]);
            }
            reduce_or(circuit, a, a_bit);
            reduce_or(circuit, b, b_bit);
            result.push(a_bit);
            result.push(b_bit);
            result
        }
        BinaryOp::BitwiseAnd => {
            let result = alloc.alloc_const_vector(circuit, bitwidth, 0);
            for i in 0..bitwidth {
                conjunction(circuit, a[i], b[i], result[i]);
            }
            result
        }
        BinaryOp::BitwiseOr => {
            let result = alloc.alloc_const_vector(circuit, bitwidth, 0);
            for i in 0..bitwidth {
                disjunction(circuit, a[i], b[i], result[i]);
            }
            result
        }
        BinaryOp::Less => single_bit(circuit, alloc, a, b, less_than)?,
        BinaryOp::Greater => single_bit(circuit, alloc, a, b, greater_than)?,
        BinaryOp::Equals => single_bit(circuit, alloc, a, b, equals)?,
        BinaryOp::NotEquals => single_bit(circuit, alloc, a, b, not_equals)?,
        BinaryOp::LessEquals => single_bit(circuit, alloc, a, b, less_equals)?,
        BinaryOp::GreaterEquals => single_bit(circuit, alloc, a, b, greater_equals)?,
    };

    let gates = circuit.gates_since(gate_start);
    // BitwiseAnd/BitwiseOr's `result` is exactly `bitwidth`-wide already;
    // every other arm may have padded with bookkeeping lines (LogicalAnd's
    // reduction bits, Divide's remainder) that still need releasing even
    // though the caller only reads the declared-width prefix.
    let visible = lines[..bitwidth.min(lines.len())].to_vec();
    Ok(ExprResult { lines: visible, cleanup: Cleanup::Ancilla { lines, gates } })
}

fn single_bit(
    circuit: &mut Circuit,
    alloc: &mut LineAllocator,
    a: &[LineIndex],
    b: &[LineIndex],
    op: impl FnOnce(&mut Circuit, &mut LineAllocator, &[LineIndex], &[LineIndex], LineIndex) -> Result<(), SynthesisError>,
) -> Result<Vec<LineIndex>, SynthesisError> {
    let target = alloc.alloc_const(circuit, false);
    op(circuit, alloc, a, b, target)?;
    Ok(vec![target])
}
