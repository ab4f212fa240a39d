//! line_alloc.rs - Constant-line allocator and free pool.
//!
//! A stateless-looking helper struct whose methods take the resource they
//! operate on (`&mut Circuit`) as an explicit parameter rather than owning
//! it, so the synthesizer can hold one allocator alongside one circuit
//! without fighting the borrow checker.
//!
//! Declaring a module's own variables (parameters, locals) is a separate,
//! un-cached operation (`declare_variable`): repeat-call caching lives on
//! the synthesizer's per-call frame, not here, since the same `Variable`
//! AST node needs a *fresh* line range on every call activation.

use crate::ast::{Variable, VariableKind};
use crate::circuit::{Circuit, LineIndex};

/// Allocates and recycles constant-valued ancillary lines, and reserves
/// fresh line ranges for declared variables.
#[derive(Debug, Default)]
pub struct LineAllocator {
    /// Free pool keyed by the polarity the line currently holds.
    free_true: Vec<LineIndex>,
    free_false: Vec<LineIndex>,
}

impl LineAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn free_pool(&mut self, value: bool) -> &mut Vec<LineIndex> {
        if value { &mut self.free_true } else { &mut self.free_false }
    }

    /// Reserve a contiguous range of fresh circuit lines for one activation
    /// of `var`. Inputs/inouts
    /// are marked input and start non-constant; outputs/wires/state start
    /// constant-zero. Wires are garbage; inputs/outputs are not.
    pub fn declare_variable(&self, circuit: &mut Circuit, var: &Variable, name_hint: &str) -> Vec<LineIndex> {
        let total = var.total_bits();
        let mut lines = Vec::with_capacity(total);
        for bit in 0..total {
            let name = format!("{name_hint}.{bit}");
            let (is_constant, is_garbage) = match var.kind {
                VariableKind::In => (None, false),
                VariableKind::Inout => (None, false),
                VariableKind::Out => (Some(false), false),
                VariableKind::Wire | VariableKind::State => (Some(false), true),
            };
            let idx = circuit.add_line(name.clone(), name, is_constant, is_garbage);
            match var.kind {
                VariableKind::In => circuit.mark_input(idx),
                VariableKind::Inout => {
                    circuit.mark_input(idx);
                    circuit.mark_output(idx);
                }
                VariableKind::Out => circuit.mark_output(idx),
                VariableKind::Wire | VariableKind::State => {}
            }
            lines.push(idx);
        }
        lines
    }

    /// Return a line whose current value is `value`. Policy: matching-polarity free pool, else opposite
    /// polarity plus a NOT, else a fresh `const_<value>` garbage line.
    pub fn alloc_const(&mut self, circuit: &mut Circuit, value: bool) -> LineIndex {
        if let Some(line) = self.free_pool(value).pop() {
            tracing::trace!(line, value, "reused ancilla from free pool");
            return line;
        }
        if let Some(line) = self.free_pool(!value).pop() {
            circuit.append_not(line);
            circuit.set_constant(line, Some(value));
            tracing::trace!(line, value, "reused ancilla from free pool with polarity flip");
            return line;
        }
        let name = format!("const_{}", value as u8);
        let line = circuit.add_line(name.clone(), name, Some(value), true);
        tracing::trace!(line, value, "allocated fresh ancilla");
        line
    }

    /// Return `bitwidth` lines whose combined value equals `value`, bit `i`
    /// being bit `i` of `value`.
    pub fn alloc_const_vector(&mut self, circuit: &mut Circuit, bitwidth: usize, value: u64) -> Vec<LineIndex> {
        (0..bitwidth).map(|i| self.alloc_const(circuit, (value >> i) & 1 == 1)).collect()
    }

    /// Return a constant line to the free pool, tagged with the polarity it
    /// was borrowed with; the caller is responsible for restoring the
    /// line's value before calling this.
    pub fn release_const(&mut self, circuit: &mut Circuit, line: LineIndex, value: bool) {
        let name = format!("const_{}", value as u8);
        circuit.rename_output(line, name);
        circuit.set_constant(line, Some(value));
        self.free_pool(value).push(line);
        tracing::trace!(line, value, "released ancilla to free pool");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn alloc_const_reuses_matching_polarity() {
        let mut circ = Circuit::new();
        let mut alloc = LineAllocator::new();
        let a = alloc.alloc_const(&mut circ, true);
        alloc.release_const(&mut circ, a, true);
        let b = alloc.alloc_const(&mut circ, true);
        assert_eq!(a, b);
        assert_eq!(circ.line_count(), 1);
    }

    #[test]
    fn alloc_const_flips_opposite_polarity_with_not() {
        let mut circ = Circuit::new();
        let mut alloc = LineAllocator::new();
        let a = alloc.alloc_const(&mut circ, false);
        alloc.release_const(&mut circ, a, false);
        let before_gates = circ.gate_count();
        let b = alloc.alloc_const(&mut circ, true);
        assert_eq!(a, b);
        assert_eq!(circ.gate_count(), before_gates + 1);
    }

    #[test]
    fn alloc_const_vector_matches_bit_pattern() {
        let mut circ = Circuit::new();
        let mut alloc = LineAllocator::new();
        let lines = alloc.alloc_const_vector(&mut circ, 4, 0b1010);
        let bits: Vec<bool> = lines.iter().map(|&l| circ.lines[l].is_constant.unwrap()).collect();
        assert_eq!(bits, vec![false, true, false, true]);
    }

    #[test]
    fn declare_variable_reserves_contiguous_range() {
        let mut circ = Circuit::new();
        let alloc = LineAllocator::new();
        let var = Variable::new(VariableKind::Wire, "x", vec![2], 3);
        let lines = alloc.declare_variable(&mut circ, &var, "x");
        assert_eq!(lines.len(), 6);
        for &l in &lines {
            assert_eq!(circ.lines[l].is_constant, Some(false));
            assert!(circ.lines[l].is_garbage);
        }
        let _ = Rc::new(var);
    }

    #[test]
    fn declare_variable_marks_input_non_garbage() {
        let mut circ = Circuit::new();
        let alloc = LineAllocator::new();
        let var = Variable::new(VariableKind::In, "a", vec![], 4);
        let lines = alloc.declare_variable(&mut circ, &var, "a");
        for &l in &lines {
            assert!(circ.lines[l].is_input);
            assert!(!circ.lines[l].is_garbage);
            assert_eq!(circ.lines[l].is_constant, None);
        }
    }
}
