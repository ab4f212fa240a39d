//! Bitwise and comparator gate primitives.

use crate::circuit::{Circuit, LineIndex};
use crate::error::SynthesisError;
use crate::line_alloc::LineAllocator;

/// `dest ^= src`, bit by bit. Used to copy a value into a fresh ancilla
/// register or to fold one operand into another before a destructive op.
pub fn bitwise_cnot(circuit: &mut Circuit, src: &[LineIndex], dest: &[LineIndex]) {
    for (&s, &d) in src.iter().zip(dest.iter()) {
        circuit.append_cnot(s, d);
    }
}

/// Flip every line in `target`.
pub fn bitwise_negation(circuit: &mut Circuit, target: &[LineIndex]) {
    for &t in target {
        circuit.append_not(t);
    }
}

/// `target ^= a AND b`.
pub fn conjunction(circuit: &mut Circuit, a: LineIndex, b: LineIndex, target: LineIndex) {
    circuit.append_toffoli(&[a, b], target);
}

/// `target ^= a OR b`, via `a xor b xor (a and b)`.
pub fn disjunction(circuit: &mut Circuit, a: LineIndex, b: LineIndex, target: LineIndex) {
    circuit.append_cnot(a, target);
    circuit.append_cnot(b, target);
    circuit.append_toffoli(&[a, b], target);
}

/// `target ^= (a == b)`. `target` is expected to start at constant 0.
pub fn equals(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex], target: LineIndex) -> Result<(), SynthesisError> {
    if a.len() != b.len() {
        return Err(SynthesisError::WidthMismatch(a.len(), b.len()));
    }
    let scratch = alloc.alloc_const_vector(circuit, a.len(), 0);
    bitwise_cnot(circuit, a, &scratch);
    bitwise_cnot(circuit, b, &scratch);
    bitwise_negation(circuit, &scratch);
    circuit.append_toffoli(&scratch, target);
    bitwise_negation(circuit, &scratch);
    bitwise_cnot(circuit, b, &scratch);
    bitwise_cnot(circuit, a, &scratch);
    for &s in &scratch {
        alloc.release_const(circuit, s, false);
    }
    Ok(())
}

/// `target ^= (a != b)`. `target` is expected to start at constant 0.
pub fn not_equals(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex], target: LineIndex) -> Result<(), SynthesisError> {
    equals(circuit, alloc, a, b, target)?;
    circuit.append_not(target);
    Ok(())
}

/// `target ^= (a < b)`, realized via the carry-out of a temporary
/// `b - a`.
pub fn less_than(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex], target: LineIndex) -> Result<(), SynthesisError> {
    if a.len() != b.len() {
        return Err(SynthesisError::WidthMismatch(a.len(), b.len()));
    }
    use crate::gates::arithmetic::{decrease_with_carry, increase_with_carry};

    let work = alloc.alloc_const_vector(circuit, b.len(), 0);
    bitwise_cnot(circuit, b, &work);
    let carry = alloc.alloc_const(circuit, false);

    decrease_with_carry(circuit, alloc, &work, a, carry)?;
    circuit.append_not(carry);
    circuit.append_cnot(carry, target);
    circuit.append_not(carry);
    increase_with_carry(circuit, alloc, &work, a, carry)?;

    bitwise_cnot(circuit, b, &work);
    alloc.release_const(circuit, carry, false);
    for &w in &work {
        alloc.release_const(circuit, w, false);
    }
    Ok(())
}

/// `target ^= (a > b)`.
pub fn greater_than(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex], target: LineIndex) -> Result<(), SynthesisError> {
    less_than(circuit, alloc, b, a, target)
}

/// `target ^= (a <= b)`.
pub fn less_equals(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex], target: LineIndex) -> Result<(), SynthesisError> {
    greater_than(circuit, alloc, a, b, target)?;
    circuit.append_not(target);
    Ok(())
}

/// `target ^= (a >= b)`.
pub fn greater_equals(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex], target: LineIndex) -> Result<(), SynthesisError> {
    less_than(circuit, alloc, a, b, target)?;
    circuit.append_not(target);
    Ok(())
}

/// `target ^= (any bit of value is set)`, via a flip-AND-flip NOR trick:
/// NOT every bit, Toffoli all of them into `target` (giving `target ^=
/// NOR(value)`), then NOT every bit back and NOT `target` once more.
pub fn reduce_or(circuit: &mut Circuit, value: &[LineIndex], target: LineIndex) {
    bitwise_negation(circuit, value);
    circuit.append_toffoli(value, target);
    bitwise_negation(circuit, value);
    circuit.append_not(target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;

    fn lines(circuit: &mut Circuit, n: usize) -> Vec<LineIndex> {
        (0..n).map(|i| circuit.add_line(format!("l{i}"), format!("l{i}"), None, false)).collect()
    }

    #[test]
    fn bitwise_cnot_emits_one_gate_per_bit() {
        let mut c = Circuit::new();
        let a = lines(&mut c, 3);
        let b = lines(&mut c, 3);
        bitwise_cnot(&mut c, &a, &b);
        assert_eq!(c.gate_count(), 3);
    }

    #[test]
    fn disjunction_emits_three_gates() {
        let mut c = Circuit::new();
        let ls = lines(&mut c, 3);
        disjunction(&mut c, ls[0], ls[1], ls[2]);
        assert_eq!(c.gate_count(), 3);
    }

    #[test]
    fn equals_releases_all_scratch_lines() {
        let mut c = Circuit::new();
        let mut alloc = LineAllocator::new();
        let a = lines(&mut c, 4);
        let b = lines(&mut c, 4);
        let target = c.add_line("t", "t", Some(false), true);
        let before = c.line_count();
        equals(&mut c, &mut alloc, &a, &b, target).unwrap();
        // scratch lines were declared fresh (no prior free pool), so the
        // total line count grows by exactly the operand width.
        assert_eq!(c.line_count(), before + a.len());
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let mut c = Circuit::new();
        let mut alloc = LineAllocator::new();
        let a = lines(&mut c, 3);
        let b = lines(&mut c, 4);
        let target = c.add_line("t", "t", Some(false), true);
        assert!(equals(&mut c, &mut alloc, &a, &b, target).is_err());
    }
}
