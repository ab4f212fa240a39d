//! Ripple-carry arithmetic primitives.
//!
//! `increase`/`increase_with_carry` build a Cuccaro-style ripple adder:
//! a majority (`maj`) cascade folds the carry forward through the
//! destination register itself, then an un-majority (`uma`) cascade
//! unwinds it, leaving only the sum behind with O(1) ancillas. Every
//! subtracting variant (`decrease*`) is realized as the literal gate
//! reverse of its adding counterpart rather than a second hand-written
//! borrow chain — NOT/CNOT/Toffoli are each their own inverse, so replaying
//! a cascade's gates in reverse order computes the exact inverse function.

use crate::circuit::{Circuit, LineIndex};
use crate::error::SynthesisError;
use crate::gates::basic::bitwise_cnot;
use crate::line_alloc::LineAllocator;

/// `a := majority(a, b, c)`, `b ^= a_in`, `c ^= a_in` (Cuccaro's MAJ gate).
fn maj(circuit: &mut Circuit, c: LineIndex, b: LineIndex, a: LineIndex) {
    circuit.append_cnot(a, b);
    circuit.append_cnot(a, c);
    circuit.append_toffoli(&[b, c], a);
}

/// Inverse of [`maj`] (Cuccaro's UMA gate): unwinds the majority and folds
/// the running sum back into `b`.
fn uma(circuit: &mut Circuit, c: LineIndex, b: LineIndex, a: LineIndex) {
    circuit.append_toffoli(&[b, c], a);
    circuit.append_cnot(a, c);
    circuit.append_cnot(c, b);
}

fn ripple_add(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex], carry_out: Option<LineIndex>) -> Result<(), SynthesisError> {
    let n = a.len();
    if b.len() != n {
        return Err(SynthesisError::WidthMismatch(a.len(), b.len()));
    }
    if n == 0 {
        return Ok(());
    }
    // A single bit has no carry-in to ripple, so addition without a carry
    // output is exactly XOR: skip the maj/uma cascade and its ancilla.
    if n == 1 && carry_out.is_none() {
        circuit.append_cnot(a[0], b[0]);
        return Ok(());
    }
    let c0 = alloc.alloc_const(circuit, false);

    maj(circuit, c0, b[0], a[0]);
    for i in 1..n {
        maj(circuit, a[i - 1], b[i], a[i]);
    }
    if let Some(z) = carry_out {
        circuit.append_cnot(a[n - 1], z);
    }
    for i in (1..n).rev() {
        uma(circuit, a[i - 1], b[i], a[i]);
    }
    uma(circuit, c0, b[0], a[0]);

    alloc.release_const(circuit, c0, false);
    Ok(())
}

/// `dest += src` in place.
pub fn increase(circuit: &mut Circuit, alloc: &mut LineAllocator, dest: &[LineIndex], src: &[LineIndex]) -> Result<(), SynthesisError> {
    ripple_add(circuit, alloc, src, dest, None)
}

/// `dest += src` in place, XORing the final carry-out into `carry_out`.
pub fn increase_with_carry(circuit: &mut Circuit, alloc: &mut LineAllocator, dest: &[LineIndex], src: &[LineIndex], carry_out: LineIndex) -> Result<(), SynthesisError> {
    ripple_add(circuit, alloc, src, dest, Some(carry_out))
}

/// Run `op`'s gate cascade in reverse, computing its functional inverse.
fn reversed<F>(circuit: &mut Circuit, op: F) -> Result<(), SynthesisError>
where
    F: FnOnce(&mut Circuit) -> Result<(), SynthesisError>,
{
    let start = circuit.gate_count();
    op(circuit)?;
    let gates = circuit.gates_since(start);
    circuit.truncate_gates(start);
    for gate in gates.into_iter().rev() {
        circuit.append_raw_gate(gate);
    }
    Ok(())
}

/// `dest -= src` in place: the literal inverse of [`increase`].
pub fn decrease(circuit: &mut Circuit, alloc: &mut LineAllocator, dest: &[LineIndex], src: &[LineIndex]) -> Result<(), SynthesisError> {
    reversed(circuit, |c| increase(c, alloc, dest, src))
}

/// `dest -= src` in place: the literal inverse of [`increase_with_carry`].
pub fn decrease_with_carry(circuit: &mut Circuit, alloc: &mut LineAllocator, dest: &[LineIndex], src: &[LineIndex], carry_out: LineIndex) -> Result<(), SynthesisError> {
    reversed(circuit, |c| increase_with_carry(c, alloc, dest, src, carry_out))
}

/// `a + b` into a freshly allocated zero-initialized register, leaving
/// both operands unchanged.
pub fn increase_new(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex]) -> Result<Vec<LineIndex>, SynthesisError> {
    let result = alloc.alloc_const_vector(circuit, b.len(), 0);
    bitwise_cnot(circuit, b, &result);
    increase(circuit, alloc, &result, a)?;
    Ok(result)
}

/// `a - b` into a freshly allocated zero-initialized register.
pub fn decrease_new(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex]) -> Result<Vec<LineIndex>, SynthesisError> {
    let result = alloc.alloc_const_vector(circuit, a.len(), 0);
    bitwise_cnot(circuit, a, &result);
    decrease(circuit, alloc, &result, b)?;
    Ok(result)
}

/// `lhs := src1 - src2`, writing into an already-resolved (constant-zero)
/// assignment target rather than allocating a fresh register — the shape
/// the statement synthesizer needs for `a -= expr` against a pre-resolved
/// left-hand side.
pub fn decrease_new_assign(circuit: &mut Circuit, alloc: &mut LineAllocator, lhs: &[LineIndex], src1: &[LineIndex], src2: &[LineIndex]) -> Result<(), SynthesisError> {
    bitwise_cnot(circuit, src1, lhs);
    decrease(circuit, alloc, lhs, src2)
}

/// `product := a * b`, truncated to `a`'s width; shift-and-add
/// via one controlled ripple-add per bit of `b`.
pub fn multiplication(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex]) -> Result<Vec<LineIndex>, SynthesisError> {
    let width = a.len();
    let full = multiplication_full(circuit, alloc, a, b)?;
    Ok(full[..width].to_vec())
}

/// `a * b` into a freshly allocated `a.len() + b.len()`-wide register.
pub fn multiplication_full(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &[LineIndex], b: &[LineIndex]) -> Result<Vec<LineIndex>, SynthesisError> {
    let width = a.len() + b.len();
    let product = alloc.alloc_const_vector(circuit, width, 0);
    for (i, &bit) in b.iter().enumerate() {
        let shifted_target = &product[i..i + a.len()];
        // Conditionally add a (under control of b's i-th bit) into the
        // product window starting at bit i.
        controlled_increase(circuit, alloc, shifted_target, a, bit)?;
    }
    Ok(product)
}

/// `dest += src` conditioned on `control` being set, via Toffoli-gated
/// majority cascades (same structure as [`ripple_add`] with every control
/// line of the adder's internal Toffolis extended by `control`).
fn controlled_increase(circuit: &mut Circuit, alloc: &mut LineAllocator, dest: &[LineIndex], src: &[LineIndex], control: LineIndex) -> Result<(), SynthesisError> {
    let n = src.len();
    if dest.len() != n {
        return Err(SynthesisError::WidthMismatch(dest.len(), n));
    }
    if n == 0 {
        return Ok(());
    }
    let c0 = alloc.alloc_const(circuit, false);

    let maj_c = |circuit: &mut Circuit, c: LineIndex, b: LineIndex, a: LineIndex| {
        circuit.append_toffoli(&[control, a], b);
        circuit.append_toffoli(&[control, a], c);
        circuit.append_toffoli(&[b, c], a);
    };
    let uma_c = |circuit: &mut Circuit, c: LineIndex, b: LineIndex, a: LineIndex| {
        circuit.append_toffoli(&[b, c], a);
        circuit.append_toffoli(&[control, a], c);
        circuit.append_toffoli(&[control, c], b);
    };

    maj_c(circuit, c0, dest[0], src[0]);
    for i in 1..n {
        maj_c(circuit, src[i - 1], dest[i], src[i]);
    }
    for i in (1..n).rev() {
        uma_c(circuit, src[i - 1], dest[i], src[i]);
    }
    uma_c(circuit, c0, dest[0], src[0]);

    alloc.release_const(circuit, c0, false);
    Ok(())
}

/// `quotient := a / b`, `a` left holding `a mod b` (restoring-division:
/// repeated compare-and-conditionally-subtract from the most significant
/// aligned position down).
pub fn division(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &mut [LineIndex], b: &[LineIndex]) -> Result<Vec<LineIndex>, SynthesisError> {
    let quotient = alloc.alloc_const_vector(circuit, a.len(), 0);
    restoring_divide(circuit, alloc, a, b, &quotient)?;
    Ok(quotient)
}

/// `a := a mod b` (quotient bits produced and discarded via release, since
/// callers that only need the remainder don't want to carry the quotient
/// register around).
pub fn modulo(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &mut [LineIndex], b: &[LineIndex]) -> Result<(), SynthesisError> {
    let quotient = division(circuit, alloc, a, b)?;
    for q in quotient {
        alloc.release_const(circuit, q, false);
    }
    Ok(())
}

/// Shared restoring-division core: for each quotient bit position (high to
/// low), compare the aligned window of `a` against `b`; where `a >= b`,
/// subtract `b` from that window and set the quotient bit.
fn restoring_divide(circuit: &mut Circuit, alloc: &mut LineAllocator, a: &mut [LineIndex], b: &[LineIndex], quotient: &[LineIndex]) -> Result<(), SynthesisError> {
    use crate::gates::basic::greater_equals;

    let n = a.len();
    let m = b.len();
    for shift in (0..n).rev() {
        let window_len = m.min(n - shift);
        let window = &a[shift..shift + window_len];
        let ge = alloc.alloc_const(circuit, false);
        greater_equals(circuit, alloc, window, &b[..window_len], ge)?;
        controlled_decrease(circuit, alloc, window, &b[..window_len], ge)?;
        circuit.append_cnot(ge, quotient[shift]);
        alloc.release_const(circuit, ge, false);
    }
    Ok(())
}

fn controlled_decrease(circuit: &mut Circuit, alloc: &mut LineAllocator, dest: &[LineIndex], src: &[LineIndex], control: LineIndex) -> Result<(), SynthesisError> {
    reversed(circuit, |c| controlled_increase(c, alloc, dest, src, control))
}

/// `value << amount`, zero-filling the low bits, into a fresh register
/// the same width as `value`.
pub fn left_shift(circuit: &mut Circuit, alloc: &mut LineAllocator, value: &[LineIndex], amount: usize) -> Vec<LineIndex> {
    let width = value.len();
    let result = alloc.alloc_const_vector(circuit, width, 0);
    for i in 0..width {
        if i >= amount && i - amount < width {
            circuit.append_cnot(value[i - amount], result[i]);
        }
    }
    result
}

/// `value >> amount`, zero-filling the high bits.
pub fn right_shift(circuit: &mut Circuit, alloc: &mut LineAllocator, value: &[LineIndex], amount: usize) -> Vec<LineIndex> {
    let width = value.len();
    let result = alloc.alloc_const_vector(circuit, width, 0);
    for i in 0..width {
        if i + amount < width {
            circuit.append_cnot(value[i + amount], result[i]);
        }
    }
    result
}
