//! access.rs - Variable access resolution.
//!
//! Turns a `VariableAccess` (a variable plus optional dimension indices and
//! bit range) into the concrete circuit lines it denotes. Static indices
//! fold to an offset with no gates emitted; at most one dynamic index is
//! supported, realized as a swap cascade that brings the selected array
//! element into a freshly allocated, zero-initialized ancilla block under
//! index-matching controls — never into the array's own storage, so that
//! two independent dynamic accesses into the same array never alias onto
//! identical physical lines. `unget` reverses that cascade by replaying its
//! gates in reverse order — every gate kind it uses (NOT, Fredkin) is its
//! own inverse, so reversing order alone suffices — then returns the
//! now-zeroed ancilla block to the allocator's free pool.

use std::collections::HashMap;

use crate::ast::{Expression, VariableAccess, LoopMap};
use crate::circuit::{Circuit, Gate, LineIndex};
use crate::error::SynthesisError;
use crate::line_alloc::LineAllocator;

/// The lines a `VariableAccess` resolved to, plus enough to undo any
/// dynamic-index swap cascade that was emitted to get them.
pub struct ResolvedAccess {
    lines: Vec<LineIndex>,
    undo_gates: Vec<Gate>,
    /// The fresh ancilla block allocated for a dynamic-index swap cascade,
    /// if any, to be released back to the allocator by `unget`.
    dynamic_ancilla: Option<Vec<LineIndex>>,
}

impl ResolvedAccess {
    pub fn lines(&self) -> &[LineIndex] {
        &self.lines
    }
}

/// Resolve `access` to its circuit lines. `bindings` maps currently-visible
/// variable names to their full declared line range.
pub fn resolve(
    circuit: &mut Circuit,
    alloc: &mut LineAllocator,
    bindings: &HashMap<String, Vec<LineIndex>>,
    loop_map: &LoopMap,
    access: &VariableAccess,
) -> Result<ResolvedAccess, SynthesisError> {
    let var_lines = bindings
        .get(&access.variable.name)
        .ok_or_else(|| SynthesisError::UnresolvedParameter(access.variable.name.clone()))?;

    let dims = &access.variable.dimensions;
    let bitwidth = access.variable.bitwidth;

    let element_lines = if access.indices.is_empty() {
        ElementLines::Static(var_lines.clone())
    } else if access.is_fully_static() {
        let offset = static_offset(dims, &access.indices, loop_map)?;
        slice_element(var_lines, offset, bitwidth)?
    } else {
        resolve_dynamic(circuit, alloc, bindings, loop_map, access, var_lines, dims, bitwidth)?
    };

    let (element, undo_gates, dynamic_ancilla) = match element_lines {
        ElementLines::Static(lines) => (lines, Vec::new(), None),
        ElementLines::Dynamic(lines, gates) => (lines.clone(), gates, Some(lines)),
    };

    let final_lines = select_range(&element, access.range);
    if final_lines.len() != access.bitwidth() {
        return Err(SynthesisError::LineCountMismatch(
            access.variable.name.clone(),
            final_lines.len(),
            access.bitwidth(),
        ));
    }
    Ok(ResolvedAccess { lines: final_lines, undo_gates, dynamic_ancilla })
}

enum ElementLines {
    Static(Vec<LineIndex>),
    Dynamic(Vec<LineIndex>, Vec<Gate>),
}

/// Undo a dynamic access's swap cascade by replaying its gates in reverse
/// order, then release the freshly allocated ancilla block back to the
/// free pool. A no-op for statically-resolved accesses.
pub fn unget(circuit: &mut Circuit, alloc: &mut LineAllocator, resolved: &ResolvedAccess) {
    for gate in resolved.undo_gates.iter().rev() {
        circuit.append_raw_gate(gate.clone());
    }
    if let Some(ancilla) = &resolved.dynamic_ancilla {
        for &line in ancilla {
            alloc.release_const(circuit, line, false);
        }
    }
}

/// Row-major offset of a fully-static index tuple.
fn static_offset(dims: &[usize], indices: &[Expression], loop_map: &LoopMap) -> Result<u64, SynthesisError> {
    let mut offset = 0u64;
    for (dim, index) in dims.iter().zip(indices.iter()) {
        let value = match index {
            Expression::Numeric(n) => n.evaluate(loop_map),
            _ => return Err(SynthesisError::UnknownExpression),
        };
        offset = offset * (*dim as u64) + value;
    }
    Ok(offset)
}

fn slice_element(var_lines: &[LineIndex], offset: u64, bitwidth: usize) -> Result<ElementLines, SynthesisError> {
    let start = offset as usize * bitwidth;
    let end = start + bitwidth;
    if end > var_lines.len() {
        return Err(SynthesisError::LineCountMismatch("<array index out of range>".to_string(), var_lines.len(), end));
    }
    Ok(ElementLines::Static(var_lines[start..end].to_vec()))
}

/// Resolve an access with exactly one non-static dimension index by
/// cascading controlled swaps over that dimension's extent.
/// Indices other than the dynamic one must already be statically foldable;
/// more than one dynamic dimension in the same access is rejected.
fn resolve_dynamic(
    circuit: &mut Circuit,
    alloc: &mut LineAllocator,
    bindings: &HashMap<String, Vec<LineIndex>>,
    loop_map: &LoopMap,
    access: &VariableAccess,
    var_lines: &[LineIndex],
    dims: &[usize],
    bitwidth: usize,
) -> Result<ElementLines, SynthesisError> {
    let mut dynamic_pos = None;
    let mut fixed = vec![0u64; dims.len()];
    let mut index_lines: Vec<LineIndex> = Vec::new();

    for (pos, index) in access.indices.iter().enumerate() {
        match index {
            Expression::Numeric(n) => fixed[pos] = n.evaluate(loop_map),
            Expression::Variable(inner) => {
                if dynamic_pos.is_some() {
                    return Err(SynthesisError::UnknownExpression);
                }
                dynamic_pos = Some(pos);
                let inner_resolved = resolve(circuit, alloc, bindings, loop_map, inner)?;
                index_lines = inner_resolved.lines().to_vec();
            }
            _ => return Err(SynthesisError::UnknownExpression),
        }
    }

    let dyn_pos = dynamic_pos.ok_or(SynthesisError::UnknownExpression)?;
    let extent = dims[dyn_pos];

    let offset_for = |candidate: u64| -> u64 {
        let mut values = fixed.clone();
        values[dyn_pos] = candidate;
        let mut offset = 0u64;
        for (dim, value) in dims.iter().zip(values.iter()) {
            offset = offset * (*dim as u64) + value;
        }
        offset
    };

    // Fresh, zero-initialized destination — never the array's own storage,
    // so two independent dynamic accesses into the same array never alias.
    let target = alloc.alloc_const_vector(circuit, bitwidth, 0);

    let gate_start = circuit.gate_count();
    let index_width = index_lines.len();

    for candidate in 0..extent as u64 {
        for bit in 0..index_width {
            if (candidate >> bit) & 1 == 0 {
                circuit.append_not(index_lines[bit]);
            }
        }
        let cand_offset = offset_for(candidate) as usize * bitwidth;
        let cand_lines = &var_lines[cand_offset..cand_offset + bitwidth];
        for (&a, &b) in target.iter().zip(cand_lines.iter()) {
            circuit.append_fredkin(&index_lines, a, b);
        }
        for bit in 0..index_width {
            if (candidate >> bit) & 1 == 0 {
                circuit.append_not(index_lines[bit]);
            }
        }
    }

    let gates = circuit.gates_since(gate_start);
    Ok(ElementLines::Dynamic(target, gates))
}

/// Apply an optional bit range to a resolved element window, reversing the
/// slice when `first > last`.
fn select_range(lines: &[LineIndex], range: Option<(usize, usize)>) -> Vec<LineIndex> {
    match range {
        None => lines.to_vec(),
        Some((first, last)) => {
            if first <= last {
                lines[first..=last].to_vec()
            } else {
                lines[last..=first].iter().rev().copied().collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Variable, VariableKind};
    use crate::line_alloc::LineAllocator;
    use std::rc::Rc;

    fn bind(circuit: &mut Circuit, name: &str, count: usize) -> Vec<LineIndex> {
        (0..count).map(|i| circuit.add_line(format!("{name}.{i}"), format!("{name}.{i}"), None, false)).collect()
    }

    #[test]
    fn static_scalar_access_returns_whole_range() {
        let mut circuit = Circuit::new();
        let lines = bind(&mut circuit, "a", 4);
        let mut bindings = HashMap::new();
        bindings.insert("a".to_string(), lines.clone());

        let var = Rc::new(Variable::new(VariableKind::Wire, "a", vec![], 4));
        let access = VariableAccess::whole(var);
        let mut alloc = LineAllocator::new();
        let resolved = resolve(&mut circuit, &mut alloc, &bindings, &LoopMap::new(), &access).unwrap();
        assert_eq!(resolved.lines(), lines.as_slice());
    }

    #[test]
    fn static_array_index_selects_element_window() {
        let mut circuit = Circuit::new();
        let lines = bind(&mut circuit, "arr", 6); // 3 elements x 2 bits
        let mut bindings = HashMap::new();
        bindings.insert("arr".to_string(), lines.clone());

        let var = Rc::new(Variable::new(VariableKind::Wire, "arr", vec![3], 2));
        let access = VariableAccess::whole(var).with_indices(vec![Expression::numeric(1)]);
        let mut alloc = LineAllocator::new();
        let resolved = resolve(&mut circuit, &mut alloc, &bindings, &LoopMap::new(), &access).unwrap();
        assert_eq!(resolved.lines(), &lines[2..4]);
    }

    #[test]
    fn bit_range_reversal_reorders_lines() {
        let mut circuit = Circuit::new();
        let lines = bind(&mut circuit, "x", 4);
        let mut bindings = HashMap::new();
        bindings.insert("x".to_string(), lines.clone());

        let var = Rc::new(Variable::new(VariableKind::Wire, "x", vec![], 4));
        let access = VariableAccess::whole(var).with_range(3, 0);
        let mut alloc = LineAllocator::new();
        let resolved = resolve(&mut circuit, &mut alloc, &bindings, &LoopMap::new(), &access).unwrap();
        assert_eq!(resolved.lines(), vec![lines[3], lines[2], lines[1], lines[0]].as_slice());
    }

    #[test]
    fn dynamic_index_emits_reversible_cascade() {
        let mut circuit = Circuit::new();
        let arr_lines = bind(&mut circuit, "arr", 4); // 2 elements x 2 bits
        let idx_lines = bind(&mut circuit, "idx", 1);
        let mut bindings = HashMap::new();
        bindings.insert("arr".to_string(), arr_lines.clone());
        bindings.insert("idx".to_string(), idx_lines.clone());

        let arr_var = Rc::new(Variable::new(VariableKind::Wire, "arr", vec![2], 2));
        let idx_var = Rc::new(Variable::new(VariableKind::Wire, "idx", vec![], 1));
        let access = VariableAccess::whole(arr_var)
            .with_indices(vec![Expression::var(VariableAccess::whole(idx_var))]);

        let mut alloc = LineAllocator::new();
        let gates_before = circuit.gate_count();
        let lines_before = circuit.line_count();
        let resolved = resolve(&mut circuit, &mut alloc, &bindings, &LoopMap::new(), &access).unwrap();
        assert_eq!(resolved.lines().len(), 2);
        assert!(circuit.gate_count() > gates_before);
        // The swap target is freshly allocated ancilla, not the array's own
        // element-0 storage.
        assert!(resolved.lines().iter().all(|l| !arr_lines.contains(l)));
        assert_eq!(circuit.line_count(), lines_before + 2);

        unget(&mut circuit, &mut alloc, &resolved);
        // Every cascade gate, then its reverse replay: an even total count.
        assert_eq!((circuit.gate_count() - gates_before) % 2, 0);
    }

    #[test]
    fn two_dynamic_accesses_into_same_array_do_not_alias() {
        let mut circuit = Circuit::new();
        let arr_lines = bind(&mut circuit, "arr", 4); // 2 elements x 2 bits
        let idx_lines = bind(&mut circuit, "idx", 1);
        let jdx_lines = bind(&mut circuit, "jdx", 1);
        let mut bindings = HashMap::new();
        bindings.insert("arr".to_string(), arr_lines.clone());
        bindings.insert("idx".to_string(), idx_lines.clone());
        bindings.insert("jdx".to_string(), jdx_lines.clone());

        let arr_var = Rc::new(Variable::new(VariableKind::Wire, "arr", vec![2], 2));
        let idx_var = Rc::new(Variable::new(VariableKind::Wire, "idx", vec![], 1));
        let jdx_var = Rc::new(Variable::new(VariableKind::Wire, "jdx", vec![], 1));

        let access_i = VariableAccess::whole(arr_var.clone())
            .with_indices(vec![Expression::var(VariableAccess::whole(idx_var))]);
        let access_j = VariableAccess::whole(arr_var)
            .with_indices(vec![Expression::var(VariableAccess::whole(jdx_var))]);

        let mut alloc = LineAllocator::new();
        let resolved_i = resolve(&mut circuit, &mut alloc, &bindings, &LoopMap::new(), &access_i).unwrap();
        let resolved_j = resolve(&mut circuit, &mut alloc, &bindings, &LoopMap::new(), &access_j).unwrap();
        // Two independent dynamic accesses must never share physical lines.
        for l in resolved_i.lines() {
            assert!(!resolved_j.lines().contains(l));
        }
    }
}
