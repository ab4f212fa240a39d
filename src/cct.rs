//! cct.rs - Controlled-Cascade Tree: deferred gate emission and control
//! hoisting.
//!
//! Nested constructs (an `if`'s controlled realization, a called module
//! invoked under an outer control) don't thread an extra control parameter
//! through every gate-emitting primitive. Instead the body runs against the
//! real circuit as if unconditional, its gates are captured, and the
//! currently-pushed controls are merged onto all of them at once via
//! [`Circuit::append_circuit`]. When [`SynthesisConfig::efficient_controls`]
//! is set and more than one control is active, a cost model decides whether
//! it's cheaper to fan every control out onto each captured gate, or to
//! fold the controls into one ancilla once and control the whole cascade
//! off that ancilla instead.

use std::collections::BTreeSet;

use crate::circuit::{Circuit, LineIndex};
use crate::error::SynthesisError;
use crate::line_alloc::LineAllocator;

/// Scores a candidate control-emission strategy so the CCT can pick the
/// cheaper of "fan out" vs "hoist into one ancilla". The default,
/// [`GateCountCost`], just counts gates; a caller wanting quantum- or
/// transistor-cost-aware decisions can supply their own (genuinely
/// out of scope to compute here — see the crate's module documentation).
pub trait CostModel {
    fn cost(&self, gate_count: usize, controls_per_gate: usize) -> u64;
}

/// Counts total (gate, control) pairs: `gate_count * controls_per_gate`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GateCountCost;

impl CostModel for GateCountCost {
    fn cost(&self, gate_count: usize, controls_per_gate: usize) -> u64 {
        (gate_count * controls_per_gate.max(1)) as u64
    }
}

/// A stack of control lines accumulated by nested constructs, plus the
/// policy for how they get merged onto captured gate cascades.
pub struct Cct {
    controls: Vec<LineIndex>,
    efficient_controls: bool,
}

impl Cct {
    pub fn new(efficient_controls: bool) -> Self {
        Self { controls: Vec::new(), efficient_controls }
    }

    pub fn push_control(&mut self, line: LineIndex) {
        self.controls.push(line);
    }

    pub fn pop_control(&mut self) -> Option<LineIndex> {
        self.controls.pop()
    }

    pub fn active_controls(&self) -> &[LineIndex] {
        &self.controls
    }

    /// Run `body` against `circuit`, then merge every currently-pushed
    /// control onto every gate it emitted.
    pub fn with_controls<F>(&mut self, circuit: &mut Circuit, alloc: &mut LineAllocator, cost: &dyn CostModel, body: F) -> Result<(), SynthesisError>
    where
        F: FnOnce(&mut Circuit) -> Result<(), SynthesisError>,
    {
        if self.controls.is_empty() {
            return body(circuit);
        }
        let start = circuit.gate_count();
        body(circuit)?;
        self.merge_captured(circuit, alloc, cost, start);
        Ok(())
    }

    /// Merge every currently-pushed control onto every gate appended since
    /// `start`, choosing fan-out vs. hoist per `cost`. Split out of
    /// [`Self::with_controls`] so a caller that needs full synthesizer
    /// access while the cascade runs (statement lists, module activations)
    /// can capture the range itself with an ordinary mutable borrow instead
    /// of fitting the whole call through a `FnOnce(&mut Circuit)` closure.
    pub(crate) fn merge_captured(&self, circuit: &mut Circuit, alloc: &mut LineAllocator, cost: &dyn CostModel, start: usize) {
        let gates = circuit.gates_since(start);
        circuit.truncate_gates(start);

        if gates.is_empty() {
            return;
        }

        let controls: BTreeSet<LineIndex> = self.controls.iter().copied().collect();

        if self.efficient_controls && controls.len() > 1 {
            let fan_out_cost = cost.cost(gates.len(), controls.len());
            let hoist_cost = cost.cost(gates.len(), 1) + cost.cost(2 * (controls.len() - 1), 1);
            tracing::trace!(fan_out_cost, hoist_cost, controls = controls.len(), gates = gates.len(), "control merge cost comparison");
            if hoist_cost < fan_out_cost {
                tracing::debug!(controls = controls.len(), gates = gates.len(), "hoisting controls into one ancilla");
                self.hoist(circuit, alloc, &controls, &gates);
                return;
            }
        }

        circuit.append_circuit(&gates, &controls);
    }

    /// AND every control into one ancilla via a Toffoli ladder (one fresh
    /// ancilla per step, each a plain Toffoli on the two prior terms), run
    /// the cascade controlled off the final ancilla, then uncompute the
    /// ladder by replaying its Toffolis. Each ladder Toffoli
    /// targets a line that was zero going in, so reapplying the identical
    /// gate toggles it back to zero.
    fn hoist(&self, circuit: &mut Circuit, alloc: &mut LineAllocator, controls: &BTreeSet<LineIndex>, gates: &[crate::circuit::Gate]) {
        let mut controls_iter = controls.iter().copied();
        let mut running = controls_iter.next().expect("controls.len() > 1 checked by caller");
        let mut ladder = Vec::new();
        for line in controls_iter {
            let next = alloc.alloc_const(circuit, false);
            circuit.append_toffoli(&[running, line], next);
            ladder.push(next);
            running = next;
        }

        let hoisted: BTreeSet<LineIndex> = BTreeSet::from([running]);
        circuit.append_circuit(gates, &hoisted);

        let chain_start = circuit.gate_count();
        let mut controls_iter = controls.iter().copied();
        let mut running = controls_iter.next().expect("controls.len() > 1 checked by caller");
        for (line, &anc) in controls_iter.zip(ladder.iter()) {
            circuit.append_toffoli(&[running, line], anc);
            running = anc;
        }
        let chain = circuit.gates_since(chain_start);
        circuit.truncate_gates(chain_start);
        for gate in chain.into_iter().rev() {
            circuit.append_raw_gate(gate);
        }

        for &anc in &ladder {
            alloc.release_const(circuit, anc, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(circuit: &mut Circuit, n: usize) -> Vec<LineIndex> {
        (0..n).map(|i| circuit.add_line(format!("l{i}"), format!("l{i}"), None, false)).collect()
    }

    #[test]
    fn no_active_controls_runs_body_unmodified() {
        let mut circuit = Circuit::new();
        let mut alloc = LineAllocator::new();
        let ls = lines(&mut circuit, 2);
        let mut cct = Cct::new(false);
        cct.with_controls(&mut circuit, &mut alloc, &GateCountCost, |c| {
            c.append_not(ls[0]);
            Ok(())
        }).unwrap();
        assert!(circuit.gates[0].controls.is_empty());
    }

    #[test]
    fn single_control_is_merged_onto_every_captured_gate() {
        let mut circuit = Circuit::new();
        let mut alloc = LineAllocator::new();
        let ls = lines(&mut circuit, 3);
        let mut cct = Cct::new(false);
        cct.push_control(ls[0]);
        cct.with_controls(&mut circuit, &mut alloc, &GateCountCost, |c| {
            c.append_cnot(ls[1], ls[2]);
            Ok(())
        }).unwrap();
        assert!(circuit.gates[0].controls.contains(&ls[0]));
    }

    #[test]
    fn efficient_controls_hoists_multiple_controls_into_one_ancilla() {
        let mut circuit = Circuit::new();
        let mut alloc = LineAllocator::new();
        let ls = lines(&mut circuit, 5);
        let mut cct = Cct::new(true);
        cct.push_control(ls[0]);
        cct.push_control(ls[1]);
        cct.push_control(ls[2]);
        let before = circuit.gate_count();
        cct.with_controls(&mut circuit, &mut alloc, &GateCountCost, |c| {
            for _ in 0..10 {
                c.append_not(ls[3]);
            }
            Ok(())
        }).unwrap();
        // Every hoisted gate now carries exactly one control line.
        for gate in &circuit.gates[before..] {
            assert!(gate.controls.len() <= 1);
        }
    }
}
