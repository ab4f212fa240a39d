//! circuit.rs - Concrete realization of the external circuit contract.
//!
//! The circuit data structure and gate-append primitives are documented as
//! an external collaborator; this module gives it
//! concrete shape matching the documented contract so the synthesizer has
//! something to build against. Cost evaluation (quantum cost, transistor
//! cost) stays genuinely out of scope — nothing here computes it.

use std::collections::{BTreeSet, HashMap};

/// Index into [`Circuit::lines`].
pub type LineIndex = usize;

/// A single circuit line and its declared attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub name_in: String,
    pub name_out: String,
    pub is_input: bool,
    pub is_output: bool,
    /// `Some(value)` when this line is currently constant-valued.
    pub is_constant: Option<bool>,
    pub is_garbage: bool,
}

/// The kind of a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateKind {
    Not,
    Cnot,
    Toffoli,
    Fredkin,
    /// A hierarchical gate referencing a named sub-circuit.
    Module(String),
}

/// A single reversible gate: a control set plus a tuple of target lines.
/// Fredkin's two targets are swapped under its controls;
/// NOT/CNOT/Toffoli's single target is inverted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    pub kind: GateKind,
    pub controls: BTreeSet<LineIndex>,
    pub targets: Vec<LineIndex>,
    /// Source line number this gate was emitted for, set via the
    /// `on_gate_added` hook from the synthesizer's statement stack.
    pub source_line: Option<u32>,
}

/// Named groups of lines forming an input bus, output bus, or state signal.
#[derive(Debug, Clone, Default)]
struct LineGroups {
    input_buses: HashMap<String, Vec<LineIndex>>,
    output_buses: HashMap<String, Vec<LineIndex>>,
    state_signals: HashMap<String, Vec<LineIndex>>,
}

/// The circuit being assembled: an ordered gate sequence over a named set
/// of lines, plus named reusable sub-modules.
#[derive(Default)]
pub struct Circuit {
    pub lines: Vec<Line>,
    pub gates: Vec<Gate>,
    modules: HashMap<String, Circuit>,
    groups: LineGroups,
    current_source_line: Option<u32>,
    on_gate_added: Option<Box<dyn FnMut(&Gate)>>,
}

impl std::fmt::Debug for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Circuit")
            .field("lines", &self.lines.len())
            .field("gates", &self.gates.len())
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new line, returning its index.
    pub fn add_line(&mut self, name_in: impl Into<String>, name_out: impl Into<String>, is_constant: Option<bool>, is_garbage: bool) -> LineIndex {
        self.lines.push(Line {
            name_in: name_in.into(),
            name_out: name_out.into(),
            is_input: false,
            is_output: false,
            is_constant,
            is_garbage,
        });
        self.lines.len() - 1
    }

    pub fn mark_input(&mut self, line: LineIndex) {
        self.lines[line].is_input = true;
    }

    pub fn mark_output(&mut self, line: LineIndex) {
        self.lines[line].is_output = true;
    }

    /// Rewrite a line's output name (used when a constant's polarity
    /// changes in `release_const`).
    pub fn rename_output(&mut self, line: LineIndex, name_out: impl Into<String>) {
        self.lines[line].name_out = name_out.into();
    }

    pub fn set_constant(&mut self, line: LineIndex, value: Option<bool>) {
        self.lines[line].is_constant = value;
    }

    pub fn set_garbage(&mut self, line: LineIndex, garbage: bool) {
        self.lines[line].is_garbage = garbage;
    }

    /// Set the source line annotated onto every subsequently appended gate
    /// until changed again.
    pub fn set_current_source_line(&mut self, line: Option<u32>) {
        self.current_source_line = line;
    }

    pub fn set_on_gate_added(&mut self, hook: impl FnMut(&Gate) + 'static) {
        self.on_gate_added = Some(Box::new(hook));
    }

    fn push_gate(&mut self, kind: GateKind, controls: BTreeSet<LineIndex>, targets: Vec<LineIndex>) {
        let gate = Gate { kind, controls, targets, source_line: self.current_source_line };
        if let Some(hook) = self.on_gate_added.as_mut() {
            hook(&gate);
        }
        self.gates.push(gate);
    }

    pub fn append_not(&mut self, target: LineIndex) {
        self.push_gate(GateKind::Not, BTreeSet::new(), vec![target]);
    }

    pub fn append_cnot(&mut self, control: LineIndex, target: LineIndex) {
        self.push_gate(GateKind::Cnot, BTreeSet::from([control]), vec![target]);
    }

    pub fn append_toffoli(&mut self, controls: &[LineIndex], target: LineIndex) {
        self.push_gate(GateKind::Toffoli, controls.iter().copied().collect(), vec![target]);
    }

    pub fn append_fredkin(&mut self, controls: &[LineIndex], a: LineIndex, b: LineIndex) {
        self.push_gate(GateKind::Fredkin, controls.iter().copied().collect(), vec![a, b]);
    }

    pub fn append_module(&mut self, name: impl Into<String>, controls: &[LineIndex], targets: &[LineIndex]) {
        self.push_gate(GateKind::Module(name.into()), controls.iter().copied().collect(), targets.to_vec());
    }

    /// Splice a previously-assembled sub-cascade's gates into this circuit,
    /// merging `extra_controls` onto every one of them.
    pub fn append_circuit(&mut self, sub: &[Gate], extra_controls: &BTreeSet<LineIndex>) {
        for gate in sub {
            let mut controls = gate.controls.clone();
            controls.extend(extra_controls.iter().copied());
            let gate = Gate { kind: gate.kind.clone(), controls, targets: gate.targets.clone(), source_line: gate.source_line };
            if let Some(hook) = self.on_gate_added.as_mut() {
                hook(&gate);
            }
            self.gates.push(gate);
        }
    }

    /// Fetch a memoized named sub-module, building it with `build` on first
    /// request.
    pub fn get_or_build_module(&mut self, name: &str, build: impl FnOnce() -> Circuit) -> &Circuit {
        self.modules.entry(name.to_string()).or_insert_with(build)
    }

    pub fn module(&self, name: &str) -> Option<&Circuit> {
        self.modules.get(name)
    }

    pub fn add_input_bus(&mut self, name: impl Into<String>, lines: Vec<LineIndex>) {
        self.groups.input_buses.insert(name.into(), lines);
    }

    pub fn add_output_bus(&mut self, name: impl Into<String>, lines: Vec<LineIndex>) {
        self.groups.output_buses.insert(name.into(), lines);
    }

    pub fn add_state_signal(&mut self, name: impl Into<String>, lines: Vec<LineIndex>) {
        self.groups.state_signals.insert(name.into(), lines);
    }

    pub fn input_bus(&self, name: &str) -> Option<&[LineIndex]> {
        self.groups.input_buses.get(name).map(Vec::as_slice)
    }

    /// Re-append a gate exactly as given, without changing its controls or
    /// recomputing its source line (used to replay a previously-emitted
    /// cascade, e.g. `access::unget`'s reverse-order undo).
    pub fn append_raw_gate(&mut self, gate: Gate) {
        if let Some(hook) = self.on_gate_added.as_mut() {
            hook(&gate);
        }
        self.gates.push(gate);
    }

    /// Gates appended since `start`.
    pub fn gates_since(&self, start: usize) -> Vec<Gate> {
        self.gates[start..].to_vec()
    }

    /// Drop every gate appended since `start` (used to capture a forward
    /// cascade, then replay it in reverse in place of the original).
    pub fn truncate_gates(&mut self, start: usize) {
        self.gates.truncate(start);
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}
