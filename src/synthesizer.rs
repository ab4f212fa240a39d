//! synthesizer.rs - Top-level orchestrator.
//!
//! Owns the circuit under construction, the line allocator, the
//! controlled-cascade control stack, and the program being lowered. Each
//! module activation gets its own [`Bindings`] map (formal parameters
//! aliased to the caller's actual lines, locals freshly declared) and
//! [`LoopMap`] — activation state lives on this call stack, never by
//! mutating the AST itself.

use std::collections::HashMap;

use crate::ast::{LoopMap, Module, Program};
use crate::cct::{Cct, CostModel, GateCountCost};
use crate::circuit::{Circuit, LineIndex};
use crate::config::SynthesisConfig;
use crate::error::SynthesisError;
use crate::line_alloc::LineAllocator;
use crate::stmt;

/// Name-to-lines bindings visible to one module activation.
pub type Bindings = HashMap<String, Vec<LineIndex>>;

/// Drives the whole lowering: owns the circuit, the constant-line pool,
/// the active-control stack, and the program being synthesized.
pub struct Synthesizer<'p> {
    pub(crate) circuit: Circuit,
    pub(crate) alloc: LineAllocator,
    pub(crate) cct: Cct,
    pub(crate) config: SynthesisConfig,
    pub(crate) cost_model: Box<dyn CostModel>,
    program: &'p Program,
}

impl<'p> Synthesizer<'p> {
    pub fn new(program: &'p Program, config: SynthesisConfig) -> Self {
        let cct = Cct::new(config.efficient_controls);
        Self { circuit: Circuit::new(), alloc: LineAllocator::new(), cct, config, cost_model: Box::new(GateCountCost), program }
    }

    /// Lower the configured main module (or the program's first module)
    /// into a complete [`Circuit`].
    pub fn synthesize(mut self) -> Result<Circuit, SynthesisError> {
        let main_name = match &self.config.main_module {
            Some(name) => name.clone(),
            None => self
                .program
                .modules
                .first()
                .map(|m| m.name.clone())
                .ok_or_else(|| SynthesisError::UnknownMainModule(String::new()))?,
        };
        let module = self
            .program
            .find_module(&main_name)
            .ok_or_else(|| SynthesisError::UnknownMainModule(main_name.clone()))?;

        let mut bindings = Bindings::new();
        for var in module.all_variables() {
            let lines = self.alloc.declare_variable(&mut self.circuit, var, &var.name);
            bindings.insert(var.name.clone(), lines);
        }
        let loop_map = LoopMap::new();
        self.run_statements(&module.statements, &mut bindings, &loop_map)?;
        Ok(self.circuit)
    }

    pub(crate) fn run_statements(&mut self, stmts: &[crate::ast::Statement], bindings: &mut Bindings, loop_map: &LoopMap) -> Result<(), SynthesisError> {
        for s in stmts {
            stmt::on_statement(self, bindings, loop_map, s)?;
        }
        Ok(())
    }

    pub(crate) fn find_module(&self, name: &str) -> Option<&'p Module> {
        self.program.find_module(name)
    }

    /// Activate `module`, binding its formal parameters to the caller's
    /// `actuals` (by name, pass-by-reference — no fresh lines) and
    /// declaring fresh lines for its locals, then run its body. `forward =
    /// false` realizes `uncall`: the body runs forward into a capture and
    /// is replayed in reverse.
    pub(crate) fn activate_module(&mut self, module: &'p Module, caller: &Bindings, actuals: &[String], forward: bool) -> Result<(), SynthesisError> {
        tracing::debug!(module = %module.name, forward, "activating module");
        let mut callee_bindings = Bindings::new();
        for (formal, actual) in module.parameters.iter().zip(actuals.iter()) {
            let lines = caller
                .get(actual)
                .ok_or_else(|| SynthesisError::UnresolvedParameter(actual.clone()))?
                .clone();
            callee_bindings.insert(formal.name.clone(), lines);
        }
        for local in &module.locals {
            let lines = self.alloc.declare_variable(&mut self.circuit, local, &local.name);
            callee_bindings.insert(local.name.clone(), lines);
        }

        let loop_map = LoopMap::new();
        if forward {
            self.run_statements(&module.statements, &mut callee_bindings, &loop_map)
        } else {
            let start = self.circuit.gate_count();
            self.run_statements(&module.statements, &mut callee_bindings, &loop_map)?;
            let gates = self.circuit.gates_since(start);
            self.circuit.truncate_gates(start);
            for gate in gates.into_iter().rev() {
                self.circuit.append_raw_gate(gate);
            }
            Ok(())
        }
    }
}
