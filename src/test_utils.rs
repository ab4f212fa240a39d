//! test_utils.rs - Shared AST-building helpers for integration tests.
//!
//! Unit tests colocated with each module build their own tiny fixtures
//! inline; these helpers are for tests that need a small multi-module
//! program (main plus a callee) without repeating the boilerplate.

use std::rc::Rc;

use crate::ast::{Module, Program, Variable, VariableKind};

pub fn scalar_var(kind: VariableKind, name: &str, bitwidth: usize) -> Rc<Variable> {
    Rc::new(Variable::new(kind, name, Vec::new(), bitwidth))
}

pub fn array_var(kind: VariableKind, name: &str, dimensions: Vec<usize>, bitwidth: usize) -> Rc<Variable> {
    Rc::new(Variable::new(kind, name, dimensions, bitwidth))
}

/// A one-module program whose `main` body is exactly `statements`, with
/// `params` as its formal parameters (in order).
pub fn program_with_main(params: Vec<Rc<Variable>>, statements: Vec<crate::ast::Statement>) -> Program {
    let mut main = Module::new("main");
    main.parameters = params;
    main.statements = statements;
    Program { modules: vec![main] }
}

/// A two-module program: `main` (with `main_statements`) plus a callee
/// module named `callee_name` taking `callee_params` and running
/// `callee_statements`.
pub fn program_with_callee(
    main_params: Vec<Rc<Variable>>,
    main_statements: Vec<crate::ast::Statement>,
    callee_name: &str,
    callee_params: Vec<Rc<Variable>>,
    callee_statements: Vec<crate::ast::Statement>,
) -> Program {
    let mut main = Module::new("main");
    main.parameters = main_params;
    main.statements = main_statements;

    let mut callee = Module::new(callee_name);
    callee.parameters = callee_params;
    callee.statements = callee_statements;

    Program { modules: vec![main, callee] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AssignOp, Expression, Statement, VariableAccess};
    use crate::config::SynthesisConfig;
    use crate::synthesizer::Synthesizer;

    #[test]
    fn program_with_main_synthesizes() {
        let a = scalar_var(VariableKind::Wire, "a", 4);
        let program = program_with_main(
            vec![a.clone()],
            vec![Statement::Assign(AssignOp::Add, VariableAccess::whole(a), Expression::numeric(1))],
        );
        let synth = Synthesizer::new(&program, SynthesisConfig::default());
        assert!(synth.synthesize().is_ok());
    }
}
