#![doc = r#"
Reversible-circuit synthesis library crate.

This crate translates an already-parsed RHDL program AST (modules,
statements, expressions — see [`ast`]) into a gate-level reversible circuit
(NOT, CNOT, Toffoli, Fredkin, and composite module gates — see [`circuit`]).
The RHDL parser, PLA reader, cost evaluators, and CLI drivers are external
collaborators and are not part of this crate.

Modules:
- ast: external AST contract (modules, statements, expressions, variables)
- circuit: external circuit data structure and gate-append primitives
- config: configuration surface
- error: synthesis error type
- line_alloc: constant-line allocator and free pool
- access: variable-access resolution and array-swap cascades
- gates: fixed library of reversible gate primitives
- cct: controlled-cascade tree with deferred gate emission
- expr: expression synthesizer
- stmt: statement synthesizer, including both IF realizations
- self_ref: self-reference resolver for assignments
- synthesizer: top-level orchestrator tying the above together

In tests, shared AST-building helpers are available under `crate::test_utils`.
"#]

pub mod access;
pub mod ast;
pub mod cct;
pub mod circuit;
pub mod config;
pub mod error;
pub mod expr;
pub mod gates;
pub mod line_alloc;
pub mod self_ref;
pub mod stmt;
pub mod synthesizer;

pub use circuit::Circuit;
pub use config::SynthesisConfig;
pub use error::SynthesisError;
pub use synthesizer::Synthesizer;

#[cfg(test)]
pub mod test_utils;
