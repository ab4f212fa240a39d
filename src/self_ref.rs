//! self_ref.rs - Self-referencing assignment resolution.
//!
//! `a += a + b` is unproblematic on its own: the expression synthesizer
//! reads `a`'s lines without mutating them while building the RHS value,
//! so evaluating the whole right-hand side before applying the accumulate
//! operator already gives the right answer (Path A, [`full_statement`]).
//!
//! The case that needs help is a *dynamic* array access on the left that
//! also shows up on the right, e.g. `arr[i] += arr[i] + b` with `i` not
//! statically known: resolving `arr[i]` independently on each side would
//! run the index swap-cascade twice against an array that the first
//! resolution already permuted. Path B ([`solver`]) resolves the
//! left-hand access once and rewrites matching occurrences on the right to
//! read through that same resolution via a synthetic scalar variable,
//! rather than re-running the cascade.
//!
//! A second, independent hazard: the right-hand side can repeat the exact
//! same operand against itself (`a + a`, `a ^ a`), with no left-hand
//! self-reference in sight (`x += a + a`). [`repeated_operand_plan`]
//! detects that shape and reports how the statement synthesizer should
//! collapse it: add/subtract of a value with itself cancels to a no-op,
//! exclusive-or applies the statement's own operator once and the
//! repeated operator again rather than evaluating the operand twice.
//!
//! Matching for Path B is conservative: any RHS access to the *same
//! declared variable* counts as a potential self-reference, regardless of
//! whether its indices can be proven to land on the same element. This
//! can trigger Path B slightly more often than strictly necessary, but
//! never misses a real aliasing hazard. Neither this nor the repeated-
//! operand check above catches a bare scalar self-accumulate
//! (`x += x`, no inner binary node at all) — that aliasing is instead
//! handled at gate-emission time, in the statement synthesizer's
//! accumulate step, since it depends on the *resolved lines* coinciding
//! rather than on AST shape.

use std::rc::Rc;

use crate::ast::{BinaryOp, Expression, Variable, VariableAccess, VariableKind};

/// True if `variable` (by declaration identity) is read anywhere in `expr`.
pub fn contains_self_reference(expr: &Expression, variable: &Rc<Variable>) -> bool {
    match expr {
        Expression::Numeric(_) => false,
        Expression::Variable(access) => Rc::ptr_eq(&access.variable, variable),
        Expression::Binary { lhs, rhs, .. } => {
            contains_self_reference(lhs, variable) || contains_self_reference(rhs, variable)
        }
        Expression::Shift { lhs, .. } => contains_self_reference(lhs, variable),
    }
}

/// Number of distinct read sites of `variable` in `expr`.
pub fn count_repeats(expr: &Expression, variable: &Rc<Variable>) -> usize {
    match expr {
        Expression::Numeric(_) => 0,
        Expression::Variable(access) => usize::from(Rc::ptr_eq(&access.variable, variable)),
        Expression::Binary { lhs, rhs, .. } => count_repeats(lhs, variable) + count_repeats(rhs, variable),
        Expression::Shift { lhs, .. } => count_repeats(lhs, variable),
    }
}

/// True when the assignment's left-hand access needs Path B: it's dynamic
/// (costs a swap cascade to resolve) and also read on the right.
pub fn needs_shared_resolution(lhs: &VariableAccess, rhs: &Expression) -> bool {
    !lhs.indices.is_empty() && !lhs.is_fully_static() && contains_self_reference(rhs, &lhs.variable)
}

/// Path B: rewrite every RHS read of `lhs.variable` into a read of
/// `synthetic` (a zero-dimension scalar standing in for the already-
/// resolved left-hand window), leaving every other node untouched.
pub fn substitute(expr: &Expression, lhs_variable: &Rc<Variable>, synthetic: &Rc<Variable>) -> Expression {
    match expr {
        Expression::Numeric(n) => Expression::Numeric(n.clone()),
        Expression::Variable(access) if Rc::ptr_eq(&access.variable, lhs_variable) => {
            Expression::var(VariableAccess::whole(synthetic.clone()))
        }
        Expression::Variable(access) => Expression::Variable(access.clone()),
        Expression::Binary { op, lhs, rhs, bitwidth } => Expression::Binary {
            op: *op,
            lhs: Box::new(substitute(lhs, lhs_variable, synthetic)),
            rhs: Box::new(substitute(rhs, lhs_variable, synthetic)),
            bitwidth: *bitwidth,
        },
        Expression::Shift { op, lhs, amount, bitwidth } => Expression::Shift {
            op: *op,
            lhs: Box::new(substitute(lhs, lhs_variable, synthetic)),
            amount: amount.clone(),
            bitwidth: *bitwidth,
        },
    }
}

/// Build the synthetic scalar variable Path B rewrites self-references
/// onto: same kind and bit-width as the left-hand variable, no dimensions
/// (the resolved window is already a flat line range).
pub fn synthetic_variable(lhs_variable: &Rc<Variable>, width: usize) -> Rc<Variable> {
    Rc::new(Variable::new(lhs_variable.kind, format!("{}__self", lhs_variable.name), Vec::new(), width))
}

/// Path A: statically-resolvable left-hand sides (including ones that
/// happen to also appear on the right) need no rewriting at all — the
/// statement synthesizer just evaluates the whole right-hand side before
/// applying the accumulate operator. This function exists to name that
/// decision at the call site rather than leaving it implicit.
pub fn full_statement_is_safe(lhs: &VariableAccess) -> bool {
    lhs.indices.is_empty() || lhs.is_fully_static()
}

/// Structural equality by declaration identity: two variable reads denote
/// the same operand only if they name the same declared variable (by
/// `Rc::ptr_eq`, not by-value) with the same indices and bit range.
pub fn expressions_equal(a: &Expression, b: &Expression) -> bool {
    match (a, b) {
        (Expression::Numeric(x), Expression::Numeric(y)) => x == y,
        (Expression::Variable(x), Expression::Variable(y)) => {
            Rc::ptr_eq(&x.variable, &y.variable)
                && x.range == y.range
                && x.indices.len() == y.indices.len()
                && x.indices.iter().zip(y.indices.iter()).all(|(i, j)| expressions_equal(i, j))
        }
        (
            Expression::Binary { op: op1, lhs: l1, rhs: r1, bitwidth: w1 },
            Expression::Binary { op: op2, lhs: l2, rhs: r2, bitwidth: w2 },
        ) => op1 == op2 && w1 == w2 && expressions_equal(l1, l2) && expressions_equal(r1, r2),
        (
            Expression::Shift { op: op1, lhs: l1, amount: a1, bitwidth: w1 },
            Expression::Shift { op: op2, lhs: l2, amount: a2, bitwidth: w2 },
        ) => op1 == op2 && w1 == w2 && a1 == a2 && expressions_equal(l1, l2),
        _ => false,
    }
}

/// What to do when a right-hand side is a single binary node whose two
/// operands are structurally equal (`a + a`, `a ^ a`).
pub enum RepeatedOperandPlan {
    /// Add/subtract of a value with itself: the whole assignment cancels,
    /// emitting nothing.
    Cancel,
    /// Exclusive-or (or any other repeated operator) doesn't cancel —
    /// apply the statement's own operator and the repeated operator in
    /// turn, each against the one shared operand.
    ApplyTwice { operand: Expression },
}

/// Detect a repeated-operand right-hand side and report how to collapse
/// it. Only `Add`/`Subtract`/`Exor` are recognized, since those are the
/// only operators an assignment can legally accumulate with; any other
/// repeated binary operator is left to the ordinary evaluate-then-apply
/// path.
pub fn repeated_operand_plan(rhs: &Expression) -> Option<RepeatedOperandPlan> {
    let Expression::Binary { op, lhs, rhs: rhs_operand, .. } = rhs else {
        return None;
    };
    if !expressions_equal(lhs, rhs_operand) {
        return None;
    }
    match op {
        BinaryOp::Add | BinaryOp::Subtract => Some(RepeatedOperandPlan::Cancel),
        BinaryOp::Exor => Some(RepeatedOperandPlan::ApplyTwice { operand: (**lhs).clone() }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NumericExpr;

    fn var(kind: VariableKind, name: &str, dims: Vec<usize>, width: usize) -> Rc<Variable> {
        Rc::new(Variable::new(kind, name, dims, width))
    }

    #[test]
    fn detects_direct_self_reference() {
        let a = var(VariableKind::Wire, "a", vec![], 4);
        let b = var(VariableKind::Wire, "b", vec![], 4);
        let expr = Expression::binary(
            BinaryOp::Add,
            Expression::var(VariableAccess::whole(a.clone())),
            Expression::var(VariableAccess::whole(b)),
            4,
        );
        assert!(contains_self_reference(&expr, &a));
    }

    #[test]
    fn no_false_positive_for_unrelated_variable() {
        let a = var(VariableKind::Wire, "a", vec![], 4);
        let b = var(VariableKind::Wire, "b", vec![], 4);
        let c = var(VariableKind::Wire, "c", vec![], 4);
        let expr = Expression::binary(
            BinaryOp::Add,
            Expression::var(VariableAccess::whole(a)),
            Expression::var(VariableAccess::whole(b)),
            4,
        );
        assert!(!contains_self_reference(&expr, &c));
    }

    #[test]
    fn counts_repeated_reads() {
        let a = var(VariableKind::Wire, "a", vec![], 4);
        let expr = Expression::binary(
            BinaryOp::Add,
            Expression::var(VariableAccess::whole(a.clone())),
            Expression::var(VariableAccess::whole(a.clone())),
            4,
        );
        assert_eq!(count_repeats(&expr, &a), 2);
    }

    #[test]
    fn static_array_lhs_never_needs_shared_resolution() {
        let arr = var(VariableKind::Wire, "arr", vec![4], 4);
        let lhs = VariableAccess::whole(arr.clone()).with_indices(vec![Expression::numeric(0)]);
        let rhs = Expression::var(VariableAccess::whole(arr).with_indices(vec![Expression::numeric(0)]));
        assert!(!needs_shared_resolution(&lhs, &rhs));
        assert!(full_statement_is_safe(&lhs));
    }

    #[test]
    fn dynamic_array_lhs_read_on_rhs_needs_shared_resolution() {
        let arr = var(VariableKind::Wire, "arr", vec![4], 4);
        let idx = var(VariableKind::Wire, "i", vec![], 2);
        let dynamic_index = Expression::var(VariableAccess::whole(idx));
        let lhs = VariableAccess::whole(arr.clone()).with_indices(vec![dynamic_index.clone()]);
        let rhs = Expression::var(VariableAccess::whole(arr).with_indices(vec![dynamic_index]));
        assert!(needs_shared_resolution(&lhs, &rhs));
        assert!(!full_statement_is_safe(&lhs));
    }

    #[test]
    fn substitute_rewrites_matching_occurrences_only() {
        let a = var(VariableKind::Wire, "a", vec![], 4);
        let b = var(VariableKind::Wire, "b", vec![], 4);
        let synthetic = synthetic_variable(&a, 4);
        let expr = Expression::binary(
            BinaryOp::Add,
            Expression::var(VariableAccess::whole(a.clone())),
            Expression::var(VariableAccess::whole(b.clone())),
            4,
        );
        let rewritten = substitute(&expr, &a, &synthetic);
        assert!(!contains_self_reference(&rewritten, &a));
        assert!(contains_self_reference(&rewritten, &synthetic));
        assert!(contains_self_reference(&rewritten, &b));
    }

    #[test]
    fn numeric_literal_evaluates_unchanged_under_substitution() {
        let a = var(VariableKind::Wire, "a", vec![], 4);
        let synthetic = synthetic_variable(&a, 4);
        let expr = Expression::Numeric(NumericExpr::literal(7));
        let rewritten = substitute(&expr, &a, &synthetic);
        assert!(matches!(rewritten, Expression::Numeric(NumericExpr::Literal(7))));
    }

    #[test]
    fn expressions_equal_matches_same_declared_variable() {
        let a = var(VariableKind::Wire, "a", vec![], 4);
        assert!(expressions_equal(
            &Expression::var(VariableAccess::whole(a.clone())),
            &Expression::var(VariableAccess::whole(a)),
        ));
    }

    #[test]
    fn expressions_equal_rejects_same_name_different_declaration() {
        let a1 = var(VariableKind::Wire, "a", vec![], 4);
        let a2 = var(VariableKind::Wire, "a", vec![], 4);
        assert!(!expressions_equal(
            &Expression::var(VariableAccess::whole(a1)),
            &Expression::var(VariableAccess::whole(a2)),
        ));
    }

    #[test]
    fn repeated_add_operand_cancels() {
        let a = var(VariableKind::Wire, "a", vec![], 4);
        let rhs = Expression::binary(
            BinaryOp::Add,
            Expression::var(VariableAccess::whole(a.clone())),
            Expression::var(VariableAccess::whole(a)),
            4,
        );
        assert!(matches!(repeated_operand_plan(&rhs), Some(RepeatedOperandPlan::Cancel)));
    }

    #[test]
    fn repeated_exor_operand_applies_twice() {
        let a = var(VariableKind::Wire, "a", vec![], 4);
        let rhs = Expression::binary(
            BinaryOp::Exor,
            Expression::var(VariableAccess::whole(a.clone())),
            Expression::var(VariableAccess::whole(a)),
            4,
        );
        assert!(matches!(repeated_operand_plan(&rhs), Some(RepeatedOperandPlan::ApplyTwice { .. })));
    }

    #[test]
    fn distinct_operands_do_not_trigger_repeated_operand_plan() {
        let a = var(VariableKind::Wire, "a", vec![], 4);
        let b = var(VariableKind::Wire, "b", vec![], 4);
        let rhs = Expression::binary(
            BinaryOp::Add,
            Expression::var(VariableAccess::whole(a)),
            Expression::var(VariableAccess::whole(b)),
            4,
        );
        assert!(repeated_operand_plan(&rhs).is_none());
    }
}
