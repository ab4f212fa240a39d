//! ast.rs - Concrete realization of the external AST contract.
//!
//! The parser/AST are documented as external collaborators; this module
//! gives them concrete shape so the synthesizer has something to compile
//! against and tests have something to build by hand. Modules own their
//! declarations by value (no shared, mutable parameter references rebound
//! per call); formal-parameter binding is instead modeled as a
//! name-to-variable map carried on the synthesizer's call stack (see
//! `synthesizer::Frame`), not by mutating these types.

use std::collections::HashMap;
use std::rc::Rc;

/// A variable's storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    In,
    Out,
    Inout,
    Wire,
    State,
}

impl VariableKind {
    /// Inputs/inouts carry caller-supplied values; outputs/wires start at
    /// constant zero.
    pub fn starts_at_constant_zero(self) -> bool {
        matches!(self, VariableKind::Out | VariableKind::Wire | VariableKind::State)
    }
}

/// A declared variable: its kind, name, array dimensions, and bit-width.
/// Instances occupy `product(dimensions) * bitwidth` contiguous
/// circuit lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub kind: VariableKind,
    pub name: String,
    pub dimensions: Vec<usize>,
    pub bitwidth: usize,
}

impl Variable {
    pub fn new(kind: VariableKind, name: impl Into<String>, dimensions: Vec<usize>, bitwidth: usize) -> Self {
        Self { kind, name: name.into(), dimensions, bitwidth }
    }

    /// Number of array elements (1 for a scalar variable).
    pub fn element_count(&self) -> usize {
        self.dimensions.iter().product::<usize>().max(1)
    }

    /// Total circuit lines this variable's declaration reserves.
    pub fn total_bits(&self) -> usize {
        self.element_count() * self.bitwidth
    }
}

/// `{name -> value}` map used to evaluate loop-variable references.
#[derive(Debug, Clone, Default)]
pub struct LoopMap(HashMap<String, u64>);

impl LoopMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, name: impl Into<String>, value: u64) -> Self {
        let mut next = self.0.clone();
        next.insert(name.into(), value);
        Self(next)
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.0.get(name).copied()
    }
}

/// Arithmetic combinators over numeric expressions (loop bounds, static
/// dimension indices). Kept separate from the general `Expression` tree
/// because these must be foldable without touching the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// A purely numeric expression: a literal, a loop-variable reference, or a
/// combination of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumericExpr {
    Literal(u64),
    LoopVariable(String),
    Binary(NumericOp, Box<NumericExpr>, Box<NumericExpr>),
}

impl NumericExpr {
    pub fn literal(v: u64) -> Self {
        NumericExpr::Literal(v)
    }

    pub fn loop_var(name: impl Into<String>) -> Self {
        NumericExpr::LoopVariable(name.into())
    }

    /// Evaluate under the current loop-variable bindings. Unbound loop
    /// variables evaluate to 0 (malformed-AST case, not a condition the
    /// synthesis error enum covers, so we don't thread a `Result` through
    /// every numeric fold).
    pub fn evaluate(&self, loop_map: &LoopMap) -> u64 {
        match self {
            NumericExpr::Literal(v) => *v,
            NumericExpr::LoopVariable(name) => loop_map.get(name).unwrap_or(0),
            NumericExpr::Binary(op, lhs, rhs) => {
                let l = lhs.evaluate(loop_map);
                let r = rhs.evaluate(loop_map);
                match op {
                    NumericOp::Add => l.wrapping_add(r),
                    NumericOp::Sub => l.wrapping_sub(r),
                    NumericOp::Mul => l.wrapping_mul(r),
                    NumericOp::Div => if r == 0 { 0 } else { l / r },
                }
            }
        }
    }
}

/// A reference to (part of) a variable: optional dimension indices and an
/// optional bit range. `range = Some((first, last))` with
/// `first > last` denotes a bit-reversed view.
#[derive(Debug, Clone)]
pub struct VariableAccess {
    pub variable: Rc<Variable>,
    pub indices: Vec<Expression>,
    pub range: Option<(usize, usize)>,
}

impl VariableAccess {
    pub fn whole(variable: Rc<Variable>) -> Self {
        Self { variable, indices: Vec::new(), range: None }
    }

    pub fn with_range(mut self, first: usize, last: usize) -> Self {
        self.range = Some((first, last));
        self
    }

    pub fn with_indices(mut self, indices: Vec<Expression>) -> Self {
        self.indices = indices;
        self
    }

    /// Bit-width of this access: the range's span if present, else the
    /// variable's full bit-width.
    pub fn bitwidth(&self) -> usize {
        match self.range {
            Some((first, last)) => first.abs_diff(last) + 1,
            None => self.variable.bitwidth,
        }
    }

    /// True when every dimension index is a statically foldable numeric
    /// expression.
    pub fn is_fully_static(&self) -> bool {
        self.indices.iter().all(|e| matches!(e, Expression::Numeric(_)))
    }
}

/// Binary expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Exor,
    Multiply,
    Divide,
    Modulo,
    FracDivide,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    Less,
    Greater,
    Equals,
    NotEquals,
    LessEquals,
    GreaterEquals,
}

/// Shift expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Left,
    Right,
}

/// Expression AST: numeric, variable-access, binary, or shift.
#[derive(Debug, Clone)]
pub enum Expression {
    Numeric(NumericExpr),
    Variable(VariableAccess),
    Binary { op: BinaryOp, lhs: Box<Expression>, rhs: Box<Expression>, bitwidth: usize },
    Shift { op: ShiftOp, lhs: Box<Expression>, amount: NumericExpr, bitwidth: usize },
}

impl Expression {
    pub fn numeric(v: u64) -> Self {
        Expression::Numeric(NumericExpr::Literal(v))
    }

    pub fn var(access: VariableAccess) -> Self {
        Expression::Variable(access)
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression, bitwidth: usize) -> Self {
        Expression::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), bitwidth }
    }

    pub fn shift(op: ShiftOp, lhs: Expression, amount: NumericExpr, bitwidth: usize) -> Self {
        Expression::Shift { op, lhs: Box::new(lhs), amount, bitwidth }
    }

    /// Bit-width this expression node carries.
    pub fn bitwidth(&self) -> usize {
        match self {
            Expression::Numeric(_) => 0, // width comes from context (assign LHS); see expr::on_expression
            Expression::Variable(access) => access.bitwidth(),
            Expression::Binary { bitwidth, .. } => *bitwidth,
            Expression::Shift { bitwidth, .. } => *bitwidth,
        }
    }
}

/// Unary statement operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Invert,
    Increment,
    Decrement,
}

/// Assignment statement operators. A strict subset of
/// `BinaryOp` — only the three reversible accumulate operators are legal
/// on an assignment's left side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Add,
    Subtract,
    Exor,
}

/// Statement AST.
#[derive(Debug, Clone)]
pub enum Statement {
    Swap(VariableAccess, VariableAccess),
    Unary(UnaryOp, VariableAccess),
    Assign(AssignOp, VariableAccess, Expression),
    If { condition: Expression, then_branch: Vec<Statement>, else_branch: Vec<Statement> },
    For {
        from: Option<NumericExpr>,
        to: NumericExpr,
        step: Option<NumericExpr>,
        loop_var: String,
        body: Vec<Statement>,
    },
    Call { target: String, actuals: Vec<String> },
    Uncall { target: String, actuals: Vec<String> },
    Skip,
}

/// A module: formal parameters, local (wire/state) declarations, and a
/// statement body.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub parameters: Vec<Rc<Variable>>,
    pub locals: Vec<Rc<Variable>>,
    pub statements: Vec<Statement>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), parameters: Vec::new(), locals: Vec::new(), statements: Vec::new() }
    }

    /// All declarations (parameters first, then locals), the order lines
    /// are allocated in.
    pub fn all_variables(&self) -> impl Iterator<Item = &Rc<Variable>> {
        self.parameters.iter().chain(self.locals.iter())
    }
}

/// A whole RHDL program: an arena of modules.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub modules: Vec<Module>,
}

impl Program {
    pub fn find_module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_total_bits_accounts_for_dimensions() {
        let v = Variable::new(VariableKind::Wire, "a", vec![2, 3], 4);
        assert_eq!(v.element_count(), 6);
        assert_eq!(v.total_bits(), 24);
    }

    #[test]
    fn scalar_variable_element_count_is_one() {
        let v = Variable::new(VariableKind::In, "x", vec![], 8);
        assert_eq!(v.element_count(), 1);
        assert_eq!(v.total_bits(), 8);
    }

    #[test]
    fn bit_range_reversal_detected_by_access_helpers() {
        let v = Rc::new(Variable::new(VariableKind::Wire, "x", vec![], 8));
        let forward = VariableAccess::whole(v.clone()).with_range(0, 3);
        let reversed = VariableAccess::whole(v).with_range(3, 0);
        assert_eq!(forward.bitwidth(), 4);
        assert_eq!(reversed.bitwidth(), 4);
    }

    #[test]
    fn numeric_expr_evaluates_under_loop_map() {
        let map = LoopMap::new().bind("i", 3);
        let e = NumericExpr::Binary(
            NumericOp::Add,
            Box::new(NumericExpr::loop_var("i")),
            Box::new(NumericExpr::literal(1)),
        );
        assert_eq!(e.evaluate(&map), 4);
    }

    #[test]
    fn fully_static_access_detection() {
        let v = Rc::new(Variable::new(VariableKind::Wire, "arr", vec![4], 2));
        let static_access = VariableAccess::whole(v.clone()).with_indices(vec![Expression::numeric(1)]);
        assert!(static_access.is_fully_static());

        let dyn_var = Rc::new(Variable::new(VariableKind::Wire, "idx", vec![], 2));
        let dynamic_access = VariableAccess::whole(v)
            .with_indices(vec![Expression::var(VariableAccess::whole(dyn_var))]);
        assert!(!dynamic_access.is_fully_static());
    }
}
