use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};

use crate::ir::program::{BinOp, Constant, Expr, Identifier, UnOp, Variable};

/// An abstract domain which forms a lattice
///
/// All operations are pure and total; comparisons are structural. Domains
/// of finite height keep the default widening (plain join) and the default
/// narrowing (no refinement, as nothing was lost to widening).
pub trait AbstractDomain: Clone + Eq + Debug {
    /// Get the Bottom value of this lattice
    fn bottom() -> Self;

    /// Get the Top value of this lattice
    fn top() -> Self;

    fn is_bottom(&self) -> bool {
        *self == Self::bottom()
    }

    fn is_top(&self) -> bool {
        *self == Self::top()
    }

    /// Join two abstract values (least upper bound)
    fn join(&self, other: &Self) -> Self;

    /// Meet two abstract values (greatest lower bound)
    fn meet(&self, other: &Self) -> Self;

    /// Partial ordering: whether `self` is at or below `other`
    fn leq(&self, other: &Self) -> bool;

    /// Widening of `self` (the previous iterate) with `other` (the new one)
    fn widen(&self, other: &Self) -> Self {
        self.join(other)
    }

    /// Narrowing of `self` (the widened iterate) with `other` (the new one)
    fn narrow(&self, _other: &Self) -> Self {
        self.clone()
    }
}

/// How a call target is annotated, as seen by a value domain
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CallKind {
    /// the target forces its return value to tainted
    Source,
    /// the target forces its return value to clean
    Sanitizer,
    /// nothing is known about the target
    Opaque,
}

/// A domain that can interpret program expressions
pub trait ValueDomain: AbstractDomain {
    fn eval_constant(constant: &Constant) -> Self;

    /// Unary operators; unsupported cases must degrade to Top, not fail
    fn eval_unary(op: UnOp, arg: &Self) -> Self;

    /// Binary operators; unsupported cases must degrade to Top, not fail
    fn eval_binary(op: BinOp, lhs: &Self, rhs: &Self) -> Self;

    /// Value returned by a call; `kind` carries the taint annotation of the
    /// resolved target, which only taint domains interpret
    fn eval_call(_kind: CallKind, _args: &[Self]) -> Self {
        Self::top()
    }
}

/// A total mapping from program variables to one abstract value
///
/// Absent variables read as Bottom; entries that become Bottom are dropped
/// so that equality over the map stays canonical.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Environment<D: AbstractDomain> {
    map: BTreeMap<Variable, D>,
}

impl<D: AbstractDomain> Default for Environment<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: AbstractDomain> Environment<D> {
    /// The environment with every variable at Bottom
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    pub fn get(&self, var: &Variable) -> D {
        self.map.get(var).cloned().unwrap_or_else(D::bottom)
    }

    pub fn set(&mut self, var: Variable, value: D) {
        if value.is_bottom() {
            self.map.remove(&var);
        } else {
            self.map.insert(var, value);
        }
    }

    pub fn join(&self, other: &Self) -> Self {
        self.pointwise(other, D::join)
    }

    pub fn meet(&self, other: &Self) -> Self {
        self.pointwise(other, D::meet)
    }

    pub fn widen(&self, other: &Self) -> Self {
        self.pointwise(other, D::widen)
    }

    pub fn narrow(&self, other: &Self) -> Self {
        self.pointwise(other, D::narrow)
    }

    pub fn leq(&self, other: &Self) -> bool {
        // missing keys are Bottom, hence trivially below anything
        self.map.iter().all(|(var, value)| value.leq(&other.get(var)))
    }

    fn pointwise<F: Fn(&D, &D) -> D>(&self, other: &Self, op: F) -> Self {
        let mut result = Self::new();
        for (var, value) in &self.map {
            result.set(*var, op(value, &other.get(var)));
        }
        for (var, value) in &other.map {
            if !self.map.contains_key(var) {
                result.set(*var, op(&D::bottom(), value));
            }
        }
        result
    }
}

impl<D: AbstractDomain + Display> Display for Environment<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let entries: Vec<_> = self
            .map
            .iter()
            .map(|(var, value)| format!("{}: {}", var, value))
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}

/// Evaluate an expression in an environment
///
/// Bottom operands are absorbing (an already-erroneous path stays
/// erroneous); call results follow the taint annotation of the target as
/// decided by the caller via `call_kind`.
pub fn eval_expr<D: ValueDomain, F: Fn(&Identifier) -> CallKind>(
    expr: &Expr,
    env: &Environment<D>,
    call_kind: &F,
) -> D {
    match expr {
        Expr::Const(constant) => D::eval_constant(constant),
        Expr::Var(var) => env.get(var),
        Expr::Unary { op, arg } => {
            let arg = eval_expr(arg, env, call_kind);
            if arg.is_bottom() {
                return D::bottom();
            }
            D::eval_unary(*op, &arg)
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(lhs, env, call_kind);
            let rhs = eval_expr(rhs, env, call_kind);
            if lhs.is_bottom() || rhs.is_bottom() {
                return D::bottom();
            }
            D::eval_binary(*op, &lhs, &rhs)
        }
        Expr::Call { callee, args } => {
            let args: Vec<_> = args
                .iter()
                .map(|arg| eval_expr(arg, env, call_kind))
                .collect();
            D::eval_call(call_kind(callee), &args)
        }
        Expr::Unknown => D::top(),
    }
}
