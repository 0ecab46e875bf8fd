use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::ir::program::{Expr, Node, NodeLabel, Stmt, Variable, VariableRegistry};

//
// Gen/kill dataflow facts: flow analyses that are not value lattices in
// the classical sense. A fact set lives in the powerset lattice of a
// finite universe (all definitions / all expressions in the program), so
// the fixpoint converges by finite height alone.
//

/// Merge policy at control-flow joins
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MergePolicy {
    /// may-analysis: a fact holds if it holds on any incoming path
    May,
    /// must-analysis: a fact holds only if it holds on every incoming path
    Must,
}

/// A single dataflow fact with its gen/kill rules
pub trait DataflowElement: Clone + Eq + Ord + Debug {
    const POLICY: MergePolicy;

    /// The variables referenced by this fact, so that kill rules can be
    /// evaluated uniformly across analyses
    fn involved_variables(&self) -> BTreeSet<Variable>;

    /// Facts introduced by the assignment `var := expr` at `node`
    fn gen_assign(var: Variable, expr: &Expr, node: &Node) -> BTreeSet<Self>;

    /// Facts introduced by a bare expression computation at `node`
    fn gen_expr(expr: &Expr, node: &Node) -> BTreeSet<Self>;

    /// Facts invalidated by the assignment `var := expr` at `node`
    fn kill_assign(
        var: Variable,
        expr: &Expr,
        node: &Node,
        current: &BTreeSet<Self>,
    ) -> BTreeSet<Self>;

    /// Render the fact with variable names resolved
    fn render(&self, vars: &VariableRegistry) -> String;
}

/// A set of dataflow facts at one program point
///
/// `Universe` is the implicit "all facts" element that must-analyses start
/// from at unvisited nodes; it is an identity for intersection and never
/// needs to be materialized because the solver only transfers nodes that
/// have already received a concrete state.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum FactSet<E: DataflowElement> {
    Universe,
    Known(BTreeSet<E>),
}

impl<E: DataflowElement> FactSet<E> {
    pub fn empty() -> Self {
        Self::Known(BTreeSet::new())
    }

    pub fn universe() -> Self {
        Self::Universe
    }

    pub fn facts(&self) -> Option<&BTreeSet<E>> {
        match self {
            Self::Universe => None,
            Self::Known(facts) => Some(facts),
        }
    }

    pub fn contains(&self, fact: &E) -> bool {
        match self {
            Self::Universe => true,
            Self::Known(facts) => facts.contains(fact),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Universe, _) | (_, Self::Universe) => Self::Universe,
            (Self::Known(a), Self::Known(b)) => {
                Self::Known(a.union(b).cloned().collect())
            }
        }
    }

    pub fn intersect(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Universe, x) | (x, Self::Universe) => x.clone(),
            (Self::Known(a), Self::Known(b)) => {
                Self::Known(a.intersection(b).cloned().collect())
            }
        }
    }

    /// Apply the gen/kill transfer of one statement
    pub fn transfer(&self, node: &Node) -> Self {
        let facts = match self {
            // the solver never transfers an unreached node
            Self::Universe => return Self::Universe,
            Self::Known(facts) => facts,
        };
        let (gen, kill) = match &node.stmt {
            Stmt::Assign { var, expr } => (
                E::gen_assign(*var, expr, node),
                E::kill_assign(*var, expr, node, facts),
            ),
            Stmt::Assume { cond } => (E::gen_expr(cond, node), BTreeSet::new()),
            Stmt::Eval { expr } => (E::gen_expr(expr, node), BTreeSet::new()),
            Stmt::Return { expr: Some(expr) } => (E::gen_expr(expr, node), BTreeSet::new()),
            Stmt::Return { expr: None } | Stmt::Skip => (BTreeSet::new(), BTreeSet::new()),
        };
        let mut result = facts.clone();
        result.retain(|fact| !kill.contains(fact));
        result.extend(gen);
        Self::Known(result)
    }
}

/// Reaching-definitions fact: a variable and the site that defined it
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct Definition {
    pub var: Variable,
    pub site: NodeLabel,
}

impl DataflowElement for Definition {
    const POLICY: MergePolicy = MergePolicy::May;

    fn involved_variables(&self) -> BTreeSet<Variable> {
        BTreeSet::from([self.var])
    }

    fn gen_assign(var: Variable, _expr: &Expr, node: &Node) -> BTreeSet<Self> {
        BTreeSet::from([Definition {
            var,
            site: node.label,
        }])
    }

    fn gen_expr(_expr: &Expr, _node: &Node) -> BTreeSet<Self> {
        BTreeSet::new()
    }

    fn kill_assign(
        var: Variable,
        _expr: &Expr,
        _node: &Node,
        current: &BTreeSet<Self>,
    ) -> BTreeSet<Self> {
        // every earlier definition of the assigned variable dies here
        current
            .iter()
            .filter(|def| def.var == var)
            .copied()
            .collect()
    }

    fn render(&self, vars: &VariableRegistry) -> String {
        format!("({}, {})", vars.name(self.var), self.site)
    }
}

/// Available-expressions fact: a computed expression
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct AvailableExpression(pub Expr);

impl DataflowElement for AvailableExpression {
    const POLICY: MergePolicy = MergePolicy::Must;

    fn involved_variables(&self) -> BTreeSet<Variable> {
        self.0.variables()
    }

    fn gen_assign(var: Variable, expr: &Expr, _node: &Node) -> BTreeSet<Self> {
        // a self-referential expression is never available across the
        // assignment; trivial expressions are filtered out entirely
        if expr.is_computation() && !expr.variables().contains(&var) {
            BTreeSet::from([AvailableExpression(expr.clone())])
        } else {
            BTreeSet::new()
        }
    }

    fn gen_expr(expr: &Expr, _node: &Node) -> BTreeSet<Self> {
        if expr.is_computation() {
            BTreeSet::from([AvailableExpression(expr.clone())])
        } else {
            BTreeSet::new()
        }
    }

    fn kill_assign(
        var: Variable,
        _expr: &Expr,
        _node: &Node,
        current: &BTreeSet<Self>,
    ) -> BTreeSet<Self> {
        current
            .iter()
            .filter(|ae| ae.involved_variables().contains(&var))
            .cloned()
            .collect()
    }

    fn render(&self, vars: &VariableRegistry) -> String {
        self.0.render(vars)
    }
}
