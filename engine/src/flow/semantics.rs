use std::marker::PhantomData;

use crate::analysis::dataflow::{DataflowElement, FactSet, MergePolicy};
use crate::analysis::domain::{eval_expr, CallKind, Environment, ValueDomain};
use crate::flow::fixpoint::Semantics;
use crate::ir::annot::TaintSpec;
use crate::ir::program::{Identifier, Node, Stmt};

/// Resolve the taint annotation of a call target
pub fn call_kind(spec: Option<&TaintSpec>, callee: &Identifier) -> CallKind {
    match spec {
        None => CallKind::Opaque,
        Some(spec) => {
            if spec.is_source(callee) {
                CallKind::Source
            } else if spec.is_sanitizer(callee) {
                CallKind::Sanitizer
            } else {
                CallKind::Opaque
            }
        }
    }
}

/// Semantics of a value-lattice analysis: states are environments mapping
/// every variable to one abstract value
pub struct ValueSemantics<'a, D: ValueDomain> {
    taint: Option<&'a TaintSpec>,
    _domain: PhantomData<D>,
}

impl<'a, D: ValueDomain> ValueSemantics<'a, D> {
    pub fn new() -> Self {
        Self {
            taint: None,
            _domain: PhantomData,
        }
    }

    /// Honor source/sanitizer overrides at call-return points
    pub fn with_taint(spec: &'a TaintSpec) -> Self {
        Self {
            taint: Some(spec),
            _domain: PhantomData,
        }
    }
}

impl<'a, D: ValueDomain> Default for ValueSemantics<'a, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, D: ValueDomain> Semantics for ValueSemantics<'a, D> {
    type State = Environment<D>;

    fn boundary(&self) -> Self::State {
        // all variables start at Bottom
        Environment::new()
    }

    fn initial(&self) -> Self::State {
        Environment::new()
    }

    fn transfer(&self, node: &Node, state: &Self::State) -> Self::State {
        match &node.stmt {
            Stmt::Assign { var, expr } => {
                let value = eval_expr(expr, state, &|callee| call_kind(self.taint, callee));
                let mut result = state.clone();
                result.set(*var, value);
                result
            }
            // conditions, bare expressions and returns do not write state
            Stmt::Assume { .. } | Stmt::Eval { .. } | Stmt::Return { .. } | Stmt::Skip => {
                state.clone()
            }
        }
    }

    fn merge(&self, a: &Self::State, b: &Self::State) -> Self::State {
        a.join(b)
    }

    fn widen(&self, old: &Self::State, new: &Self::State) -> Self::State {
        old.widen(new)
    }

    fn narrow(&self, old: &Self::State, new: &Self::State) -> Self::State {
        old.narrow(new)
    }
}

/// Semantics of a gen/kill fact analysis: states are fact sets, merged by
/// union (may) or intersection (must)
pub struct FactSemantics<E: DataflowElement> {
    _element: PhantomData<E>,
}

impl<E: DataflowElement> FactSemantics<E> {
    pub fn new() -> Self {
        Self {
            _element: PhantomData,
        }
    }
}

impl<E: DataflowElement> Default for FactSemantics<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DataflowElement> Semantics for FactSemantics<E> {
    type State = FactSet<E>;

    fn boundary(&self) -> Self::State {
        FactSet::empty()
    }

    fn initial(&self) -> Self::State {
        match E::POLICY {
            MergePolicy::May => FactSet::empty(),
            // must-facts start from the full universe so that the first
            // incoming path determines the set
            MergePolicy::Must => FactSet::universe(),
        }
    }

    fn transfer(&self, node: &Node, state: &Self::State) -> Self::State {
        state.transfer(node)
    }

    fn merge(&self, a: &Self::State, b: &Self::State) -> Self::State {
        match E::POLICY {
            MergePolicy::May => a.union(b),
            MergePolicy::Must => a.intersect(b),
        }
    }
}
