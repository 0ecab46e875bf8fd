use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use lyra_shared::logging::Tracer;

use crate::error::{EngineError, EngineResult};
use crate::ir::cfg::Cfg;
use crate::ir::program::{Node, NodeLabel};

/// The transfer and merge semantics of one analysis over one CFG
///
/// Value analyses instantiate the state with an `Environment`, gen/kill
/// analyses with a `FactSet`; the solver only relies on the operations
/// below plus structural equality for change detection.
pub trait Semantics {
    type State: Clone + Eq + Debug;

    /// The entering state of the entry node
    fn boundary(&self) -> Self::State;

    /// The starting state of every other node
    fn initial(&self) -> Self::State;

    /// Apply the statement owned by `node` to the entering state
    fn transfer(&self, node: &Node, state: &Self::State) -> Self::State;

    /// Combine states at a control-flow join
    fn merge(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Extrapolate at a loop head once the revisit threshold is reached
    fn widen(&self, old: &Self::State, new: &Self::State) -> Self::State {
        self.merge(old, new)
    }

    /// Refine a widened state during the descending phase; the default
    /// keeps the old state since nothing was lost without widening
    fn narrow(&self, old: &Self::State, _new: &Self::State) -> Self::State {
        old.clone()
    }
}

/// Knobs of the fixpoint iteration
#[derive(Copy, Clone, Debug)]
pub struct FixpointConfig {
    /// number of entering-state updates of a node before widening kicks in
    pub widening_threshold: usize,
    /// bound on the descending (narrowing) phase
    pub descending_rounds: usize,
    /// hard cap on ascending iterations; hitting it flags non-convergence
    pub max_iterations: usize,
}

impl Default for FixpointConfig {
    fn default() -> Self {
        Self {
            widening_threshold: 3,
            descending_rounds: 5,
            max_iterations: 10_000,
        }
    }
}

impl FixpointConfig {
    fn validate(&self) -> EngineResult<()> {
        if self.widening_threshold == 0 {
            return Err(EngineError::ConfigError(
                "widening threshold must be at least 1".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(EngineError::ConfigError(
                "iteration cap must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// The frozen result of one fixpoint run: the abstract state before and
/// after each statement, plus whether the run actually converged
pub struct FixpointSolution<S> {
    entering: BTreeMap<NodeLabel, S>,
    leaving: BTreeMap<NodeLabel, S>,
    converged: bool,
}

impl<S> FixpointSolution<S> {
    /// The state before the statement at `label`
    pub fn pre(&self, label: NodeLabel) -> EngineResult<&S> {
        self.entering.get(&label).ok_or_else(|| {
            EngineError::QueryFailure(format!("no entering state recorded for {}", label))
        })
    }

    /// The state after the statement at `label`
    pub fn post(&self, label: NodeLabel) -> EngineResult<&S> {
        self.leaving.get(&label).ok_or_else(|| {
            EngineError::QueryFailure(format!("no leaving state recorded for {}", label))
        })
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iter_post(&self) -> impl Iterator<Item = (NodeLabel, &S)> {
        self.leaving.iter().map(|(label, state)| (*label, state))
    }
}

/// Worklist-driven iterative solver over one CFG
///
/// The ascending phase merges at joins and widens at nodes that keep
/// being revisited; once the worklist drains, a bounded descending phase
/// re-propagates with narrowing to recover precision lost to widening.
pub struct FixpointEngine<'a, T: Semantics> {
    cfg: &'a Cfg,
    semantics: &'a T,
    config: FixpointConfig,
}

impl<'a, T: Semantics> FixpointEngine<'a, T> {
    pub fn new(cfg: &'a Cfg, semantics: &'a T, config: FixpointConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            cfg,
            semantics,
            config,
        })
    }

    pub fn solve(&self) -> FixpointSolution<T::State> {
        let tracer = Tracer::new(format!("fixpoint over {} nodes", self.cfg.node_count()));

        let mut entering: BTreeMap<NodeLabel, T::State> = self
            .cfg
            .labels()
            .map(|label| (label, self.semantics.initial()))
            .collect();
        let mut leaving = entering.clone();
        entering.insert(self.cfg.entry(), self.semantics.boundary());

        // ascending phase
        let mut updates: BTreeMap<NodeLabel, usize> = BTreeMap::new();
        let mut worklist: BTreeSet<NodeLabel> = BTreeSet::from([self.cfg.entry()]);
        let mut iterations = 0usize;
        let mut converged = true;
        while let Some(label) = worklist.pop_first() {
            if iterations >= self.config.max_iterations {
                converged = false;
                break;
            }
            iterations += 1;

            let node = match self.cfg.node(label) {
                None => continue,
                Some(node) => node,
            };
            let post = self.semantics.transfer(node, &entering[&label]);
            if post == leaving[&label] && updates.contains_key(&label) {
                // already propagated to the successors
                continue;
            }
            updates.entry(label).or_insert(0);
            leaving.insert(label, post.clone());

            for succ in self.cfg.successors(label) {
                let current = &entering[&succ];
                let merged = self.semantics.merge(current, &post);
                let revisits = updates.get(&succ).copied().unwrap_or(0);
                // on repeated arrivals at a loop head, trade precision for
                // termination
                let candidate = if revisits >= self.config.widening_threshold {
                    self.semantics.widen(current, &merged)
                } else {
                    merged
                };
                if &candidate != current {
                    entering.insert(succ, candidate);
                    *updates.entry(succ).or_insert(0) += 1;
                    worklist.insert(succ);
                }
            }
        }
        tracer.log(&format!("ascending phase done in {} iterations", iterations));

        // descending (narrowing) phase, bounded
        if converged {
            for round in 0..self.config.descending_rounds {
                let mut changed = false;
                for label in self.cfg.labels() {
                    let node = match self.cfg.node(label) {
                        None => continue,
                        Some(node) => node,
                    };
                    let mut recomputed = if label == self.cfg.entry() {
                        self.semantics.boundary()
                    } else {
                        self.semantics.initial()
                    };
                    for pred in self.cfg.predecessors(label) {
                        recomputed = self.semantics.merge(&recomputed, &leaving[&pred]);
                    }
                    let narrowed = self.semantics.narrow(&entering[&label], &recomputed);
                    if narrowed != entering[&label] {
                        entering.insert(label, narrowed);
                        changed = true;
                    }
                    let post = self.semantics.transfer(node, &entering[&label]);
                    if post != leaving[&label] {
                        leaving.insert(label, post);
                        changed = true;
                    }
                }
                if !changed {
                    tracer.log(&format!("descending phase stable after {} rounds", round));
                    break;
                }
            }
        }

        FixpointSolution {
            entering,
            leaving,
            converged,
        }
    }
}
