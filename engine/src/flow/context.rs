use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::{Display, Formatter};

use log::{debug, warn};

use crate::error::EngineResult;
use crate::flow::fixpoint::{FixpointConfig, FixpointEngine, FixpointSolution, Semantics};
use crate::ir::program::{Identifier, Program};

/// An immutable call-string context key
///
/// The engine threads this key explicitly through every interprocedural
/// run instead of keeping a global context table; each (function, context)
/// pair owns an isolated fixpoint result. The last frame names the
/// function being analyzed.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct CallString {
    frames: Vec<Identifier>,
}

impl CallString {
    /// The root context of a top-level function
    pub fn root(function: Identifier) -> Self {
        Self {
            frames: vec![function],
        }
    }

    /// The function this context analyzes
    pub fn current(&self) -> &Identifier {
        // frames are never empty by construction
        self.frames.last().expect("empty call string")
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Extend the context with a callee, or refuse when the configured
    /// bound is reached or the call recurses
    pub fn push(&self, callee: &Identifier, bound: Option<usize>) -> Option<Self> {
        if self.frames.contains(callee) {
            return None;
        }
        if let Some(limit) = bound {
            if self.frames.len() >= limit {
                return None;
            }
        }
        let mut frames = self.frames.clone();
        frames.push(callee.clone());
        Some(Self { frames })
    }
}

impl Display for CallString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<_> = self.frames.iter().map(|id| id.to_string()).collect();
        write!(f, "{}", rendered.join(">"))
    }
}

/// Context-sensitivity policy, supplied by configuration
///
/// `depth: None` keeps the full call stack (recursive calls are still
/// collapsed into their first occurrence); `Some(k)` truncates contexts
/// at k frames.
#[derive(Copy, Clone, Debug, Default)]
pub struct ContextPolicy {
    pub depth: Option<usize>,
}

/// Per-context fixpoint results of one whole-program run
pub struct ContextResults<S> {
    map: BTreeMap<CallString, FixpointSolution<S>>,
    converged: bool,
}

impl<S> ContextResults<S> {
    pub fn get(&self, context: &CallString) -> Option<&FixpointSolution<S>> {
        self.map.get(context)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CallString, &FixpointSolution<S>)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Whether every per-context run converged within its iteration cap
    pub fn converged(&self) -> bool {
        self.converged
    }
}

/// Compute a fixpoint for every reachable (function, context) pair
///
/// Every function with a body is also analyzed under its own root
/// context. Independent pairs have no shared state; this driver runs them
/// sequentially but nothing in the engine prevents external
/// parallelization over isolated pairs.
pub fn solve_contextual<T: Semantics>(
    program: &Program,
    semantics: &T,
    config: FixpointConfig,
    policy: ContextPolicy,
) -> EngineResult<ContextResults<T::State>> {
    let mut queue: VecDeque<CallString> = program
        .functions
        .values()
        .filter(|f| f.body.is_some())
        .map(|f| CallString::root(f.name.clone()))
        .collect();
    let mut seen: BTreeSet<CallString> = queue.iter().cloned().collect();

    let mut map = BTreeMap::new();
    let mut converged = true;
    while let Some(context) = queue.pop_front() {
        let function = match program.function(context.current()) {
            Some(function) => function,
            None => {
                // a recoverable failure local to this call: skip the
                // context and keep analyzing the rest of the program
                warn!("cannot resolve call target {}", context.current());
                continue;
            }
        };
        let body = match &function.body {
            Some(body) => body,
            None => {
                debug!("{} is external, nothing to analyze", function.name);
                continue;
            }
        };

        let solution = FixpointEngine::new(body, semantics, config)?.solve();
        if !solution.converged() {
            warn!(
                "fixpoint for {} hit the iteration cap; partial result",
                context
            );
            converged = false;
        }

        // discover callees under the extended context
        for node in body.nodes() {
            let Some(expr) = node.stmt.expr() else {
                continue;
            };
            for (callee, _) in expr.calls() {
                match context.push(callee, policy.depth) {
                    None => debug!("context growth capped at {} for {}", context, callee),
                    Some(next) => {
                        if seen.insert(next.clone()) {
                            queue.push_back(next);
                        }
                    }
                }
            }
        }

        map.insert(context, solution);
    }

    Ok(ContextResults { map, converged })
}
