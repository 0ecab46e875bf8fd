use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use log::warn;
use serde::Serialize;

use crate::analysis::dataflow::{AvailableExpression, DataflowElement, Definition};
use crate::analysis::domain::{Environment, ValueDomain};
use crate::analysis::interval::Interval;
use crate::analysis::parity::Parity;
use crate::analysis::taint::{Taint, TaintDomain, TaintThreeLevels};
use crate::checkers::divzero::DivisionByZeroChecker;
use crate::checkers::overflow::OverflowChecker;
use crate::checkers::size::NumericalSize;
use crate::checkers::taint::TaintChecker;
use crate::checkers::{Category, Diagnostic, Severity};
use crate::error::{EngineError, EngineResult};
use crate::flow::context::{solve_contextual, ContextPolicy, ContextResults};
use crate::flow::fixpoint::FixpointConfig;
use crate::flow::semantics::{FactSemantics, ValueSemantics};
use crate::ir::annot::TaintSpec;
use crate::ir::program::{Location, Program};

pub mod context;
pub mod fixpoint;
pub mod semantics;

/// One analysis request, with its domain-specific knobs
#[derive(Copy, Clone, Debug)]
pub enum Analysis {
    Intervals { size: NumericalSize },
    Taint { two_levels: bool },
    Parity,
    ReachingDefinitions,
    AvailableExpressions,
}

impl Analysis {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Intervals { .. } => "intervals",
            Self::Taint { two_levels: true } => "taint",
            Self::Taint { two_levels: false } => "taint-three-levels",
            Self::Parity => "parity",
            Self::ReachingDefinitions => "reaching-definitions",
            Self::AvailableExpressions => "available-expressions",
        }
    }
}

/// What one analysis run produced, ready for serialization
#[derive(Serialize)]
pub struct AnalysisReport {
    pub analysis: String,
    pub converged: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// rendered leaving states, keyed by context then node label
    pub states: BTreeMap<String, BTreeMap<String, String>>,
}

/// Drives one program through the requested analyses
///
/// The workflow owns no state across runs: each `execute` solves its own
/// contextual fixpoints and runs the checkers attached to that analysis.
pub struct Workflow<'a> {
    program: &'a Program,
    taint: Option<&'a TaintSpec>,
    config: FixpointConfig,
    policy: ContextPolicy,
}

impl<'a> Workflow<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            taint: None,
            config: FixpointConfig::default(),
            policy: ContextPolicy::default(),
        }
    }

    pub fn with_taint(mut self, spec: &'a TaintSpec) -> Self {
        self.taint = Some(spec);
        self
    }

    pub fn with_config(mut self, config: FixpointConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: ContextPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn execute(&self, analysis: &Analysis) -> EngineResult<AnalysisReport> {
        match analysis {
            Analysis::Intervals { size } => self.run_intervals(*size),
            Analysis::Taint { two_levels } => {
                let spec = self.taint.ok_or_else(|| {
                    EngineError::ConfigError(
                        "taint analysis requires taint annotations".into(),
                    )
                })?;
                if *two_levels {
                    self.run_taint::<Taint>(spec, analysis.name())
                } else {
                    self.run_taint::<TaintThreeLevels>(spec, analysis.name())
                }
            }
            Analysis::Parity => {
                let semantics = ValueSemantics::<Parity>::new();
                let results =
                    solve_contextual(self.program, &semantics, self.config, self.policy)?;
                Ok(self.report(analysis.name(), &results, value_states(&results), vec![]))
            }
            Analysis::ReachingDefinitions => self.run_facts::<Definition>(analysis.name()),
            Analysis::AvailableExpressions => {
                self.run_facts::<AvailableExpression>(analysis.name())
            }
        }
    }

    fn run_intervals(&self, size: NumericalSize) -> EngineResult<AnalysisReport> {
        let semantics = ValueSemantics::<Interval>::new();
        let results = solve_contextual(self.program, &semantics, self.config, self.policy)?;

        let overflow = OverflowChecker::new(size);
        let divzero = DivisionByZeroChecker::new(size);
        let mut diagnostics = vec![];
        for (context, solution) in results.iter() {
            let Some(function) = self.program.function(context.current()) else {
                continue;
            };
            overflow.check(self.program, function, solution, &mut diagnostics);
            divzero.check(self.program, function, solution, &mut diagnostics);
        }
        dedup(&mut diagnostics);
        Ok(self.report("intervals", &results, value_states(&results), diagnostics))
    }

    fn run_taint<D: TaintDomain + Display>(
        &self,
        spec: &TaintSpec,
        name: &str,
    ) -> EngineResult<AnalysisReport> {
        let semantics = ValueSemantics::<D>::with_taint(spec);
        let results = solve_contextual(self.program, &semantics, self.config, self.policy)?;

        let checker = TaintChecker::new(spec);
        let mut diagnostics = vec![];
        for (context, solution) in results.iter() {
            let Some(function) = self.program.function(context.current()) else {
                continue;
            };
            checker.check(self.program, function, solution, &mut diagnostics);
        }
        dedup(&mut diagnostics);
        Ok(self.report(name, &results, value_states(&results), diagnostics))
    }

    fn run_facts<E: DataflowElement>(&self, name: &str) -> EngineResult<AnalysisReport> {
        let semantics = FactSemantics::<E>::new();
        let results = solve_contextual(self.program, &semantics, self.config, self.policy)?;

        let mut states = BTreeMap::new();
        for (call_string, solution) in results.iter() {
            let mut per_node = BTreeMap::new();
            for (label, state) in solution.iter_post() {
                let rendered = match state.facts() {
                    None => "<universe>".to_string(),
                    Some(facts) => {
                        let rendered: Vec<_> = facts
                            .iter()
                            .map(|fact| fact.render(&self.program.vars))
                            .collect();
                        format!("{{{}}}", rendered.join(", "))
                    }
                };
                per_node.insert(label.to_string(), rendered);
            }
            states.insert(call_string.to_string(), per_node);
        }
        Ok(self.report(name, &results, states, vec![]))
    }

    fn report<S>(
        &self,
        name: &str,
        results: &ContextResults<S>,
        states: BTreeMap<String, BTreeMap<String, String>>,
        mut diagnostics: Vec<Diagnostic>,
    ) -> AnalysisReport {
        if !results.converged() {
            warn!("analysis {} did not fully converge", name);
            diagnostics.push(Diagnostic::new(
                Location::default(),
                Severity::Info,
                Category::Coverage,
                format!(
                    "the {} fixpoint hit its iteration cap, results may be incomplete",
                    name
                ),
            ));
        }
        AnalysisReport {
            analysis: name.to_string(),
            converged: results.converged(),
            diagnostics,
            states,
        }
    }
}

/// Render the leaving environments of every context
fn value_states<D: ValueDomain + Display>(
    results: &ContextResults<Environment<D>>,
) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut states = BTreeMap::new();
    for (call_string, solution) in results.iter() {
        let per_node: BTreeMap<_, _> = solution
            .iter_post()
            .map(|(label, state)| (label.to_string(), state.to_string()))
            .collect();
        states.insert(call_string.to_string(), per_node);
    }
    states
}

/// Contexts of the same function can rediscover the same finding
fn dedup(diagnostics: &mut Vec<Diagnostic>) {
    let mut seen = BTreeSet::new();
    diagnostics.retain(|diagnostic| seen.insert(diagnostic.to_string()));
}
