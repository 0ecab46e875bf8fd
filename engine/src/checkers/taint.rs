use log::warn;

use crate::analysis::domain::{eval_expr, Environment};
use crate::analysis::taint::TaintDomain;
use crate::checkers::{ordinal, Category, Diagnostic, Severity};
use crate::flow::fixpoint::FixpointSolution;
use crate::flow::semantics::call_kind;
use crate::ir::annot::TaintSpec;
use crate::ir::program::{Function, Program};

/// Flags tainted data reaching a sink-marked call parameter
///
/// Generic over the taint lattice in use: the two-level domain never
/// produces definite findings (its Tainted element means "may be"), while
/// the three-level one separates always-tainted from possibly-tainted.
pub struct TaintChecker<'a> {
    spec: &'a TaintSpec,
}

impl<'a> TaintChecker<'a> {
    pub fn new(spec: &'a TaintSpec) -> Self {
        Self { spec }
    }

    pub fn check<D: TaintDomain>(
        &self,
        program: &Program,
        function: &Function,
        solution: &FixpointSolution<Environment<D>>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(body) = &function.body else {
            return;
        };
        for node in body.nodes() {
            let Some(expr) = node.stmt.expr() else {
                continue;
            };
            for (callee, args) in expr.calls() {
                let Some(params) = self.spec.sink_params(callee) else {
                    continue;
                };
                let state = match solution.pre(node.label) {
                    Ok(state) => state,
                    Err(e) => {
                        warn!("{}", e);
                        continue;
                    }
                };
                for &index in params {
                    let Some(arg) = args.get(index) else {
                        warn!(
                            "sink {} marks parameter {} but the call passes only {} arguments",
                            callee,
                            index,
                            args.len()
                        );
                        continue;
                    };

                    // judge the value actually flowing into the sink, so a
                    // sanitizer on the path clears the argument
                    let value = eval_expr(arg, state, &|c| call_kind(Some(self.spec), c));
                    let severity = if value.is_always_tainted() {
                        Severity::Definite
                    } else if value.is_possibly_tainted() {
                        Severity::Possible
                    } else {
                        continue;
                    };
                    let verdict = match severity {
                        Severity::Definite => "is always tainted",
                        _ => "may be tainted",
                    };
                    let param_name = program
                        .function(callee)
                        .and_then(|f| f.params.get(index))
                        .map(|v| program.vars.name(*v).to_string())
                        .unwrap_or_else(|| format!("param{}", index));
                    diagnostics.push(Diagnostic::new(
                        node.loc,
                        severity,
                        Category::Taint,
                        format!(
                            "the value passed for the {} parameter of this call {}, \
                             and it reaches the sink at parameter '{}' of {}",
                            ordinal(index + 1),
                            verdict,
                            param_name,
                            callee
                        ),
                    ));
                }
            }
        }
    }
}
