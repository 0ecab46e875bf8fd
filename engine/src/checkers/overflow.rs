use std::collections::BTreeSet;

use log::warn;

use crate::analysis::domain::{AbstractDomain, Environment};
use crate::analysis::interval::Interval;
use crate::checkers::size::NumericalSize;
use crate::checkers::{Category, Diagnostic, Severity};
use crate::flow::fixpoint::FixpointSolution;
use crate::ir::program::{Function, Location, Program};

/// Flags variables whose interval escapes the bounds of a numeric width
///
/// Works off the leaving states of an interval fixpoint: a variable is
/// reported at every node that mentions it while its range is (or may be)
/// outside `[min, max]` of the configured size.
pub struct OverflowChecker {
    size: NumericalSize,
}

impl OverflowChecker {
    pub fn new(size: NumericalSize) -> Self {
        Self { size }
    }

    pub fn check(
        &self,
        program: &Program,
        function: &Function,
        solution: &FixpointSolution<Environment<Interval>>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(body) = &function.body else {
            return;
        };
        for node in body.nodes() {
            let mut involved: BTreeSet<_> = node.stmt.reads();
            involved.extend(node.stmt.written());
            if involved.is_empty() {
                continue;
            }
            let state = match solution.post(node.label) {
                Ok(state) => state,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };
            for var in involved {
                // width bounds only make sense for typed numeric variables
                if !program.vars.var_type(var).is_numeric() {
                    continue;
                }
                let name = program.vars.name(var);
                self.check_value(name, &state.get(&var), node.loc, diagnostics);
            }
        }
    }

    fn check_value(
        &self,
        name: &str,
        value: &Interval,
        loc: Location,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let (low, high) = match value {
            // nothing flows here, nothing to report
            Interval::Bottom => return,
            Interval::Range(low, high) => (*low, *high),
        };
        if value.is_top() {
            diagnostics.push(Diagnostic::new(
                loc,
                Severity::Possible,
                Category::Overflow,
                format!(
                    "the value of '{}' is unknown, it may overflow or underflow {}",
                    name, self.size
                ),
            ));
            return;
        }
        let (min, max) = (self.size.min(), self.size.max());
        if high.as_f64() > max {
            let severity = if low.as_f64() > max {
                Severity::Definite
            } else {
                Severity::Possible
            };
            let verdict = match severity {
                Severity::Definite => "always overflows",
                _ => "may overflow",
            };
            diagnostics.push(Diagnostic::new(
                loc,
                severity,
                Category::Overflow,
                format!("the value of '{}' {} {}", name, verdict, self.size),
            ));
        }
        if low.as_f64() < min {
            let severity = if high.as_f64() < min {
                Severity::Definite
            } else {
                Severity::Possible
            };
            let verdict = match severity {
                Severity::Definite => "always underflows",
                _ => "may underflow",
            };
            diagnostics.push(Diagnostic::new(
                loc,
                severity,
                Category::Overflow,
                format!("the value of '{}' {} {}", name, verdict, self.size),
            ));
        }
    }
}
