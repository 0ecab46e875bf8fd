use log::warn;

use crate::analysis::domain::{eval_expr, AbstractDomain, CallKind, Environment};
use crate::analysis::interval::{Bound, Interval};
use crate::checkers::size::NumericalSize;
use crate::checkers::{Category, Diagnostic, Severity};
use crate::flow::fixpoint::FixpointSolution;
use crate::ir::program::{Function, Program};

/// Flags divisions whose divisor is, or may be, zero
///
/// Divisors are evaluated in the entering state of their node. On floating
/// widths, a divisor that stays clear of zero but comes closer than the
/// width's epsilon is reported as a precision hazard.
pub struct DivisionByZeroChecker {
    size: NumericalSize,
}

impl DivisionByZeroChecker {
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
            let Some(expr) = node.stmt.expr() else {
                continue;
            };
            let divisors = expr.divisors();
            if divisors.is_empty() {
                continue;
            }
            let state = match solution.pre(node.label) {
                Ok(state) => state,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };
            for divisor in divisors {
                let value = eval_expr::<Interval, _>(divisor, state, &|_| CallKind::Opaque);
                let rendered = divisor.render(&program.vars);
                if value.is_bottom() {
                    diagnostics.push(Diagnostic::new(
                        node.loc,
                        Severity::Possible,
                        Category::DivisionByZero,
                        format!(
                            "the divisor '{}' is evaluated on an unreachable or erroneous path",
                            rendered
                        ),
                    ));
                } else if value.is_top() {
                    diagnostics.push(Diagnostic::new(
                        node.loc,
                        Severity::Possible,
                        Category::DivisionByZero,
                        format!("the value of divisor '{}' is unknown, it may be zero", rendered),
                    ));
                } else if value.is_zero() {
                    diagnostics.push(Diagnostic::new(
                        node.loc,
                        Severity::Definite,
                        Category::DivisionByZero,
                        format!("the divisor '{}' is always zero", rendered),
                    ));
                } else if value.contains_zero() {
                    diagnostics.push(Diagnostic::new(
                        node.loc,
                        Severity::Possible,
                        Category::DivisionByZero,
                        format!("the divisor '{}' may be zero", rendered),
                    ));
                } else if let Some(nearest) = nearest_to_zero(&value) {
                    if self.size.is_near_zero(nearest) {
                        diagnostics.push(Diagnostic::new(
                            node.loc,
                            Severity::Possible,
                            Category::DivisionByZero,
                            format!(
                                "the divisor '{}' may come within {} of zero, losing precision at {} width",
                                rendered,
                                // epsilon is present on every floating width
                                self.size.epsilon().unwrap_or_default(),
                                self.size
                            ),
                        ));
                    }
                }
            }
        }
    }
}

/// Smallest magnitude in a range known to exclude zero
fn nearest_to_zero(value: &Interval) -> Option<f64> {
    match value {
        Interval::Bottom => None,
        Interval::Range(low, high) => {
            if *low > Bound::Int(0) {
                Some(low.as_f64())
            } else if *high < Bound::Int(0) {
                Some(high.as_f64().abs())
            } else {
                None
            }
        }
    }
}
