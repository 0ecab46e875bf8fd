use lyra_engine::analysis::domain::Environment;
use lyra_engine::analysis::interval::Interval;
use lyra_engine::analysis::taint::{Taint, TaintDomain, TaintThreeLevels};
use lyra_engine::checkers::divzero::DivisionByZeroChecker;
use lyra_engine::checkers::overflow::OverflowChecker;
use lyra_engine::checkers::size::NumericalSize;
use lyra_engine::checkers::taint::TaintChecker;
use lyra_engine::checkers::{Category, Diagnostic, Severity};
use lyra_engine::flow::fixpoint::{FixpointConfig, FixpointEngine, FixpointSolution};
use lyra_engine::flow::semantics::ValueSemantics;
use lyra_engine::ir::annot::TaintSpec;
use lyra_engine::ir::cfg::Cfg;
use lyra_engine::ir::program::{BinOp, Expr, Program, Stmt, VarType, VariableRegistry};

mod common;
use common::{branch, cfg, goto, node, single_function};

fn solve_intervals(body: &Cfg) -> FixpointSolution<Environment<Interval>> {
    let semantics = ValueSemantics::<Interval>::new();
    FixpointEngine::new(body, &semantics, FixpointConfig::default())
        .unwrap()
        .solve()
}

fn run_overflow(program: &Program, size: NumericalSize) -> Vec<Diagnostic> {
    let function = program.function(&"f".into()).unwrap();
    let solution = solve_intervals(function.body.as_ref().unwrap());
    let mut diagnostics = vec![];
    OverflowChecker::new(size).check(program, function, &solution, &mut diagnostics);
    diagnostics
}

fn run_divzero(program: &Program, size: NumericalSize) -> Vec<Diagnostic> {
    let function = program.function(&"f".into()).unwrap();
    let solution = solve_intervals(function.body.as_ref().unwrap());
    let mut diagnostics = vec![];
    DivisionByZeroChecker::new(size).check(program, function, &solution, &mut diagnostics);
    diagnostics
}

fn run_taint<D: TaintDomain>(
    program: &Program,
    spec: &TaintSpec,
) -> Vec<Diagnostic> {
    let function = program.function(&"f".into()).unwrap();
    let semantics = ValueSemantics::<D>::with_taint(spec);
    let solution = FixpointEngine::new(
        function.body.as_ref().unwrap(),
        &semantics,
        FixpointConfig::default(),
    )
    .unwrap()
    .solve();
    let mut diagnostics = vec![];
    TaintChecker::new(spec).check(program, function, &solution, &mut diagnostics);
    diagnostics
}

#[test]
fn overflow_definite_on_constant_out_of_range() {
    let mut vars = VariableRegistry::new();
    let x = vars.intern("x", VarType::Int);
    let body = cfg(
        vec![node(
            0,
            Stmt::Assign {
                var: x,
                expr: Expr::binary(BinOp::Add, Expr::int(200), Expr::int(100)),
            },
        )],
        vec![],
    );
    let program = single_function("f", vars, body);

    let diagnostics = run_overflow(&program, NumericalSize::UInt8);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Definite);
    assert_eq!(diagnostics[0].category, Category::Overflow);
    assert!(diagnostics[0].message.contains("always overflows uint8"));
}

#[test]
fn overflow_silent_within_range() {
    let mut vars = VariableRegistry::new();
    let x = vars.intern("x", VarType::Int);
    let body = cfg(
        vec![node(0, Stmt::Assign { var: x, expr: Expr::int(100) })],
        vec![],
    );
    let program = single_function("f", vars, body);

    assert!(run_overflow(&program, NumericalSize::UInt8).is_empty());
}

#[test]
fn underflow_on_unsigned_width() {
    let mut vars = VariableRegistry::new();
    let x = vars.intern("x", VarType::Int);
    let body = cfg(
        vec![node(
            0,
            Stmt::Assign {
                var: x,
                expr: Expr::binary(BinOp::Sub, Expr::int(0), Expr::int(1)),
            },
        )],
        vec![],
    );
    let program = single_function("f", vars, body);

    let diagnostics = run_overflow(&program, NumericalSize::UInt8);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Definite);
    assert!(diagnostics[0].message.contains("always underflows uint8"));
}

#[test]
fn overflow_possible_when_range_straddles_the_limit() {
    let mut vars = VariableRegistry::new();
    let x = vars.intern("x", VarType::Int);
    // if (*) { x := 100 } else { x := 300 }
    let body = cfg(
        vec![
            node(0, Stmt::Assume { cond: Expr::Unknown }),
            node(1, Stmt::Assign { var: x, expr: Expr::int(100) }),
            node(2, Stmt::Assign { var: x, expr: Expr::int(300) }),
            node(3, Stmt::Eval { expr: Expr::var(x) }),
        ],
        vec![
            branch(0, 1, true),
            branch(0, 2, false),
            goto(1, 3),
            goto(2, 3),
        ],
    );
    let program = single_function("f", vars, body);

    let diagnostics = run_overflow(&program, NumericalSize::UInt8);
    // reported at the definite write at node 2 and the possible read at node 3
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Definite && d.location.line == 2));
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Possible && d.location.line == 3));
}

#[test]
fn overflow_possible_on_unknown_value() {
    let mut vars = VariableRegistry::new();
    let x = vars.intern("x", VarType::Int);
    let body = cfg(
        vec![node(0, Stmt::Assign { var: x, expr: Expr::Unknown })],
        vec![],
    );
    let program = single_function("f", vars, body);

    let diagnostics = run_overflow(&program, NumericalSize::Int32);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Possible);
    assert!(diagnostics[0].message.contains("unknown"));
}

#[test]
fn division_by_constant_zero_is_definite() {
    let mut vars = VariableRegistry::new();
    let y = vars.intern("y", VarType::Int);
    let body = cfg(
        vec![node(
            0,
            Stmt::Assign {
                var: y,
                expr: Expr::binary(BinOp::Div, Expr::int(1), Expr::int(0)),
            },
        )],
        vec![],
    );
    let program = single_function("f", vars, body);

    let diagnostics = run_divzero(&program, NumericalSize::Int32);
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Definite
            && d.category == Category::DivisionByZero
            && d.message.contains("always zero")));
}

#[test]
fn division_by_possibly_zero_range() {
    let mut vars = VariableRegistry::new();
    let d = vars.intern("d", VarType::Int);
    let z = vars.intern("z", VarType::Int);
    // if (*) { d := -1 } else { d := 1 } ; z := 10 / d
    let body = cfg(
        vec![
            node(0, Stmt::Assume { cond: Expr::Unknown }),
            node(1, Stmt::Assign { var: d, expr: Expr::int(-1) }),
            node(2, Stmt::Assign { var: d, expr: Expr::int(1) }),
            node(
                3,
                Stmt::Assign {
                    var: z,
                    expr: Expr::binary(BinOp::Div, Expr::int(10), Expr::var(d)),
                },
            ),
        ],
        vec![
            branch(0, 1, true),
            branch(0, 2, false),
            goto(1, 3),
            goto(2, 3),
        ],
    );
    let program = single_function("f", vars, body);

    let diagnostics = run_divzero(&program, NumericalSize::Int32);
    assert!(diagnostics
        .iter()
        .any(|diag| diag.severity == Severity::Possible && diag.message.contains("may be zero")));
}

#[test]
fn division_by_nonzero_range_is_silent() {
    let mut vars = VariableRegistry::new();
    let d = vars.intern("d", VarType::Int);
    let z = vars.intern("z", VarType::Int);
    let body = cfg(
        vec![
            node(0, Stmt::Assign { var: d, expr: Expr::int(5) }),
            node(
                1,
                Stmt::Assign {
                    var: z,
                    expr: Expr::binary(BinOp::Div, Expr::int(10), Expr::var(d)),
                },
            ),
        ],
        vec![goto(0, 1)],
    );
    let program = single_function("f", vars, body);

    assert!(run_divzero(&program, NumericalSize::Int32).is_empty());
}

#[test]
fn division_by_undefined_variable() {
    let mut vars = VariableRegistry::new();
    let w = vars.intern("w", VarType::Int);
    let z = vars.intern("z", VarType::Int);
    // w is never assigned, so the divisor evaluates to Bottom
    let body = cfg(
        vec![node(
            0,
            Stmt::Assign {
                var: z,
                expr: Expr::binary(BinOp::Div, Expr::int(1), Expr::var(w)),
            },
        )],
        vec![],
    );
    let program = single_function("f", vars, body);

    let diagnostics = run_divzero(&program, NumericalSize::Int32);
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Possible && d.message.contains("unreachable")));
}

#[test]
fn near_zero_thresholds() {
    assert!(NumericalSize::Float16.is_near_zero(0.0001));
    assert!(!NumericalSize::Float16.is_near_zero(0.01));
    assert!(!NumericalSize::Float32.is_near_zero(0.0001));
    assert!(NumericalSize::Float32.is_near_zero(1e-7));
    // exact zero is a division error, not a precision hazard
    assert!(!NumericalSize::Float16.is_near_zero(0.0));
    // integer widths have no epsilon
    assert!(!NumericalSize::Int32.is_near_zero(0.0001));
    assert_eq!(NumericalSize::Int32.epsilon(), None);
}

fn source_to_sink_program() -> (Program, TaintSpec) {
    let mut vars = VariableRegistry::new();
    let t = vars.intern("t", VarType::Unknown);
    // t := source(); sink(t)
    let body = cfg(
        vec![
            node(0, Stmt::Assign { var: t, expr: Expr::call("source", vec![]) }),
            node(1, Stmt::Eval { expr: Expr::call("sink", vec![Expr::var(t)]) }),
        ],
        vec![goto(0, 1)],
    );
    let program = single_function("f", vars, body);

    let mut spec = TaintSpec::new();
    spec.mark_source("source");
    spec.mark_sink("sink", 0);
    (program, spec)
}

#[test]
fn taint_three_levels_reports_definite_flow() {
    let (program, spec) = source_to_sink_program();
    let diagnostics = run_taint::<TaintThreeLevels>(&program, &spec);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Definite);
    assert_eq!(diagnostics[0].category, Category::Taint);
    assert!(diagnostics[0].message.contains("1st parameter"));
    assert!(diagnostics[0].message.contains("always tainted"));
}

#[test]
fn taint_two_levels_reports_possible_flow() {
    let (program, spec) = source_to_sink_program();
    // the two-level lattice cannot distinguish "always" from "may"
    let diagnostics = run_taint::<Taint>(&program, &spec);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Possible);
    assert!(diagnostics[0].message.contains("may be tainted"));
}

#[test]
fn sanitizer_clears_the_flow() {
    let mut vars = VariableRegistry::new();
    let t = vars.intern("t", VarType::Unknown);
    // t := sanitize(source()); sink(t)
    let body = cfg(
        vec![
            node(
                0,
                Stmt::Assign {
                    var: t,
                    expr: Expr::call("sanitize", vec![Expr::call("source", vec![])]),
                },
            ),
            node(1, Stmt::Eval { expr: Expr::call("sink", vec![Expr::var(t)]) }),
        ],
        vec![goto(0, 1)],
    );
    let program = single_function("f", vars, body);

    let mut spec = TaintSpec::new();
    spec.mark_source("source");
    spec.mark_sanitizer("sanitize");
    spec.mark_sink("sink", 0);

    assert!(run_taint::<TaintThreeLevels>(&program, &spec).is_empty());
}

#[test]
fn sanitizer_at_the_sink_call_clears_the_flow() {
    let mut vars = VariableRegistry::new();
    let t = vars.intern("t", VarType::Unknown);
    // t := source(); sink(sanitize(t)) -- t itself stays tainted, but the
    // value reaching the sink has passed through the sanitizer
    let body = cfg(
        vec![
            node(0, Stmt::Assign { var: t, expr: Expr::call("source", vec![]) }),
            node(
                1,
                Stmt::Eval {
                    expr: Expr::call("sink", vec![Expr::call("sanitize", vec![Expr::var(t)])]),
                },
            ),
        ],
        vec![goto(0, 1)],
    );
    let program = single_function("f", vars, body);

    let mut spec = TaintSpec::new();
    spec.mark_source("source");
    spec.mark_sanitizer("sanitize");
    spec.mark_sink("sink", 0);

    assert!(run_taint::<TaintThreeLevels>(&program, &spec).is_empty());
    assert!(run_taint::<Taint>(&program, &spec).is_empty());
}

#[test]
fn clean_data_at_a_sink_is_silent() {
    let mut vars = VariableRegistry::new();
    let t = vars.intern("t", VarType::Int);
    let body = cfg(
        vec![
            node(0, Stmt::Assign { var: t, expr: Expr::int(42) }),
            node(1, Stmt::Eval { expr: Expr::call("sink", vec![Expr::var(t)]) }),
        ],
        vec![goto(0, 1)],
    );
    let program = single_function("f", vars, body);

    let mut spec = TaintSpec::new();
    spec.mark_sink("sink", 0);

    assert!(run_taint::<TaintThreeLevels>(&program, &spec).is_empty());
}

#[test]
fn sink_annotation_beyond_the_arguments_is_skipped() {
    let vars = VariableRegistry::new();
    let body = cfg(
        vec![node(0, Stmt::Eval { expr: Expr::call("sink", vec![]) })],
        vec![],
    );
    let program = single_function("f", vars, body);

    let mut spec = TaintSpec::new();
    spec.mark_sink("sink", 0);

    assert!(run_taint::<TaintThreeLevels>(&program, &spec).is_empty());
}
