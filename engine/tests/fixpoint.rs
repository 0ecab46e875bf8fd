use lyra_engine::analysis::domain::Environment;
use lyra_engine::analysis::interval::{Bound, Interval};
use lyra_engine::error::EngineError;
use lyra_engine::flow::context::{solve_contextual, CallString, ContextPolicy};
use lyra_engine::flow::fixpoint::{FixpointConfig, FixpointEngine, FixpointSolution};
use lyra_engine::flow::semantics::ValueSemantics;
use lyra_engine::ir::cfg::Cfg;
use lyra_engine::ir::program::{
    BinOp, Expr, Function, NodeLabel, Program, Stmt, VarType, VariableRegistry,
};

mod common;
use common::{branch, cfg, goto, node};

fn solve_intervals(body: &Cfg) -> FixpointSolution<Environment<Interval>> {
    let semantics = ValueSemantics::<Interval>::new();
    FixpointEngine::new(body, &semantics, FixpointConfig::default())
        .unwrap()
        .solve()
}

fn range(low: i64, high: i64) -> Interval {
    Interval::range(Bound::Int(low), Bound::Int(high))
}

#[test]
fn straight_line_propagation() {
    let mut vars = VariableRegistry::new();
    let x = vars.intern("x", VarType::Int);
    let y = vars.intern("y", VarType::Int);

    // x := 2; y := x * 3
    let body = cfg(
        vec![
            node(0, Stmt::Assign { var: x, expr: Expr::int(2) }),
            node(
                1,
                Stmt::Assign {
                    var: y,
                    expr: Expr::binary(BinOp::Mul, Expr::var(x), Expr::int(3)),
                },
            ),
        ],
        vec![goto(0, 1)],
    );
    let solution = solve_intervals(&body);

    assert!(solution.converged());
    let post = solution.post(NodeLabel(1)).unwrap();
    assert_eq!(post.get(&x), range(2, 2));
    assert_eq!(post.get(&y), range(6, 6));
}

#[test]
fn branches_join() {
    let mut vars = VariableRegistry::new();
    let x = vars.intern("x", VarType::Int);

    // if (*) { x := 1 } else { x := 2 } ; join
    let body = cfg(
        vec![
            node(0, Stmt::Assume { cond: Expr::Unknown }),
            node(1, Stmt::Assign { var: x, expr: Expr::int(1) }),
            node(2, Stmt::Assign { var: x, expr: Expr::int(2) }),
            node(3, Stmt::Skip),
        ],
        vec![
            branch(0, 1, true),
            branch(0, 2, false),
            goto(1, 3),
            goto(2, 3),
        ],
    );
    let solution = solve_intervals(&body);

    assert!(solution.converged());
    assert_eq!(solution.post(NodeLabel(3)).unwrap().get(&x), range(1, 2));
}

/// A counting loop without modeled guards: widening must terminate the
/// ascending chain `[0,0], [0,1], [0,2], ...`
#[test]
fn loop_widening_terminates() {
    let mut vars = VariableRegistry::new();
    let x = vars.intern("x", VarType::Int);

    // x := 0; while (*) { x := x + 1 }
    let body = cfg(
        vec![
            node(0, Stmt::Assign { var: x, expr: Expr::int(0) }),
            node(1, Stmt::Skip),
            node(2, Stmt::Assume { cond: Expr::Unknown }),
            node(
                3,
                Stmt::Assign {
                    var: x,
                    expr: Expr::binary(BinOp::Add, Expr::var(x), Expr::int(1)),
                },
            ),
            node(4, Stmt::Skip),
        ],
        vec![
            goto(0, 1),
            branch(1, 2, true),
            branch(1, 4, false),
            goto(2, 3),
            goto(3, 1),
        ],
    );
    let solution = solve_intervals(&body);

    assert!(solution.converged());
    // the loop head stabilizes at [0, +Inf]
    assert_eq!(
        solution.post(NodeLabel(1)).unwrap().get(&x),
        Interval::range(Bound::Int(0), Bound::PosInf)
    );
    // after the increment, the lower bound is refined to 1
    assert_eq!(
        solution.post(NodeLabel(3)).unwrap().get(&x),
        Interval::range(Bound::Int(1), Bound::PosInf)
    );
    assert_eq!(
        solution.post(NodeLabel(4)).unwrap().get(&x),
        Interval::range(Bound::Int(0), Bound::PosInf)
    );
}

#[test]
fn iteration_cap_flags_non_convergence() {
    let mut vars = VariableRegistry::new();
    let x = vars.intern("x", VarType::Int);

    let body = cfg(
        vec![
            node(0, Stmt::Assign { var: x, expr: Expr::int(0) }),
            node(1, Stmt::Skip),
            node(
                2,
                Stmt::Assign {
                    var: x,
                    expr: Expr::binary(BinOp::Add, Expr::var(x), Expr::int(1)),
                },
            ),
        ],
        vec![goto(0, 1), goto(1, 2), goto(2, 1)],
    );
    let config = FixpointConfig {
        max_iterations: 2,
        ..FixpointConfig::default()
    };
    let semantics = ValueSemantics::<Interval>::new();
    let solution = FixpointEngine::new(&body, &semantics, config)
        .unwrap()
        .solve();
    assert!(!solution.converged());
}

#[test]
fn config_is_validated_up_front() {
    let body = cfg(vec![node(0, Stmt::Skip)], vec![]);
    let semantics = ValueSemantics::<Interval>::new();

    let config = FixpointConfig {
        widening_threshold: 0,
        ..FixpointConfig::default()
    };
    let result = FixpointEngine::new(&body, &semantics, config);
    assert!(matches!(result, Err(EngineError::ConfigError(..))));

    let config = FixpointConfig {
        max_iterations: 0,
        ..FixpointConfig::default()
    };
    let result = FixpointEngine::new(&body, &semantics, config);
    assert!(matches!(result, Err(EngineError::ConfigError(..))));
}

#[test]
fn queries_on_unknown_labels_fail() {
    let body = cfg(vec![node(0, Stmt::Skip)], vec![]);
    let solution = solve_intervals(&body);
    assert!(matches!(
        solution.pre(NodeLabel(99)),
        Err(EngineError::QueryFailure(..))
    ));
    assert!(matches!(
        solution.post(NodeLabel(99)),
        Err(EngineError::QueryFailure(..))
    ));
}

fn two_function_program() -> Program {
    let mut vars = VariableRegistry::new();
    let x = vars.intern("x", VarType::Int);

    let helper_body = cfg(
        vec![node(0, Stmt::Assign { var: x, expr: Expr::int(1) })],
        vec![],
    );
    let main_body = cfg(
        vec![node(0, Stmt::Eval { expr: Expr::call("helper", vec![]) })],
        vec![],
    );

    let mut program = Program::new(vars);
    program
        .add_function(Function {
            name: "helper".into(),
            params: vec![],
            body: Some(helper_body),
        })
        .unwrap();
    program
        .add_function(Function {
            name: "main".into(),
            params: vec![],
            body: Some(main_body),
        })
        .unwrap();
    program
}

#[test]
fn contexts_cover_roots_and_discovered_calls() {
    let program = two_function_program();
    let semantics = ValueSemantics::<Interval>::new();
    let results = solve_contextual(
        &program,
        &semantics,
        FixpointConfig::default(),
        ContextPolicy::default(),
    )
    .unwrap();

    assert!(results.converged());
    assert_eq!(results.len(), 3);
    let contexts: Vec<_> = results.iter().map(|(c, _)| c.to_string()).collect();
    assert!(contexts.contains(&"helper".to_string()));
    assert!(contexts.contains(&"main".to_string()));
    assert!(contexts.contains(&"main>helper".to_string()));
}

#[test]
fn context_depth_limits_growth() {
    let program = two_function_program();
    let semantics = ValueSemantics::<Interval>::new();
    let results = solve_contextual(
        &program,
        &semantics,
        FixpointConfig::default(),
        ContextPolicy { depth: Some(1) },
    )
    .unwrap();

    // only the root contexts remain
    assert_eq!(results.len(), 2);
    assert!(results
        .get(&CallString::root("main".into()))
        .is_some());
}

#[test]
fn calls_to_unresolved_targets_are_recoverable() {
    let vars = VariableRegistry::new();
    let main_body = cfg(
        vec![node(0, Stmt::Eval { expr: Expr::call("missing", vec![]) })],
        vec![],
    );
    let mut program = Program::new(vars);
    program
        .add_function(Function {
            name: "main".into(),
            params: vec![],
            body: Some(main_body),
        })
        .unwrap();

    let semantics = ValueSemantics::<Interval>::new();
    let results = solve_contextual(
        &program,
        &semantics,
        FixpointConfig::default(),
        ContextPolicy::default(),
    )
    .unwrap();
    // the main context is still solved; the dangling callee is skipped
    assert_eq!(results.len(), 1);
}

#[test]
fn recursion_collapses_into_one_context() {
    let vars = VariableRegistry::new();
    let body = cfg(
        vec![node(0, Stmt::Eval { expr: Expr::call("loop", vec![]) })],
        vec![],
    );
    let mut program = Program::new(vars);
    program
        .add_function(Function {
            name: "loop".into(),
            params: vec![],
            body: Some(body),
        })
        .unwrap();

    let semantics = ValueSemantics::<Interval>::new();
    let results = solve_contextual(
        &program,
        &semantics,
        FixpointConfig::default(),
        ContextPolicy::default(),
    )
    .unwrap();
    assert_eq!(results.len(), 1);
}
