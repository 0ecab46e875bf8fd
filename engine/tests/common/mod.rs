#![allow(dead_code)]

use lyra_engine::ir::cfg::{Cfg, Edge};
use lyra_engine::ir::program::{
    Function, Location, Node, NodeLabel, Program, Stmt, VariableRegistry,
};

pub fn node(label: usize, stmt: Stmt) -> Node {
    Node {
        label: NodeLabel(label),
        loc: Location::new(label as u32, 1),
        stmt,
    }
}

pub fn goto(from: usize, to: usize) -> (NodeLabel, NodeLabel, Edge) {
    (NodeLabel(from), NodeLabel(to), Edge::Goto)
}

pub fn branch(from: usize, to: usize, outcome: bool) -> (NodeLabel, NodeLabel, Edge) {
    (NodeLabel(from), NodeLabel(to), Edge::Branch(outcome))
}

/// Build a CFG rooted at node 0
pub fn cfg(nodes: Vec<Node>, edges: Vec<(NodeLabel, NodeLabel, Edge)>) -> Cfg {
    Cfg::build(nodes, edges, NodeLabel(0)).unwrap()
}

/// Wrap one CFG into a single-function program
pub fn single_function(name: &str, vars: VariableRegistry, body: Cfg) -> Program {
    let mut program = Program::new(vars);
    program
        .add_function(Function {
            name: name.into(),
            params: vec![],
            body: Some(body),
        })
        .unwrap();
    program
}
