use std::collections::BTreeMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{EngineError, EngineResult};
use crate::ir::adapter;
use crate::ir::program::{convert_stmt, Location, Node, NodeLabel, VariableRegistry};

/// A representation of CFG edges
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Edge {
    Goto,
    Branch(bool),
}

/// The control-flow graph of one function
///
/// The graph is opaque to the analyses: they only see node labels, the
/// statements owned by each node, and the successor/predecessor relation.
pub struct Cfg {
    graph: DiGraph<Node, Edge>,
    /// node label to index in the graph
    label_to_index: BTreeMap<NodeLabel, NodeIndex>,
    entry: NodeLabel,
}

impl Cfg {
    pub fn build(
        nodes: Vec<Node>,
        edges: Vec<(NodeLabel, NodeLabel, Edge)>,
        entry: NodeLabel,
    ) -> EngineResult<Self> {
        let mut graph = DiGraph::new();
        let mut label_to_index = BTreeMap::new();
        for node in nodes {
            let label = node.label;
            let index = graph.add_node(node);
            if label_to_index.insert(label, index).is_some() {
                return Err(EngineError::InvalidProgram(format!(
                    "duplicated node label: {}",
                    label
                )));
            }
        }
        for (src, dst, edge) in edges {
            let src_index = *label_to_index.get(&src).ok_or_else(|| {
                EngineError::InvalidProgram(format!("edge from unknown node: {}", src))
            })?;
            let dst_index = *label_to_index.get(&dst).ok_or_else(|| {
                EngineError::InvalidProgram(format!("edge to unknown node: {}", dst))
            })?;
            graph.add_edge(src_index, dst_index, edge);
        }
        if !label_to_index.contains_key(&entry) {
            return Err(EngineError::InvalidProgram(format!(
                "entry node does not exist: {}",
                entry
            )));
        }
        Ok(Self {
            graph,
            label_to_index,
            entry,
        })
    }

    pub fn convert(adapted: &adapter::Body, vars: &mut VariableRegistry) -> EngineResult<Self> {
        let nodes = adapted
            .nodes
            .iter()
            .map(|node| {
                Ok(Node {
                    label: NodeLabel(node.label),
                    loc: Location::new(node.line, node.column),
                    stmt: convert_stmt(&node.stmt, vars)?,
                })
            })
            .collect::<EngineResult<_>>()?;
        let edges = adapted
            .edges
            .iter()
            .map(|edge| {
                let kind = match edge.branch {
                    None => Edge::Goto,
                    Some(outcome) => Edge::Branch(outcome),
                };
                (NodeLabel(edge.from), NodeLabel(edge.to), kind)
            })
            .collect();
        Self::build(nodes, edges, NodeLabel(adapted.entry))
    }

    pub fn entry(&self) -> NodeLabel {
        self.entry
    }

    pub fn node(&self, label: NodeLabel) -> Option<&Node> {
        self.label_to_index
            .get(&label)
            .map(|index| &self.graph[*index])
    }

    /// All node labels in ascending order
    pub fn labels(&self) -> impl Iterator<Item = NodeLabel> + '_ {
        self.label_to_index.keys().copied()
    }

    /// All nodes in ascending label order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.label_to_index.values().map(|index| &self.graph[*index])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn successors(&self, label: NodeLabel) -> Vec<NodeLabel> {
        self.neighbors(label, Direction::Outgoing)
    }

    pub fn predecessors(&self, label: NodeLabel) -> Vec<NodeLabel> {
        self.neighbors(label, Direction::Incoming)
    }

    fn neighbors(&self, label: NodeLabel, direction: Direction) -> Vec<NodeLabel> {
        match self.label_to_index.get(&label) {
            None => vec![],
            Some(index) => {
                let mut result: Vec<_> = self
                    .graph
                    .neighbors_directed(*index, direction)
                    .map(|n| self.graph[n].label)
                    .collect();
                // petgraph yields neighbors in reverse insertion order
                result.sort();
                result.dedup();
                result
            }
        }
    }
}
