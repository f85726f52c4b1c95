// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Pattern dependency graph of a run of plannable clauses
//!
//! One node per clause, one undirected link between two clauses sharing a
//! variable. Besides the links, the graph keeps precedence constraints: a
//! FILTER or BIND reads whatever is bound when it runs, so a clause sharing
//! a variable with it stays on the same side of it, unless the variable is
//! already surely bound when the FILTER or BIND runs.

use petgraph::graph::{NodeIndex, UnGraph};

use crate::ast::{EdgePattern, Exp, ExpKind, ExpType, Node, PathPattern, Variable};

/// Clause of a run
#[derive(Debug, Clone)]
pub struct PatternNode {
    /// Position in the run
    pub position: usize,
    pub exp_type: ExpType,
    pub variables: Vec<Variable>,
    /// Variables bound on every solution of the clause
    pub binds: Vec<Variable>,
    pub edge: Option<EdgePattern>,
    pub path: Option<PathPattern>,
    /// Variable naming the graph of a GRAPH clause
    pub graph_name: Option<Variable>,
    /// Target of a BIND clause
    pub bind_target: Option<Variable>,
    /// Variable a `?x = constant` filter pins
    pub pinned: Option<Variable>,
    pub cost: f64,
}

impl PatternNode {
    fn new(position: usize, exp: &Exp) -> Self {
        let mut node = Self {
            position,
            exp_type: exp.exp_type(),
            variables: Vec::new(),
            binds: Vec::new(),
            edge: None,
            path: None,
            graph_name: None,
            bind_target: None,
            pinned: None,
            cost: 0.0,
        };
        match exp.kind() {
            ExpKind::Edge(pattern) => {
                node.variables = pattern.variables();
                node.binds = node.variables.clone();
                node.edge = Some(pattern.clone());
            }
            ExpKind::Path(pattern) => {
                node.variables = pattern.variables();
                node.binds = node.variables.clone();
                node.path = Some(pattern.clone());
            }
            ExpKind::Graph { name, .. } => {
                if let Node::Var(var) = name {
                    node.graph_name = Some(var.clone());
                    node.binds.push(var.clone());
                }
                node.variables = exp.all_nodes();
            }
            ExpKind::Filter(filter) => {
                node.variables = filter.variables().to_vec();
                node.pinned = filter.expr().constant_binding().map(|(var, _)| var.clone());
            }
            ExpKind::Values(rows) => {
                node.variables = rows.variables().to_vec();
                node.binds = node
                    .variables
                    .iter()
                    .filter(|var| rows.bound_everywhere(var))
                    .cloned()
                    .collect();
            }
            ExpKind::Bind { variable, expr } => {
                node.variables = expr.variables();
                if !node.variables.contains(variable) {
                    node.variables.push(variable.clone());
                }
                node.bind_target = Some(variable.clone());
            }
            _ => node.variables = exp.all_nodes(),
        }
        node
    }

    /// FILTER and BIND are placed by their constraints, not by cost
    pub fn is_constraint(&self) -> bool {
        matches!(self.exp_type, ExpType::Filter | ExpType::Bind)
    }

    /// Clause producing candidate bindings from the graph
    pub fn is_evaluable(&self) -> bool {
        matches!(self.exp_type, ExpType::Edge | ExpType::Path | ExpType::Graph)
    }

    pub fn shares_with(&self, other: &PatternNode) -> Vec<Variable> {
        self.variables
            .iter()
            .filter(|var| other.variables.contains(var))
            .cloned()
            .collect()
    }
}

/// Link between two clauses sharing variables
#[derive(Debug, Clone)]
pub struct PatternLink {
    pub shared: Vec<Variable>,
    pub cost: f64,
}

#[derive(Debug, Clone)]
pub struct PatternGraph {
    graph: UnGraph<PatternNode, PatternLink>,
    predecessors: Vec<Vec<usize>>,
}

impl PatternGraph {
    pub fn build(run: &[Exp]) -> Self {
        let mut graph = UnGraph::with_capacity(run.len(), run.len());
        for (position, exp) in run.iter().enumerate() {
            graph.add_node(PatternNode::new(position, exp));
        }

        // variables surely bound by the clauses before each position
        let mut bound_before: Vec<Vec<Variable>> = Vec::with_capacity(run.len());
        let mut bound: Vec<Variable> = Vec::new();
        for i in 0..run.len() {
            bound_before.push(bound.clone());
            for var in &graph[NodeIndex::new(i)].binds {
                if !bound.contains(var) {
                    bound.push(var.clone());
                }
            }
        }

        let mut predecessors = vec![Vec::new(); run.len()];
        for j in 0..run.len() {
            for i in 0..j {
                let (a, b) = (NodeIndex::new(i), NodeIndex::new(j));
                let shared = graph[a].shares_with(&graph[b]);
                if shared.is_empty() {
                    continue;
                }
                let both_filters =
                    graph[a].exp_type == ExpType::Filter && graph[b].exp_type == ExpType::Filter;
                let ordered = if both_filters {
                    false
                } else if graph[b].is_constraint() {
                    true
                } else if graph[a].is_constraint() {
                    shared.iter().any(|var| !bound_before[i].contains(var))
                } else {
                    false
                };
                if ordered {
                    predecessors[j].push(i);
                }
                graph.add_edge(a, b, PatternLink { shared, cost: 0.0 });
            }
        }
        Self {
            graph,
            predecessors,
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, i: usize) -> &PatternNode {
        &self.graph[NodeIndex::new(i)]
    }

    pub fn node_mut(&mut self, i: usize) -> &mut PatternNode {
        &mut self.graph[NodeIndex::new(i)]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PatternNode> {
        self.graph.node_weights()
    }

    /// Clauses sharing a variable with clause `i`
    pub fn neighbors(&self, i: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .graph
            .neighbors(NodeIndex::new(i))
            .map(|node| node.index())
            .collect();
        out.sort_unstable();
        out
    }

    /// Neighbors of clause `i` of the given type
    pub fn linked(&self, i: usize, exp_type: ExpType) -> Vec<usize> {
        self.neighbors(i)
            .into_iter()
            .filter(|&j| self.node(j).exp_type == exp_type)
            .collect()
    }

    pub fn link(&self, a: usize, b: usize) -> Option<&PatternLink> {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|edge| &self.graph[edge])
    }

    /// Endpoints of every link
    pub fn links(&self) -> Vec<(usize, usize)> {
        self.graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(a, b)| (a.index(), b.index()))
            .collect()
    }

    pub fn set_link_cost(&mut self, a: usize, b: usize, cost: f64) {
        if let Some(edge) = self.graph.find_edge(NodeIndex::new(a), NodeIndex::new(b)) {
            self.graph[edge].cost = cost;
        }
    }

    /// Clauses that must be placed before clause `i`
    pub fn predecessors(&self, i: usize) -> &[usize] {
        &self.predecessors[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn run() -> Vec<Exp> {
        vec![
            Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y")),
            Exp::filter(Expr::ne(Expr::var("y"), Expr::var("z"))),
            Exp::triple(Node::var("y"), Node::iri("q"), Node::var("z")),
            Exp::triple(Node::var("a"), Node::iri("r"), Node::var("b")),
        ]
    }

    #[test]
    fn should_link_clauses_sharing_variables() {
        let graph = PatternGraph::build(&run());
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.neighbors(0), vec![1, 2]);
        assert!(graph.neighbors(3).is_empty());
        assert_eq!(
            graph.link(0, 2).map(|link| link.shared.clone()),
            Some(vec![Variable::new("y")])
        );
    }

    #[test]
    fn should_pin_filter_between_its_clauses() {
        let graph = PatternGraph::build(&run());
        assert_eq!(graph.predecessors(1), &[0]);
        assert_eq!(graph.predecessors(2), &[1]);
        assert!(graph.predecessors(3).is_empty());
    }

    #[test]
    fn should_free_clauses_once_filter_variables_are_bound() {
        let run = vec![
            Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y")),
            Exp::filter(Expr::ne(Expr::var("x"), Expr::var("y"))),
            Exp::triple(Node::var("y"), Node::iri("q"), Node::iri("c")),
        ];
        let graph = PatternGraph::build(&run);
        assert_eq!(graph.predecessors(1), &[0]);
        assert!(graph.predecessors(2).is_empty());
    }
}
