// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cost estimation for clause ordering
//!
//! Node costs rank a clause by how constrained it is when evaluated first;
//! link costs rank how cheap it is to evaluate one clause right after the
//! other. Lower is better for both.

use std::collections::HashSet;

use crate::ast::{EdgePattern, ExpType, Node, Variable};
use crate::exec::Producer;
use crate::plan::pattern_graph::PatternGraph;

/// Cost of a link that gives no join benefit
pub const MAX_COST: f64 = f64::MAX;

/// Cost of a GRAPH clause evaluated first
const GRAPH_COST: f64 = 8.0;

/// Pluggable cost model of the sorter
pub trait CostEstimator {
    /// Fills node and link costs of `graph`; `bound` lists the variables
    /// already bound when the run starts
    fn estimate(&self, graph: &mut PatternGraph, producer: &dyn Producer, bound: &[Variable]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Subject,
    Predicate,
    Object,
}

/// Join shapes of two edges, strongest first: weights 6 down to 1
const JOINT_PATTERNS: [(Position, Position); 6] = [
    (Position::Predicate, Position::Object),
    (Position::Subject, Position::Predicate),
    (Position::Subject, Position::Object),
    (Position::Object, Position::Object),
    (Position::Subject, Position::Subject),
    (Position::Predicate, Position::Predicate),
];

/// Heuristics on pattern shape, optionally refined with producer cardinalities
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicsEstimator {
    use_cardinality: bool,
}

impl HeuristicsEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cardinality(mut self, use_cardinality: bool) -> Self {
        self.use_cardinality = use_cardinality;
        self
    }

    fn node_cost(
        &self,
        graph: &PatternGraph,
        i: usize,
        producer: &dyn Producer,
        bound: &HashSet<Variable>,
    ) -> f64 {
        let node = graph.node(i);
        match node.exp_type {
            ExpType::Edge => {
                let Some(pattern) = &node.edge else {
                    return GRAPH_COST;
                };
                let rank = shape_rank(
                    is_bound(&pattern.subject, bound),
                    is_bound(&pattern.predicate, bound),
                    is_bound(&pattern.object, bound),
                ) as f64;
                match self.cardinality(pattern, producer) {
                    Some(count) => rank + (count as f64).ln_1p(),
                    None => rank,
                }
            }
            ExpType::Path => match &node.path {
                Some(pattern) => {
                    let rank = shape_rank(
                        is_bound(&pattern.subject, bound),
                        true,
                        is_bound(&pattern.object, bound),
                    );
                    rank as f64 + 1.0
                }
                None => GRAPH_COST,
            },
            ExpType::Graph => GRAPH_COST,
            _ => 0.0,
        }
    }

    fn cardinality(&self, pattern: &EdgePattern, producer: &dyn Producer) -> Option<usize> {
        if self.use_cardinality {
            producer.cardinality(pattern)
        } else {
            None
        }
    }

    fn link_cost(&self, graph: &PatternGraph, a: usize, b: usize) -> f64 {
        let (left, right) = (graph.node(a), graph.node(b));
        if !left.is_evaluable() || !right.is_evaluable() {
            return MAX_COST;
        }
        let nshare = graph.link(a, b).map_or(0, |link| link.shared.len());
        if nshare == 0 {
            return MAX_COST;
        }
        if left.exp_type == ExpType::Graph || right.exp_type == ExpType::Graph {
            return nshare as f64 / 3.0;
        }
        match (&left.edge, &right.edge) {
            (Some(first), Some(second)) => match joint_weight(first, second) {
                Some(weight) => 1.0 / weight as f64 / nshare as f64,
                None => MAX_COST,
            },
            _ => 1.0 / nshare as f64,
        }
    }
}

impl CostEstimator for HeuristicsEstimator {
    fn estimate(&self, graph: &mut PatternGraph, producer: &dyn Producer, bound: &[Variable]) {
        let mut bound: HashSet<Variable> = bound.iter().cloned().collect();
        // `?x = constant` filters pin their variable
        bound.extend(graph.nodes().filter_map(|node| node.pinned.clone()));

        for i in 0..graph.len() {
            let cost = self.node_cost(graph, i, producer, &bound);
            graph.node_mut(i).cost = cost;
        }
        for (a, b) in graph.links() {
            let cost = self.link_cost(graph, a, b);
            graph.set_link_cost(a, b, cost);
        }
    }
}

fn is_bound(node: &Node, bound: &HashSet<Variable>) -> bool {
    match node {
        Node::Const(_) => true,
        Node::Var(var) => bound.contains(var),
    }
}

/// Selectivity rank of a triple shape, 0 for fully bound to 7 for fully free
fn shape_rank(subject: bool, predicate: bool, object: bool) -> u8 {
    match (subject, predicate, object) {
        (true, true, true) => 0,
        (true, false, true) => 1,
        (true, true, false) => 2,
        (false, true, true) => 3,
        (true, false, false) => 4,
        (false, false, true) => 5,
        (false, true, false) => 6,
        (false, false, false) => 7,
    }
}

fn position(pattern: &EdgePattern, position: Position) -> &Node {
    match position {
        Position::Subject => &pattern.subject,
        Position::Predicate => &pattern.predicate,
        Position::Object => &pattern.object,
    }
}

/// Weight of the strongest join shape two edges share a variable through
fn joint_weight(first: &EdgePattern, second: &EdgePattern) -> Option<usize> {
    let same_var = |a: &Node, b: &Node| match (a, b) {
        (Node::Var(x), Node::Var(y)) => x == y,
        _ => false,
    };
    JOINT_PATTERNS
        .iter()
        .enumerate()
        .find(|(_, (p1, p2))| {
            same_var(position(first, *p1), position(second, *p2))
                || same_var(position(first, *p2), position(second, *p1))
        })
        .map(|(i, _)| JOINT_PATTERNS.len() - i)
}
