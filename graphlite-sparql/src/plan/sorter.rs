// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cost-based clause ordering inside groups
//!
//! A group is split into maximal runs of plannable clauses (EDGE, PATH,
//! GRAPH, FILTER, VALUES, BIND); composites such as OPTIONAL or UNION end a
//! run and are never moved. Each run of two clauses or more is reordered in
//! place:
//! 1. build the pattern graph of the run,
//! 2. estimate node and link costs,
//! 3. search an order,
//! 4. move a BIND producing a graph name right before the GRAPH using it,
//! 5. rewrite the run.

use std::ops::Range;

use crate::ast::{Exp, ExpKind, ExpType, Variable};
use crate::exec::Producer;
use crate::plan::cost::{CostEstimator, HeuristicsEstimator};
use crate::plan::optimizer::OptimizationLevel;
use crate::plan::pattern_graph::PatternGraph;
use crate::plan::search::{DepthFirstBestSearch, SearchStrategy};

/// Clause types a run is made of
pub fn plannable(exp_type: ExpType) -> bool {
    matches!(
        exp_type,
        ExpType::Edge
            | ExpType::Path
            | ExpType::Graph
            | ExpType::Filter
            | ExpType::Values
            | ExpType::Bind
    )
}

pub struct BgpSorter {
    estimator: Box<dyn CostEstimator>,
    strategy: Box<dyn SearchStrategy>,
}

impl BgpSorter {
    pub fn new(
        estimator: impl CostEstimator + 'static,
        strategy: impl SearchStrategy + 'static,
    ) -> Self {
        Self {
            estimator: Box::new(estimator),
            strategy: Box::new(strategy),
        }
    }

    /// Heuristic sorter; producer cardinalities are only consulted from
    /// `Advanced` on
    pub fn for_level(level: OptimizationLevel) -> Self {
        let use_cardinality = matches!(
            level,
            OptimizationLevel::Advanced | OptimizationLevel::Aggressive
        );
        Self::new(
            HeuristicsEstimator::new().with_cardinality(use_cardinality),
            DepthFirstBestSearch::new(),
        )
    }

    /// Reorders every run under `exp`; returns the number of runs visited
    pub fn sort(&self, exp: &mut Exp, producer: &dyn Producer) -> usize {
        self.sort_with(exp, producer, &[])
    }

    fn sort_with(&self, exp: &mut Exp, producer: &dyn Producer, bound: &[Variable]) -> usize {
        let mut sorted = 0;
        if let Some(args) = exp.children_mut() {
            for range in tokenize(args) {
                let mut run_bound = bound.to_vec();
                for arg in &args[..range.start] {
                    for var in arg.in_subscope_nodes(false) {
                        if !run_bound.contains(&var) {
                            run_bound.push(var);
                        }
                    }
                }
                self.sort_run(args, range, producer, &run_bound);
                sorted += 1;
            }

            // inline groups see the bindings of their preceding siblings
            let mut seen = bound.to_vec();
            for arg in args.iter_mut() {
                let inline = matches!(arg.kind(), ExpKind::Bgp(_) | ExpKind::And(_) | ExpKind::Union(..));
                sorted += if inline {
                    self.sort_with(arg, producer, &seen)
                } else {
                    self.sort_with(arg, producer, &[])
                };
                for var in arg.in_subscope_nodes(false) {
                    if !seen.contains(&var) {
                        seen.push(var);
                    }
                }
            }
            return sorted;
        }

        let inline = matches!(exp.kind(), ExpKind::Union(..));
        for sub in exp.sub_expressions_mut() {
            sorted += if inline {
                self.sort_with(sub, producer, bound)
            } else {
                self.sort_with(sub, producer, &[])
            };
        }
        sorted
    }

    fn sort_run(
        &self,
        args: &mut Vec<Exp>,
        range: Range<usize>,
        producer: &dyn Producer,
        bound: &[Variable],
    ) {
        let mut graph = PatternGraph::build(&args[range.clone()]);
        self.estimator.estimate(&mut graph, producer, bound);
        let mut order = self.strategy.order(&graph);
        hoist_binds(&graph, &mut order);

        if order.iter().enumerate().all(|(i, &j)| i == j) {
            return;
        }
        log::debug!(
            "reordered clauses {}..{} as {:?}",
            range.start,
            range.end,
            order
        );
        rewrite(args, range, &order);
    }
}

impl Default for BgpSorter {
    fn default() -> Self {
        Self::for_level(OptimizationLevel::Basic)
    }
}

/// Maximal runs of plannable clauses, at least two long
fn tokenize(args: &[Exp]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, arg) in args.iter().enumerate() {
        match (plannable(arg.exp_type()), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(s..args.len());
    }
    runs.retain(|run| run.len() >= 2);
    runs
}

/// `BIND (<g> AS ?g)` must run before `GRAPH ?g { ... }`
fn hoist_binds(graph: &PatternGraph, order: &mut Vec<usize>) {
    for g in 0..graph.len() {
        let Some(name) = graph.node(g).graph_name.clone() else {
            continue;
        };
        for b in graph.linked(g, ExpType::Bind) {
            if graph.node(b).bind_target.as_ref() != Some(&name) {
                continue;
            }
            let (Some(bind_at), Some(graph_at)) = (
                order.iter().position(|&i| i == b),
                order.iter().position(|&i| i == g),
            ) else {
                continue;
            };
            if bind_at > graph_at {
                order.remove(bind_at);
                order.insert(graph_at, b);
            }
        }
    }
}

/// Replaces `args[range]` by its clauses in `order`
fn rewrite(args: &mut Vec<Exp>, range: Range<usize>, order: &[usize]) {
    let mut slots: Vec<Option<Exp>> = args.drain(range.clone()).map(Some).collect();
    let mut run: Vec<Exp> = order.iter().filter_map(|&i| slots.get_mut(i)?.take()).collect();
    run.extend(slots.into_iter().flatten());
    args.splice(range.start..range.start, run);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Node, Term};
    use crate::storage::MemoryStore;

    fn types(exp: &Exp) -> Vec<ExpType> {
        exp.children().iter().map(Exp::exp_type).collect()
    }

    #[test]
    fn should_split_runs_at_composites() {
        let args = vec![
            Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y")),
            Exp::triple(Node::var("y"), Node::iri("q"), Node::var("z")),
            Exp::optional(Exp::bgp(vec![]), Exp::bgp(vec![])),
            Exp::triple(Node::var("z"), Node::iri("r"), Node::var("w")),
            Exp::triple(Node::var("w"), Node::iri("s"), Node::var("v")),
            Exp::filter(Expr::bound("v")),
        ];
        assert_eq!(tokenize(&args), vec![0..2, 3..6]);
    }

    #[test]
    fn should_move_selective_edge_first() {
        let mut body = Exp::bgp(vec![
            Exp::triple(Node::var("x"), Node::var("p"), Node::var("y")),
            Exp::triple(Node::var("y"), Node::iri("q"), Node::iri("c")),
        ]);
        let second = body.children()[1].id();
        BgpSorter::default().sort(&mut body, &MemoryStore::new());
        assert_eq!(body.children()[0].id(), second);
    }

    #[test]
    fn should_hoist_bind_before_graph() {
        let mut body = Exp::bgp(vec![
            Exp::graph(
                Node::var("g"),
                Exp::bgp(vec![Exp::triple(Node::var("s"), Node::iri("p"), Node::var("o"))]),
            ),
            Exp::bind(Variable::new("g"), Expr::constant(Term::iri("g1"))),
        ]);
        BgpSorter::default().sort(&mut body, &MemoryStore::new());
        assert_eq!(types(&body), vec![ExpType::Bind, ExpType::Graph]);
    }

    #[test]
    fn should_leave_single_clause_groups_alone() {
        let mut body = Exp::bgp(vec![Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y"))]);
        assert_eq!(BgpSorter::default().sort(&mut body, &MemoryStore::new()), 0);
    }
}
