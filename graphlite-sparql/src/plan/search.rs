// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Search strategies turning an estimated pattern graph into a clause order

use crate::plan::pattern_graph::PatternGraph;

pub trait SearchStrategy {
    /// A permutation of the positions of `graph` honoring its precedence
    /// constraints
    fn order(&self, graph: &PatternGraph) -> Vec<usize>;
}

/// Depth-first best search
///
/// Starts from the cheapest clause, then keeps following the cheapest link
/// out of the most recently placed clause, falling back along the placed path
/// when a clause has no unplaced neighbor left. A FILTER or BIND is emitted as
/// soon as its constraints allow.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthFirstBestSearch;

impl DepthFirstBestSearch {
    pub fn new() -> Self {
        Self
    }
}

impl SearchStrategy for DepthFirstBestSearch {
    fn order(&self, graph: &PatternGraph) -> Vec<usize> {
        let n = graph.len();
        let mut placed = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut path: Vec<usize> = Vec::new();

        while order.len() < n {
            let constraint = (0..n)
                .find(|&i| is_ready(graph, &placed, i) && graph.node(i).is_constraint());
            if let Some(i) = constraint {
                placed[i] = true;
                order.push(i);
                continue;
            }

            let mut next = None;
            for &anchor in path.iter().rev() {
                next = graph
                    .neighbors(anchor)
                    .into_iter()
                    .filter(|&i| is_ready(graph, &placed, i))
                    .min_by(|&a, &b| {
                        let link = |i: usize| graph.link(anchor, i).map_or(f64::MAX, |l| l.cost);
                        link(a)
                            .total_cmp(&link(b))
                            .then(graph.node(a).cost.total_cmp(&graph.node(b).cost))
                            .then(a.cmp(&b))
                    });
                if next.is_some() {
                    break;
                }
            }
            let next = next.or_else(|| {
                (0..n)
                    .filter(|&i| is_ready(graph, &placed, i))
                    .min_by(|&a, &b| {
                        graph
                            .node(a)
                            .cost
                            .total_cmp(&graph.node(b).cost)
                            .then(a.cmp(&b))
                    })
            });
            let Some(i) = next else {
                break;
            };
            placed[i] = true;
            order.push(i);
            path.push(i);
        }

        // constraints always admit the original order, so nothing is left here
        order.extend((0..n).filter(|&i| !placed[i]));
        order
    }
}

fn is_ready(graph: &PatternGraph, placed: &[bool], i: usize) -> bool {
    !placed[i] && graph.predecessors(i).iter().all(|&p| placed[p])
}
