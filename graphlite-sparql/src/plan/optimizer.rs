// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query optimizer and planner
//!
//! This module provides the main query planning interface that turns a
//! compiled query into an immutable [`Plan`]: the rewritten query plus the
//! annotation side table the solver reads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::{Exp, Query};
use crate::config::EngineConfig;
use crate::exec::Producer;
use crate::plan::annotate::PlanAnnotations;
use crate::plan::placement::place_filters;
use crate::plan::sorter::BgpSorter;

/// Main query planner that orchestrates the planning process
#[derive(Debug, Default)]
pub struct QueryPlanner {
    optimization_level: OptimizationLevel,
}

/// Optimization levels for query planning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OptimizationLevel {
    None, // No optimization, clauses run in query order
    #[default]
    Basic, // Filter placement and heuristic clause ordering
    Advanced,   // Clause ordering refined with producer cardinalities
    Aggressive, // Same as Advanced
}

/// Planning errors
#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Invalid query structure: {0}")]
    InvalidQuery(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),
}

/// A query ready for evaluation
#[derive(Debug, Clone)]
pub struct Plan {
    pub query: Query,
    pub annotations: PlanAnnotations,
}

impl QueryPlanner {
    /// Create a new query planner with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query planner with specific optimization level
    pub fn with_optimization_level(level: OptimizationLevel) -> Self {
        Self {
            optimization_level: level,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_optimization_level(config.optimization_level)
    }

    pub fn optimization_level(&self) -> OptimizationLevel {
        self.optimization_level
    }

    /// Validates, rewrites and annotates `query`
    pub fn plan(&self, mut query: Query, producer: &dyn Producer) -> Result<Plan, PlanningError> {
        validate(&query)?;

        if self.optimization_level != OptimizationLevel::None {
            let moved = place_filters(&mut query.body);
            let sorter = BgpSorter::for_level(self.optimization_level);
            let runs = sorter.sort(&mut query.body, producer);
            log::debug!("planner moved {} filters, sorted {} runs", moved, runs);
        }

        if query.distinct && query.select.len() == 1 && query.group_by.is_empty() {
            let var = query.select[0].clone();
            if query.body.distinct(&var) {
                log::debug!("DISTINCT {} pushed into the pattern", var);
            }
        }

        let annotations = PlanAnnotations::build(&query.body);
        Ok(Plan { query, annotations })
    }
}

fn validate(query: &Query) -> Result<(), PlanningError> {
    if !query.group_by.is_empty() {
        if let Some(var) = query.select.iter().find(|var| !query.group_by.contains(var)) {
            return Err(PlanningError::InvalidQuery(format!(
                "{} is selected but not grouped",
                var
            )));
        }
    }
    let mut aggregate = false;
    query.body.walk(&mut |exp: &Exp| aggregate |= exp.flags().aggregate);
    if aggregate {
        return Err(PlanningError::UnsupportedFeature(
            "aggregate evaluation".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExpType, Expr, Node, Variable};
    use crate::storage::MemoryStore;

    fn query() -> Query {
        Query::new(Exp::bgp(vec![
            Exp::triple(Node::var("x"), Node::var("p"), Node::var("y")),
            Exp::triple(Node::var("y"), Node::iri("q"), Node::iri("c")),
            Exp::filter(Expr::ne(Expr::var("x"), Expr::var("y"))),
        ]))
    }

    fn types(plan: &Plan) -> Vec<ExpType> {
        plan.query.body.children().iter().map(Exp::exp_type).collect()
    }

    #[test]
    fn should_keep_query_order_without_optimization() {
        let plan = QueryPlanner::with_optimization_level(OptimizationLevel::None)
            .plan(query(), &MemoryStore::new())
            .unwrap();
        assert_eq!(types(&plan), vec![ExpType::Edge, ExpType::Edge, ExpType::Filter]);
        assert!(plan.query.body.children()[0]
            .edge_pattern()
            .map_or(false, |p| p.predicate.is_variable()));
    }

    #[test]
    fn should_reorder_with_basic_optimization() {
        let plan = QueryPlanner::new().plan(query(), &MemoryStore::new()).unwrap();
        let first = plan.query.body.children()[0].edge_pattern().cloned().unwrap();
        assert_eq!(first.object, Node::iri("c"));
        assert_eq!(types(&plan)[2], ExpType::Filter);
    }

    #[test]
    fn should_push_distinct_into_pattern() {
        let query = query().select(&["x"]).distinct();
        let plan = QueryPlanner::new().plan(query, &MemoryStore::new()).unwrap();
        let mut accepts = Vec::new();
        plan.query.body.walk(&mut |exp| {
            if exp.exp_type() == ExpType::Accept {
                accepts.push(exp.id());
            }
        });
        assert_eq!(accepts.len(), 1);
    }

    #[test]
    fn should_reject_ungrouped_selection() {
        let query = query().group_by(&["x"]).select(&["x", "y"]);
        let err = QueryPlanner::new()
            .plan(query, &MemoryStore::new())
            .unwrap_err();
        assert!(matches!(err, PlanningError::InvalidQuery(_)));
        assert!(err.to_string().contains(&Variable::new("y").to_string()));
    }

    #[test]
    fn should_reject_aggregates() {
        let query = Query::new(Exp::bgp(vec![]).aggregate());
        let err = QueryPlanner::new()
            .plan(query, &MemoryStore::new())
            .unwrap_err();
        assert!(matches!(err, PlanningError::UnsupportedFeature(_)));
    }
}
