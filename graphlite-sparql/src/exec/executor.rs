// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query executor: plan, check, solve, apply modifiers

use crate::ast::Query;
use crate::config::EngineConfig;
use crate::exec::checker::Checker;
use crate::exec::{
    modifiers, CancellationToken, Eval, EvalContext, EvalSparql, EvalVisitor, Evaluator,
    ExecutionError, ExecutionStatus, ExprEvaluator, NoopVisitor, Producer, QueryResult,
};
use crate::plan::{Plan, PlanningError, QueryPlanner};

/// Entry point running queries against one producer
pub struct QueryExecutor<'a> {
    producer: &'a dyn Producer,
    evaluator: &'a dyn Evaluator,
    visitor: &'a dyn EvalVisitor,
    config: EngineConfig,
    cancellation: CancellationToken,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(producer: &'a dyn Producer) -> Self {
        Self {
            producer,
            evaluator: &ExprEvaluator,
            visitor: &NoopVisitor,
            config: EngineConfig::default(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_evaluator(mut self, evaluator: &'a dyn Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_visitor(mut self, visitor: &'a dyn EvalVisitor) -> Self {
        self.visitor = visitor;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Token stopping every evaluation started by this executor
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn plan(&self, query: Query) -> Result<Plan, PlanningError> {
        QueryPlanner::from_config(&self.config).plan(query, self.producer)
    }

    pub fn execute(&self, query: Query) -> Result<QueryResult, ExecutionError> {
        let plan = self.plan(query)?;
        self.execute_plan(plan)
    }

    /// Runs an already planned query with the backtracking solver
    pub fn execute_plan(&self, plan: Plan) -> Result<QueryResult, ExecutionError> {
        let Plan {
            mut query,
            annotations,
        } = plan;
        let from = query.from.clone();
        let named = query.named.clone();
        let ctx = EvalContext::new(self.producer, self.evaluator, &annotations, &self.config)
            .with_visitor(self.visitor)
            .with_dataset(&from, &named)
            .with_cancellation(self.cancellation.clone());

        if self.config.check {
            let reports = Checker::new(&ctx).check(&mut query);
            log::debug!("checked {} edges", reports.len());
        }

        let mut eval = Eval::new(&ctx).with_limit(modifiers::early_limit(&query));
        let rows = eval.run(&query)?;
        let status = match ctx.halted() {
            Some(status) => status,
            None if eval.limit_reached() => ExecutionStatus::LimitReached,
            None => ExecutionStatus::Complete,
        };
        let mappings = modifiers::apply(&query, rows);
        log::info!("query returned {} solutions ({:?})", mappings.len(), status);

        Ok(QueryResult {
            mappings,
            status,
            info: query.info().to_vec(),
        })
    }

    /// Runs `query` with the set-at-a-time evaluator
    pub fn execute_algebra(&self, query: Query) -> Result<QueryResult, ExecutionError> {
        let Plan { query, annotations } = self.plan(query)?;
        let ctx = EvalContext::new(self.producer, self.evaluator, &annotations, &self.config)
            .with_visitor(self.visitor)
            .with_dataset(&query.from, &query.named)
            .with_cancellation(self.cancellation.clone());

        let rows = EvalSparql::new(&ctx).run(&query)?;
        let status = ctx.halted().unwrap_or(ExecutionStatus::Complete);
        let mappings = modifiers::apply(&query, rows);
        Ok(QueryResult {
            mappings,
            status,
            info: query.info().to_vec(),
        })
    }
}
