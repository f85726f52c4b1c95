// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared state of one query evaluation

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ast::Term;
use crate::config::EngineConfig;
use crate::exec::{EvalVisitor, Evaluator, ExecutionStatus, NoopVisitor, Producer};
use crate::plan::PlanAnnotations;

/// Cooperative cancellation flag shared with the caller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Collaborators and settings every evaluator of a query shares
///
/// Nested evaluations (operands of JOIN, OPTIONAL, GRAPH, sub-queries) borrow
/// the same context, so a stop raised anywhere unwinds all of them.
pub struct EvalContext<'a> {
    pub producer: &'a dyn Producer,
    pub evaluator: &'a dyn Evaluator,
    pub visitor: &'a dyn EvalVisitor,
    pub annotations: &'a PlanAnnotations,
    pub config: &'a EngineConfig,
    /// Default graph restriction
    pub from: &'a [Term],
    /// Named graph restriction
    pub named: &'a [Term],
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    halted: Cell<Option<ExecutionStatus>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        producer: &'a dyn Producer,
        evaluator: &'a dyn Evaluator,
        annotations: &'a PlanAnnotations,
        config: &'a EngineConfig,
    ) -> Self {
        let deadline = config
            .timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        Self {
            producer,
            evaluator,
            visitor: &NoopVisitor,
            annotations,
            config,
            from: &[],
            named: &[],
            cancellation: CancellationToken::new(),
            deadline,
            halted: Cell::new(None),
        }
    }

    pub fn with_visitor(mut self, visitor: &'a dyn EvalVisitor) -> Self {
        self.visitor = visitor;
        self
    }

    pub fn with_dataset(mut self, from: &'a [Term], named: &'a [Term]) -> Self {
        self.from = from;
        self.named = named;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Context for another plan sharing this context's collaborators,
    /// dataset, token and deadline
    pub fn derive<'b>(&'b self, annotations: &'b PlanAnnotations) -> EvalContext<'b> {
        EvalContext {
            producer: self.producer,
            evaluator: self.evaluator,
            visitor: self.visitor,
            annotations,
            config: self.config,
            from: self.from,
            named: self.named,
            cancellation: self.cancellation.clone(),
            deadline: self.deadline,
            halted: Cell::new(self.halted.get()),
        }
    }

    /// Polled at every loop iteration of the solver
    pub fn should_stop(&self) -> bool {
        if self.halted.get().is_some() {
            return true;
        }
        if self.cancellation.is_cancelled() {
            log::info!("evaluation cancelled");
            self.halted.set(Some(ExecutionStatus::Cancelled));
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                log::info!("evaluation timed out");
                self.halted.set(Some(ExecutionStatus::TimedOut));
                return true;
            }
        }
        false
    }

    /// Why evaluation was halted, if it was
    pub fn halted(&self) -> Option<ExecutionStatus> {
        self.halted.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ExprEvaluator;
    use crate::storage::MemoryStore;

    #[test]
    fn should_stop_once_token_is_cancelled() {
        let store = MemoryStore::new();
        let annotations = PlanAnnotations::default();
        let config = EngineConfig::default();
        let token = CancellationToken::new();
        let ctx = EvalContext::new(&store, &ExprEvaluator, &annotations, &config)
            .with_cancellation(token.clone());
        assert!(!ctx.should_stop());
        token.cancel();
        assert!(ctx.should_stop());
        assert_eq!(ctx.halted(), Some(ExecutionStatus::Cancelled));
    }

    #[test]
    fn should_time_out_with_zero_deadline() {
        let store = MemoryStore::new();
        let annotations = PlanAnnotations::default();
        let config = EngineConfig {
            timeout_ms: Some(0),
            ..EngineConfig::default()
        };
        let ctx = EvalContext::new(&store, &ExprEvaluator, &annotations, &config);
        assert!(ctx.should_stop());
        assert_eq!(ctx.halted(), Some(ExecutionStatus::TimedOut));
    }
}
