// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Evaluation observers

use parking_lot::Mutex;

use crate::ast::{Exp, ExpId, Term};
use crate::binding::Mappings;

/// Notified at each operator boundary with the operand results
///
/// Observers only see the data; they cannot steer evaluation.
pub trait EvalVisitor {
    fn join(&self, _exp: &Exp, _left: &Mappings, _right: &Mappings) {}

    fn optional(&self, _exp: &Exp, _left: &Mappings, _right: &Mappings) {}

    fn minus(&self, _exp: &Exp, _left: &Mappings, _right: &Mappings) {}

    fn graph(&self, _exp: &Exp, _name: &Term, _results: &Mappings) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVisitor;

impl EvalVisitor for NoopVisitor {}

/// One recorded operator event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Join { exp: ExpId, left: usize, right: usize },
    Optional { exp: ExpId, left: usize, right: usize },
    Minus { exp: ExpId, left: usize, right: usize },
    Graph { exp: ExpId, name: Term, results: usize },
}

/// Visitor recording operand sizes, for tests and plan diagnostics
#[derive(Debug, Default)]
pub struct TraceVisitor {
    events: Mutex<Vec<TraceEvent>>,
}

impl TraceVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn record(&self, event: TraceEvent) {
        log::debug!("trace: {:?}", event);
        self.events.lock().push(event);
    }
}

impl EvalVisitor for TraceVisitor {
    fn join(&self, exp: &Exp, left: &Mappings, right: &Mappings) {
        self.record(TraceEvent::Join {
            exp: exp.id(),
            left: left.len(),
            right: right.len(),
        });
    }

    fn optional(&self, exp: &Exp, left: &Mappings, right: &Mappings) {
        self.record(TraceEvent::Optional {
            exp: exp.id(),
            left: left.len(),
            right: right.len(),
        });
    }

    fn minus(&self, exp: &Exp, left: &Mappings, right: &Mappings) {
        self.record(TraceEvent::Minus {
            exp: exp.id(),
            left: left.len(),
            right: right.len(),
        });
    }

    fn graph(&self, exp: &Exp, name: &Term, results: &Mappings) {
        self.record(TraceEvent::Graph {
            exp: exp.id(),
            name: name.clone(),
            results: results.len(),
        });
    }
}
