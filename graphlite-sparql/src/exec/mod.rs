// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution engine
//!
//! This module provides the backtracking solver that evaluates a planned
//! algebra tree against a [`Producer`], the set-at-a-time reference
//! evaluator, and the executor tying planning and evaluation together.

pub mod checker;
pub mod context;
pub mod error;
pub mod eval;
mod eval_join;
mod eval_optional;
pub mod eval_sparql;
pub mod evaluator;
pub mod executor;
pub mod matcher;
pub mod memory;
pub mod modifiers;
pub mod path;
pub mod producer;
pub mod result;
pub mod stack;
pub mod visitor;

// Re-export the main types for convenience
pub use checker::{Checker, EdgeReport};
pub use context::{CancellationToken, EvalContext};
pub use error::ExecutionError;
pub use eval::{Backtrack, Eval};
pub use eval_sparql::EvalSparql;
pub use evaluator::{Evaluator, ExprEvaluator};
pub use executor::QueryExecutor;
pub use matcher::Matcher;
pub use memory::Memory;
pub use producer::Producer;
pub use result::{ExecutionStatus, QueryResult};
pub use visitor::{EvalVisitor, NoopVisitor, TraceEvent, TraceVisitor};

pub use crate::binding::Environment;
