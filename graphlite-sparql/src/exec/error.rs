// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use thiserror::Error;

use crate::plan::PlanningError;

/// Errors raised while evaluating a query
///
/// No-match and incompatible merges are not errors; they show up as empty
/// solution sets.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Producer error: {0}")]
    Producer(String),

    #[error("Expression evaluation error: {0}")]
    Expression(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),
}
