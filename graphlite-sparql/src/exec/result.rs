// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query results

use serde::{Deserialize, Serialize};

use crate::binding::Mappings;

/// How an evaluation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// The whole search space was explored
    Complete,
    /// LIMIT was satisfied before the search space was exhausted
    LimitReached,
    Cancelled,
    TimedOut,
}

impl ExecutionStatus {
    /// True when the solutions are all the query has
    pub fn is_complete(&self) -> bool {
        matches!(self, ExecutionStatus::Complete | ExecutionStatus::LimitReached)
    }
}

/// Solutions of a query with diagnostics
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub mappings: Mappings,
    pub status: ExecutionStatus,
    /// Diagnostics written while planning, checking and evaluating
    pub info: Vec<(String, String)>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
