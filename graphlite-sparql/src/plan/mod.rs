// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query planning and optimization
//!
//! This module turns a compiled query into an immutable plan: filters are
//! moved up within their group, runs of clauses are reordered by estimated
//! cost, DISTINCT is pushed into the pattern, and the annotation side table
//! read by the solver is built.

pub mod annotate;
pub mod cost;
pub mod optimizer;
pub mod pattern_graph;
pub mod placement;
pub mod search;
pub mod sorter;

pub use annotate::PlanAnnotations;
pub use cost::{CostEstimator, HeuristicsEstimator};
pub use optimizer::{OptimizationLevel, Plan, PlanningError, QueryPlanner};
pub use pattern_graph::PatternGraph;
pub use search::{DepthFirstBestSearch, SearchStrategy};
pub use sorter::BgpSorter;
