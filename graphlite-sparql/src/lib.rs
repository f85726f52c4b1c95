// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphLite SPARQL - graph pattern execution core for RDF triple stores
//!
//! This crate evaluates a compiled SPARQL algebra tree against a graph made
//! available through the [`Producer`] trait. It contains the query model,
//! the solution algebra, a cost-based planner and a backtracking solver.
//!
//! # Quick Start
//!
//! ```no_run
//! use graphlite_sparql::{Exp, MemoryStore, Node, Quad, Query, QueryExecutor, Term};
//!
//! let store = MemoryStore::new();
//! store.insert(Quad::new(Term::iri("alice"), Term::iri("knows"), Term::iri("bob")));
//!
//! let query = Query::new(Exp::bgp(vec![Exp::triple(
//!     Node::var("x"),
//!     Node::iri("knows"),
//!     Node::var("y"),
//! )]));
//! let result = QueryExecutor::new(&store).execute(query).unwrap();
//! for row in result.mappings.iter() {
//!     println!("{:?}", row.get_by_name("y"));
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//!   Query ──▶ QueryPlanner ──▶ Plan ──▶ Eval (backtracking) ──▶ modifiers
//!                │                         │
//!                ▼                         ▼
//!        filter placement            Producer / Evaluator
//!        clause ordering             EvalVisitor
//! ```

pub mod ast;
pub mod binding;
pub mod config;
pub mod exec;
pub mod plan;
pub mod storage;

pub use ast::{EdgePattern, Exp, ExpId, ExpType, Expr, Node, PathPattern, PropertyPath, Quad, Query, Term, Variable};
pub use binding::{Environment, Mapping, Mappings};
pub use config::{ConfigError, EngineConfig};
pub use exec::{
    CancellationToken, Checker, EvalVisitor, Evaluator, ExecutionError, ExecutionStatus,
    ExprEvaluator, Producer, QueryExecutor, QueryResult,
};
pub use plan::{OptimizationLevel, Plan, PlanningError, QueryPlanner};
pub use storage::MemoryStore;
