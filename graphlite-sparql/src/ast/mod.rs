// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Compiled query representation
//!
//! Terms, patterns, filter expressions and the algebra tree produced by the
//! query compiler and consumed by the planner and the solver.

pub mod edge;
pub mod exp;
pub mod expr;
pub mod query;
pub mod scope;
pub mod term;

pub use edge::{EdgePattern, PathPattern, PropertyPath, Quad};
pub use exp::{Exp, ExpFlags, ExpId, ExpKind, ExpType};
pub use expr::{CompareOp, Expr, Filter};
pub use query::{OrderCondition, Query};
pub use scope::{OptionalScope, ScopeHandler};
pub use term::{Literal, Node, Term, Variable};
