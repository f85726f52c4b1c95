// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Source of candidate edges

use crate::ast::{EdgePattern, Quad, Term};
use crate::binding::Environment;
use crate::exec::ExecutionError;

/// The graph layer seen by the solver
///
/// Implementations must accept partially bound patterns: a variable position
/// whose variable is bound in `env` is matched against that value.
pub trait Producer {
    /// Edges matching `pattern` under the current bindings
    ///
    /// `graph` is the named graph in scope, `None` for the default graph.
    /// `from` restricts the default graph to the listed graphs when not empty.
    fn edges(
        &self,
        graph: Option<&Term>,
        from: &[Term],
        pattern: &EdgePattern,
        env: &dyn Environment,
    ) -> Result<Vec<Quad>, ExecutionError>;

    /// Named graphs GRAPH clauses range over, restricted to `named` when not
    /// empty
    fn graph_names(&self, named: &[Term]) -> Result<Vec<Term>, ExecutionError>;

    /// Distinct subjects and objects of the graph in scope
    fn nodes(&self, graph: Option<&Term>, from: &[Term]) -> Result<Vec<Term>, ExecutionError>;

    /// Estimated number of edges matching the constant positions of `pattern`
    fn cardinality(&self, _pattern: &EdgePattern) -> Option<usize> {
        None
    }
}
