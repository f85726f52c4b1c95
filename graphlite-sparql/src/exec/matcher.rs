// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Structural matching of candidate edges

use crate::ast::{EdgePattern, Node, Quad, Term};

/// Checks candidate edges against a pattern beyond what a producer lookup
/// guarantees: repeated variables and term kinds per position
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher;

impl Matcher {
    pub fn new() -> Self {
        Self
    }

    pub fn matches(&self, pattern: &EdgePattern, quad: &Quad) -> bool {
        well_formed(quad) && pattern.bind(quad).is_some()
    }

    /// False when a constant cannot occur at its position: a literal subject,
    /// a non-IRI predicate or graph name
    pub fn well_typed(&self, pattern: &EdgePattern) -> bool {
        let subject_ok = !matches!(&pattern.subject, Node::Const(term) if term.is_literal());
        let predicate_ok = match &pattern.predicate {
            Node::Const(term) => term.is_iri(),
            Node::Var(_) => true,
        };
        let graph_ok = match &pattern.graph {
            Some(Node::Const(term)) => term.is_iri(),
            _ => true,
        };
        subject_ok && predicate_ok && graph_ok
    }
}

fn well_formed(quad: &Quad) -> bool {
    !quad.subject.is_literal()
        && quad.predicate.is_iri()
        && quad.graph.as_ref().map_or(true, Term::is_iri)
}
