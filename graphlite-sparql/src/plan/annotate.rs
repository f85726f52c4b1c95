// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Compile-time annotations of a planned tree
//!
//! The solver never mutates the algebra tree. What it needs to know about an
//! OPTIONAL node (which filters to postpone, which variables seed the right
//! operand) is computed once here and looked up by [`ExpId`].

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::ast::{Exp, ExpId, ExpKind, OptionalScope, Variable};

/// Side table keyed by node identity
#[derive(Debug, Clone, Default)]
pub struct PlanAnnotations {
    optional_scopes: HashMap<ExpId, OptionalScope>,
    postponed: HashSet<ExpId>,
    rest_nodes: HashMap<ExpId, Vec<Variable>>,
}

impl PlanAnnotations {
    /// Annotates every OPTIONAL node under `root`, sub-query bodies included
    pub fn build(root: &Exp) -> Self {
        let mut annotations = Self::default();
        root.walk(&mut |exp| {
            let ExpKind::Optional(_, rest) = exp.kind() else {
                return;
            };
            let scope = exp.optional_scope().unwrap_or_default();
            for (id, _) in &scope.postponed {
                annotations.postponed.insert(*id);
            }
            annotations
                .rest_nodes
                .insert(exp.id(), rest.in_subscope_nodes(false));
            annotations.optional_scopes.insert(exp.id(), scope);
        });
        log::debug!(
            "annotated {} OPTIONAL nodes, {} postponed filters",
            annotations.optional_scopes.len(),
            annotations.postponed.len()
        );
        annotations
    }

    /// True when the filter node is tested by its enclosing OPTIONAL after the
    /// merge instead of in place
    pub fn is_postponed(&self, filter: ExpId) -> bool {
        self.postponed.contains(&filter)
    }

    /// Filter classification of an OPTIONAL node
    ///
    /// Computed on the fly for a node the table does not know.
    pub fn optional_scope(&self, exp: &Exp) -> Cow<'_, OptionalScope> {
        match self.optional_scopes.get(&exp.id()) {
            Some(scope) => Cow::Borrowed(scope),
            None => Cow::Owned(exp.optional_scope().unwrap_or_default()),
        }
    }

    /// Variables of the right operand of an OPTIONAL node visible to its left
    /// rows
    pub fn rest_nodes(&self, exp: &Exp) -> Cow<'_, [Variable]> {
        match self.rest_nodes.get(&exp.id()) {
            Some(vars) => Cow::Borrowed(vars.as_slice()),
            None => Cow::Owned(
                exp.rest()
                    .map(|rest| rest.in_subscope_nodes(false))
                    .unwrap_or_default(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.optional_scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.optional_scopes.is_empty()
    }
}
