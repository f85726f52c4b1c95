// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Solution model
//!
//! [`Mapping`] is one solution, [`Mappings`] an ordered solution set with the
//! join, union and minus algebra used by the evaluators.

pub mod mapping;
pub mod mapping_set;
pub mod mappings;

pub use mapping::Mapping;
pub use mapping_set::{CandidateSet, MappingSet};
pub use mappings::Mappings;

use crate::ast::{Node, Term, Variable};

/// Read access to the current variable bindings
pub trait Environment {
    fn get(&self, var: &Variable) -> Option<&Term>;

    /// Value of a pattern position: the constant, or the variable's binding
    fn resolve<'a>(&'a self, node: &'a Node) -> Option<&'a Term> {
        match node {
            Node::Const(term) => Some(term),
            Node::Var(var) => self.get(var),
        }
    }

    fn is_bound(&self, var: &Variable) -> bool {
        self.get(var).is_some()
    }
}

/// Environment with no bindings
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyEnvironment;

impl Environment for EmptyEnvironment {
    fn get(&self, _var: &Variable) -> Option<&Term> {
        None
    }
}
