// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Continuation stack of the solver
//!
//! Position `n` of the stack is the clause evaluated at level `n`; the
//! clauses after it are the continuation. Groups are flattened into the
//! stack as they are reached.

use crate::ast::Exp;

#[derive(Debug, Clone)]
pub struct Stack<'p> {
    exps: Vec<&'p Exp>,
    /// Lowest level a backjump may target
    barrier: usize,
}

impl<'p> Stack<'p> {
    pub fn new(exp: &'p Exp) -> Self {
        Self {
            exps: vec![exp],
            barrier: 0,
        }
    }

    pub fn get(&self, n: usize) -> Option<&'p Exp> {
        self.exps.get(n).copied()
    }

    pub fn len(&self) -> usize {
        self.exps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exps.is_empty()
    }

    pub fn barrier(&self) -> usize {
        self.barrier
    }

    /// Copy with the clause at `n` replaced by `children`
    pub fn expand(&self, n: usize, children: &'p [Exp]) -> Stack<'p> {
        let mut exps = Vec::with_capacity(self.exps.len() + children.len());
        exps.extend_from_slice(&self.exps[..n]);
        exps.extend(children.iter());
        exps.extend_from_slice(&self.exps[n + 1..]);
        Stack {
            exps,
            barrier: self.barrier,
        }
    }

    /// Copy with the clause at `n` replaced by one UNION branch
    ///
    /// Backjumps raised inside the branch stop at `n`, so the other branch is
    /// always tried.
    pub fn branch(&self, n: usize, branch: &'p Exp) -> Stack<'p> {
        let mut stack = self.expand(n, branch.body());
        stack.barrier = stack.barrier.max(n);
        stack
    }
}
