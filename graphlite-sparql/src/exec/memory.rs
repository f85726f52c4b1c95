// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Binding environment of the backtracking solver
//!
//! Each bound variable records the stack level that first bound it and how
//! many pushes currently hold it. Pushes and pops are strictly nested, so a
//! variable is released when its count drops to zero.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{Term, Variable};
use crate::binding::{Environment, Mapping};

#[derive(Debug, Clone)]
struct Slot {
    variable: Variable,
    value: Term,
    level: usize,
    count: usize,
}

#[derive(Debug, Default)]
pub struct Memory {
    slots: HashMap<Arc<str>, Slot>,
    /// Bound variable names in binding order
    order: Vec<Arc<str>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends the current bindings with `mapping` at `level`
    ///
    /// Returns false, leaving the memory untouched, when a variable is
    /// already bound to a different value.
    pub fn push(&mut self, mapping: &Mapping, level: usize) -> bool {
        self.push_all(mapping.pairs(), level)
    }

    /// Undoes a successful [`push`](Self::push) of the same mapping
    pub fn pop(&mut self, mapping: &Mapping) {
        self.release(mapping.variables().iter().rev());
    }

    pub fn push_pairs(&mut self, pairs: &[(Variable, Term)], level: usize) -> bool {
        self.push_all(pairs.iter().map(|(var, term)| (var, term)), level)
    }

    pub fn pop_pairs(&mut self, pairs: &[(Variable, Term)]) {
        self.release(pairs.iter().rev().map(|(var, _)| var));
    }

    fn push_all<'a>(
        &mut self,
        pairs: impl Iterator<Item = (&'a Variable, &'a Term)> + Clone,
        level: usize,
    ) -> bool {
        let compatible = pairs.clone().all(|(var, term)| match self.slots.get(var.name()) {
            Some(slot) => &slot.value == term,
            None => true,
        });
        if !compatible {
            return false;
        }
        for (var, term) in pairs {
            match self.slots.get_mut(var.name()) {
                Some(slot) => slot.count += 1,
                None => {
                    let name = var.shared_name();
                    self.order.push(Arc::clone(&name));
                    self.slots.insert(
                        name,
                        Slot {
                            variable: var.clone(),
                            value: term.clone(),
                            level,
                            count: 1,
                        },
                    );
                }
            }
        }
        true
    }

    fn release<'a>(&mut self, vars: impl Iterator<Item = &'a Variable>) {
        for var in vars {
            let Some(slot) = self.slots.get_mut(var.name()) else {
                continue;
            };
            slot.count -= 1;
            if slot.count == 0 {
                self.slots.remove(var.name());
                match self.order.last() {
                    Some(last) if last.as_ref() == var.name() => {
                        self.order.pop();
                    }
                    _ => self.order.retain(|name| name.as_ref() != var.name()),
                }
            }
        }
    }

    /// Level of the push that bound `var`
    pub fn level_of(&self, var: &Variable) -> Option<usize> {
        self.slots.get(var.name()).map(|slot| slot.level)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current solution, every bound variable in binding order
    pub fn to_mapping(&self) -> Mapping {
        Mapping::from_pairs(self.order.iter().filter_map(|name| {
            self.slots
                .get(name)
                .map(|slot| (slot.variable.clone(), slot.value.clone()))
        }))
    }

    /// Current solution restricted to `select`
    pub fn project(&self, select: &[Variable]) -> Mapping {
        Mapping::from_pairs(
            select
                .iter()
                .filter_map(|var| self.get(var).map(|term| (var.clone(), term.clone()))),
        )
    }
}

impl Environment for Memory {
    fn get(&self, var: &Variable) -> Option<&Term> {
        self.slots.get(var.name()).map(|slot| &slot.value)
    }
}
