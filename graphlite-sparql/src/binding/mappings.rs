// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Ordered solution sets and their set algebra
//!
//! `join` is a sort-merge join on the first shared variable. Rows where that
//! variable is unbound match every row of the other side, so the merge has to
//! visit them explicitly: a left row with an unbound value is merged with the
//! whole right side, and a left row with value `v` is merged with the right
//! rows that leave the variable unbound plus the contiguous run equal to `v`.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::mapping::Mapping;
use crate::ast::{OrderCondition, Term, Variable};

/// Ordered collection of [`Mapping`]s
///
/// The variable list records every variable bound by some row, in first
/// appearance order, and gives the query-node context of the set.
#[derive(Debug, Clone, Default)]
pub struct Mappings {
    rows: Vec<Mapping>,
    variables: Vec<Variable>,
    sorted_by: Option<Variable>,
}

impl Mappings {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self {
            rows: Vec::new(),
            variables,
            sorted_by: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(variables: Vec<Variable>, rows: Vec<Mapping>) -> Self {
        let mut mappings = Self::new(variables);
        for row in rows {
            mappings.push(row);
        }
        mappings
    }

    /// A set holding one empty solution, the unit of join
    pub fn unit() -> Self {
        Self::from_rows(Vec::new(), vec![Mapping::new()])
    }

    pub fn push(&mut self, row: Mapping) {
        for var in row.variables() {
            if !self.variables.contains(var) {
                self.variables.push(var.clone());
            }
        }
        self.sorted_by = None;
        self.rows.push(row);
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = Mapping>) {
        for row in rows {
            self.push(row);
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn rows(&self) -> &[Mapping] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Mapping> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mapping> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Mapping> {
        self.rows
    }

    pub fn retain(&mut self, keep: impl FnMut(&Mapping) -> bool) {
        self.rows.retain(keep);
    }

    /// True when every row binds `var`
    pub fn bound_everywhere(&self, var: &Variable) -> bool {
        self.rows.iter().all(|row| row.is_bound(var))
    }

    /// First variable of this set also present in `other`'s variables
    pub fn common_variable(&self, other: &Mappings) -> Option<&Variable> {
        self.variables.iter().find(|var| other.variables.contains(var))
    }

    /// Stable sort by the value of `var`, unbound rows first
    pub fn sort_by(&mut self, var: &Variable) {
        self.rows.sort_by(|a, b| a.get(var).cmp(&b.get(var)));
        self.sorted_by = Some(var.clone());
    }

    pub fn sorted_by(&self) -> Option<&Variable> {
        self.sorted_by.as_ref()
    }

    /// Index of the first row whose value of `var` is not lower than `value`
    ///
    /// The set must be sorted by `var`; the result is `len()` when every row
    /// is lower.
    pub fn find(&self, value: &Term, var: &Variable) -> usize {
        self.rows.partition_point(|row| row.get(var) < Some(value))
    }

    /// Number of leading rows leaving `var` unbound in a set sorted by `var`
    pub fn unbound_prefix(&self, var: &Variable) -> usize {
        self.rows.partition_point(|row| row.get(var).is_none())
    }

    /// Rows that can merge with a row whose `var` value is `value`, in a set
    /// sorted by `var`: the unbound prefix, then the run equal to `value`
    pub fn candidates<'a>(
        &'a self,
        value: Option<&'a Term>,
        var: &'a Variable,
    ) -> impl Iterator<Item = &'a Mapping> + 'a {
        let (prefix, run): (&[Mapping], &[Mapping]) = match value {
            None => (&self.rows[..], &[]),
            Some(value) => {
                let unbound = self.unbound_prefix(var);
                let start = self.find(value, var).max(unbound);
                let end = start
                    + self.rows[start..]
                        .iter()
                        .take_while(|row| row.get(var) == Some(value))
                        .count();
                (&self.rows[..unbound], &self.rows[start..end])
            }
        };
        prefix.iter().chain(run.iter())
    }

    fn merged_variables(&self, other: &Mappings) -> Vec<Variable> {
        let mut variables = self.variables.clone();
        for var in &other.variables {
            if !variables.contains(var) {
                variables.push(var.clone());
            }
        }
        variables
    }

    /// Join on the common variable, cartesian product when there is none
    ///
    /// Left order is preserved for matched pairs.
    pub fn join(&self, other: &Mappings) -> Mappings {
        let mut result = Mappings::new(self.merged_variables(other));
        if self.is_empty() || other.is_empty() {
            return result;
        }
        match self.common_variable(other).cloned() {
            None => {
                for left in &self.rows {
                    for right in &other.rows {
                        if let Some(merged) = left.merge(right) {
                            result.push(merged);
                        }
                    }
                }
            }
            Some(var) => {
                let mut sorted = other.clone();
                sorted.sort_by(&var);
                for left in &self.rows {
                    for right in sorted.candidates(left.get(&var), &var) {
                        if let Some(merged) = left.merge(right) {
                            result.push(merged);
                        }
                    }
                }
            }
        }
        result
    }

    /// Concatenation
    pub fn union(&self, other: &Mappings) -> Mappings {
        let mut result = Mappings::new(self.merged_variables(other));
        result.extend(self.rows.iter().cloned());
        result.extend(other.rows.iter().cloned());
        result
    }

    /// Rows of this set with no MINUS-compatible row in `other`
    pub fn minus(&self, other: &Mappings) -> Mappings {
        let mut result = Mappings::new(self.variables.clone());
        for row in &self.rows {
            if !other.rows.iter().any(|right| row.minus_compatible(right)) {
                result.push(row.clone());
            }
        }
        result
    }

    /// Left join without filters
    pub fn optional(&self, other: &Mappings) -> Mappings {
        let mut result = Mappings::new(self.merged_variables(other));
        for left in &self.rows {
            let before = result.len();
            for right in &other.rows {
                if let Some(merged) = left.merge(right) {
                    result.push(merged);
                }
            }
            if result.len() == before {
                result.push(left.clone());
            }
        }
        result
    }

    pub fn project(&self, vars: &[Variable]) -> Mappings {
        let mut result = Mappings::new(vars.to_vec());
        for row in &self.rows {
            result.rows.push(row.project(vars));
        }
        result
    }

    /// Removes duplicate rows, keeping first occurrences
    pub fn distinct(&self) -> Mappings {
        let mut seen = HashSet::new();
        let mut result = Mappings::new(self.variables.clone());
        for row in &self.rows {
            if seen.insert(row.clone()) {
                result.rows.push(row.clone());
            }
        }
        result
    }

    /// Distinct projection on `vars`, `None` when `vars` is empty
    pub fn distinct_projection(&self, vars: &[Variable]) -> Option<Mappings> {
        if vars.is_empty() {
            return None;
        }
        Some(self.project(vars).distinct())
    }

    /// Stable sort on ORDER BY keys prepared by
    /// [`Mapping::prepare_modifiers`]
    pub fn order_by(&mut self, conditions: &[OrderCondition]) {
        let descending: Vec<bool> = conditions.iter().map(|c| c.descending).collect();
        self.rows.sort_by(|a, b| a.compare_order(b, &descending));
        self.sorted_by = None;
    }

    /// Rows grouped by their prepared GROUP BY key, keys in ascending order
    pub fn groups(&self) -> Vec<Mappings> {
        let mut groups: BTreeMap<Vec<Option<Term>>, Mappings> = BTreeMap::new();
        for row in &self.rows {
            groups
                .entry(row.group_key().to_vec())
                .or_insert_with(|| Mappings::new(self.variables.clone()))
                .rows
                .push(row.clone());
        }
        groups.into_values().collect()
    }

    /// OFFSET / LIMIT window
    pub fn slice(&mut self, offset: usize, limit: Option<usize>) {
        let start = offset.min(self.rows.len());
        self.rows.drain(..start);
        if let Some(limit) = limit {
            self.rows.truncate(limit);
        }
    }
}

impl<'a> IntoIterator for &'a Mappings {
    type Item = &'a Mapping;
    type IntoIter = std::slice::Iter<'a, Mapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for Mappings {
    type Item = Mapping;
    type IntoIter = std::vec::IntoIter<Mapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl fmt::Display for Mappings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
