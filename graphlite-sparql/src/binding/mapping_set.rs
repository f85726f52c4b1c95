// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Helpers deriving evaluation context from an intermediate solution set

use super::mapping::Mapping;
use super::mappings::Mappings;
use crate::ast::Variable;

/// Left-hand results of a JOIN or OPTIONAL
pub struct MappingSet<'a> {
    mappings: &'a Mappings,
}

impl<'a> MappingSet<'a> {
    pub fn new(mappings: &'a Mappings) -> Self {
        Self { mappings }
    }

    /// Seed rows for the right operand: the distinct projection of the left
    /// rows on the right operand's variables that every left row binds.
    ///
    /// `None` when no such variable exists.
    pub fn prepare_mappings_rest(&self, rest_nodes: &[Variable]) -> Option<Mappings> {
        let shared: Vec<Variable> = rest_nodes
            .iter()
            .filter(|var| self.mappings.bound_everywhere(var))
            .cloned()
            .collect();
        if self.mappings.is_empty() {
            return None;
        }
        self.mappings.distinct_projection(&shared)
    }
}

/// Right-hand rows of an OPTIONAL indexed on a variable they all bind
///
/// A left row binding that variable only needs to be tried against the
/// contiguous run holding the same value.
pub struct CandidateSet {
    sorted: Mappings,
    key: Option<Variable>,
}

impl CandidateSet {
    /// Picks the first of `left_vars` bound by every row of `right`
    pub fn new(right: &Mappings, left_vars: &[Variable]) -> Self {
        let key = if right.is_empty() {
            None
        } else {
            left_vars
                .iter()
                .find(|var| right.variables().contains(var) && right.bound_everywhere(var))
                .cloned()
        };
        let mut sorted = right.clone();
        if let Some(var) = &key {
            sorted.sort_by(var);
        }
        Self { sorted, key }
    }

    pub fn key(&self) -> Option<&Variable> {
        self.key.as_ref()
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Rows that may merge with `left`
    pub fn candidates(&self, left: &Mapping) -> &[Mapping] {
        let rows = self.sorted.rows();
        let Some(var) = &self.key else {
            return rows;
        };
        let Some(value) = left.get(var) else {
            return rows;
        };
        let start = self.sorted.find(value, var);
        let end = start
            + rows[start..]
                .iter()
                .take_while(|row| row.get(var) == Some(value))
                .count();
        &rows[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Term;

    fn row(pairs: &[(&str, &str)]) -> Mapping {
        Mapping::from_pairs(
            pairs
                .iter()
                .map(|(var, value)| (Variable::new(var), Term::iri(value))),
        )
    }

    #[test]
    fn should_project_on_variables_bound_everywhere() {
        let left = Mappings::from_rows(
            Vec::new(),
            vec![
                row(&[("x", "a"), ("y", "b")]),
                row(&[("x", "a"), ("y", "c")]),
                row(&[("x", "a")]),
            ],
        );
        let rest = vec![Variable::new("x"), Variable::new("y"), Variable::new("z")];
        let seeds = MappingSet::new(&left).prepare_mappings_rest(&rest).unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds.variables(), &[Variable::new("x")]);
        assert!(MappingSet::new(&left)
            .prepare_mappings_rest(&[Variable::new("z")])
            .is_none());
    }

    #[test]
    fn should_narrow_candidates_to_matching_run() {
        let right = Mappings::from_rows(
            Vec::new(),
            vec![
                row(&[("y", "b"), ("z", "1")]),
                row(&[("y", "a"), ("z", "2")]),
                row(&[("y", "b"), ("z", "3")]),
            ],
        );
        let set = CandidateSet::new(&right, &[Variable::new("x"), Variable::new("y")]);
        assert_eq!(set.key(), Some(&Variable::new("y")));
        assert_eq!(set.candidates(&row(&[("y", "b")])).len(), 2);
        assert_eq!(set.candidates(&row(&[("y", "c")])).len(), 0);
        assert_eq!(set.candidates(&row(&[("x", "a")])).len(), 3);
    }

    #[test]
    fn should_scan_everything_without_key() {
        let right = Mappings::from_rows(Vec::new(), vec![row(&[("z", "1")]), row(&[("y", "a")])]);
        let set = CandidateSet::new(&right, &[Variable::new("y")]);
        assert!(set.key().is_none());
        assert_eq!(set.candidates(&row(&[("y", "a")])).len(), 2);
    }
}
