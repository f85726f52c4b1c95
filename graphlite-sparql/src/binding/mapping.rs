// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! One solution of a graph pattern

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::Environment;
use crate::ast::{Query, Term, Variable};

/// Assignment of graph terms to query variables
///
/// Bound variables and their values are kept as two parallel sequences in
/// binding order, with a name index for lookups. A variable is unbound iff
/// it is absent. Equality and hashing ignore binding order and the modifier
/// keys.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    query_nodes: Vec<Variable>,
    target_nodes: Vec<Term>,
    index: HashMap<Arc<str>, usize>,
    order_by: Vec<Option<Term>>,
    group_by: Vec<Option<Term>>,
    distinct: Vec<Option<Term>>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from pairs; a repeated variable keeps its first value
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Variable, Term)>) -> Self {
        let mut mapping = Self::new();
        for (var, term) in pairs {
            mapping.bind(var, term);
        }
        mapping
    }

    /// Binds `var` unless it is already bound
    ///
    /// Returns false when `var` is bound to a different value.
    pub fn bind(&mut self, var: Variable, term: Term) -> bool {
        match self.index.get(var.name()) {
            Some(&i) => self.target_nodes[i] == term,
            None => {
                self.index.insert(var.shared_name(), self.query_nodes.len());
                self.query_nodes.push(var);
                self.target_nodes.push(term);
                true
            }
        }
    }

    pub fn get(&self, var: &Variable) -> Option<&Term> {
        self.get_by_name(var.name())
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Term> {
        self.index.get(name).map(|&i| &self.target_nodes[i])
    }

    pub fn is_bound(&self, var: &Variable) -> bool {
        self.index.contains_key(var.name())
    }

    pub fn variables(&self) -> &[Variable] {
        &self.query_nodes
    }

    pub fn values(&self) -> &[Term] {
        &self.target_nodes
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&Variable, &Term)> + Clone {
        self.query_nodes.iter().zip(self.target_nodes.iter())
    }

    pub fn len(&self) -> usize {
        self.query_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query_nodes.is_empty()
    }

    /// True when every variable bound on both sides has the same value
    pub fn is_mergeable(&self, other: &Mapping) -> bool {
        self.pairs().all(|(var, term)| match other.get(var) {
            Some(value) => value == term,
            None => true,
        })
    }

    /// Union of both bindings, `None` when a shared variable disagrees
    ///
    /// This mapping's variables come first.
    pub fn merge(&self, other: &Mapping) -> Option<Mapping> {
        if !self.is_mergeable(other) {
            return None;
        }
        let mut merged = Mapping {
            query_nodes: self.query_nodes.clone(),
            target_nodes: self.target_nodes.clone(),
            index: self.index.clone(),
            ..Mapping::default()
        };
        for (var, term) in other.pairs() {
            if !merged.is_bound(var) {
                merged.bind(var.clone(), term.clone());
            }
        }
        Some(merged)
    }

    /// Compatibility on `vars`
    ///
    /// Variables unbound on either side are skipped. Any disagreement makes
    /// the mappings incompatible; at least one agreement makes them
    /// compatible. When no variable is bound on both sides the result is
    /// `default_when_disjoint`.
    pub fn compatible_on(&self, other: &Mapping, vars: &[Variable], default_when_disjoint: bool) -> bool {
        let mut success = false;
        for var in vars {
            match (self.get(var), other.get(var)) {
                (Some(left), Some(right)) => {
                    if left != right {
                        return false;
                    }
                    success = true;
                }
                _ => continue,
            }
        }
        success || default_when_disjoint
    }

    /// MINUS compatibility: some shared variable agrees and none disagrees
    pub fn minus_compatible(&self, other: &Mapping) -> bool {
        self.compatible_on(other, &self.query_nodes, false)
    }

    /// OPTIONAL compatibility: no shared variable disagrees
    pub fn optional_compatible(&self, other: &Mapping, vars: &[Variable]) -> bool {
        self.compatible_on(other, vars, true)
    }

    /// First variable of this mapping also bound in `other`
    pub fn common_variable(&self, other: &Mapping) -> Option<&Variable> {
        self.query_nodes.iter().find(|var| other.is_bound(var))
    }

    /// Restriction to `vars`, in the order of `vars`
    pub fn project(&self, vars: &[Variable]) -> Mapping {
        let mut projected = Mapping::new();
        for var in vars {
            if let Some(term) = self.get(var) {
                projected.bind(var.clone(), term.clone());
            }
        }
        projected
    }

    /// Copy extended with one more binding, `None` on conflict
    pub fn with(&self, var: &Variable, term: &Term) -> Option<Mapping> {
        let mut extended = self.clone();
        if extended.bind(var.clone(), term.clone()) {
            Some(extended)
        } else {
            None
        }
    }

    /// Fills the ORDER BY, GROUP BY and DISTINCT keys from `query`
    pub fn prepare_modifiers(&mut self, query: &Query) {
        self.order_by = query
            .order_by
            .iter()
            .map(|condition| self.get(&condition.variable).cloned())
            .collect();
        self.group_by = query.group_by.iter().map(|var| self.get(var).cloned()).collect();
        self.distinct = query.projection().iter().map(|var| self.get(var).cloned()).collect();
    }

    pub fn order_key(&self) -> &[Option<Term>] {
        &self.order_by
    }

    pub fn group_key(&self) -> &[Option<Term>] {
        &self.group_by
    }

    pub fn distinct_key(&self) -> &[Option<Term>] {
        &self.distinct
    }

    /// Compares ORDER BY keys, unbound first, honoring descending flags
    pub fn compare_order(&self, other: &Mapping, descending: &[bool]) -> Ordering {
        for (i, (left, right)) in self.order_by.iter().zip(other.order_by.iter()).enumerate() {
            let ordering = left.cmp(right);
            let ordering = if descending.get(i).copied().unwrap_or(false) {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Bindings sorted by variable name
    pub fn sorted_pairs(&self) -> Vec<(&str, &Term)> {
        let mut pairs: Vec<_> = self.pairs().map(|(var, term)| (var.name(), term)).collect();
        pairs.sort();
        pairs
    }
}

impl Environment for Mapping {
    fn get(&self, var: &Variable) -> Option<&Term> {
        Mapping::get(self, var)
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.pairs().all(|(var, term)| other.get(var) == Some(term))
    }
}

impl Eq for Mapping {}

impl Hash for Mapping {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted_pairs().hash(state);
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (var, term)) in self.pairs().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} = {}", var, term)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Exp, Node};

    fn mapping(pairs: &[(&str, &str)]) -> Mapping {
        Mapping::from_pairs(
            pairs
                .iter()
                .map(|(var, value)| (Variable::new(var), Term::iri(value))),
        )
    }

    fn vars(names: &[&str]) -> Vec<Variable> {
        names.iter().map(|name| Variable::new(name)).collect()
    }

    #[test]
    fn should_merge_agreeing_mappings() {
        let left = mapping(&[("x", "a"), ("y", "b")]);
        let right = mapping(&[("y", "b"), ("z", "c")]);
        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.len(), 3);
        let order: Vec<_> = merged.variables().iter().map(Variable::name).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    #[test]
    fn should_refuse_merge_on_conflict() {
        let left = mapping(&[("x", "a")]);
        let right = mapping(&[("x", "b")]);
        assert!(left.merge(&right).is_none());
    }

    #[test]
    fn should_merge_with_empty_mapping() {
        let left = mapping(&[("x", "a")]);
        assert_eq!(left.merge(&Mapping::new()), Some(left.clone()));
        assert_eq!(Mapping::new().merge(&left), Some(left));
    }

    #[test]
    fn should_skip_unbound_variables_when_checking_compatibility() {
        let left = mapping(&[("x", "a"), ("y", "b")]);
        let right = mapping(&[("x", "a")]);
        assert!(left.compatible_on(&right, &vars(&["x", "y"]), false));
        let disjoint = mapping(&[("z", "c")]);
        assert!(!left.minus_compatible(&disjoint));
        assert!(left.optional_compatible(&disjoint, &vars(&["x", "y", "z"])));
        let conflicting = mapping(&[("x", "a"), ("y", "c")]);
        assert!(!left.compatible_on(&conflicting, &vars(&["x", "y"]), true));
    }

    #[test]
    fn should_find_common_variable_in_binding_order() {
        let left = mapping(&[("x", "a"), ("y", "b")]);
        let right = mapping(&[("y", "c"), ("x", "d")]);
        assert_eq!(left.common_variable(&right).map(Variable::name), Some("x"));
        assert!(left.common_variable(&mapping(&[("z", "a")])).is_none());
    }

    #[test]
    fn should_compare_as_sets() {
        let left = mapping(&[("x", "a"), ("y", "b")]);
        let right = mapping(&[("y", "b"), ("x", "a")]);
        assert_eq!(left, right);
        let mut set = std::collections::HashSet::new();
        set.insert(left);
        assert!(set.contains(&right));
    }

    #[test]
    fn should_project_and_prepare_modifiers() {
        let row = mapping(&[("x", "a"), ("y", "b")]);
        assert_eq!(row.project(&vars(&["y", "w"])), mapping(&[("y", "b")]));

        let body = Exp::bgp(vec![Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y"))]);
        let query = Query::new(body).select(&["x"]).order_by("y", true).group_by(&["w"]);
        let mut row = row;
        row.prepare_modifiers(&query);
        assert_eq!(row.order_key(), &[Some(Term::iri("b"))]);
        assert_eq!(row.group_key(), &[None]);
        assert_eq!(row.distinct_key(), &[Some(Term::iri("a"))]);
    }
}
