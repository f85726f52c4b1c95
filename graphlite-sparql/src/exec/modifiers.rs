// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Solution modifiers: GROUP BY, ORDER BY, projection, DISTINCT, OFFSET/LIMIT

use crate::ast::Query;
use crate::binding::Mappings;

/// Number of raw solutions after which the solver may stop, when the
/// modifiers cannot reorder or merge them
pub fn early_limit(query: &Query) -> Option<usize> {
    if query.has_early_limit() && !query.distinct {
        query.limit.map(|limit| limit.saturating_add(query.offset))
    } else {
        None
    }
}

/// Applies the modifiers of `query` to raw solutions, in SPARQL order
pub fn apply(query: &Query, rows: Mappings) -> Mappings {
    let mut prepared = Mappings::new(rows.variables().to_vec());
    for mut row in rows.into_rows() {
        row.prepare_modifiers(query);
        prepared.push(row);
    }

    if !query.group_by.is_empty() {
        let groups = prepared.groups();
        prepared = Mappings::new(query.group_by.clone());
        for group in groups {
            if let Some(first) = group.get(0) {
                let mut row = first.project(&query.group_by);
                row.prepare_modifiers(query);
                prepared.push(row);
            }
        }
    }

    if !query.order_by.is_empty() {
        prepared.order_by(&query.order_by);
    }

    let mut result = prepared.project(&query.projection());
    if query.distinct {
        result = result.distinct();
    }
    result.slice(query.offset, query.limit);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Exp, Node, Term, Variable};
    use crate::binding::Mapping;

    fn rows() -> Mappings {
        let row = |x: i64, y: &str| {
            Mapping::from_pairs(vec![
                (Variable::new("x"), Term::integer(x)),
                (Variable::new("y"), Term::iri(y)),
            ])
        };
        Mappings::from_rows(Vec::new(), vec![row(3, "a"), row(1, "b"), row(2, "a"), row(1, "b")])
    }

    fn query() -> Query {
        Query::new(Exp::bgp(vec![Exp::triple(
            Node::var("x"),
            Node::iri("p"),
            Node::var("y"),
        )]))
    }

    #[test]
    fn should_order_then_slice() {
        let query = query().order_by("x", true).offset(1).limit(2);
        let result = apply(&query, rows());
        let xs: Vec<_> = result
            .iter()
            .map(|row| row.get_by_name("x").cloned())
            .collect();
        assert_eq!(xs, vec![Some(Term::integer(2)), Some(Term::integer(1))]);
    }

    #[test]
    fn should_project_before_distinct() {
        let query = query().select(&["y"]).distinct();
        assert_eq!(apply(&query, rows()).len(), 2);
    }

    #[test]
    fn should_collapse_groups() {
        let query = query().group_by(&["y"]).select(&["y"]);
        let result = apply(&query, rows());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn should_only_stop_early_without_reordering() {
        assert_eq!(early_limit(&query().limit(3).offset(2)), Some(5));
        assert_eq!(early_limit(&query().limit(3).order_by("x", false)), None);
        assert_eq!(early_limit(&query().limit(3).distinct()), None);
    }
}
