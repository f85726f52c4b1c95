// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property tests for the solution algebra and the evaluators
//!
//! Random small graphs are queried with a fixed set of pattern shapes; the
//! backtracking solver with every optimization on, the same solver with
//! none, and the set-at-a-time evaluator must agree on the solution bag.

mod common;

use common::{canonical, init_logging};
use graphlite_sparql::{
    EngineConfig, Exp, Expr, Mapping, Mappings, MemoryStore, Node, OptimizationLevel, Quad, Query,
    QueryExecutor, Term, Variable,
};
use proptest::prelude::*;

const NODES: u8 = 5;
const PREDICATES: u8 = 2;

fn node(i: u8) -> Term {
    Term::iri(&format!("n{}", i))
}

fn pred(i: u8) -> Node {
    Node::iri(&format!("p{}", i))
}

fn var(name: &str) -> Node {
    Node::var(name)
}

fn quads_strategy() -> impl Strategy<Value = Vec<(u8, u8, u8, Option<u8>)>> {
    prop::collection::vec(
        (0..NODES, 0..PREDICATES, 0..NODES, prop::option::of(0u8..2)),
        0..24,
    )
}

fn build_store(quads: &[(u8, u8, u8, Option<u8>)]) -> MemoryStore {
    MemoryStore::from_quads(quads.iter().map(|&(s, p, o, g)| {
        let quad = Quad::new(node(s), Term::iri(&format!("p{}", p)), node(o));
        match g {
            Some(g) => quad.in_graph(Term::iri(&format!("g{}", g))),
            None => quad,
        }
    }))
}

fn shape(index: usize) -> Exp {
    let edge = |s: &str, p: u8, o: &str| Exp::triple(var(s), pred(p), var(o));
    match index {
        0 => Exp::bgp(vec![edge("x", 0, "y"), edge("y", 1, "z")]),
        1 => Exp::bgp(vec![edge("x", 0, "y"), edge("y", 0, "x")]),
        2 => Exp::optional(
            Exp::bgp(vec![edge("x", 0, "y")]),
            Exp::bgp(vec![edge("y", 1, "z")]),
        ),
        3 => Exp::minus(
            Exp::bgp(vec![edge("x", 0, "y")]),
            Exp::bgp(vec![edge("y", 1, "z")]),
        ),
        4 => Exp::bgp(vec![
            Exp::union(
                Exp::bgp(vec![edge("x", 0, "y")]),
                Exp::bgp(vec![edge("x", 1, "y")]),
            ),
            edge("y", 0, "z"),
        ]),
        5 => Exp::bgp(vec![
            edge("x", 0, "y"),
            edge("z", 1, "w"),
            Exp::filter(Expr::ne(Expr::var("y"), Expr::var("z"))),
        ]),
        6 => Exp::bgp(vec![Exp::graph(var("g"), Exp::bgp(vec![edge("x", 0, "y")]))]),
        7 => Exp::optional(
            Exp::bgp(vec![edge("x", 0, "y")]),
            Exp::bgp(vec![
                edge("y", 1, "z"),
                Exp::filter(Expr::ne(Expr::var("z"), Expr::var("x"))),
            ]),
        ),
        8 => Exp::join(
            Exp::bgp(vec![edge("x", 0, "y")]),
            Exp::bgp(vec![edge("y", 1, "z")]),
        ),
        9 => Exp::bgp(vec![
            edge("x", 0, "y"),
            edge("a", 1, "b"),
            edge("x", 1, "c"),
        ]),
        // left rows come twice, right operand accepts seed rows
        10 => Exp::join(
            twice(edge("x", 0, "y")),
            Exp::bgp(vec![Exp::join(
                Exp::bgp(vec![edge("y", 1, "z")]),
                Exp::bgp(vec![edge("z", 0, "w")]),
            )]),
        ),
        _ => Exp::join(
            twice(edge("x", 0, "y")),
            Exp::bgp(vec![
                Exp::service(
                    Node::iri("http://example.org/sparql"),
                    Exp::bgp(vec![edge("s", 0, "o")]),
                )
                .silent(),
                edge("y", 1, "z"),
            ]),
        ),
    }
}

fn twice(pattern: Exp) -> Exp {
    Exp::bgp(vec![Exp::union(
        Exp::bgp(vec![pattern.clone()]),
        Exp::bgp(vec![pattern]),
    )])
}

fn row(vars: &[&str], values: &[Option<u8>]) -> Mapping {
    Mapping::from_pairs(
        vars.iter()
            .zip(values)
            .filter_map(|(name, value)| value.map(|v| (Variable::new(name), node(v)))),
    )
}

fn mappings(vars: &[&str], rows: &[Vec<Option<u8>>]) -> Mappings {
    let variables = vars.iter().map(|name| Variable::new(name)).collect();
    Mappings::from_rows(variables, rows.iter().map(|values| row(vars, values)).collect())
}

fn rows_strategy() -> impl Strategy<Value = Vec<Vec<Option<u8>>>> {
    prop::collection::vec(
        prop::collection::vec(prop::option::weighted(0.8, 0..3u8), 2),
        0..8,
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn join_is_commutative(left in rows_strategy(), right in rows_strategy()) {
        let a = mappings(&["x", "y"], &left);
        let b = mappings(&["y", "z"], &right);
        prop_assert_eq!(canonical(&a.join(&b)), canonical(&b.join(&a)));
    }

    #[test]
    fn unit_is_neutral_for_join(left in rows_strategy()) {
        let a = mappings(&["x", "y"], &left);
        prop_assert_eq!(canonical(&a.join(&Mappings::unit())), canonical(&a));
        prop_assert_eq!(canonical(&Mappings::unit().join(&a)), canonical(&a));
    }

    #[test]
    fn join_matches_nested_loop(left in rows_strategy(), right in rows_strategy()) {
        let a = mappings(&["x", "y"], &left);
        let b = mappings(&["y", "z"], &right);
        let mut expected = Mappings::empty();
        for l in a.iter() {
            for r in b.iter() {
                if let Some(merged) = l.merge(r) {
                    expected.push(merged);
                }
            }
        }
        prop_assert_eq!(canonical(&a.join(&b)), canonical(&expected));
    }

    #[test]
    fn optional_with_empty_right_is_identity(left in rows_strategy()) {
        let a = mappings(&["x", "y"], &left);
        prop_assert_eq!(canonical(&a.optional(&Mappings::empty())), canonical(&a));
    }

    #[test]
    fn minus_keeps_only_rows_without_compatible_partner(left in rows_strategy(), right in rows_strategy()) {
        let a = mappings(&["x", "y"], &left);
        let b = mappings(&["y", "z"], &right);
        let kept = a.minus(&b);
        for row in kept.iter() {
            prop_assert!(!b.iter().any(|other| row.minus_compatible(other)));
        }
        let removed = a.len() - kept.len();
        let expected = a.iter().filter(|row| b.iter().any(|other| row.minus_compatible(other))).count();
        prop_assert_eq!(removed, expected);
    }

    #[test]
    fn join_with_empty_is_empty(left in rows_strategy()) {
        let a = mappings(&["x", "y"], &left);
        prop_assert!(a.join(&Mappings::empty()).is_empty());
        prop_assert!(Mappings::empty().join(&a).is_empty());
    }

    #[test]
    fn disjoint_join_is_cartesian(left in rows_strategy(), right in rows_strategy()) {
        let a = mappings(&["x", "y"], &left);
        let b = mappings(&["z", "w"], &right);
        prop_assert_eq!(a.join(&b).len(), a.len() * b.len());
    }

    #[test]
    fn optional_covers_every_left_row(left in rows_strategy(), right in rows_strategy()) {
        let a = mappings(&["x", "y"], &left);
        let b = mappings(&["y", "z"], &right);
        let result = a.optional(&b);
        for row in a.iter() {
            let partners = b.iter().filter(|other| row.merge(other).is_some()).count();
            if partners == 0 {
                prop_assert!(result.iter().any(|merged| merged == row));
            } else {
                prop_assert!(result.iter().any(|merged| row.merge(merged).as_ref() == Some(merged)));
            }
        }
    }

    #[test]
    fn minus_empty_is_identity(left in rows_strategy()) {
        let a = mappings(&["x", "y"], &left);
        prop_assert_eq!(canonical(&a.minus(&Mappings::empty())), canonical(&a));
    }

    #[test]
    fn evaluators_agree(
        quads in quads_strategy(),
        index in 0usize..12,
        join_mappings in any::<bool>(),
    ) {
        init_logging();
        let store = build_store(&quads);
        let query = Query::new(shape(index));

        let optimized = QueryExecutor::new(&store)
            .with_config(EngineConfig {
                join_mappings,
                ..EngineConfig::default()
            })
            .execute(query.clone())
            .unwrap();
        let naive = QueryExecutor::new(&store)
            .with_config(EngineConfig {
                optimization_level: OptimizationLevel::None,
                backjump: false,
                join_mappings: !join_mappings,
                ..EngineConfig::default()
            })
            .execute(query.clone())
            .unwrap();
        let reference = QueryExecutor::new(&store).execute_algebra(query).unwrap();

        prop_assert_eq!(canonical(&optimized.mappings), canonical(&naive.mappings));
        prop_assert_eq!(canonical(&optimized.mappings), canonical(&reference.mappings));
    }

    #[test]
    fn backjumping_preserves_solutions(quads in quads_strategy(), index in 0usize..12) {
        let store = build_store(&quads);
        let query = Query::new(shape(index));
        let level = |backjump| EngineConfig {
            optimization_level: OptimizationLevel::None,
            backjump,
            ..EngineConfig::default()
        };
        let with = QueryExecutor::new(&store).with_config(level(true)).execute(query.clone()).unwrap();
        let without = QueryExecutor::new(&store).with_config(level(false)).execute(query).unwrap();
        prop_assert_eq!(canonical(&with.mappings), canonical(&without.mappings));
    }

    #[test]
    fn limit_returns_a_prefix_sized_subset(quads in quads_strategy(), limit in 0usize..6) {
        let store = build_store(&quads);
        let full = QueryExecutor::new(&store).execute(Query::new(shape(0))).unwrap();
        let limited = QueryExecutor::new(&store)
            .execute(Query::new(shape(0)).limit(limit))
            .unwrap();
        prop_assert_eq!(limited.len(), full.len().min(limit));
        let all = canonical(&full.mappings);
        for row in canonical(&limited.mappings) {
            prop_assert!(all.contains(&row));
        }
    }
}
