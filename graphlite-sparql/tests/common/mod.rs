// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared fixtures for integration tests

#![allow(dead_code)]

use graphlite_sparql::{Mappings, MemoryStore, Quad, Term};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn iri(value: &str) -> Term {
    Term::iri(value)
}

/// Social graph used across tests
///
/// - alice (30) knows bob (25), bob knows carol (35), carol knows nobody
/// - dave is a Robot, not a Person
/// - graph g1 holds alice knows carol, graph g2 holds bob knows dave
pub fn social_store() -> MemoryStore {
    let store = MemoryStore::new();
    for (name, age) in [("alice", 30), ("bob", 25), ("carol", 35)] {
        store.insert(Quad::new(iri(name), iri("type"), iri("Person")));
        store.insert(Quad::new(iri(name), iri("age"), Term::integer(age)));
        store.insert(Quad::new(iri(name), iri("name"), Term::literal(name)));
    }
    store.insert(Quad::new(iri("dave"), iri("type"), iri("Robot")));
    store.insert(Quad::new(iri("alice"), iri("knows"), iri("bob")));
    store.insert(Quad::new(iri("bob"), iri("knows"), iri("carol")));
    store.insert(Quad::new(iri("alice"), iri("knows"), iri("carol")).in_graph(iri("g1")));
    store.insert(Quad::new(iri("bob"), iri("knows"), iri("dave")).in_graph(iri("g2")));
    store
}

/// Order-insensitive view of a solution set
pub fn canonical(mappings: &Mappings) -> Vec<Vec<(String, String)>> {
    let mut rows: Vec<Vec<(String, String)>> = mappings
        .iter()
        .map(|row| {
            row.sorted_pairs()
                .into_iter()
                .map(|(name, term)| (name.to_string(), term.to_string()))
                .collect()
        })
        .collect();
    rows.sort();
    rows
}

/// Values of `name` in row order, `None` where unbound
pub fn column(mappings: &Mappings, name: &str) -> Vec<Option<Term>> {
    mappings
        .iter()
        .map(|row| row.get_by_name(name).cloned())
        .collect()
}
