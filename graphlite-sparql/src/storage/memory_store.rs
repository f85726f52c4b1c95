// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory quad store

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::RwLock;

use crate::ast::{EdgePattern, Quad, Term};
use crate::binding::Environment;
use crate::exec::{ExecutionError, Producer};

#[derive(Debug, Default)]
struct StoreInner {
    quads: Vec<Quad>,
    seen: HashSet<Quad>,
    by_subject: HashMap<Term, Vec<usize>>,
    by_predicate: HashMap<Term, Vec<usize>>,
    by_object: HashMap<Term, Vec<usize>>,
    graphs: BTreeSet<Term>,
}

impl StoreInner {
    /// Quad positions worth scanning for the given constant positions
    fn candidates(&self, s: Option<&Term>, p: Option<&Term>, o: Option<&Term>) -> Vec<usize> {
        let lookups = [
            s.map(|t| self.by_subject.get(t)),
            p.map(|t| self.by_predicate.get(t)),
            o.map(|t| self.by_object.get(t)),
        ];
        let mut best: Option<&Vec<usize>> = None;
        for lookup in lookups.into_iter().flatten() {
            match lookup {
                None => return Vec::new(),
                Some(list) if best.map_or(true, |b| list.len() < b.len()) => best = Some(list),
                Some(_) => {}
            }
        }
        match best {
            Some(list) => list.clone(),
            None => (0..self.quads.len()).collect(),
        }
    }
}

/// Thread-safe in-memory graph of quads
///
/// Quads are deduplicated on insert and kept in insertion order, which makes
/// candidate order deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_quads(quads: impl IntoIterator<Item = Quad>) -> Self {
        let store = Self::new();
        for quad in quads {
            store.insert(quad);
        }
        store
    }

    /// Adds `quad`; returns false if it was already present
    pub fn insert(&self, quad: Quad) -> bool {
        let mut inner = self.inner.write();
        if inner.seen.contains(&quad) {
            return false;
        }
        let index = inner.quads.len();
        inner.by_subject.entry(quad.subject.clone()).or_default().push(index);
        inner.by_predicate.entry(quad.predicate.clone()).or_default().push(index);
        inner.by_object.entry(quad.object.clone()).or_default().push(index);
        if let Some(graph) = &quad.graph {
            inner.graphs.insert(graph.clone());
        }
        inner.seen.insert(quad.clone());
        inner.quads.push(quad);
        true
    }

    pub fn len(&self) -> usize {
        self.inner.read().quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// True when `quad` belongs to the graph in scope
fn in_scope(quad: &Quad, graph: Option<&Term>, from: &[Term]) -> bool {
    match graph {
        Some(name) => quad.graph.as_ref() == Some(name),
        None if from.is_empty() => true,
        None => quad.graph.as_ref().map_or(false, |g| from.contains(g)),
    }
}

impl Producer for MemoryStore {
    fn edges(
        &self,
        graph: Option<&Term>,
        from: &[Term],
        pattern: &EdgePattern,
        env: &dyn Environment,
    ) -> Result<Vec<Quad>, ExecutionError> {
        let s = env.resolve(&pattern.subject);
        let p = env.resolve(&pattern.predicate);
        let o = env.resolve(&pattern.object);
        let g = pattern.graph.as_ref().and_then(|node| env.resolve(node));

        let inner = self.inner.read();
        let edges = inner
            .candidates(s, p, o)
            .into_iter()
            .map(|i| &inner.quads[i])
            .filter(|quad| {
                s.map_or(true, |t| &quad.subject == t)
                    && p.map_or(true, |t| &quad.predicate == t)
                    && o.map_or(true, |t| &quad.object == t)
                    && g.map_or(true, |t| quad.graph.as_ref() == Some(t))
                    && in_scope(quad, graph, from)
            })
            .cloned()
            .collect();
        Ok(edges)
    }

    fn graph_names(&self, named: &[Term]) -> Result<Vec<Term>, ExecutionError> {
        let inner = self.inner.read();
        Ok(inner
            .graphs
            .iter()
            .filter(|g| named.is_empty() || named.contains(g))
            .cloned()
            .collect())
    }

    fn nodes(&self, graph: Option<&Term>, from: &[Term]) -> Result<Vec<Term>, ExecutionError> {
        let inner = self.inner.read();
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for quad in inner.quads.iter().filter(|q| in_scope(q, graph, from)) {
            for term in [&quad.subject, &quad.object] {
                if seen.insert(term) {
                    nodes.push(term.clone());
                }
            }
        }
        Ok(nodes)
    }

    fn cardinality(&self, pattern: &EdgePattern) -> Option<usize> {
        let s = pattern.subject.as_constant();
        let p = pattern.predicate.as_constant();
        let o = pattern.object.as_constant();
        let inner = self.inner.read();
        let count = inner
            .candidates(s, p, o)
            .into_iter()
            .filter(|&i| {
                let quad = &inner.quads[i];
                s.map_or(true, |t| &quad.subject == t)
                    && p.map_or(true, |t| &quad.predicate == t)
                    && o.map_or(true, |t| &quad.object == t)
            })
            .count();
        Some(count)
    }
}
