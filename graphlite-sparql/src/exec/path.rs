// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property path evaluation
//!
//! A path is evaluated to the list of (start, end) pairs it connects, using
//! only single-predicate edge lookups on the producer. `*` and `+` are
//! computed by breadth-first closure and yield each pair once; the other
//! operators keep duplicates, like a chain of joins would.

use std::collections::{HashSet, VecDeque};

use crate::ast::{EdgePattern, Node, PathPattern, PropertyPath, Term, Variable};
use crate::binding::{EmptyEnvironment, Environment};
use crate::exec::{ExecutionError, Producer};

pub struct PathEvaluator<'a> {
    producer: &'a dyn Producer,
    graph: Option<&'a Term>,
    from: &'a [Term],
}

impl<'a> PathEvaluator<'a> {
    pub fn new(producer: &'a dyn Producer, graph: Option<&'a Term>, from: &'a [Term]) -> Self {
        Self {
            producer,
            graph,
            from,
        }
    }

    /// Pairs connected by `pattern.path` that agree with the ends of
    /// `pattern` bound in `env`
    pub fn evaluate(
        &self,
        pattern: &PathPattern,
        env: &dyn Environment,
    ) -> Result<Vec<(Term, Term)>, ExecutionError> {
        let subject = env.resolve(&pattern.subject);
        let object = env.resolve(&pattern.object);
        let mut pairs = self.pairs(&pattern.path, subject, object)?;
        let same_variable = match (&pattern.subject, &pattern.object) {
            (Node::Var(s), Node::Var(o)) => s == o,
            _ => false,
        };
        pairs.retain(|(s, o)| {
            subject.map_or(true, |t| t == s)
                && object.map_or(true, |t| t == o)
                && (!same_variable || s == o)
        });
        Ok(pairs)
    }

    fn pairs(
        &self,
        path: &PropertyPath,
        subject: Option<&Term>,
        object: Option<&Term>,
    ) -> Result<Vec<(Term, Term)>, ExecutionError> {
        match path {
            PropertyPath::Predicate(predicate) => self.step(predicate, subject, object),
            PropertyPath::Inverse(inner) => Ok(self
                .pairs(inner, object, subject)?
                .into_iter()
                .map(|(s, o)| (o, s))
                .collect()),
            PropertyPath::Sequence(first, second) => {
                let mut out = Vec::new();
                for (start, middle) in self.pairs(first, subject, None)? {
                    for (_, end) in self.pairs(second, Some(&middle), object)? {
                        out.push((start.clone(), end));
                    }
                }
                Ok(out)
            }
            PropertyPath::Alternative(first, second) => {
                let mut out = self.pairs(first, subject, object)?;
                out.extend(self.pairs(second, subject, object)?);
                Ok(out)
            }
            PropertyPath::ZeroOrOne(inner) => {
                let mut out = self.zero_length(subject, object)?;
                out.extend(self.pairs(inner, subject, object)?);
                Ok(distinct(out))
            }
            PropertyPath::ZeroOrMore(inner) => self.repeat(inner, subject, object, true),
            PropertyPath::OneOrMore(inner) => self.repeat(inner, subject, object, false),
        }
    }

    fn step(
        &self,
        predicate: &Term,
        subject: Option<&Term>,
        object: Option<&Term>,
    ) -> Result<Vec<(Term, Term)>, ExecutionError> {
        let position = |term: Option<&Term>, name: &str| match term {
            Some(term) => Node::Const(term.clone()),
            None => Node::Var(Variable::blank(name)),
        };
        let pattern = EdgePattern::new(
            position(subject, "path_subject"),
            Node::Const(predicate.clone()),
            position(object, "path_object"),
        );
        let quads = self
            .producer
            .edges(self.graph, self.from, &pattern, &EmptyEnvironment)?;
        Ok(quads
            .into_iter()
            .filter(|quad| pattern.bind(quad).is_some())
            .map(|quad| (quad.subject, quad.object))
            .collect())
    }

    fn zero_length(
        &self,
        subject: Option<&Term>,
        object: Option<&Term>,
    ) -> Result<Vec<(Term, Term)>, ExecutionError> {
        Ok(match (subject, object) {
            (Some(s), Some(o)) if s != o => Vec::new(),
            (Some(term), _) | (None, Some(term)) => vec![(term.clone(), term.clone())],
            (None, None) => self
                .producer
                .nodes(self.graph, self.from)?
                .into_iter()
                .map(|node| (node.clone(), node))
                .collect(),
        })
    }

    fn repeat(
        &self,
        path: &PropertyPath,
        subject: Option<&Term>,
        object: Option<&Term>,
        zero: bool,
    ) -> Result<Vec<(Term, Term)>, ExecutionError> {
        let mut out = Vec::new();
        match (subject, object) {
            (Some(start), _) => {
                if zero {
                    out.push((start.clone(), start.clone()));
                }
                for end in self.closure(path, start, true)? {
                    out.push((start.clone(), end));
                }
            }
            (None, Some(end)) => {
                if zero {
                    out.push((end.clone(), end.clone()));
                }
                for start in self.closure(path, end, false)? {
                    out.push((start, end.clone()));
                }
            }
            (None, None) => {
                let starts: Vec<Term> = if zero {
                    self.producer.nodes(self.graph, self.from)?
                } else {
                    distinct(self.pairs(path, None, None)?)
                        .into_iter()
                        .map(|(s, _)| s)
                        .collect::<Vec<_>>()
                };
                let mut seen = HashSet::new();
                for start in starts {
                    if !seen.insert(start.clone()) {
                        continue;
                    }
                    if zero {
                        out.push((start.clone(), start.clone()));
                    }
                    for end in self.closure(path, &start, true)? {
                        out.push((start.clone(), end));
                    }
                }
            }
        }
        Ok(distinct(out))
    }

    /// Nodes reachable from `start` in one or more steps, following the path
    /// backwards when `forward` is false
    fn closure(
        &self,
        path: &PropertyPath,
        start: &Term,
        forward: bool,
    ) -> Result<Vec<Term>, ExecutionError> {
        let mut visited: HashSet<Term> = HashSet::new();
        let mut reached = Vec::new();
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(node) = queue.pop_front() {
            let next: Vec<Term> = if forward {
                self.pairs(path, Some(&node), None)?
                    .into_iter()
                    .map(|(_, o)| o)
                    .collect()
            } else {
                self.pairs(path, None, Some(&node))?
                    .into_iter()
                    .map(|(s, _)| s)
                    .collect()
            };
            for term in next {
                if visited.insert(term.clone()) {
                    reached.push(term.clone());
                    queue.push_back(term);
                }
            }
        }
        Ok(reached)
    }
}

/// Bindings of the pattern ends for one pair, `None` when a constant end or
/// a repeated variable disagrees
pub fn path_bindings(
    pattern: &PathPattern,
    subject: &Term,
    object: &Term,
) -> Option<Vec<(Variable, Term)>> {
    let mut pairs: Vec<(Variable, Term)> = Vec::with_capacity(2);
    for (node, value) in [(&pattern.subject, subject), (&pattern.object, object)] {
        match node {
            Node::Const(term) => {
                if term != value {
                    return None;
                }
            }
            Node::Var(var) => match pairs.iter().find(|(v, _)| v == var) {
                Some((_, bound)) if bound != value => return None,
                Some(_) => {}
                None => pairs.push((var.clone(), value.clone())),
            },
        }
    }
    Some(pairs)
}

fn distinct(pairs: Vec<(Term, Term)>) -> Vec<(Term, Term)> {
    let mut seen = HashSet::new();
    pairs
        .into_iter()
        .filter(|pair| seen.insert(pair.clone()))
        .collect()
}
