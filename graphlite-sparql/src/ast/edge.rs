// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Edge and path patterns, and the candidate edges matched against them

use std::fmt;

use super::term::{Node, Term, Variable};

/// An edge of the target graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    /// Named graph holding the edge, `None` for the default graph
    pub graph: Option<Term>,
}

impl Quad {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph: None,
        }
    }

    pub fn in_graph(mut self, graph: Term) -> Self {
        self.graph = Some(graph);
        self
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(graph) = &self.graph {
            write!(f, " {}", graph)?;
        }
        Ok(())
    }
}

/// Triple pattern with an optional named-graph position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgePattern {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
    pub graph: Option<Node>,
}

impl EdgePattern {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph: None,
        }
    }

    pub fn with_graph(mut self, graph: Node) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Positions in subject, predicate, object, graph order
    pub fn positions(&self) -> impl Iterator<Item = &Node> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .chain(self.graph.as_ref())
    }

    /// Distinct variables of the pattern
    pub fn variables(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = Vec::with_capacity(4);
        for node in self.positions() {
            if let Node::Var(var) = node {
                if !vars.contains(var) {
                    vars.push(var.clone());
                }
            }
        }
        vars
    }

    /// Bindings produced by matching `quad` against the pattern
    ///
    /// Returns `None` when a constant differs from the edge or when a variable
    /// repeated in the pattern would receive two different values.
    pub fn bind(&self, quad: &Quad) -> Option<Vec<(Variable, Term)>> {
        let mut pairs: Vec<(Variable, Term)> = Vec::with_capacity(4);
        let graph_value = quad.graph.as_ref();
        let positions = [
            (Some(&self.subject), Some(&quad.subject)),
            (Some(&self.predicate), Some(&quad.predicate)),
            (Some(&self.object), Some(&quad.object)),
            (self.graph.as_ref(), graph_value),
        ];
        for (node, value) in positions {
            let Some(node) = node else { continue };
            let value = value?;
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
}

impl fmt::Display for EdgePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(graph) = &self.graph {
            write!(f, " {}", graph)?;
        }
        Ok(())
    }
}

/// Property path expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    Predicate(Term),
    Inverse(Box<PropertyPath>),
    Sequence(Box<PropertyPath>, Box<PropertyPath>),
    Alternative(Box<PropertyPath>, Box<PropertyPath>),
    ZeroOrMore(Box<PropertyPath>),
    OneOrMore(Box<PropertyPath>),
    ZeroOrOne(Box<PropertyPath>),
}

impl PropertyPath {
    pub fn predicate(iri: &str) -> Self {
        PropertyPath::Predicate(Term::iri(iri))
    }

    pub fn inverse(path: PropertyPath) -> Self {
        PropertyPath::Inverse(Box::new(path))
    }

    pub fn sequence(first: PropertyPath, second: PropertyPath) -> Self {
        PropertyPath::Sequence(Box::new(first), Box::new(second))
    }

    pub fn alternative(first: PropertyPath, second: PropertyPath) -> Self {
        PropertyPath::Alternative(Box::new(first), Box::new(second))
    }

    pub fn zero_or_more(path: PropertyPath) -> Self {
        PropertyPath::ZeroOrMore(Box::new(path))
    }

    pub fn one_or_more(path: PropertyPath) -> Self {
        PropertyPath::OneOrMore(Box::new(path))
    }

    pub fn zero_or_one(path: PropertyPath) -> Self {
        PropertyPath::ZeroOrOne(Box::new(path))
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPath::Predicate(term) => write!(f, "{}", term),
            PropertyPath::Inverse(path) => write!(f, "^{}", path),
            PropertyPath::Sequence(a, b) => write!(f, "({}/{})", a, b),
            PropertyPath::Alternative(a, b) => write!(f, "({}|{})", a, b),
            PropertyPath::ZeroOrMore(path) => write!(f, "{}*", path),
            PropertyPath::OneOrMore(path) => write!(f, "{}+", path),
            PropertyPath::ZeroOrOne(path) => write!(f, "{}?", path),
        }
    }
}

/// `subject path object`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    pub subject: Node,
    pub path: PropertyPath,
    pub object: Node,
}

impl PathPattern {
    pub fn new(subject: Node, path: PropertyPath, object: Node) -> Self {
        Self {
            subject,
            path,
            object,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        let mut vars = Vec::with_capacity(2);
        for node in [&self.subject, &self.object] {
            if let Node::Var(var) = node {
                if !vars.contains(var) {
                    vars.push(var.clone());
                }
            }
        }
        vars
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.path, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(s: &str, p: &str, o: &str) -> Quad {
        Quad::new(Term::iri(s), Term::iri(p), Term::iri(o))
    }

    #[test]
    fn should_bind_pattern_variables() {
        let pattern = EdgePattern::new(Node::var("x"), Node::iri("p"), Node::var("y"));
        let pairs = pattern.bind(&quad("a", "p", "b")).unwrap();
        assert_eq!(
            pairs,
            vec![
                (Variable::new("x"), Term::iri("a")),
                (Variable::new("y"), Term::iri("b")),
            ]
        );
    }

    #[test]
    fn should_reject_mismatched_constant() {
        let pattern = EdgePattern::new(Node::var("x"), Node::iri("p"), Node::var("y"));
        assert!(pattern.bind(&quad("a", "q", "b")).is_none());
    }

    #[test]
    fn should_require_repeated_variables_to_agree() {
        let pattern = EdgePattern::new(Node::var("x"), Node::iri("p"), Node::var("x"));
        assert!(pattern.bind(&quad("a", "p", "b")).is_none());
        assert_eq!(pattern.bind(&quad("a", "p", "a")).map(|p| p.len()), Some(1));
    }

    #[test]
    fn should_bind_graph_variable_only_for_named_edges() {
        let pattern = EdgePattern::new(Node::var("x"), Node::iri("p"), Node::var("y"))
            .with_graph(Node::var("g"));
        assert!(pattern.bind(&quad("a", "p", "b")).is_none());
        let named = quad("a", "p", "b").in_graph(Term::iri("g1"));
        assert_eq!(pattern.bind(&named).map(|p| p.len()), Some(3));
        assert_eq!(pattern.variables().len(), 3);
    }
}
