// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Algebra tree of a compiled graph pattern
//!
//! An [`Exp`] is either a leaf (edge or path pattern, filter, bind, values,
//! node, accept marker) or a composite (BGP/AND group, JOIN, UNION, OPTIONAL,
//! MINUS, GRAPH, SERVICE, sub-QUERY). Binary composites hold exactly two boxed
//! operands, so arity is guaranteed by construction.
//!
//! Every node carries an [`ExpId`] that is unique within the process. Plan
//! annotations computed before execution are keyed by this id instead of being
//! stored in the tree.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::edge::{EdgePattern, PathPattern};
use super::expr::{Expr, Filter};
use super::query::Query;
use super::term::{Node, Variable};
use crate::binding::Mappings;

/// Identity of an expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpId(u64);

impl ExpId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ExpId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type tag of an expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpType {
    Bgp,
    And,
    Join,
    Union,
    Optional,
    Minus,
    Graph,
    Query,
    Edge,
    Path,
    Node,
    Filter,
    Values,
    Bind,
    Service,
    Accept,
}

impl ExpType {
    /// Composite statements that end a sampled scope walk
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            ExpType::Join
                | ExpType::Union
                | ExpType::Optional
                | ExpType::Minus
                | ExpType::Graph
                | ExpType::Query
                | ExpType::Service
        )
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ExpType::Bgp | ExpType::And)
    }

    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            ExpType::Join | ExpType::Union | ExpType::Optional | ExpType::Minus
        )
    }
}

impl fmt::Display for ExpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpType::Bgp => "BGP",
            ExpType::And => "AND",
            ExpType::Join => "JOIN",
            ExpType::Union => "UNION",
            ExpType::Optional => "OPTIONAL",
            ExpType::Minus => "MINUS",
            ExpType::Graph => "GRAPH",
            ExpType::Query => "QUERY",
            ExpType::Edge => "EDGE",
            ExpType::Path => "PATH",
            ExpType::Node => "NODE",
            ExpType::Filter => "FILTER",
            ExpType::Values => "VALUES",
            ExpType::Bind => "BIND",
            ExpType::Service => "SERVICE",
            ExpType::Accept => "ACCEPT",
        };
        f.write_str(name)
    }
}

/// Node flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpFlags {
    pub aggregate: bool,
    /// Errors raised while evaluating the clause yield one empty solution
    pub silent: bool,
    /// The clause is known to have no solution
    pub fail: bool,
}

/// Node payload
#[derive(Debug, Clone)]
pub enum ExpKind {
    Bgp(Vec<Exp>),
    And(Vec<Exp>),
    Join(Box<Exp>, Box<Exp>),
    Union(Box<Exp>, Box<Exp>),
    Optional(Box<Exp>, Box<Exp>),
    Minus(Box<Exp>, Box<Exp>),
    Graph { name: Node, body: Box<Exp> },
    Service { endpoint: Node, body: Box<Exp> },
    Query(Box<Query>),
    Edge(EdgePattern),
    Path(PathPattern),
    Node(Node),
    Filter(Filter),
    Values(Mappings),
    Bind { variable: Variable, expr: Expr },
    Accept(Variable),
}

/// Expression node
#[derive(Debug, Clone)]
pub struct Exp {
    id: ExpId,
    kind: ExpKind,
    flags: ExpFlags,
}

impl Exp {
    pub fn new(kind: ExpKind) -> Self {
        Self {
            id: ExpId::next(),
            kind,
            flags: ExpFlags::default(),
        }
    }

    pub fn bgp(args: Vec<Exp>) -> Self {
        Self::new(ExpKind::Bgp(args))
    }

    pub fn and(args: Vec<Exp>) -> Self {
        Self::new(ExpKind::And(args))
    }

    pub fn join(first: Exp, rest: Exp) -> Self {
        Self::new(ExpKind::Join(Box::new(first), Box::new(rest)))
    }

    pub fn union(first: Exp, rest: Exp) -> Self {
        Self::new(ExpKind::Union(Box::new(first), Box::new(rest)))
    }

    pub fn optional(first: Exp, rest: Exp) -> Self {
        Self::new(ExpKind::Optional(Box::new(first), Box::new(rest)))
    }

    pub fn minus(first: Exp, rest: Exp) -> Self {
        Self::new(ExpKind::Minus(Box::new(first), Box::new(rest)))
    }

    pub fn graph(name: Node, body: Exp) -> Self {
        Self::new(ExpKind::Graph {
            name,
            body: Box::new(body),
        })
    }

    pub fn service(endpoint: Node, body: Exp) -> Self {
        Self::new(ExpKind::Service {
            endpoint,
            body: Box::new(body),
        })
    }

    pub fn query(query: Query) -> Self {
        Self::new(ExpKind::Query(Box::new(query)))
    }

    pub fn edge(pattern: EdgePattern) -> Self {
        Self::new(ExpKind::Edge(pattern))
    }

    /// Shorthand for an edge over the default graph
    pub fn triple(subject: Node, predicate: Node, object: Node) -> Self {
        Self::edge(EdgePattern::new(subject, predicate, object))
    }

    pub fn path(pattern: PathPattern) -> Self {
        Self::new(ExpKind::Path(pattern))
    }

    pub fn node(node: Node) -> Self {
        Self::new(ExpKind::Node(node))
    }

    pub fn filter(expr: Expr) -> Self {
        Self::new(ExpKind::Filter(Filter::new(expr)))
    }

    pub fn values(rows: Mappings) -> Self {
        Self::new(ExpKind::Values(rows))
    }

    pub fn bind(variable: Variable, expr: Expr) -> Self {
        Self::new(ExpKind::Bind { variable, expr })
    }

    pub fn accept(variable: Variable) -> Self {
        Self::new(ExpKind::Accept(variable))
    }

    pub fn silent(mut self) -> Self {
        self.flags.silent = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.flags.fail = true;
        self
    }

    pub fn aggregate(mut self) -> Self {
        self.flags.aggregate = true;
        self
    }

    pub fn id(&self) -> ExpId {
        self.id
    }

    pub fn kind(&self) -> &ExpKind {
        &self.kind
    }

    pub fn flags(&self) -> ExpFlags {
        self.flags
    }

    pub fn is_silent(&self) -> bool {
        self.flags.silent
    }

    pub fn is_fail(&self) -> bool {
        self.flags.fail
    }

    pub fn exp_type(&self) -> ExpType {
        match &self.kind {
            ExpKind::Bgp(_) => ExpType::Bgp,
            ExpKind::And(_) => ExpType::And,
            ExpKind::Join(..) => ExpType::Join,
            ExpKind::Union(..) => ExpType::Union,
            ExpKind::Optional(..) => ExpType::Optional,
            ExpKind::Minus(..) => ExpType::Minus,
            ExpKind::Graph { .. } => ExpType::Graph,
            ExpKind::Service { .. } => ExpType::Service,
            ExpKind::Query(_) => ExpType::Query,
            ExpKind::Edge(_) => ExpType::Edge,
            ExpKind::Path(_) => ExpType::Path,
            ExpKind::Node(_) => ExpType::Node,
            ExpKind::Filter(_) => ExpType::Filter,
            ExpKind::Values(_) => ExpType::Values,
            ExpKind::Bind { .. } => ExpType::Bind,
            ExpKind::Accept(_) => ExpType::Accept,
        }
    }

    pub fn is_group(&self) -> bool {
        self.exp_type().is_group()
    }

    /// Left operand of a binary composite
    pub fn first(&self) -> Option<&Exp> {
        self.operands().map(|(first, _)| first)
    }

    /// Right operand of a binary composite
    pub fn rest(&self) -> Option<&Exp> {
        self.operands().map(|(_, rest)| rest)
    }

    pub fn operands(&self) -> Option<(&Exp, &Exp)> {
        match &self.kind {
            ExpKind::Join(first, rest)
            | ExpKind::Union(first, rest)
            | ExpKind::Optional(first, rest)
            | ExpKind::Minus(first, rest) => Some((first, rest)),
            _ => None,
        }
    }

    /// Direct children of a group, empty otherwise
    pub fn children(&self) -> &[Exp] {
        match &self.kind {
            ExpKind::Bgp(args) | ExpKind::And(args) => args,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Exp>> {
        match &mut self.kind {
            ExpKind::Bgp(args) | ExpKind::And(args) => Some(args),
            _ => None,
        }
    }

    /// Clauses of a group, or the node itself when it is not a group
    pub fn body(&self) -> &[Exp] {
        match &self.kind {
            ExpKind::Bgp(args) | ExpKind::And(args) => args,
            _ => std::slice::from_ref(self),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Exp> {
        self.children().get(index)
    }

    pub fn size(&self) -> usize {
        match &self.kind {
            ExpKind::Bgp(args) | ExpKind::And(args) => args.len(),
            ExpKind::Join(..)
            | ExpKind::Union(..)
            | ExpKind::Optional(..)
            | ExpKind::Minus(..) => 2,
            ExpKind::Graph { .. } | ExpKind::Service { .. } | ExpKind::Query(_) => 1,
            _ => 0,
        }
    }

    pub fn edge_pattern(&self) -> Option<&EdgePattern> {
        match &self.kind {
            ExpKind::Edge(pattern) => Some(pattern),
            _ => None,
        }
    }

    pub fn as_filter(&self) -> Option<&Filter> {
        match &self.kind {
            ExpKind::Filter(filter) => Some(filter),
            _ => None,
        }
    }

    /// A VALUES clause, or a group made of exactly one
    pub fn is_values_only(&self) -> bool {
        match &self.kind {
            ExpKind::Values(_) => true,
            ExpKind::Bgp(args) | ExpKind::And(args) => {
                matches!(args.as_slice(), [only] if only.exp_type() == ExpType::Values)
            }
            _ => false,
        }
    }

    /// True when the right operand of a JOIN can be seeded with the left
    /// rows: it is, or starts with, a SERVICE call, or it has the shape
    /// `{ JOIN({ edge ... }, ...) }`
    pub fn is_evaluable_with_mappings(&self) -> bool {
        self.is_and_join() || self.starts_with_service()
    }

    fn is_and_join(&self) -> bool {
        match &self.kind {
            ExpKind::Bgp(args) | ExpKind::And(args) => match args.as_slice() {
                [only] => only.is_and_join(),
                _ => false,
            },
            ExpKind::Join(first, _) => first.is_group()
                && first.children().first().map_or(false, |e| {
                    matches!(e.exp_type(), ExpType::Edge | ExpType::Path)
                }),
            _ => false,
        }
    }

    fn starts_with_service(&self) -> bool {
        match &self.kind {
            ExpKind::Service { .. } => true,
            ExpKind::Bgp(args) | ExpKind::And(args) => {
                args.first().map_or(false, Exp::starts_with_service)
            }
            ExpKind::Join(first, _) => first.starts_with_service(),
            _ => false,
        }
    }

    /// Calls `visit` on this node and every descendant, pre-order
    ///
    /// Sub-query bodies are visited too.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Exp)) {
        visit(self);
        match &self.kind {
            ExpKind::Bgp(args) | ExpKind::And(args) => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            ExpKind::Join(first, rest)
            | ExpKind::Union(first, rest)
            | ExpKind::Optional(first, rest)
            | ExpKind::Minus(first, rest) => {
                first.walk(visit);
                rest.walk(visit);
            }
            ExpKind::Graph { body, .. } | ExpKind::Service { body, .. } => body.walk(visit),
            ExpKind::Query(query) => query.body.walk(visit),
            _ => {}
        }
    }

    /// Mutable access to the direct sub-expressions, used by plan rewrites
    pub fn sub_expressions_mut(&mut self) -> Vec<&mut Exp> {
        match &mut self.kind {
            ExpKind::Bgp(args) | ExpKind::And(args) => args.iter_mut().collect(),
            ExpKind::Join(first, rest)
            | ExpKind::Union(first, rest)
            | ExpKind::Optional(first, rest)
            | ExpKind::Minus(first, rest) => vec![first.as_mut(), rest.as_mut()],
            ExpKind::Graph { body, .. } | ExpKind::Service { body, .. } => vec![body.as_mut()],
            ExpKind::Query(query) => vec![&mut query.body],
            _ => Vec::new(),
        }
    }

    /// Inserts an ACCEPT marker for `var` right after the first edge or path
    /// that binds it, searching nested groups too.
    ///
    /// Returns true when a marker was inserted.
    pub fn distinct(&mut self, var: &Variable) -> bool {
        let Some(args) = self.children_mut() else {
            return false;
        };
        for i in 0..args.len() {
            let binds = match args[i].kind() {
                ExpKind::Edge(pattern) => pattern.variables().contains(var),
                ExpKind::Path(pattern) => pattern.variables().contains(var),
                _ => false,
            };
            if binds {
                args.insert(i + 1, Exp::accept(var.clone()));
                return true;
            }
            if args[i].is_group() && args[i].distinct(var) {
                return true;
            }
        }
        false
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        match &self.kind {
            ExpKind::Edge(pattern) => writeln!(f, "{}EDGE {}", pad, pattern),
            ExpKind::Path(pattern) => writeln!(f, "{}PATH {}", pad, pattern),
            ExpKind::Node(node) => writeln!(f, "{}NODE {}", pad, node),
            ExpKind::Filter(filter) => writeln!(f, "{}FILTER {}", pad, filter),
            ExpKind::Values(rows) => writeln!(f, "{}VALUES {} rows", pad, rows.len()),
            ExpKind::Bind { variable, expr } => writeln!(f, "{}BIND {} AS {}", pad, expr, variable),
            ExpKind::Accept(var) => writeln!(f, "{}ACCEPT {}", pad, var),
            ExpKind::Graph { name, body } => {
                writeln!(f, "{}GRAPH {}", pad, name)?;
                body.fmt_indented(f, depth + 1)
            }
            ExpKind::Service { endpoint, body } => {
                writeln!(f, "{}SERVICE {}", pad, endpoint)?;
                body.fmt_indented(f, depth + 1)
            }
            ExpKind::Query(query) => {
                writeln!(f, "{}QUERY", pad)?;
                query.body.fmt_indented(f, depth + 1)
            }
            _ => {
                writeln!(f, "{}{}", pad, self.exp_type())?;
                for child in self.children() {
                    child.fmt_indented(f, depth + 1)?;
                }
                if let Some((first, rest)) = self.operands() {
                    first.fmt_indented(f, depth + 1)?;
                    rest.fmt_indented(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    fn edge(s: &str, p: &str, o: &str) -> Exp {
        Exp::triple(Node::var(s), Node::iri(p), Node::var(o))
    }

    #[test]
    fn should_assign_distinct_ids() {
        let a = edge("x", "p", "y");
        let b = edge("x", "p", "y");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn should_expose_binary_operands() {
        let exp = Exp::optional(Exp::bgp(vec![edge("x", "p", "y")]), Exp::bgp(vec![]));
        assert_eq!(exp.exp_type(), ExpType::Optional);
        assert_eq!(exp.size(), 2);
        assert_eq!(exp.first().map(Exp::exp_type), Some(ExpType::Bgp));
        assert!(edge("x", "p", "y").first().is_none());
    }

    #[test]
    fn should_insert_accept_after_first_binding_edge() {
        let mut exp = Exp::bgp(vec![
            edge("a", "p", "b"),
            Exp::and(vec![edge("b", "q", "x"), edge("x", "r", "c")]),
        ]);
        assert!(exp.distinct(&Variable::new("x")));
        let nested = &exp.children()[1];
        assert_eq!(nested.children().len(), 3);
        assert_eq!(nested.children()[1].exp_type(), ExpType::Accept);
        assert!(!exp.distinct(&Variable::new("missing")));
    }

    #[test]
    fn should_detect_values_only_groups() {
        let values = Exp::values(Mappings::new(vec![Variable::new("x")]));
        assert!(values.is_values_only());
        assert!(Exp::bgp(vec![values.clone()]).is_values_only());
        assert!(!Exp::bgp(vec![values, edge("x", "p", "y")]).is_values_only());
    }

    #[test]
    fn should_recognize_service_prefix() {
        let service = Exp::service(Node::iri("http://endpoint"), Exp::bgp(vec![]));
        assert!(Exp::bgp(vec![service]).is_evaluable_with_mappings());
        assert!(!Exp::bgp(vec![edge("x", "p", "y")]).is_evaluable_with_mappings());
    }

    #[test]
    fn should_recognize_group_wrapping_join_on_edges() {
        let join = Exp::join(
            Exp::bgp(vec![edge("x", "p", "y")]),
            Exp::bgp(vec![edge("y", "q", "z")]),
        );
        assert!(Exp::bgp(vec![join.clone()]).is_evaluable_with_mappings());
        assert!(!Exp::bgp(vec![join.clone(), edge("z", "r", "w")]).is_evaluable_with_mappings());

        let join_on_filter = Exp::join(
            Exp::bgp(vec![Exp::filter(Expr::bound("x"))]),
            Exp::bgp(vec![edge("y", "q", "z")]),
        );
        assert!(!Exp::bgp(vec![join_on_filter]).is_evaluable_with_mappings());
    }
}
