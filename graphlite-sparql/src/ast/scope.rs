// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Variable scoping over the algebra tree
//!
//! Three questions are answered here:
//! - which variables a sub-expression may bind ([`Exp::nodes`]),
//! - which variables it surely binds for a given filter ([`Exp::share`]),
//! - which filters under an OPTIONAL must wait for the left join to complete
//!   ([`Exp::optional_scope`]).

use super::exp::{Exp, ExpId, ExpKind};
use super::expr::Filter;
use super::term::{Node, Variable};

/// Scope collection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeHandler {
    /// Only variables visible outside the sub-expression: the right arm of
    /// OPTIONAL and MINUS is skipped, UNION contributes the variables common to
    /// both branches.
    pub in_subscope: bool,
    /// Count BIND targets
    pub bind: bool,
    /// Count query blank nodes
    pub blank: bool,
    /// Stop a group walk after its first composite statement
    pub sample: bool,
}

impl ScopeHandler {
    pub fn all() -> Self {
        Self {
            in_subscope: false,
            bind: true,
            blank: false,
            sample: false,
        }
    }

    pub fn in_subscope() -> Self {
        Self {
            in_subscope: true,
            bind: true,
            blank: false,
            sample: false,
        }
    }

    pub fn with_bind(mut self, bind: bool) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_blank(mut self, blank: bool) -> Self {
        self.blank = blank;
        self
    }

    pub fn sampled(mut self) -> Self {
        self.sample = true;
        self
    }
}

/// Filter classification of an OPTIONAL node
#[derive(Debug, Clone, Default)]
pub struct OptionalScope {
    /// Filters of the right arm that can only be tested once a left row has
    /// been merged with a right row
    pub postponed: Vec<(ExpId, Filter)>,
    /// Filters of the right arm whose variables are bound on both sides; they
    /// can be tested on the left rows before the right arm runs
    pub inscope: Vec<Filter>,
}

impl OptionalScope {
    pub fn is_empty(&self) -> bool {
        self.postponed.is_empty() && self.inscope.is_empty()
    }

    pub fn postponed_filters(&self) -> impl Iterator<Item = &Filter> {
        self.postponed.iter().map(|(_, filter)| filter)
    }
}

fn add_variable(out: &mut Vec<Variable>, var: &Variable, handler: ScopeHandler) {
    if var.is_blank() && !handler.blank {
        return;
    }
    if !out.contains(var) {
        out.push(var.clone());
    }
}

fn add_node(out: &mut Vec<Variable>, node: &Node, handler: ScopeHandler) {
    if let Node::Var(var) = node {
        add_variable(out, var, handler);
    }
}

impl Exp {
    /// Variables of the sub-expression according to `handler`
    pub fn nodes(&self, handler: ScopeHandler) -> Vec<Variable> {
        let mut out = Vec::new();
        self.collect_nodes(handler, &mut out);
        out
    }

    fn collect_nodes(&self, handler: ScopeHandler, out: &mut Vec<Variable>) {
        match self.kind() {
            ExpKind::Bgp(args) | ExpKind::And(args) => {
                for arg in args {
                    arg.collect_nodes(handler, out);
                    if handler.sample && arg.exp_type().is_statement() {
                        break;
                    }
                }
            }
            ExpKind::Join(first, rest) => {
                first.collect_nodes(handler, out);
                rest.collect_nodes(handler, out);
            }
            ExpKind::Union(first, rest) => {
                if handler.in_subscope {
                    let left = first.nodes(handler);
                    let right = rest.nodes(handler);
                    for var in left.iter().filter(|v| right.contains(v)) {
                        add_variable(out, var, handler);
                    }
                } else {
                    first.collect_nodes(handler, out);
                    rest.collect_nodes(handler, out);
                }
            }
            ExpKind::Optional(first, rest) => {
                first.collect_nodes(handler, out);
                if !handler.in_subscope {
                    rest.collect_nodes(handler, out);
                }
            }
            ExpKind::Minus(first, _) => first.collect_nodes(handler, out),
            ExpKind::Graph { name, body } => {
                add_node(out, name, handler);
                body.collect_nodes(handler, out);
            }
            ExpKind::Service { endpoint, body } => {
                add_node(out, endpoint, handler);
                body.collect_nodes(handler, out);
            }
            ExpKind::Query(query) => {
                for var in query.projection() {
                    add_variable(out, &var, handler);
                }
            }
            ExpKind::Edge(pattern) => {
                for node in pattern.positions() {
                    add_node(out, node, handler);
                }
            }
            ExpKind::Path(pattern) => {
                add_node(out, &pattern.subject, handler);
                add_node(out, &pattern.object, handler);
            }
            ExpKind::Node(node) => add_node(out, node, handler),
            ExpKind::Values(rows) => {
                for var in rows.variables() {
                    add_variable(out, var, handler);
                }
            }
            ExpKind::Bind { variable, .. } => {
                if handler.bind {
                    add_variable(out, variable, handler);
                }
            }
            ExpKind::Filter(_) | ExpKind::Accept(_) => {}
        }
    }

    /// Every variable the sub-expression may bind, blank nodes included
    pub fn all_nodes(&self) -> Vec<Variable> {
        self.nodes(ScopeHandler::all().with_blank(true))
    }

    /// Variables visible outside the sub-expression, blank nodes excluded
    pub fn in_scope_nodes(&self) -> Vec<Variable> {
        self.nodes(ScopeHandler::in_subscope())
    }

    pub fn in_subscope_nodes(&self, bind: bool) -> Vec<Variable> {
        self.nodes(ScopeHandler::in_subscope().with_bind(bind))
    }

    /// Adds to `acc` the variables of `filter_vars` this sub-expression binds
    /// on every solution. BIND targets and the right arm of OPTIONAL and MINUS
    /// do not count.
    pub fn share(&self, filter_vars: &[Variable], acc: &mut Vec<Variable>) {
        let add = |var: &Variable, acc: &mut Vec<Variable>| {
            if filter_vars.contains(var) && !acc.contains(var) {
                acc.push(var.clone());
            }
        };
        match self.kind() {
            ExpKind::Bgp(args) | ExpKind::And(args) => {
                for arg in args {
                    arg.share(filter_vars, acc);
                }
            }
            ExpKind::Join(first, rest) => {
                first.share(filter_vars, acc);
                rest.share(filter_vars, acc);
            }
            ExpKind::Optional(first, _) | ExpKind::Minus(first, _) => {
                first.share(filter_vars, acc)
            }
            ExpKind::Union(first, rest) => {
                let mut left = Vec::new();
                let mut right = Vec::new();
                first.share(filter_vars, &mut left);
                rest.share(filter_vars, &mut right);
                for var in left.iter().filter(|v| right.contains(v)) {
                    add(var, acc);
                }
            }
            ExpKind::Graph { name, body } => {
                if let Node::Var(var) = name {
                    add(var, acc);
                }
                body.share(filter_vars, acc);
            }
            ExpKind::Service { body, .. } => body.share(filter_vars, acc),
            ExpKind::Query(query) => {
                for var in query.projection() {
                    add(&var, acc);
                }
            }
            ExpKind::Edge(pattern) => {
                for var in pattern.variables() {
                    add(&var, acc);
                }
            }
            ExpKind::Path(pattern) => {
                for var in pattern.variables() {
                    add(&var, acc);
                }
            }
            ExpKind::Node(Node::Var(var)) => add(var, acc),
            ExpKind::Values(rows) => {
                for var in rows.variables() {
                    if rows.bound_everywhere(var) {
                        add(var, acc);
                    }
                }
            }
            ExpKind::Node(_)
            | ExpKind::Filter(_)
            | ExpKind::Bind { .. }
            | ExpKind::Accept(_) => {}
        }
    }

    /// True when every variable of `filter` is bound by an edge, path, node,
    /// VALUES or BIND clause directly in this expression's body
    pub fn is_simple_bind(&self, filter: &Filter) -> bool {
        let mut local: Vec<Variable> = Vec::new();
        for exp in self.body() {
            match exp.kind() {
                ExpKind::Edge(pattern) => local.extend(pattern.variables()),
                ExpKind::Path(pattern) => local.extend(pattern.variables()),
                ExpKind::Node(Node::Var(var)) => local.push(var.clone()),
                ExpKind::Values(rows) => local.extend(rows.variables().iter().cloned()),
                ExpKind::Bind { variable, .. } => local.push(variable.clone()),
                _ => {}
            }
        }
        filter.variables().iter().all(|var| local.contains(var))
    }

    /// Filter classification for an OPTIONAL node, `None` for other nodes
    pub fn optional_scope(&self) -> Option<OptionalScope> {
        let ExpKind::Optional(first, rest) = self.kind() else {
            return None;
        };
        let mut scope = OptionalScope::default();
        for exp in rest.body() {
            match exp.kind() {
                ExpKind::Filter(filter) => {
                    if !rest.is_simple_bind(filter) {
                        scope.postponed.push((exp.id(), filter.clone()));
                    }
                }
                ExpKind::Optional(nested, _) | ExpKind::Minus(nested, _) => {
                    for inner in nested.body() {
                        if let ExpKind::Filter(filter) = inner.kind() {
                            if !nested.is_simple_bind(filter) {
                                scope.postponed.push((inner.id(), filter.clone()));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        scope.inscope = Self::inscope_filters(first, rest);
        Some(scope)
    }

    /// Filters of `rest` whose variables are bound both by `first` and by
    /// `rest`, BIND targets excluded
    fn inscope_filters(first: &Exp, rest: &Exp) -> Vec<Filter> {
        let first_nodes = first.in_subscope_nodes(false);
        let rest_nodes = rest.in_subscope_nodes(false);
        rest.body()
            .iter()
            .filter_map(Exp::as_filter)
            .filter(|filter| !filter.is_local())
            .filter(|filter| {
                filter
                    .variables()
                    .iter()
                    .all(|v| first_nodes.contains(v) && rest_nodes.contains(v))
            })
            .cloned()
            .collect()
    }
}
