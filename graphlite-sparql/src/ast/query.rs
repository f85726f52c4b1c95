// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query metadata attached to a compiled pattern

use std::collections::HashMap;

use super::exp::{Exp, ExpId};
use super::term::{Term, Variable};

/// ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCondition {
    pub variable: Variable,
    pub descending: bool,
}

/// A compiled query: the pattern body plus solution modifiers and dataset
#[derive(Debug, Clone)]
pub struct Query {
    pub body: Exp,
    /// Projected variables, empty for `SELECT *`
    pub select: Vec<Variable>,
    pub distinct: bool,
    pub order_by: Vec<OrderCondition>,
    pub group_by: Vec<Variable>,
    pub offset: usize,
    pub limit: Option<usize>,
    /// Graphs forming the default graph, empty for the whole store
    pub from: Vec<Term>,
    /// Graphs GRAPH clauses may range over, empty for every named graph
    pub named: Vec<Term>,
    definitions: HashMap<ExpId, Query>,
    info: Vec<(String, String)>,
}

impl Query {
    pub fn new(body: Exp) -> Self {
        Self {
            body,
            select: Vec::new(),
            distinct: false,
            order_by: Vec::new(),
            group_by: Vec::new(),
            offset: 0,
            limit: None,
            from: Vec::new(),
            named: Vec::new(),
            definitions: HashMap::new(),
            info: Vec::new(),
        }
    }

    pub fn select(mut self, vars: &[&str]) -> Self {
        self.select = vars.iter().map(|name| Variable::new(name)).collect();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn order_by(mut self, name: &str, descending: bool) -> Self {
        self.order_by.push(OrderCondition {
            variable: Variable::new(name),
            descending,
        });
        self
    }

    pub fn group_by(mut self, vars: &[&str]) -> Self {
        self.group_by = vars.iter().map(|name| Variable::new(name)).collect();
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn from_graph(mut self, graph: Term) -> Self {
        self.from.push(graph);
        self
    }

    pub fn named_graph(mut self, graph: Term) -> Self {
        self.named.push(graph);
        self
    }

    /// Attaches a definition query checked against the given edge clause
    pub fn with_definition(mut self, edge: ExpId, definition: Query) -> Self {
        self.definitions.insert(edge, definition);
        self
    }

    pub fn definition(&self, edge: ExpId) -> Option<&Query> {
        self.definitions.get(&edge)
    }

    /// Variables returned by the query
    pub fn projection(&self) -> Vec<Variable> {
        if self.select.is_empty() {
            self.body.in_scope_nodes()
        } else {
            self.select.clone()
        }
    }

    /// Variables recorded for each solution before modifiers apply
    pub fn recorded_variables(&self) -> Vec<Variable> {
        let mut vars = self.body.in_scope_nodes();
        for var in self
            .select
            .iter()
            .chain(self.order_by.iter().map(|c| &c.variable))
            .chain(self.group_by.iter())
        {
            if !vars.contains(var) {
                vars.push(var.clone());
            }
        }
        vars
    }

    /// True when LIMIT can cut the search short
    pub fn has_early_limit(&self) -> bool {
        self.limit.is_some() && self.order_by.is_empty() && self.group_by.is_empty()
    }

    pub fn add_info(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.info.push((key.into(), message.into()));
    }

    pub fn info(&self) -> &[(String, String)] {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    #[test]
    fn should_project_in_scope_nodes_for_select_star() {
        let body = Exp::bgp(vec![Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y"))]);
        let query = Query::new(body);
        let names: Vec<_> = query.projection().iter().map(|v| v.name().to_string()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn should_record_order_variables_outside_projection() {
        let body = Exp::bgp(vec![Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y"))]);
        let query = Query::new(body).select(&["x"]).order_by("w", false);
        assert_eq!(query.recorded_variables().len(), 3);
        assert!(!query.has_early_limit());
    }
}
