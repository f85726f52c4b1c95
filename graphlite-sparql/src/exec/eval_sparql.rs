// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Set-at-a-time evaluator
//!
//! Every operator is evaluated bottom-up into a full [`Mappings`] and combined
//! with the algebra of the solution model. It shares the solver's context and
//! plan annotations but none of its search: no memory, no backjumping, no
//! DISTINCT pushdown. Used as a reference to cross-check the solver.

use std::collections::HashMap;

use crate::ast::{EdgePattern, Exp, ExpKind, Expr, Filter, Node, PathPattern, Query, Term, Variable};
use crate::binding::{Mapping, Mappings};
use crate::exec::modifiers;
use crate::exec::path::{path_bindings, PathEvaluator};
use crate::exec::{EvalContext, ExecutionError};

pub struct EvalSparql<'a> {
    ctx: &'a EvalContext<'a>,
}

impl<'a> EvalSparql<'a> {
    pub fn new(ctx: &'a EvalContext<'a>) -> Self {
        Self { ctx }
    }

    /// Solutions of `query.body`, before solution modifiers
    pub fn run(&self, query: &Query) -> Result<Mappings, ExecutionError> {
        self.eval(None, &query.body)
    }

    pub fn eval(&self, graph: Option<&Term>, exp: &Exp) -> Result<Mappings, ExecutionError> {
        self.extend(graph, Mappings::unit(), exp)
    }

    /// Extends every row of `current` with the solutions of `exp`
    fn extend(
        &self,
        graph: Option<&Term>,
        current: Mappings,
        exp: &Exp,
    ) -> Result<Mappings, ExecutionError> {
        if self.ctx.should_stop() {
            return Ok(Mappings::empty());
        }
        if current.is_empty() || exp.is_fail() {
            return Ok(Mappings::new(current.variables().to_vec()));
        }
        match exp.kind() {
            ExpKind::Bgp(args) | ExpKind::And(args) => {
                let mut current = current;
                for arg in args {
                    current = self.extend(graph, current, arg)?;
                    if current.is_empty() {
                        break;
                    }
                }
                Ok(current)
            }
            ExpKind::Union(first, rest) => {
                let left = self.extend(graph, current.clone(), first)?;
                let right = self.extend(graph, current, rest)?;
                Ok(left.union(&right))
            }
            ExpKind::Join(first, rest) => Ok(current.join(&self.join(graph, exp, first, rest)?)),
            ExpKind::Optional(first, rest) => {
                Ok(current.join(&self.optional(graph, exp, first, rest)?))
            }
            ExpKind::Minus(first, rest) => Ok(current.join(&self.minus(graph, exp, first, rest)?)),
            ExpKind::Graph { name, body } => self.graph(graph, current, exp, name, body),
            ExpKind::Service { endpoint, .. } => {
                let err = ExecutionError::UnsupportedOperator(format!("SERVICE {}", endpoint));
                if exp.is_silent() {
                    log::warn!("silent {}", err);
                    Ok(current)
                } else {
                    Err(err)
                }
            }
            ExpKind::Query(query) => Ok(current.join(&self.subquery(graph, query)?)),
            ExpKind::Edge(pattern) => self.edge(graph, current, pattern),
            ExpKind::Path(pattern) => self.path(graph, current, pattern),
            ExpKind::Node(node) => self.node(graph, current, node),
            ExpKind::Filter(filter) => {
                if self.ctx.annotations.is_postponed(exp.id()) {
                    Ok(current)
                } else {
                    self.filter(graph, current, filter)
                }
            }
            ExpKind::Values(rows) => Ok(current.join(rows)),
            ExpKind::Bind { variable, expr } => self.bind(graph, current, variable, expr),
            ExpKind::Accept(_) => Ok(current),
        }
    }

    fn join(
        &self,
        graph: Option<&Term>,
        exp: &Exp,
        first: &Exp,
        rest: &Exp,
    ) -> Result<Mappings, ExecutionError> {
        let map1 = self.eval(graph, first)?;
        if map1.is_empty() {
            self.ctx.visitor.join(exp, &map1, &Mappings::empty());
            return Ok(map1);
        }
        let map2 = self.eval(graph, rest)?;
        self.ctx.visitor.join(exp, &map1, &map2);
        Ok(map1.join(&map2))
    }

    fn optional(
        &self,
        graph: Option<&Term>,
        exp: &Exp,
        first: &Exp,
        rest: &Exp,
    ) -> Result<Mappings, ExecutionError> {
        let map1 = self.eval(graph, first)?;
        if map1.is_empty() {
            self.ctx.visitor.optional(exp, &map1, &Mappings::empty());
            return Ok(map1);
        }
        let map2 = self.eval(graph, rest)?;
        self.ctx.visitor.optional(exp, &map1, &map2);

        let scope = self.ctx.annotations.optional_scope(exp);
        let mut variables = map1.variables().to_vec();
        for var in map2.variables() {
            if !variables.contains(var) {
                variables.push(var.clone());
            }
        }
        let mut result = Mappings::new(variables);
        for left in &map1 {
            let mut nbsuc = 0usize;
            for right in &map2 {
                let Some(merged) = left.merge(right) else {
                    continue;
                };
                if !self.passes(graph, scope.postponed_filters(), &merged)? {
                    continue;
                }
                nbsuc += 1;
                result.push(merged);
            }
            if nbsuc == 0 {
                result.push(left.clone());
            }
        }
        Ok(result)
    }

    fn passes<'f>(
        &self,
        graph: Option<&Term>,
        filters: impl IntoIterator<Item = &'f Filter>,
        row: &Mapping,
    ) -> Result<bool, ExecutionError> {
        for filter in filters {
            if !self
                .ctx
                .evaluator
                .test(graph, filter, row, self.ctx.producer)?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn minus(
        &self,
        graph: Option<&Term>,
        exp: &Exp,
        first: &Exp,
        rest: &Exp,
    ) -> Result<Mappings, ExecutionError> {
        let map1 = self.eval(graph, first)?;
        if map1.is_empty() {
            self.ctx.visitor.minus(exp, &map1, &Mappings::empty());
            return Ok(map1);
        }
        let map2 = self.eval(graph, rest)?;
        self.ctx.visitor.minus(exp, &map1, &map2);
        Ok(map1.minus(&map2))
    }

    fn graph(
        &self,
        graph: Option<&Term>,
        current: Mappings,
        exp: &Exp,
        name: &Node,
        body: &Exp,
    ) -> Result<Mappings, ExecutionError> {
        let var = name.as_variable();
        let mut all_names: Option<Vec<Term>> = None;
        let mut results: HashMap<Term, Mappings> = HashMap::new();
        let mut out = Mappings::new(current.variables().to_vec());

        for row in current.into_rows() {
            let names = match (name, var.and_then(|var| row.get(var))) {
                (Node::Const(term), _) => vec![term.clone()],
                (_, Some(bound)) => vec![bound.clone()],
                (_, None) => match &all_names {
                    Some(names) => names.clone(),
                    None => match self.ctx.producer.graph_names(self.ctx.named) {
                        Ok(names) => {
                            all_names = Some(names.clone());
                            names
                        }
                        Err(err) if exp.is_silent() => {
                            log::warn!("silent GRAPH {}: {}", name, err);
                            out.push(row);
                            continue;
                        }
                        Err(err) => return Err(err),
                    },
                },
            };
            for graph_name in names {
                if !results.contains_key(&graph_name) {
                    let rows = match self.eval(Some(&graph_name), body) {
                        Ok(rows) => rows,
                        Err(err) if exp.is_silent() => {
                            log::warn!("silent GRAPH {}: {}", graph_name, err);
                            Mappings::unit()
                        }
                        Err(err) => return Err(err),
                    };
                    self.ctx.visitor.graph(exp, &graph_name, &rows);
                    results.insert(graph_name.clone(), rows);
                }
                let Some(rows) = results.get(&graph_name) else {
                    continue;
                };
                for right in rows {
                    let right = match var {
                        Some(var) => match right.with(var, &graph_name) {
                            Some(right) => right,
                            None => continue,
                        },
                        None => right.clone(),
                    };
                    if let Some(merged) = row.merge(&right) {
                        out.push(merged);
                    }
                }
            }
        }
        Ok(out)
    }

    fn subquery(&self, graph: Option<&Term>, query: &Query) -> Result<Mappings, ExecutionError> {
        let rows = self.eval(graph, &query.body)?;
        Ok(modifiers::apply(query, rows))
    }

    fn edge(
        &self,
        graph: Option<&Term>,
        current: Mappings,
        pattern: &EdgePattern,
    ) -> Result<Mappings, ExecutionError> {
        let mut out = Mappings::new(current.variables().to_vec());
        for row in &current {
            let quads = self
                .ctx
                .producer
                .edges(graph, self.ctx.from, pattern, row)?;
            for quad in &quads {
                let Some(pairs) = pattern.bind(quad) else {
                    continue;
                };
                if let Some(merged) = row.merge(&Mapping::from_pairs(pairs)) {
                    out.push(merged);
                }
            }
        }
        Ok(out)
    }

    fn path(
        &self,
        graph: Option<&Term>,
        current: Mappings,
        pattern: &PathPattern,
    ) -> Result<Mappings, ExecutionError> {
        let paths = PathEvaluator::new(self.ctx.producer, graph, self.ctx.from);
        let mut out = Mappings::new(current.variables().to_vec());
        for row in &current {
            for (subject, object) in paths.evaluate(pattern, row)? {
                let Some(bindings) = path_bindings(pattern, &subject, &object) else {
                    continue;
                };
                if let Some(merged) = row.merge(&Mapping::from_pairs(bindings)) {
                    out.push(merged);
                }
            }
        }
        Ok(out)
    }

    fn node(
        &self,
        graph: Option<&Term>,
        current: Mappings,
        node: &Node,
    ) -> Result<Mappings, ExecutionError> {
        let Node::Var(var) = node else {
            return Ok(current);
        };
        let nodes = self.ctx.producer.nodes(graph, self.ctx.from)?;
        let mut out = Mappings::new(current.variables().to_vec());
        for row in current.into_rows() {
            if row.is_bound(var) {
                out.push(row);
                continue;
            }
            for term in &nodes {
                if let Some(extended) = row.with(var, term) {
                    out.push(extended);
                }
            }
        }
        Ok(out)
    }

    fn filter(
        &self,
        graph: Option<&Term>,
        current: Mappings,
        filter: &Filter,
    ) -> Result<Mappings, ExecutionError> {
        let mut out = Mappings::new(current.variables().to_vec());
        for row in current.into_rows() {
            if self
                .ctx
                .evaluator
                .test(graph, filter, &row, self.ctx.producer)?
            {
                out.push(row);
            }
        }
        Ok(out)
    }

    fn bind(
        &self,
        graph: Option<&Term>,
        current: Mappings,
        variable: &Variable,
        expr: &Expr,
    ) -> Result<Mappings, ExecutionError> {
        let mut out = Mappings::new(current.variables().to_vec());
        for row in current.into_rows() {
            match self
                .ctx
                .evaluator
                .eval(graph, expr, &row, self.ctx.producer)?
            {
                None => out.push(row),
                Some(value) => {
                    if let Some(extended) = row.with(variable, &value) {
                        out.push(extended);
                    }
                }
            }
        }
        Ok(out)
    }
}
