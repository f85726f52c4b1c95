// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Backtracking solver
//!
//! [`Eval::eval`] walks the continuation stack one clause per level. Leaf
//! clauses extend the [`Memory`] with each candidate binding and recurse into
//! the next level; groups and UNION branches are flattened into the stack;
//! JOIN, OPTIONAL, MINUS, GRAPH and sub-queries materialize their operands
//! with a nested evaluation and push the resulting rows.
//!
//! Every frame returns a [`Backtrack`]. A frame at level `n` receiving
//! `BackjumpTo(k)` with `k < n` returns it unchanged, so an edge without any
//! candidate skips every choice point that cannot change its outcome.

use std::collections::{HashMap, HashSet};

use crate::ast::{EdgePattern, Exp, ExpId, ExpKind, Expr, Filter, Node, PathPattern, Query, Term, Variable};
use crate::binding::{Environment, Mapping, Mappings};
use crate::exec::memory::Memory;
use crate::exec::modifiers;
use crate::exec::path::{path_bindings, PathEvaluator};
use crate::exec::stack::Stack;
use crate::exec::{EvalContext, ExecutionError};

/// Outcome of one solver frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backtrack {
    /// Try the next candidate
    Continue,
    /// Unwind every frame above the given level
    BackjumpTo(usize),
    /// Unwind everything: LIMIT reached, cancelled or timed out
    Stop,
}

impl Backtrack {
    /// True when the frame at level `n` must return this outcome to its caller
    pub fn unwinds(&self, n: usize) -> bool {
        match self {
            Backtrack::Continue => false,
            Backtrack::BackjumpTo(level) => *level < n,
            Backtrack::Stop => true,
        }
    }
}

pub struct Eval<'c> {
    pub(crate) ctx: &'c EvalContext<'c>,
    pub(crate) memory: Memory,
    results: Mappings,
    /// Seed rows of this evaluation, also handed to a composite at level 0
    pub(crate) data: Option<&'c Mappings>,
    limit: Option<usize>,
    limit_reached: bool,
    accepted: HashMap<Variable, HashSet<Term>>,
}

impl<'c> Eval<'c> {
    pub fn new(ctx: &'c EvalContext<'c>) -> Self {
        Self {
            ctx,
            memory: Memory::new(),
            results: Mappings::empty(),
            data: None,
            limit: None,
            limit_reached: false,
            accepted: HashMap::new(),
        }
    }

    /// Stops the search once `limit` solutions are recorded
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    /// Solutions of `query.body`, before solution modifiers
    pub fn run(&mut self, query: &Query) -> Result<Mappings, ExecutionError> {
        if self.limit.is_none() {
            self.limit = modifiers::early_limit(query);
        }
        self.evaluate(None, &query.body, None)
    }

    /// Solutions of `exp`, each extending one row of `data` when given
    pub fn evaluate(
        &mut self,
        graph: Option<&Term>,
        exp: &Exp,
        data: Option<&'c Mappings>,
    ) -> Result<Mappings, ExecutionError> {
        let stack = Stack::new(exp);
        self.data = data;
        match data {
            None => {
                self.eval(graph, &stack, 0)?;
            }
            Some(rows) => {
                for row in rows {
                    if !self.memory.push(row, 0) {
                        continue;
                    }
                    let result = self.eval(graph, &stack, 0);
                    self.memory.pop(row);
                    if result? == Backtrack::Stop {
                        break;
                    }
                }
            }
        }
        Ok(std::mem::take(&mut self.results))
    }

    /// Materializes `exp` with a fresh environment
    pub(crate) fn sub_eval(
        &self,
        graph: Option<&Term>,
        exp: &Exp,
        data: Option<&Mappings>,
    ) -> Result<Mappings, ExecutionError> {
        let mut child = Eval::new(self.ctx);
        child.evaluate(graph, exp, data)
    }

    /// Evaluates a nested query with its own modifiers
    pub(crate) fn subquery(
        &self,
        graph: Option<&Term>,
        query: &Query,
    ) -> Result<Mappings, ExecutionError> {
        let mut child = Eval::new(self.ctx).with_limit(modifiers::early_limit(query));
        let rows = child.evaluate(graph, &query.body, None)?;
        Ok(modifiers::apply(query, rows))
    }

    /// Seed rows visible to the composite at level `n`
    pub(crate) fn level_data(&self, n: usize) -> Option<&'c Mappings> {
        if n == 0 {
            self.data
        } else {
            None
        }
    }

    pub(crate) fn eval<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        if self.ctx.should_stop() {
            return Ok(Backtrack::Stop);
        }
        let Some(exp) = stack.get(n) else {
            return Ok(self.record());
        };
        if exp.is_fail() {
            return Ok(Backtrack::Continue);
        }
        match exp.kind() {
            ExpKind::Bgp(args) | ExpKind::And(args) => self.eval(graph, &stack.expand(n, args), n),
            ExpKind::Union(first, rest) => self.eval_union(graph, stack, first, rest, n),
            ExpKind::Join(..) => self.eval_join(graph, stack, exp, n),
            ExpKind::Optional(..) => self.eval_optional(graph, stack, exp, n),
            ExpKind::Minus(..) => self.eval_minus(graph, stack, exp, n),
            ExpKind::Graph { name, body } => self.eval_graph(graph, stack, exp, name, body, n),
            ExpKind::Service { endpoint, .. } => self.eval_service(graph, stack, exp, endpoint, n),
            ExpKind::Query(query) => {
                let rows = self.subquery(graph, query)?;
                self.push_rows(graph, stack, n, &rows)
            }
            ExpKind::Edge(pattern) => self.eval_edge(graph, stack, pattern, n),
            ExpKind::Path(pattern) => self.eval_path(graph, stack, pattern, n),
            ExpKind::Node(node) => self.eval_node(graph, stack, node, n),
            ExpKind::Filter(filter) => self.eval_filter(graph, stack, exp.id(), filter, n),
            ExpKind::Values(rows) => self.push_rows(graph, stack, n, rows),
            ExpKind::Bind { variable, expr } => self.eval_bind(graph, stack, variable, expr, n),
            ExpKind::Accept(var) => self.eval_accept(graph, stack, var, n),
        }
    }

    fn record(&mut self) -> Backtrack {
        if self.limit.map_or(false, |limit| self.results.len() >= limit) {
            self.limit_reached = true;
            return Backtrack::Stop;
        }
        self.results.push(self.memory.to_mapping());
        if self.limit.map_or(false, |limit| self.results.len() >= limit) {
            log::debug!("limit of {} solutions reached", self.results.len());
            self.limit_reached = true;
            return Backtrack::Stop;
        }
        Backtrack::Continue
    }

    /// Pushes `row` at level `n` and evaluates the continuation
    pub(crate) fn push_and_continue<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        n: usize,
        row: &Mapping,
    ) -> Result<Backtrack, ExecutionError> {
        if !self.memory.push(row, n) {
            return Ok(Backtrack::Continue);
        }
        let result = self.eval(graph, stack, n + 1);
        self.memory.pop(row);
        result
    }

    fn push_pairs_and_continue<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        n: usize,
        pairs: &[(Variable, Term)],
    ) -> Result<Option<Backtrack>, ExecutionError> {
        if !self.memory.push_pairs(pairs, n) {
            return Ok(None);
        }
        let result = self.eval(graph, stack, n + 1);
        self.memory.pop_pairs(pairs);
        result.map(Some)
    }

    pub(crate) fn push_rows<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        n: usize,
        rows: &Mappings,
    ) -> Result<Backtrack, ExecutionError> {
        for row in rows {
            if self.ctx.should_stop() {
                return Ok(Backtrack::Stop);
            }
            let result = self.push_and_continue(graph, stack, n, row)?;
            if result.unwinds(n) {
                return Ok(result);
            }
        }
        Ok(Backtrack::Continue)
    }

    fn eval_union<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        first: &'p Exp,
        rest: &'p Exp,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        for branch in [first, rest] {
            let result = self.eval(graph, &stack.branch(n, branch), n)?;
            if result.unwinds(n) {
                return Ok(result);
            }
        }
        Ok(Backtrack::Continue)
    }

    fn eval_edge<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        pattern: &EdgePattern,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        let edges = self
            .ctx
            .producer
            .edges(graph, self.ctx.from, pattern, &self.memory)?;
        let mut pushed = 0usize;
        for quad in &edges {
            if self.ctx.should_stop() {
                return Ok(Backtrack::Stop);
            }
            let Some(pairs) = pattern.bind(quad) else {
                continue;
            };
            let Some(result) = self.push_pairs_and_continue(graph, stack, n, &pairs)? else {
                continue;
            };
            pushed += 1;
            if result.unwinds(n) {
                return Ok(result);
            }
        }
        if pushed == 0 && self.ctx.config.backjump {
            return Ok(self.backjump_target(&pattern.variables(), stack, n));
        }
        Ok(Backtrack::Continue)
    }

    /// Where to resume after a clause over `vars` found no candidate: the
    /// deepest level binding one of them, never below the stack barrier
    fn backjump_target(&self, vars: &[Variable], stack: &Stack<'_>, n: usize) -> Backtrack {
        let deepest = vars.iter().filter_map(|var| self.memory.level_of(var)).max();
        let level = deepest.unwrap_or(0).max(stack.barrier());
        if level + 1 >= n {
            Backtrack::Continue
        } else {
            log::trace!("backjump from level {} to {}", n, level);
            Backtrack::BackjumpTo(level)
        }
    }

    fn eval_path<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        pattern: &PathPattern,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        let pairs = PathEvaluator::new(self.ctx.producer, graph, self.ctx.from)
            .evaluate(pattern, &self.memory)?;
        for (subject, object) in &pairs {
            if self.ctx.should_stop() {
                return Ok(Backtrack::Stop);
            }
            let Some(bindings) = path_bindings(pattern, subject, object) else {
                continue;
            };
            if let Some(result) = self.push_pairs_and_continue(graph, stack, n, &bindings)? {
                if result.unwinds(n) {
                    return Ok(result);
                }
            }
        }
        Ok(Backtrack::Continue)
    }

    fn eval_node<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        node: &Node,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        let var = match node {
            Node::Var(var) if !self.memory.is_bound(var) => var,
            _ => return self.eval(graph, stack, n + 1),
        };
        let nodes = self.ctx.producer.nodes(graph, self.ctx.from)?;
        for term in nodes {
            if self.ctx.should_stop() {
                return Ok(Backtrack::Stop);
            }
            let pairs = [(var.clone(), term)];
            if let Some(result) = self.push_pairs_and_continue(graph, stack, n, &pairs)? {
                if result.unwinds(n) {
                    return Ok(result);
                }
            }
        }
        Ok(Backtrack::Continue)
    }

    fn eval_filter<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        id: ExpId,
        filter: &Filter,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        // checked by the enclosing OPTIONAL once its rows are merged
        if self.ctx.annotations.is_postponed(id) {
            return self.eval(graph, stack, n + 1);
        }
        if self
            .ctx
            .evaluator
            .test(graph, filter, &self.memory, self.ctx.producer)?
        {
            self.eval(graph, stack, n + 1)
        } else {
            Ok(Backtrack::Continue)
        }
    }

    fn eval_bind<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        variable: &Variable,
        expr: &Expr,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        let value = self
            .ctx
            .evaluator
            .eval(graph, expr, &self.memory, self.ctx.producer)?;
        match value {
            None => self.eval(graph, stack, n + 1),
            Some(value) => {
                let pairs = [(variable.clone(), value)];
                Ok(self
                    .push_pairs_and_continue(graph, stack, n, &pairs)?
                    .unwrap_or(Backtrack::Continue))
            }
        }
    }

    /// DISTINCT pushdown: a value of `var` that already led to a solution is
    /// not explored again
    fn eval_accept<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        var: &Variable,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        let Some(value) = self.memory.get(var).cloned() else {
            return self.eval(graph, stack, n + 1);
        };
        if self
            .accepted
            .get(var)
            .map_or(false, |seen| seen.contains(&value))
        {
            return Ok(Backtrack::Continue);
        }
        let before = self.results.len();
        let result = self.eval(graph, stack, n + 1)?;
        if self.results.len() > before {
            self.accepted.entry(var.clone()).or_default().insert(value);
        }
        Ok(result)
    }

    fn eval_graph<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        exp: &'p Exp,
        name: &'p Node,
        body: &'p Exp,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        let names = match self.graph_names(name) {
            Ok(names) => names,
            Err(err) if exp.is_silent() => {
                log::warn!("silent GRAPH {}: {}", name, err);
                return self.eval(graph, stack, n + 1);
            }
            Err(err) => return Err(err),
        };
        for graph_name in &names {
            if self.ctx.should_stop() {
                return Ok(Backtrack::Stop);
            }
            let results = match self.sub_eval(Some(graph_name), body, None) {
                Ok(results) => results,
                Err(err) if exp.is_silent() => {
                    log::warn!("silent GRAPH {}: {}", graph_name, err);
                    Mappings::unit()
                }
                Err(err) => return Err(err),
            };
            self.ctx.visitor.graph(exp, graph_name, &results);
            log::debug!("GRAPH {}: {} rows", graph_name, results.len());
            for row in &results {
                let row = match name.as_variable() {
                    Some(var) => match row.with(var, graph_name) {
                        Some(row) => row,
                        None => continue,
                    },
                    None => row.clone(),
                };
                let result = self.push_and_continue(graph, stack, n, &row)?;
                if result.unwinds(n) {
                    return Ok(result);
                }
            }
        }
        Ok(Backtrack::Continue)
    }

    fn graph_names(&self, name: &Node) -> Result<Vec<Term>, ExecutionError> {
        match name {
            Node::Const(term) => Ok(vec![term.clone()]),
            Node::Var(var) => match self.memory.get(var) {
                Some(term) => Ok(vec![term.clone()]),
                None => self.ctx.producer.graph_names(self.ctx.named),
            },
        }
    }

    fn eval_service<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        exp: &Exp,
        endpoint: &Node,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        let err = ExecutionError::UnsupportedOperator(format!("SERVICE {}", endpoint));
        if exp.is_silent() {
            log::warn!("silent {}", err);
            return self.eval(graph, stack, n + 1);
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Quad;
    use crate::config::EngineConfig;
    use crate::exec::ExprEvaluator;
    use crate::plan::PlanAnnotations;
    use crate::storage::MemoryStore;

    fn iri(value: &str) -> Term {
        Term::iri(value)
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(Quad::new(iri("a"), iri("p"), iri("b")));
        store.insert(Quad::new(iri("a"), iri("p"), iri("c")));
        store.insert(Quad::new(iri("b"), iri("q"), iri("d")));
        store.insert(Quad::new(iri("x"), iri("p"), iri("y")).in_graph(iri("g1")));
        store
    }

    fn solve(store: &MemoryStore, body: &Exp, config: &EngineConfig) -> Result<Mappings, ExecutionError> {
        let annotations = PlanAnnotations::build(body);
        let ctx = EvalContext::new(store, &ExprEvaluator, &annotations, config);
        Eval::new(&ctx).evaluate(None, body, None)
    }

    #[test]
    fn should_only_unwind_frames_above_target() {
        assert!(Backtrack::Stop.unwinds(0));
        assert!(Backtrack::BackjumpTo(2).unwinds(3));
        assert!(!Backtrack::BackjumpTo(3).unwinds(3));
        assert!(!Backtrack::Continue.unwinds(5));
    }

    #[test]
    fn should_chain_edges_through_shared_variable() {
        let body = Exp::bgp(vec![
            Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y")),
            Exp::triple(Node::var("y"), Node::iri("q"), Node::var("z")),
        ]);
        let rows = solve(&store(), &body, &EngineConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.rows()[0].get_by_name("z"), Some(&iri("d")));
    }

    #[test]
    fn should_evaluate_union_branches_inline() {
        let body = Exp::bgp(vec![Exp::union(
            Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y")),
            Exp::triple(Node::var("x"), Node::iri("q"), Node::var("y")),
        )]);
        let rows = solve(&store(), &body, &EngineConfig::default()).unwrap();
        // the default graph covers the named graph edge too
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn should_bind_graph_variable() {
        let body = Exp::bgp(vec![Exp::graph(
            Node::var("g"),
            Exp::bgp(vec![Exp::triple(Node::var("s"), Node::iri("p"), Node::var("o"))]),
        )]);
        let rows = solve(&store(), &body, &EngineConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.rows()[0].get_by_name("g"), Some(&iri("g1")));
    }

    #[test]
    fn should_reject_service_unless_silent() {
        let service = Exp::service(Node::iri("http://remote"), Exp::bgp(Vec::new()));
        let body = Exp::bgp(vec![service]);
        let result = solve(&store(), &body, &EngineConfig::default());
        assert!(matches!(result, Err(ExecutionError::UnsupportedOperator(_))));

        let silent = Exp::bgp(vec![Exp::service(Node::iri("http://remote"), Exp::bgp(Vec::new())).silent()]);
        let rows = solve(&store(), &silent, &EngineConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn should_keep_bind_unbound_on_expression_error() {
        let body = Exp::bgp(vec![
            Exp::triple(Node::iri("a"), Node::iri("p"), Node::var("y")),
            Exp::bind(
                Variable::new("n"),
                Expr::lt(Expr::var("y"), Expr::constant(Term::integer(1))),
            ),
        ]);
        let rows = solve(&store(), &body, &EngineConfig::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.get_by_name("n").is_none()));
    }

    #[test]
    fn should_stop_at_limit() {
        let store = store();
        let body = Exp::bgp(vec![Exp::triple(Node::var("x"), Node::var("p"), Node::var("y"))]);
        let annotations = PlanAnnotations::build(&body);
        let config = EngineConfig::default();
        let ctx = EvalContext::new(&store, &ExprEvaluator, &annotations, &config);
        let mut eval = Eval::new(&ctx).with_limit(Some(2));
        let rows = eval.evaluate(None, &body, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(eval.limit_reached());
    }

    #[test]
    fn should_backjump_past_independent_choice_points() {
        // ?x and ?y range over all p-edges; the last edge only depends on ?x
        let body = Exp::bgp(vec![
            Exp::triple(Node::var("x"), Node::iri("p"), Node::var("o1")),
            Exp::triple(Node::var("y"), Node::iri("p"), Node::var("o2")),
            Exp::triple(Node::var("x"), Node::iri("missing"), Node::var("z")),
        ]);
        let naive = EngineConfig {
            backjump: false,
            ..EngineConfig::default()
        };
        assert!(solve(&store(), &body, &EngineConfig::default()).unwrap().is_empty());
        assert!(solve(&store(), &body, &naive).unwrap().is_empty());
    }
}
