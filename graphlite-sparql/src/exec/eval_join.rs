// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! JOIN and MINUS frames of the solver
//!
//! Both operands are materialized, then each accepted combination is pushed
//! at the frame's level and the continuation is evaluated. Joins on a shared
//! variable run as a sort-merge over the larger operand; rows leaving the
//! variable unbound are compatible with every row of the other side and are
//! visited explicitly.

use std::borrow::Cow;

use crate::ast::{Exp, Term, Variable};
use crate::binding::{Mapping, MappingSet, Mappings};
use crate::exec::eval::{Backtrack, Eval};
use crate::exec::stack::Stack;
use crate::exec::ExecutionError;

impl<'c> Eval<'c> {
    pub(crate) fn eval_join<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        exp: &'p Exp,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        let Some((first, rest)) = exp.operands() else {
            return Err(ExecutionError::MalformedPlan(format!("{} without operands", exp.exp_type())));
        };
        let data = self.level_data(n);
        let map1 = self.sub_eval(graph, first, data)?;
        if map1.is_empty() {
            self.ctx.visitor.join(exp, &map1, &Mappings::empty());
            return Ok(Backtrack::Continue);
        }
        if self.ctx.should_stop() {
            return Ok(Backtrack::Stop);
        }

        let seed = if self.ctx.config.join_mappings && rest.is_evaluable_with_mappings() {
            // join(values ?s { ... }, service ?s { ... }): the outer rows
            // reach the right operand through the VALUES rows
            let extended = match data {
                Some(data) if first.is_values_only() => Cow::Owned(map1.join(data)),
                _ => Cow::Borrowed(&map1),
            };
            MappingSet::new(&extended).prepare_mappings_rest(&rest.in_subscope_nodes(false))
        } else {
            None
        };
        let map2 = self.sub_eval(graph, rest, seed.as_ref())?;
        self.ctx.visitor.join(exp, &map1, &map2);
        if map2.is_empty() {
            return Ok(Backtrack::Continue);
        }
        log::debug!("JOIN {}: {} x {} rows", exp.id(), map1.len(), map2.len());
        self.join_rows(graph, stack, n, &map1, &map2)
    }

    fn join_rows<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        n: usize,
        map1: &Mappings,
        map2: &Mappings,
    ) -> Result<Backtrack, ExecutionError> {
        let (outer, inner) = if map1.len() <= map2.len() {
            (map1, map2)
        } else {
            (map2, map1)
        };
        match map1.common_variable(map2).cloned() {
            None => {
                for left in outer {
                    for right in inner {
                        if self.ctx.should_stop() {
                            return Ok(Backtrack::Stop);
                        }
                        let result = self.push_both(graph, stack, n, left, right)?;
                        if result.unwinds(n) {
                            return Ok(result);
                        }
                    }
                }
            }
            Some(var) => {
                let mut sorted = inner.clone();
                sorted.sort_by(&var);
                for left in outer {
                    let result = self.merge_run(graph, stack, n, left, &sorted, &var)?;
                    if result.unwinds(n) {
                        return Ok(result);
                    }
                }
            }
        }
        Ok(Backtrack::Continue)
    }

    /// Pushes `left` with every row of `sorted` it may merge with
    fn merge_run<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        n: usize,
        left: &Mapping,
        sorted: &Mappings,
        var: &Variable,
    ) -> Result<Backtrack, ExecutionError> {
        for right in sorted.candidates(left.get(var), var) {
            if self.ctx.should_stop() {
                return Ok(Backtrack::Stop);
            }
            let result = self.push_both(graph, stack, n, left, right)?;
            if result.unwinds(n) {
                return Ok(result);
            }
        }
        Ok(Backtrack::Continue)
    }

    fn push_both<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        n: usize,
        left: &Mapping,
        right: &Mapping,
    ) -> Result<Backtrack, ExecutionError> {
        if !self.memory.push(left, n) {
            return Ok(Backtrack::Continue);
        }
        let result = if self.memory.push(right, n) {
            let result = self.eval(graph, stack, n + 1);
            self.memory.pop(right);
            result
        } else {
            Ok(Backtrack::Continue)
        };
        self.memory.pop(left);
        result
    }

    pub(crate) fn eval_minus<'p>(
        &mut self,
        graph: Option<&Term>,
        stack: &Stack<'p>,
        exp: &'p Exp,
        n: usize,
    ) -> Result<Backtrack, ExecutionError> {
        let Some((first, rest)) = exp.operands() else {
            return Err(ExecutionError::MalformedPlan(format!("{} without operands", exp.exp_type())));
        };
        let map1 = self.sub_eval(graph, first, self.level_data(n))?;
        if map1.is_empty() {
            self.ctx.visitor.minus(exp, &map1, &Mappings::empty());
            return Ok(Backtrack::Continue);
        }
        let map2 = self.sub_eval(graph, rest, None)?;
        self.ctx.visitor.minus(exp, &map1, &map2);
        log::debug!("MINUS {}: {} - {} rows", exp.id(), map1.len(), map2.len());
        for left in &map1 {
            if self.ctx.should_stop() {
                return Ok(Backtrack::Stop);
            }
            if map2.iter().any(|right| left.minus_compatible(right)) {
                continue;
            }
            let result = self.push_and_continue(graph, stack, n, left)?;
            if result.unwinds(n) {
                return Ok(result);
            }
        }
        Ok(Backtrack::Continue)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Exp, Expr, Node, Quad, Term, Variable};
    use crate::binding::{Mapping, Mappings};
    use crate::config::EngineConfig;
    use crate::exec::{Eval, EvalContext, ExprEvaluator, TraceEvent, TraceVisitor};
    use crate::plan::PlanAnnotations;
    use crate::storage::MemoryStore;

    fn iri(value: &str) -> Term {
        Term::iri(value)
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for (s, p, o) in [
            ("a", "p", "b"),
            ("c", "p", "d"),
            ("b", "q", "e"),
            ("d", "q", "f"),
            ("d", "q", "g"),
            ("a", "r", "h"),
        ] {
            store.insert(Quad::new(iri(s), iri(p), iri(o)));
        }
        store
    }

    fn solve(body: &Exp, visitor: &TraceVisitor) -> Mappings {
        solve_with(body, visitor, &EngineConfig::default(), None)
    }

    fn solve_with(
        body: &Exp,
        visitor: &TraceVisitor,
        config: &EngineConfig,
        data: Option<&Mappings>,
    ) -> Mappings {
        let store = store();
        let annotations = PlanAnnotations::build(body);
        let ctx = EvalContext::new(&store, &ExprEvaluator, &annotations, config).with_visitor(visitor);
        Eval::new(&ctx).evaluate(None, body, data).unwrap()
    }

    fn edge(s: &str, p: &str, o: &str) -> Exp {
        Exp::triple(Node::var(s), Node::iri(p), Node::var(o))
    }

    /// `{ JOIN({ ?y q ?z }, {}) }`, a right operand accepting seed rows
    fn seedable_rest() -> Exp {
        Exp::bgp(vec![Exp::join(Exp::bgp(vec![edge("y", "q", "z")]), Exp::bgp(vec![]))])
    }

    #[test]
    fn should_merge_join_on_shared_variable() {
        let join = Exp::join(
            Exp::bgp(vec![Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y"))]),
            Exp::bgp(vec![Exp::triple(Node::var("y"), Node::iri("q"), Node::var("z"))]),
        );
        let visitor = TraceVisitor::new();
        let rows = solve(&Exp::bgp(vec![join]), &visitor);
        assert_eq!(rows.len(), 3);
        assert!(matches!(
            visitor.events().as_slice(),
            [TraceEvent::Join { left: 2, right: 3, .. }]
        ));
    }

    #[test]
    fn should_build_cartesian_product_without_shared_variable() {
        let join = Exp::join(
            Exp::bgp(vec![Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y"))]),
            Exp::bgp(vec![Exp::triple(Node::var("s"), Node::iri("q"), Node::var("o"))]),
        );
        let rows = solve(&Exp::bgp(vec![join]), &TraceVisitor::new());
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn should_evaluate_filter_only_operand_on_its_own() {
        // the filter sees ?x unbound, so the right operand has no row
        let join = Exp::join(
            Exp::bgp(vec![edge("x", "p", "y")]),
            Exp::bgp(vec![Exp::filter(Expr::eq(
                Expr::var("x"),
                Expr::constant(iri("a")),
            ))]),
        );
        let visitor = TraceVisitor::new();
        let rows = solve(&Exp::bgp(vec![join]), &visitor);
        assert!(rows.is_empty());
        assert!(matches!(
            visitor.events().as_slice(),
            [TraceEvent::Join { left: 2, right: 0, .. }]
        ));
    }

    #[test]
    fn should_not_multiply_duplicate_left_rows_when_seeding() {
        let twice = Exp::union(
            Exp::bgp(vec![edge("x", "p", "y")]),
            Exp::bgp(vec![edge("x", "p", "y")]),
        );
        let join = Exp::bgp(vec![Exp::join(Exp::bgp(vec![twice]), seedable_rest())]);
        for join_mappings in [true, false] {
            let config = EngineConfig {
                join_mappings,
                ..EngineConfig::default()
            };
            let rows = solve_with(&join, &TraceVisitor::new(), &config, None);
            // (a p b) twice with b q e, (c p d) twice with d q f and d q g
            assert_eq!(rows.len(), 6, "join_mappings = {}", join_mappings);
        }
    }

    #[test]
    fn should_seed_right_operand_with_left_projection() {
        let join = Exp::bgp(vec![Exp::join(
            Exp::bgp(vec![Exp::triple(Node::iri("a"), Node::iri("p"), Node::var("y"))]),
            seedable_rest(),
        )]);
        let visitor = TraceVisitor::new();
        let rows = solve_with(&join, &visitor, &EngineConfig::default(), None);
        assert_eq!(rows.len(), 1);
        // only ?y = b reaches the right operand
        assert!(matches!(
            visitor.events().last(),
            Some(TraceEvent::Join { left: 1, right: 1, .. })
        ));

        let unseeded = EngineConfig {
            join_mappings: false,
            ..EngineConfig::default()
        };
        visitor.clear();
        let rows = solve_with(&join, &visitor, &unseeded, None);
        assert_eq!(rows.len(), 1);
        assert!(matches!(
            visitor.events().last(),
            Some(TraceEvent::Join { left: 1, right: 3, .. })
        ));
    }

    #[test]
    fn should_pass_outer_rows_through_values_to_right_operand() {
        let s = Variable::new("s");
        let values = Mappings::from_rows(
            vec![s.clone()],
            vec![
                Mapping::from_pairs(vec![(s.clone(), iri("a"))]),
                Mapping::from_pairs(vec![(s.clone(), iri("c"))]),
            ],
        );
        let rest = Exp::bgp(vec![Exp::join(
            Exp::bgp(vec![edge("s", "p", "y")]),
            Exp::bgp(vec![edge("y", "q", "z")]),
        )]);
        let join = Exp::join(Exp::values(values), rest);
        let data = Mappings::from_rows(
            vec![s.clone()],
            vec![Mapping::from_pairs(vec![(s, iri("c"))])],
        );

        let visitor = TraceVisitor::new();
        let rows = solve_with(&join, &visitor, &EngineConfig::default(), Some(&data));
        // c p d, then d q f and d q g
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.get_by_name("s") == Some(&iri("c"))));
        assert!(matches!(
            visitor.events().last(),
            Some(TraceEvent::Join { left: 1, right: 2, .. })
        ));
    }

    #[test]
    fn should_remove_compatible_rows_with_minus() {
        let minus = Exp::minus(
            Exp::bgp(vec![Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y"))]),
            Exp::bgp(vec![Exp::triple(Node::var("x"), Node::iri("r"), Node::var("w"))]),
        );
        let rows = solve(&Exp::bgp(vec![minus]), &TraceVisitor::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.rows()[0].get_by_name("x"), Some(&iri("c")));
    }

    #[test]
    fn should_keep_all_rows_when_minus_shares_nothing() {
        let minus = Exp::minus(
            Exp::bgp(vec![Exp::triple(Node::var("x"), Node::iri("p"), Node::var("y"))]),
            Exp::bgp(vec![Exp::triple(Node::var("s"), Node::iri("r"), Node::var("o"))]),
        );
        let rows = solve(&Exp::bgp(vec![minus]), &TraceVisitor::new());
        assert_eq!(rows.len(), 2);
    }
}
