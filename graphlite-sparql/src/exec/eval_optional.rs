// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! OPTIONAL frame of the solver
//!
//! The right operand is evaluated once, seeded with the left rows projected
//! on the variables it shares with them. Filters of the right operand come in
//! two kinds:
//! - in-scope filters only read variables bound on both sides and are tested
//!   on the seed rows before the right operand runs;
//! - postponed filters read variables the right operand alone does not bind,
//!   so the solver skips them and they are tested here on every merged row.
//!
//! A left row that merges with no right row, or whose merges all fail a
//! postponed filter, is kept alone.

use crate::ast::{Exp, OptionalScope, Term};
use crate::binding::{CandidateSet, Environment, MappingSet, Mappings};
use crate::exec::eval::{Backtrack, Eval};
use crate::exec::stack::Stack;
use crate::exec::ExecutionError;

impl<'c> Eval<'c> {
    pub(crate) fn eval_optional<'p>(
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
            self.ctx.visitor.optional(exp, &map1, &Mappings::empty());
            return Ok(Backtrack::Continue);
        }

        let annotations = self.ctx.annotations;
        let scope = annotations.optional_scope(exp);
        let rest_nodes = annotations.rest_nodes(exp);
        let mut seeds = MappingSet::new(&map1).prepare_mappings_rest(&rest_nodes);
        if let Some(rows) = seeds.take() {
            seeds = Some(self.inscope_filter(graph, &scope, rows)?);
        }
        let map2 = match &seeds {
            Some(rows) if rows.is_empty() => Mappings::empty(),
            _ => self.sub_eval(graph, rest, seeds.as_ref())?,
        };
        self.ctx.visitor.optional(exp, &map1, &map2);
        log::debug!(
            "OPTIONAL {}: {} rows, {} candidates, {} postponed filters",
            exp.id(),
            map1.len(),
            map2.len(),
            scope.postponed.len()
        );

        let candidates = CandidateSet::new(&map2, map1.variables());
        for left in &map1 {
            let mut nbsuc = 0usize;
            for right in candidates.candidates(left) {
                if self.ctx.should_stop() {
                    return Ok(Backtrack::Stop);
                }
                let Some(merged) = left.merge(right) else {
                    continue;
                };
                if !self.postponed_filters(graph, &scope, &merged)? {
                    continue;
                }
                nbsuc += 1;
                let result = self.push_and_continue(graph, stack, n, &merged)?;
                if result.unwinds(n) {
                    return Ok(result);
                }
            }
            if nbsuc == 0 {
                if self.ctx.should_stop() {
                    return Ok(Backtrack::Stop);
                }
                let result = self.push_and_continue(graph, stack, n, left)?;
                if result.unwinds(n) {
                    return Ok(result);
                }
            }
        }
        Ok(Backtrack::Continue)
    }

    /// Seed rows passing the in-scope filters; a filter is only tested on
    /// rows binding all its variables
    fn inscope_filter(
        &self,
        graph: Option<&Term>,
        scope: &OptionalScope,
        seeds: Mappings,
    ) -> Result<Mappings, ExecutionError> {
        if scope.inscope.is_empty() {
            return Ok(seeds);
        }
        let mut kept = Mappings::new(seeds.variables().to_vec());
        'rows: for row in seeds.into_rows() {
            for filter in &scope.inscope {
                if !filter.variables().iter().all(|var| row.is_bound(var)) {
                    continue;
                }
                if !self
                    .ctx
                    .evaluator
                    .test(graph, filter, &row, self.ctx.producer)?
                {
                    continue 'rows;
                }
            }
            kept.push(row);
        }
        Ok(kept)
    }

    pub(crate) fn postponed_filters(
        &self,
        graph: Option<&Term>,
        scope: &OptionalScope,
        row: &dyn Environment,
    ) -> Result<bool, ExecutionError> {
        for filter in scope.postponed_filters() {
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
}
