// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Diagnostic check of a query's edge patterns
//!
//! The checker asks the producer about every edge of the query and writes
//! what it found into the query's info log. It never fails the query: lookup
//! errors are recorded as `error` entries.

use crate::ast::{EdgePattern, ExpId, Query};
use crate::binding::EmptyEnvironment;
use crate::exec::matcher::Matcher;
use crate::exec::{Eval, EvalContext, ExecutionError};
use crate::plan::PlanAnnotations;

/// Findings for one edge clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeReport {
    pub edge: ExpId,
    pub pattern: EdgePattern,
    pub well_typed: bool,
    /// The producer returned candidates for the constant positions
    pub exist: bool,
    /// A candidate matches the pattern structurally
    pub matched: bool,
    /// Whether the attached definition query has solutions, when there is one
    pub define: Option<bool>,
}

pub struct Checker<'a> {
    ctx: &'a EvalContext<'a>,
    matcher: Matcher,
}

impl<'a> Checker<'a> {
    pub fn new(ctx: &'a EvalContext<'a>) -> Self {
        Self {
            ctx,
            matcher: Matcher::new(),
        }
    }

    pub fn check(&self, query: &mut Query) -> Vec<EdgeReport> {
        let mut edges: Vec<(ExpId, EdgePattern)> = Vec::new();
        query.body.walk(&mut |exp| {
            if let Some(pattern) = exp.edge_pattern() {
                edges.push((exp.id(), pattern.clone()));
            }
        });

        let mut reports = Vec::with_capacity(edges.len());
        for (edge, pattern) in edges {
            let well_typed = self.matcher.well_typed(&pattern);
            let (exist, matched) = match self.inspect(&pattern) {
                Ok(found) => found,
                Err(err) => {
                    log::warn!("check {}: {}", pattern, err);
                    query.add_info("error", format!("{}: {}", pattern, err));
                    (false, false)
                }
            };
            let define = match query.definition(edge).map(|definition| self.define(definition)) {
                None => None,
                Some(Ok(found)) => Some(found),
                Some(Err(err)) => {
                    log::warn!("definition of {}: {}", pattern, err);
                    query.add_info("error", format!("definition of {}: {}", pattern, err));
                    None
                }
            };

            let mut message = format!(
                "{} exist: {} match: {} well-typed: {}",
                pattern, exist, matched, well_typed
            );
            if let Some(define) = define {
                message.push_str(&format!(" define: {}", define));
            }
            log::info!("check {}", message);
            query.add_info("check", message);

            reports.push(EdgeReport {
                edge,
                pattern,
                well_typed,
                exist,
                matched,
                define,
            });
        }
        reports
    }

    fn inspect(&self, pattern: &EdgePattern) -> Result<(bool, bool), ExecutionError> {
        let quads = self
            .ctx
            .producer
            .edges(None, self.ctx.from, pattern, &EmptyEnvironment)?;
        let matched = quads.iter().any(|quad| self.matcher.matches(pattern, quad));
        Ok((!quads.is_empty(), matched))
    }

    fn define(&self, definition: &Query) -> Result<bool, ExecutionError> {
        let annotations = PlanAnnotations::build(&definition.body);
        let ctx = self.ctx.derive(&annotations);
        let mut eval = Eval::new(&ctx).with_limit(Some(1));
        Ok(!eval.run(definition)?.is_empty())
    }
}
