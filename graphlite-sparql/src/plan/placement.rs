// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Filter placement
//!
//! Inside a group a filter is moved up to the position right after the clause
//! that binds its last variable, counting only clauses that bind on every
//! solution (edges, paths, nodes, VALUES bound in every row). Filters are
//! never moved down, and filters testing `bound()` stay where they are.

use crate::ast::{Exp, ExpKind, Node, Variable};

/// Moves filters up in every group under `exp`; returns the number moved
pub fn place_filters(exp: &mut Exp) -> usize {
    let mut moved = 0;
    if let Some(args) = exp.children_mut() {
        let mut i = 0;
        while i < args.len() {
            if let Some(target) = earliest_position(args, i) {
                let filter = args.remove(i);
                log::debug!("moved FILTER {} from {} to {}", filter, i, target);
                args.insert(target, filter);
                moved += 1;
            }
            i += 1;
        }
    }
    for sub in exp.sub_expressions_mut() {
        moved += place_filters(sub);
    }
    moved
}

/// Where the filter at `i` can move to, if it can move up at all
fn earliest_position(args: &[Exp], i: usize) -> Option<usize> {
    let filter = args[i].as_filter()?;
    if filter.is_local() {
        return None;
    }
    let mut bound: Vec<Variable> = Vec::new();
    let mut position = if filter.variables().is_empty() { Some(0) } else { None };
    for (j, arg) in args[..i].iter().enumerate() {
        if position.is_some() {
            break;
        }
        surely_binds(arg, &mut bound);
        if filter.variables().iter().all(|var| bound.contains(var)) {
            position = Some(j + 1);
        }
    }
    position.filter(|&target| target < i && !already_placed(args, target, i))
}

/// True when only filters sit between `target` and `i`
fn already_placed(args: &[Exp], target: usize, i: usize) -> bool {
    args[target..i].iter().all(|arg| arg.as_filter().is_some())
}

fn surely_binds(exp: &Exp, bound: &mut Vec<Variable>) {
    let mut add = |var: &Variable| {
        if !bound.contains(var) {
            bound.push(var.clone());
        }
    };
    match exp.kind() {
        ExpKind::Edge(pattern) => pattern.variables().iter().for_each(&mut add),
        ExpKind::Path(pattern) => pattern.variables().iter().for_each(&mut add),
        ExpKind::Node(Node::Var(var)) => add(var),
        ExpKind::Values(rows) => rows
            .variables()
            .iter()
            .filter(|var| rows.bound_everywhere(var))
            .for_each(&mut add),
        _ => {}
    }
}
