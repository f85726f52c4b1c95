// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Filter and BIND expression evaluation
//!
//! [`Evaluator`] is the seam to the expression engine. [`ExprEvaluator`] is a
//! small reference implementation covering comparisons, boolean connectives,
//! `bound()` and a handful of term tests.

use std::cmp::Ordering;

use crate::ast::{CompareOp, Expr, Filter, Term};
use crate::binding::Environment;
use crate::exec::{ExecutionError, Producer};

pub trait Evaluator {
    /// Effective boolean value of `filter` under `env`
    ///
    /// Type errors inside the expression make the filter false; an `Err` is
    /// reserved for failures that must abort the query.
    fn test(
        &self,
        graph: Option<&Term>,
        filter: &Filter,
        env: &dyn Environment,
        producer: &dyn Producer,
    ) -> Result<bool, ExecutionError>;

    /// Value of `expr` under `env`, `None` for the SPARQL error value
    fn eval(
        &self,
        graph: Option<&Term>,
        expr: &Expr,
        env: &dyn Environment,
        producer: &dyn Producer,
    ) -> Result<Option<Term>, ExecutionError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl ExprEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn value(&self, expr: &Expr, env: &dyn Environment) -> Result<Option<Term>, ExecutionError> {
        match expr {
            Expr::Var(var) => Ok(env.get(var).cloned()),
            Expr::Const(term) => Ok(Some(term.clone())),
            Expr::Bound(var) => Ok(Some(Term::boolean(env.is_bound(var)))),
            Expr::Compare(op, left, right) => {
                let left = self.value(left, env)?;
                let right = self.value(right, env)?;
                Ok(match (left, right) {
                    (Some(left), Some(right)) => compare(*op, &left, &right).map(Term::boolean),
                    _ => None,
                })
            }
            Expr::And(left, right) => {
                let left = self.truth(left, env)?;
                let right = self.truth(right, env)?;
                Ok(match (left, right) {
                    (Some(false), _) | (_, Some(false)) => Some(Term::boolean(false)),
                    (Some(true), Some(true)) => Some(Term::boolean(true)),
                    _ => None,
                })
            }
            Expr::Or(left, right) => {
                let left = self.truth(left, env)?;
                let right = self.truth(right, env)?;
                Ok(match (left, right) {
                    (Some(true), _) | (_, Some(true)) => Some(Term::boolean(true)),
                    (Some(false), Some(false)) => Some(Term::boolean(false)),
                    _ => None,
                })
            }
            Expr::Not(inner) => Ok(self.truth(inner, env)?.map(|b| Term::boolean(!b))),
            Expr::Function(name, args) => self.call(name, args, env),
        }
    }

    fn truth(&self, expr: &Expr, env: &dyn Environment) -> Result<Option<bool>, ExecutionError> {
        Ok(self.value(expr, env)?.as_ref().and_then(effective_boolean))
    }

    fn call(
        &self,
        name: &str,
        args: &[Expr],
        env: &dyn Environment,
    ) -> Result<Option<Term>, ExecutionError> {
        let single = |args: &[Expr]| -> Result<Option<Term>, ExecutionError> {
            match args {
                [arg] => self.value(arg, env),
                _ => Err(ExecutionError::Expression(format!(
                    "{} expects one argument, got {}",
                    name,
                    args.len()
                ))),
            }
        };
        match name.to_ascii_lowercase().as_str() {
            "isiri" | "isuri" => Ok(single(args)?.map(|t| Term::boolean(t.is_iri()))),
            "isblank" => Ok(single(args)?.map(|t| Term::boolean(t.is_blank()))),
            "isliteral" => Ok(single(args)?.map(|t| Term::boolean(t.is_literal()))),
            "str" => Ok(single(args)?
                .filter(|t| !t.is_blank())
                .map(|t| Term::literal(t.lexical()))),
            "sameterm" => match args {
                [left, right] => {
                    let left = self.value(left, env)?;
                    let right = self.value(right, env)?;
                    Ok(match (left, right) {
                        (Some(left), Some(right)) => Some(Term::boolean(left == right)),
                        _ => None,
                    })
                }
                _ => Err(ExecutionError::Expression(format!(
                    "sameTerm expects two arguments, got {}",
                    args.len()
                ))),
            },
            _ => Err(ExecutionError::UnknownFunction(name.to_string())),
        }
    }
}

impl Evaluator for ExprEvaluator {
    fn test(
        &self,
        _graph: Option<&Term>,
        filter: &Filter,
        env: &dyn Environment,
        _producer: &dyn Producer,
    ) -> Result<bool, ExecutionError> {
        Ok(self.truth(filter.expr(), env)?.unwrap_or(false))
    }

    fn eval(
        &self,
        _graph: Option<&Term>,
        expr: &Expr,
        env: &dyn Environment,
        _producer: &dyn Producer,
    ) -> Result<Option<Term>, ExecutionError> {
        self.value(expr, env)
    }
}

/// SPARQL effective boolean value, `None` when undefined
pub fn effective_boolean(term: &Term) -> Option<bool> {
    let literal = term.as_literal()?;
    if let Some(value) = literal.as_bool() {
        return Some(value);
    }
    if literal.is_numeric() {
        return literal.as_f64().map(|n| n != 0.0 && !n.is_nan());
    }
    if literal.datatype() == crate::ast::term::XSD_STRING {
        return Some(!literal.lexical().is_empty());
    }
    None
}

fn compare(op: CompareOp, left: &Term, right: &Term) -> Option<bool> {
    let ordering = order_terms(left, right);
    match op {
        CompareOp::Eq => match ordering {
            Some(ordering) => Some(ordering == Ordering::Equal),
            None => same_kind_equality(left, right),
        },
        CompareOp::Ne => match ordering {
            Some(ordering) => Some(ordering != Ordering::Equal),
            None => same_kind_equality(left, right).map(|eq| !eq),
        },
        CompareOp::Lt => ordering.map(|o| o == Ordering::Less),
        CompareOp::Le => ordering.map(|o| o != Ordering::Greater),
        CompareOp::Gt => ordering.map(|o| o == Ordering::Greater),
        CompareOp::Ge => ordering.map(|o| o != Ordering::Less),
    }
}

/// Order between comparable values: two numbers, two plain strings, or two
/// literals of the same datatype
fn order_terms(left: &Term, right: &Term) -> Option<Ordering> {
    let (left, right) = (left.as_literal()?, right.as_literal()?);
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return l.partial_cmp(&r);
    }
    if left.is_numeric() || right.is_numeric() {
        return None;
    }
    if left.datatype() == right.datatype() && left.language() == right.language() {
        return Some(left.lexical().cmp(right.lexical()));
    }
    None
}

/// Term equality for values that cannot be ordered
fn same_kind_equality(left: &Term, right: &Term) -> Option<bool> {
    match (left, right) {
        (Term::Literal(_), Term::Literal(_)) => {
            if left == right {
                Some(true)
            } else {
                None
            }
        }
        _ => Some(left == right),
    }
}
