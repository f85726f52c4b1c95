// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Filter and BIND expressions
//!
//! Expressions are opaque to the solver: it only needs the variables an
//! expression reads, and hands the expression itself to an
//! [`Evaluator`](crate::exec::Evaluator).

use std::fmt;

use super::term::{Node, Term, Variable};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(Variable),
    Const(Term),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Bound(Variable),
    Function(String, Vec<Expr>),
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(Variable::new(name))
    }

    pub fn constant(term: Term) -> Self {
        Expr::Const(term)
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Compare(op, Box::new(left), Box::new(right))
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::compare(CompareOp::Eq, left, right)
    }

    pub fn ne(left: Expr, right: Expr) -> Self {
        Self::compare(CompareOp::Ne, left, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Self::compare(CompareOp::Lt, left, right)
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Self::compare(CompareOp::Gt, left, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    pub fn bound(name: &str) -> Self {
        Expr::Bound(Variable::new(name))
    }

    pub fn function(name: &str, args: Vec<Expr>) -> Self {
        Expr::Function(name.to_string(), args)
    }

    /// Variables read by the expression, in first-occurrence order
    pub fn variables(&self) -> Vec<Variable> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<Variable>) {
        match self {
            Expr::Var(var) | Expr::Bound(var) => {
                if !vars.contains(var) {
                    vars.push(var.clone());
                }
            }
            Expr::Const(_) => {}
            Expr::Compare(_, left, right) | Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }
            Expr::Not(inner) => inner.collect_variables(vars),
            Expr::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
        }
    }

    /// True when the expression tests boundness, which makes its result
    /// depend on where it is evaluated
    pub fn uses_bound(&self) -> bool {
        match self {
            Expr::Bound(_) => true,
            Expr::Var(_) | Expr::Const(_) => false,
            Expr::Compare(_, left, right) | Expr::And(left, right) | Expr::Or(left, right) => {
                left.uses_bound() || right.uses_bound()
            }
            Expr::Not(inner) => inner.uses_bound(),
            Expr::Function(_, args) => args.iter().any(Expr::uses_bound),
        }
    }

    /// `?x = constant` (either side), used by the planner to treat `?x` as bound
    pub fn constant_binding(&self) -> Option<(&Variable, &Term)> {
        match self {
            Expr::Compare(CompareOp::Eq, left, right) => match (left.as_ref(), right.as_ref()) {
                (Expr::Var(var), Expr::Const(term)) | (Expr::Const(term), Expr::Var(var)) => {
                    Some((var, term))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<&Node> for Expr {
    fn from(node: &Node) -> Self {
        match node {
            Node::Var(var) => Expr::Var(var.clone()),
            Node::Const(term) => Expr::Const(term.clone()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(var) => write!(f, "{}", var),
            Expr::Const(term) => write!(f, "{}", term),
            Expr::Compare(op, left, right) => write!(f, "({} {} {})", left, op, right),
            Expr::And(left, right) => write!(f, "({} && {})", left, right),
            Expr::Or(left, right) => write!(f, "({} || {})", left, right),
            Expr::Not(inner) => write!(f, "!{}", inner),
            Expr::Bound(var) => write!(f, "bound({})", var),
            Expr::Function(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A FILTER condition with its variable list computed once
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    expr: Expr,
    variables: Vec<Variable>,
}

impl Filter {
    pub fn new(expr: Expr) -> Self {
        let variables = expr.variables();
        Self { expr, variables }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Filters testing `bound()` are pinned to their position
    pub fn is_local(&self) -> bool {
        self.expr.uses_bound()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}
