// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! RDF terms and query-side nodes
//!
//! A [`Term`] is a value of the target graph. A [`Node`] is a position in a
//! query pattern: either a constant term or a [`Variable`]. Query blank nodes
//! are variables carrying the `blank` flag; they bind like any other variable
//! but are hidden from projected variable lists unless asked for.

use std::fmt;
use std::sync::Arc;

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

/// Literal value with optional datatype and language tag
///
/// A missing datatype means a plain `xsd:string` literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    lexical: Arc<str>,
    datatype: Option<Arc<str>>,
    lang: Option<Arc<str>>,
}

impl Literal {
    pub fn string(value: &str) -> Self {
        Self {
            lexical: Arc::from(value),
            datatype: None,
            lang: None,
        }
    }

    pub fn typed(value: &str, datatype: &str) -> Self {
        let datatype = if datatype == XSD_STRING {
            None
        } else {
            Some(Arc::from(datatype))
        };
        Self {
            lexical: Arc::from(value),
            datatype,
            lang: None,
        }
    }

    pub fn lang(value: &str, lang: &str) -> Self {
        Self {
            lexical: Arc::from(value),
            datatype: None,
            lang: Some(Arc::from(lang.to_ascii_lowercase().as_str())),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::typed(&value.to_string(), XSD_INTEGER)
    }

    pub fn boolean(value: bool) -> Self {
        Self::typed(if value { "true" } else { "false" }, XSD_BOOLEAN)
    }

    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    pub fn datatype(&self) -> &str {
        self.datatype.as_deref().unwrap_or(XSD_STRING)
    }

    pub fn language(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.datatype.as_deref(),
            Some(XSD_INTEGER) | Some(XSD_DECIMAL) | Some(XSD_DOUBLE) | Some(XSD_FLOAT)
        )
    }

    /// Numeric value of a numeric literal, `None` for ill-typed lexical forms
    pub fn as_f64(&self) -> Option<f64> {
        if self.is_numeric() {
            self.lexical.trim().parse::<f64>().ok()
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match (self.datatype.as_deref(), self.lexical.as_ref()) {
            (Some(XSD_BOOLEAN), "true") | (Some(XSD_BOOLEAN), "1") => Some(true),
            (Some(XSD_BOOLEAN), "false") | (Some(XSD_BOOLEAN), "0") => Some(false),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.lexical)?;
        if let Some(lang) = &self.lang {
            write!(f, "@{}", lang)
        } else if let Some(datatype) = &self.datatype {
            write!(f, "^^<{}>", datatype)
        } else {
            Ok(())
        }
    }
}

/// A value of the target graph
///
/// The derived order is total and agrees with term equality, which is what
/// the sort-merge join relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(Arc<str>),
    Blank(Arc<str>),
    Literal(Literal),
}

impl Term {
    pub fn iri(value: &str) -> Self {
        Term::Iri(Arc::from(value))
    }

    pub fn blank(label: &str) -> Self {
        Term::Blank(Arc::from(label))
    }

    pub fn literal(value: &str) -> Self {
        Term::Literal(Literal::string(value))
    }

    pub fn integer(value: i64) -> Self {
        Term::Literal(Literal::integer(value))
    }

    pub fn boolean(value: bool) -> Self {
        Term::Literal(Literal::boolean(value))
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// Lexical form used by `str()`
    pub fn lexical(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Blank(label) => label,
            Term::Literal(literal) => literal.lexical(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Blank(label) => write!(f, "_:{}", label),
            Term::Literal(literal) => write!(f, "{}", literal),
        }
    }
}

/// Query variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    name: Arc<str>,
    blank: bool,
}

impl Variable {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            blank: false,
        }
    }

    /// Variable standing for a blank node of the query pattern
    pub fn blank(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            blank: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle on the name, for index keys
    pub fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn is_blank(&self) -> bool {
        self.blank
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.blank {
            write!(f, "_:{}", self.name)
        } else {
            write!(f, "?{}", self.name)
        }
    }
}

/// A position of a query pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Var(Variable),
    Const(Term),
}

impl Node {
    pub fn var(name: &str) -> Self {
        Node::Var(Variable::new(name))
    }

    pub fn blank(name: &str) -> Self {
        Node::Var(Variable::blank(name))
    }

    pub fn iri(value: &str) -> Self {
        Node::Const(Term::iri(value))
    }

    pub fn literal(value: &str) -> Self {
        Node::Const(Term::literal(value))
    }

    pub fn integer(value: i64) -> Self {
        Node::Const(Term::integer(value))
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Node::Var(var) => Some(var),
            Node::Const(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Term> {
        match self {
            Node::Const(term) => Some(term),
            Node::Var(_) => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Node::Var(_))
    }
}

impl From<Term> for Node {
    fn from(term: Term) -> Self {
        Node::Const(term)
    }
}

impl From<Variable> for Node {
    fn from(var: Variable) -> Self {
        Node::Var(var)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Var(var) => write!(f, "{}", var),
            Node::Const(term) => write!(f, "{}", term),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_treat_xsd_string_as_plain_literal() {
        assert_eq!(
            Literal::typed("abc", XSD_STRING),
            Literal::string("abc")
        );
    }

    #[test]
    fn should_parse_numeric_literals() {
        assert_eq!(Literal::integer(42).as_f64(), Some(42.0));
        assert_eq!(Literal::typed("4.5", XSD_DECIMAL).as_f64(), Some(4.5));
        assert_eq!(Literal::string("42").as_f64(), None);
        assert_eq!(Literal::typed("abc", XSD_INTEGER).as_f64(), None);
    }

    #[test]
    fn should_order_terms_consistently_with_equality() {
        let a = Term::iri("http://example.org/a");
        let b = Term::iri("http://example.org/b");
        assert!(a < b);
        assert_eq!(a.cmp(&a.clone()), std::cmp::Ordering::Equal);
        assert!(Term::iri("z") < Term::blank("a"));
        assert!(Term::blank("z") < Term::literal("a"));
    }

    #[test]
    fn should_display_terms_and_variables() {
        assert_eq!(Term::iri("http://x").to_string(), "<http://x>");
        assert_eq!(Term::integer(3).to_string(), format!("\"3\"^^<{}>", XSD_INTEGER));
        assert_eq!(Variable::new("x").to_string(), "?x");
        assert_eq!(Variable::blank("b0").to_string(), "_:b0");
    }
}
