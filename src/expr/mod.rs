//! Template composition expressions
//!
//! A tiny S-expression dialect used only to group fragment identifiers:
//!
//! ```text
//! ; intro first, then the body sections
//! (intro.md (body.md #_ draft.md appendix.md))
//! ```

mod parser;

pub use parser::{MAX_DEPTH, ParseError, parse, parse_tokens, tokenize};

use std::fmt;

/// A parsed composition expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// A single fragment identifier
    Atom(String),
    /// An ordered group of expressions
    List(Vec<Expression>),
}

impl Expression {
    /// Create an atom expression
    pub fn atom(value: impl Into<String>) -> Self {
        Expression::Atom(value.into())
    }

    /// Create a list expression
    pub fn list(elements: Vec<Expression>) -> Self {
        Expression::List(elements)
    }

    /// Collect every atom in document order
    pub fn atoms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Atom(value) => out.push(value),
            Expression::List(elements) => {
                for element in elements {
                    element.collect_atoms(out);
                }
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Atom(value) => write!(f, "{}", value),
            Expression::List(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }
        }
    }
}
