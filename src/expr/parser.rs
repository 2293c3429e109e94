//! Tokenizer and recursive-descent parser for composition expressions

use thiserror::Error;
use tracing::debug;

use super::Expression;

/// Marker that discards the expression following it
const DISCARD: &str = "#_";

/// Deepest list nesting the parser accepts
pub const MAX_DEPTH: usize = 128;

/// Errors produced while parsing a composition expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("Unexpected token: {token}")]
    UnexpectedToken { token: String },

    #[error("Expression nested too deeply (limit {depth})")]
    NestingTooDeep { depth: usize },
}

/// Parse composition text into an expression tree
///
/// Several top-level expressions are wrapped in an implicit root list.
pub fn parse(input: &str) -> Result<Expression, ParseError> {
    debug!(input_len = input.len(), "parse: called");
    let tokens = tokenize(input);
    parse_tokens(&tokens)
}

/// Split input into tokens
///
/// Line comments are stripped first, then `#_` markers are removed together
/// with the expression that follows them.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for line in input.split('\n') {
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        split_line(line, &mut tokens);
    }

    let tokens = drop_discarded(tokens);
    debug!(token_count = tokens.len(), "tokenize: done");
    tokens
}

/// Parse an already tokenized input
pub fn parse_tokens(tokens: &[String]) -> Result<Expression, ParseError> {
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let mut exprs = Vec::new();

    while parser.pos < tokens.len() {
        exprs.push(parser.expression()?);
    }

    match exprs.len() {
        0 => Err(ParseError::UnexpectedEndOfInput),
        1 => Ok(exprs.remove(0)),
        _ => Ok(Expression::List(exprs)),
    }
}

fn split_line(line: &str, tokens: &mut Vec<String>) {
    let mut current = String::new();

    for c in line.chars() {
        if c == '(' || c == ')' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(c.to_string());
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
}

fn drop_discarded(tokens: Vec<String>) -> Vec<String> {
    let mut result = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        if tokens[i] == DISCARD {
            i = skip_expression(&tokens, i + 1);
        } else {
            result.push(tokens[i].clone());
            i += 1;
        }
    }

    result
}

/// Index just past the expression starting at `start`
///
/// An unbalanced list runs to the end of the tokens. Any other token,
/// including a stray `)`, counts as a single expression.
fn skip_expression(tokens: &[String], start: usize) -> usize {
    if start >= tokens.len() {
        return start;
    }

    if tokens[start] != "(" {
        return start + 1;
    }

    let mut depth = 1;
    let mut i = start + 1;
    while i < tokens.len() && depth > 0 {
        match tokens[i].as_str() {
            "(" => depth += 1,
            ")" => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    i
}

struct Parser<'a> {
    tokens: &'a [String],
    pos: usize,
    /// Lists currently open
    depth: usize,
}

impl Parser<'_> {
    fn expression(&mut self) -> Result<Expression, ParseError> {
        let token = self.tokens.get(self.pos).ok_or(ParseError::UnexpectedEndOfInput)?;

        match token.as_str() {
            "(" => {
                if self.depth >= MAX_DEPTH {
                    return Err(ParseError::NestingTooDeep { depth: MAX_DEPTH });
                }
                self.depth += 1;
                self.pos += 1;
                let mut elements = Vec::new();
                loop {
                    match self.tokens.get(self.pos).map(String::as_str) {
                        None => return Err(ParseError::UnexpectedEndOfInput),
                        Some(")") => {
                            self.pos += 1;
                            self.depth -= 1;
                            return Ok(Expression::List(elements));
                        }
                        Some(_) => elements.push(self.expression()?),
                    }
                }
            }
            ")" => Err(ParseError::UnexpectedToken { token: token.clone() }),
            _ => {
                self.pos += 1;
                Ok(Expression::Atom(token.clone()))
            }
        }
    }
}
