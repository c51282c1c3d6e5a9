//! Syntactic analysis.
//!
//! Recursive descent over a [`TokenStream`]. Each syntax node knows how
//! to parse itself through the [`Parse`] trait. The first malformed
//! construct stops parsing.
mod block;
mod delim;
mod expr;
mod func;
mod ident;
mod literal;
mod stmts;
mod unit;
mod visitor;

pub use block::*;
pub use delim::*;
pub use expr::*;
pub use func::*;
pub use ident::*;
pub use literal::*;
pub use stmts::*;
pub use unit::*;
pub use visitor::*;

use crate::{
    token_stream::{TokenError, TokenStream},
    tokens::TokenKind,
};
use std::{error::Error, fmt};

pub trait Parse: Sized {
    type Output;
    type Err: Error;

    fn parse(input: &mut TokenStream) -> Result<Self::Output, Self::Err>;
}

/// Run a parse function one nesting level deeper.
///
/// Guards the recursive descent against unbounded recursion.
pub(crate) fn nested<T>(
    input: &mut TokenStream,
    parse: impl FnOnce(&mut TokenStream) -> Result<T, ParseError>,
) -> Result<T, ParseError> {
    if input.enter().is_err() {
        let line = match input.peek() {
            Ok(token) => token.line(),
            Err(err) => err.line(),
        };
        return Err(ParseError::NestingTooDeep {
            limit: input.max_depth(),
            line,
        });
    }

    let result = parse(input);
    input.leave();
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Token(TokenError),
    Unexpected {
        found: TokenKind,
        expected: &'static str,
        line: usize,
    },
    /// Left hand side of an assignment or increment can't be assigned to.
    InvalidTarget {
        line: usize,
    },
    /// Construct that is valid, but not where it was found.
    Misplaced {
        what: &'static str,
        line: usize,
    },
    InvalidLiteral {
        line: usize,
    },
    NestingTooDeep {
        limit: usize,
        line: usize,
    },
    /// Source has no tokens at all.
    EmptySource,
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            Self::Token(err) => err.line(),
            Self::Unexpected { line, .. }
            | Self::InvalidTarget { line }
            | Self::Misplaced { line, .. }
            | Self::InvalidLiteral { line }
            | Self::NestingTooDeep { line, .. } => *line,
            Self::EmptySource => 0,
        }
    }
}

impl Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Token(err) => fmt::Display::fmt(err, f),
            Self::Unexpected {
                found,
                expected,
                line,
            } => write!(f, "expected {}, found '{}' at line {}", expected, found, line),
            Self::InvalidTarget { line } => write!(f, "invalid assignment target at line {}", line),
            Self::Misplaced { what, line } => write!(f, "{} not allowed here at line {}", what, line),
            Self::InvalidLiteral { line } => write!(f, "invalid literal at line {}", line),
            Self::NestingTooDeep { limit, line } => {
                write!(f, "nesting deeper than {} levels at line {}", limit, line)
            }
            Self::EmptySource => write!(f, "source is empty"),
        }
    }
}

impl From<TokenError> for ParseError {
    fn from(err: TokenError) -> Self {
        ParseError::Token(err)
    }
}
