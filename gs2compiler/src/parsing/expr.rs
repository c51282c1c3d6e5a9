//! Expression parsing.
//!
//! Binary operators are parsed by precedence climbing. Assignment and
//! the conditional operator sit above the binary operators, unary and
//! postfix operators below them.
use super::{nested, Comma, Delimited, Ident, LitValue, Literal, Parse, ParseError};
use crate::{
    token_stream::TokenStream,
    tokens::{KeywordKind, TokenKind},
};
use smol_str::SmolStr;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    /// Line of the token the expression originates from.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(LitValue),
    Ident(Name),
    Member {
        object: Box<Expr>,
        member: Ident,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Array literal `{a, b, c}`
    Array(Vec<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Increment or decrement, `++x` or `x--`
    Step {
        op: StepOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Plain assignment when `op` is `None`, otherwise compound
    /// assignment like `+=`.
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Explicit conversion, `int(x)`
    Cast {
        kind: CastKind,
        operand: Box<Expr>,
    },
    /// Membership test, `x in |1, 10|` when `upper` is set,
    /// otherwise `x in list`.
    In {
        value: Box<Expr>,
        lower: Box<Expr>,
        upper: Option<Box<Expr>>,
    },
    /// Object construction, `new TStaticVar()`
    New {
        class: Ident,
        args: Vec<Expr>,
    },
    /// Array with fixed dimensions, `new[3][4]`
    NewArray(Vec<u32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Float,
    String,
}

impl CastKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// Reference to a named value.
///
/// The binding is filled in by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub name: SmolStr,
    pub binding: Binding,
}

impl Name {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            binding: Binding::Unresolved,
        }
    }
}

/// What a name was bound to during resolution.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Binding {
    #[default]
    Unresolved,
    /// Object variable, implicitly declared by assignment.
    Var,
    /// Declared with `var`, lives in the `temp` object.
    Local,
    Param,
    Func,
    /// Compile time constant, inlined at each use.
    Const(ConstValue),
    /// Provided by the runtime or the script type's environment.
    Builtin,
}

/// Value of a folded constant expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Number(f64),
    Str(String),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::Str(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    /// String concatenation `@`
    Concat,
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
}

impl BinaryOp {
    #[inline]
    pub fn is_comparison(self) -> bool {
        use BinaryOp as B;
        matches!(
            self,
            B::Eq | B::NotEq | B::Less | B::Greater | B::LessEq | B::GreaterEq
        )
    }

    #[inline]
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::NotEq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
    In,
}

/// Operator and binding power of an infix token.
#[rustfmt::skip]
fn infix_operator(kind: TokenKind) -> Option<(Infix, u8)> {
    use BinaryOp as B;
    use TokenKind as T;

    Some(match kind {
        T::OrOr      => (Infix::Logical(LogicalOp::Or), 1),
        T::AndAnd    => (Infix::Logical(LogicalOp::And), 2),
        T::EqEq      => (Infix::Binary(B::Eq), 3),
        T::BangEq    => (Infix::Binary(B::NotEq), 3),
        T::Less      => (Infix::Binary(B::Less), 4),
        T::Greater   => (Infix::Binary(B::Greater), 4),
        T::LessEq    => (Infix::Binary(B::LessEq), 4),
        T::GreaterEq => (Infix::Binary(B::GreaterEq), 4),
        T::Keyword(KeywordKind::In) => (Infix::In, 4),
        T::At        => (Infix::Binary(B::Concat), 5),
        T::Plus      => (Infix::Binary(B::Add), 6),
        T::Minus     => (Infix::Binary(B::Sub), 6),
        T::Star      => (Infix::Binary(B::Mul), 7),
        T::Slash     => (Infix::Binary(B::Div), 7),
        T::Percent   => (Infix::Binary(B::Mod), 7),
        T::Caret     => (Infix::Binary(B::Pow), 8),
        _            => return None,
    })
}

/// Assignment operator, with the arithmetic of compound assignments.
#[rustfmt::skip]
fn assign_operator(kind: TokenKind) -> Option<Option<BinaryOp>> {
    use BinaryOp as B;
    use TokenKind as T;

    Some(match kind {
        T::Eq        => None,
        T::PlusEq    => Some(B::Add),
        T::MinusEq   => Some(B::Sub),
        T::StarEq    => Some(B::Mul),
        T::SlashEq   => Some(B::Div),
        T::PercentEq => Some(B::Mod),
        T::AtEq      => Some(B::Concat),
        _            => return None,
    })
}

impl Expr {
    #[inline]
    pub fn new(kind: ExprKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// Whether the expression can appear on the left of an assignment.
    #[inline]
    pub fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
        )
    }
}

impl Parse for Expr {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        nested(input, parse_assignment)
    }
}

fn parse_assignment(input: &mut TokenStream) -> Result<Expr, ParseError> {
    let target = parse_ternary(input)?;

    let op = match assign_operator(input.peek_kind()?) {
        Some(op) => op,
        None => return Ok(target),
    };
    let operator = input.advance()?;

    if !target.is_assignable() {
        return Err(ParseError::InvalidTarget {
            line: operator.line(),
        });
    }

    // Right associative
    let value = nested(input, parse_assignment)?;

    Ok(Expr::new(
        ExprKind::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        },
        operator.line(),
    ))
}

fn parse_ternary(input: &mut TokenStream) -> Result<Expr, ParseError> {
    let cond = parse_binary(input, 1)?;

    if !input.match_token(TokenKind::Question) {
        return Ok(cond);
    }
    let line = input.last_line();

    let then = Expr::parse(input)?;
    input.consume(TokenKind::Colon)?;
    let otherwise = Expr::parse(input)?;

    Ok(Expr::new(
        ExprKind::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        },
        line,
    ))
}

fn parse_binary(input: &mut TokenStream, min_power: u8) -> Result<Expr, ParseError> {
    let mut lhs = parse_unary(input)?;

    loop {
        let (infix, power) = match infix_operator(input.peek_kind()?) {
            Some((infix, power)) if power >= min_power => (infix, power),
            _ => break,
        };
        let operator = input.advance()?;

        // Power is right associative, everything else binds to the left.
        let next_power = match infix {
            Infix::Binary(BinaryOp::Pow) => power,
            _ => power + 1,
        };

        let kind = match infix {
            Infix::In => nested(input, |input| parse_in(input, lhs, next_power))?,
            Infix::Binary(op) => ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(nested(input, |input| parse_binary(input, next_power))?),
            },
            Infix::Logical(op) => ExprKind::Logical {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(nested(input, |input| parse_binary(input, next_power))?),
            },
        };
        lhs = Expr::new(kind, operator.line());
    }

    Ok(lhs)
}

/// Right hand side of `in`, either a `|lower, upper|` range or an object.
fn parse_in(input: &mut TokenStream, value: Expr, power: u8) -> Result<ExprKind, ParseError> {
    if !input.match_token(TokenKind::Pipe) {
        let object = parse_binary(input, power)?;
        return Ok(ExprKind::In {
            value: Box::new(value),
            lower: Box::new(object),
            upper: None,
        });
    }

    let lower = Expr::parse(input)?;
    input.consume(TokenKind::Comma)?;
    let upper = Expr::parse(input)?;
    input.consume(TokenKind::Pipe)?;

    Ok(ExprKind::In {
        value: Box::new(value),
        lower: Box::new(lower),
        upper: Some(Box::new(upper)),
    })
}

fn parse_unary(input: &mut TokenStream) -> Result<Expr, ParseError> {
    use TokenKind as T;

    match input.peek_kind()? {
        T::Minus | T::Bang => {
            let operator = input.advance()?;
            let op = if operator.kind == T::Minus {
                UnaryOp::Neg
            } else {
                UnaryOp::Not
            };
            let operand = nested(input, parse_unary)?;
            Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                operator.line(),
            ))
        }
        T::PlusPlus | T::MinusMinus => {
            let operator = input.advance()?;
            let op = if operator.kind == T::PlusPlus {
                StepOp::Inc
            } else {
                StepOp::Dec
            };
            let target = nested(input, parse_unary)?;
            if !target.is_assignable() {
                return Err(ParseError::InvalidTarget {
                    line: operator.line(),
                });
            }
            Ok(Expr::new(
                ExprKind::Step {
                    op,
                    prefix: true,
                    target: Box::new(target),
                },
                operator.line(),
            ))
        }
        _ => parse_postfix(input),
    }
}

fn parse_postfix(input: &mut TokenStream) -> Result<Expr, ParseError> {
    use TokenKind as T;

    let mut expr = parse_primary(input)?;

    loop {
        let line = expr.line;
        let kind = match input.peek_kind()? {
            T::LeftParen => {
                input.advance()?;
                let args = Delimited::<Expr, Comma>::parse_until(input, T::RightParen)?;
                input.consume(T::RightParen)?;
                ExprKind::Call {
                    callee: Box::new(expr),
                    args: args.into_items(),
                }
            }
            T::Dot => {
                input.advance()?;
                let member = Ident::parse(input)?;
                ExprKind::Member {
                    object: Box::new(expr),
                    member,
                }
            }
            T::LeftBracket => {
                input.advance()?;
                let index = Expr::parse(input)?;
                input.consume(T::RightBracket)?;
                ExprKind::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                }
            }
            T::PlusPlus | T::MinusMinus => {
                let operator = input.advance()?;
                if !expr.is_assignable() {
                    return Err(ParseError::InvalidTarget {
                        line: operator.line(),
                    });
                }
                let op = if operator.kind == T::PlusPlus {
                    StepOp::Inc
                } else {
                    StepOp::Dec
                };
                ExprKind::Step {
                    op,
                    prefix: false,
                    target: Box::new(expr),
                }
            }
            _ => break,
        };
        expr = Expr::new(kind, line);
    }

    Ok(expr)
}

fn parse_primary(input: &mut TokenStream) -> Result<Expr, ParseError> {
    use KeywordKind as K;
    use TokenKind as T;

    let token = input.peek()?.clone();
    let line = token.line();

    match token.kind {
        T::Int | T::Float | T::Str | T::Keyword(K::True | K::False | K::Null) => {
            let literal = Literal::parse(input)?;
            Ok(Expr::new(ExprKind::Literal(literal.value), literal.line))
        }
        T::Ident => {
            let ident = Ident::parse(input)?;
            let is_call = input.peek_kind()? == T::LeftParen;
            match CastKind::from_name(&ident.name) {
                Some(kind) if is_call => {
                    input.advance()?;
                    let operand = Expr::parse(input)?;
                    input.consume(T::RightParen)?;
                    Ok(Expr::new(
                        ExprKind::Cast {
                            kind,
                            operand: Box::new(operand),
                        },
                        line,
                    ))
                }
                _ => Ok(Expr::new(ExprKind::Ident(Name::new(ident.name)), ident.line)),
            }
        }
        T::Keyword(K::New) => parse_new(input),
        T::LeftParen => {
            input.advance()?;
            let expr = Expr::parse(input)?;
            input.consume(T::RightParen)?;
            Ok(expr)
        }
        T::LeftBrace => {
            input.advance()?;
            let items = Delimited::<Expr, Comma>::parse_until(input, T::RightBrace)?;
            input.consume(T::RightBrace)?;
            Ok(Expr::new(ExprKind::Array(items.into_items()), line))
        }
        found => Err(ParseError::Unexpected {
            found,
            expected: "expression",
            line,
        }),
    }
}

/// `new Class(args)` or `new[3][4]`.
pub(crate) fn parse_new(input: &mut TokenStream) -> Result<Expr, ParseError> {
    use TokenKind as T;

    let keyword = input.consume(T::Keyword(KeywordKind::New))?;
    let line = keyword.line();

    if input.peek_kind()? == T::LeftBracket {
        let mut dimensions = vec![];
        while input.match_token(T::LeftBracket) {
            let literal = Literal::parse(input)?;
            match literal.value {
                LitValue::Int(size) => dimensions.push(size),
                _ => return Err(ParseError::InvalidLiteral { line: literal.line }),
            }
            input.consume(T::RightBracket)?;
        }
        return Ok(Expr::new(ExprKind::NewArray(dimensions), line));
    }

    let class = Ident::parse(input)?;
    input.consume(T::LeftParen)?;
    let args = Delimited::<Expr, Comma>::parse_until(input, T::RightParen)?;
    input.consume(T::RightParen)?;

    Ok(Expr::new(
        ExprKind::New {
            class,
            args: args.into_items(),
        },
        line,
    ))
}
