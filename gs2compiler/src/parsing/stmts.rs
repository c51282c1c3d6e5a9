//! Statement parsing.
use super::{expr::parse_new, nested, Block, Expr, ExprKind, Ident, Name, Parse, ParseError};
use crate::{
    token_stream::TokenStream,
    tokens::{KeywordKind, TokenKind},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Block),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    ForEach(ForEachStmt),
    With(WithStmt),
    Switch(SwitchStmt),
    /// Object construction with a body, `new TGuiButton("Ok") { ... }`
    New(NewStmt),
    Return(ReturnStmt),
    Break(usize),
    Continue(usize),
    /// Variable definitions
    Var(VarDecl),
    Const(ConstDef),
    /// Expression Statements
    Expr(Expr),
    /// Lone semicolon
    Empty(usize),
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Stmt::Block(block) => block.line,
            Stmt::If(stmt) => stmt.line,
            Stmt::While(stmt) => stmt.line,
            Stmt::For(stmt) => stmt.line,
            Stmt::ForEach(stmt) => stmt.line,
            Stmt::With(stmt) => stmt.line,
            Stmt::Switch(stmt) => stmt.line,
            Stmt::New(stmt) => stmt.line,
            Stmt::Return(stmt) => stmt.line,
            Stmt::Var(decl) => decl.line,
            Stmt::Const(def) => def.line,
            Stmt::Expr(expr) => expr.line,
            Stmt::Break(line) | Stmt::Continue(line) | Stmt::Empty(line) => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then: Box<Stmt>,
    pub otherwise: Option<Box<Stmt>>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Box<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Option<ForInit>,
    pub cond: Option<Expr>,
    pub step: Option<Expr>,
    pub body: Box<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

/// Iteration over the elements of an object.
///
/// ```text
/// for (item : list) { ... }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachStmt {
    /// Declared with `var`.
    pub declared: bool,
    pub var: Name,
    pub iterable: Expr,
    pub body: Box<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithStmt {
    pub object: Expr,
    pub body: Box<Stmt>,
    pub line: usize,
}

/// Case labels jump into one list of statements, falling
/// through to the next case unless there is a `break`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    pub value: Expr,
    pub cases: Vec<SwitchCase>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` is the `default` label.
    pub labels: Vec<Option<Expr>>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

impl SwitchCase {
    #[inline]
    pub fn is_default(&self) -> bool {
        self.labels.iter().any(Option::is_none)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStmt {
    pub class: Ident,
    /// Name of the new object.
    pub name: Expr,
    /// Runs with the new object as the current object.
    pub body: Block,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub line: usize,
}

/// One or more variable definitions.
///
/// # Example
///
/// ```text
/// var a = 1, b;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub defs: Vec<VarDef>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: Ident,
    pub rhs: Option<Expr>,
}

/// Definition of constant value.
///
/// # Example
///
/// ```text
/// const FOO = 1;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDef {
    pub name: Ident,
    pub rhs: Expr,
    pub line: usize,
}

impl Parse for Stmt {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        nested(input, parse_stmt)
    }
}

fn parse_stmt(input: &mut TokenStream) -> Result<Stmt, ParseError> {
    use KeywordKind as K;
    use TokenKind as T;

    let token = input.peek()?.clone();
    let line = token.line();

    match token.kind {
        T::LeftBrace => Block::parse(input).map(Stmt::Block),
        T::Semicolon => {
            input.advance()?;
            Ok(Stmt::Empty(line))
        }
        T::Keyword(keyword) => match keyword {
            K::If => IfStmt::parse(input).map(Stmt::If),
            K::While => WhileStmt::parse(input).map(Stmt::While),
            K::For => parse_for(input),
            K::With => WithStmt::parse(input).map(Stmt::With),
            K::Return => ReturnStmt::parse(input).map(Stmt::Return),
            K::Switch => SwitchStmt::parse(input).map(Stmt::Switch),
            K::New => parse_new_stmt(input),
            K::Break | K::Continue => {
                input.advance()?;
                let allowed = if keyword == K::Break {
                    input.can_break()
                } else {
                    input.in_loop()
                };
                if !allowed {
                    return Err(ParseError::Misplaced {
                        what: if keyword == K::Break { "break" } else { "continue" },
                        line,
                    });
                }
                input.consume(T::Semicolon)?;
                Ok(if keyword == K::Break {
                    Stmt::Break(line)
                } else {
                    Stmt::Continue(line)
                })
            }
            K::Var => {
                let decl = VarDecl::parse(input)?;
                input.consume(T::Semicolon)?;
                Ok(Stmt::Var(decl))
            }
            K::Const => ConstDef::parse(input).map(Stmt::Const),
            K::Function | K::Public => Err(ParseError::Misplaced {
                what: "function declaration",
                line,
            }),
            K::Else | K::Case | K::Default | K::In => Err(ParseError::Unexpected {
                found: token.kind,
                expected: "statement",
                line,
            }),
            K::True | K::False | K::Null => parse_expr_stmt(input),
        },
        T::Directive => Err(ParseError::Misplaced {
            what: "client side directive",
            line,
        }),
        _ => parse_expr_stmt(input),
    }
}

fn parse_expr_stmt(input: &mut TokenStream) -> Result<Stmt, ParseError> {
    let expr = Expr::parse(input)?;
    input.consume(TokenKind::Semicolon)?;
    Ok(Stmt::Expr(expr))
}

/// A `new` followed by a block is a statement, otherwise
/// the statement is an expression.
fn parse_new_stmt(input: &mut TokenStream) -> Result<Stmt, ParseError> {
    let expr = parse_new(input)?;
    let line = expr.line;

    if input.peek_kind()? != TokenKind::LeftBrace {
        input.consume(TokenKind::Semicolon)?;
        return Ok(Stmt::Expr(expr));
    }

    match expr.kind {
        ExprKind::New { class, mut args } if args.len() == 1 => {
            let body = Block::parse(input)?;
            let name = args.remove(0);
            Ok(Stmt::New(NewStmt { class, name, body, line }))
        }
        _ => Err(ParseError::Unexpected {
            found: TokenKind::LeftBrace,
            expected: "';' after new expression",
            line: input.last_line(),
        }),
    }
}

/// Parse `( expr )` as used by conditions.
fn parse_condition(input: &mut TokenStream) -> Result<Expr, ParseError> {
    input.consume(TokenKind::LeftParen)?;
    let cond = Expr::parse(input)?;
    input.consume(TokenKind::RightParen)?;
    Ok(cond)
}

/// Loop bodies are the only place `break` and `continue` are valid.
fn parse_loop_body(input: &mut TokenStream) -> Result<Box<Stmt>, ParseError> {
    input.enter_loop();
    let body = Stmt::parse(input);
    input.leave_loop();
    body.map(Box::new)
}

/// Both `for` forms start the same way, so the loop
/// kind is decided by looking ahead for the colon.
fn parse_for(input: &mut TokenStream) -> Result<Stmt, ParseError> {
    use KeywordKind as K;
    use TokenKind as T;

    let keyword = input.consume(T::Keyword(K::For))?;
    input.consume(T::LeftParen)?;

    let is_foreach = matches!(
        (input.peek_nth_kind(0), input.peek_nth_kind(1), input.peek_nth_kind(2)),
        (T::Ident, T::Colon, _) | (T::Keyword(K::Var), T::Ident, T::Colon)
    );

    if is_foreach {
        let declared = input.match_token(T::Keyword(K::Var));
        let var = Ident::parse(input)?;
        input.consume(T::Colon)?;
        let iterable = Expr::parse(input)?;
        input.consume(T::RightParen)?;
        let body = parse_loop_body(input)?;

        return Ok(Stmt::ForEach(ForEachStmt {
            declared,
            var: Name::new(var.name),
            iterable,
            body,
            line: keyword.line(),
        }));
    }

    let init = match input.peek_kind()? {
        T::Semicolon => None,
        T::Keyword(K::Var) => Some(ForInit::Var(VarDecl::parse(input)?)),
        _ => Some(ForInit::Expr(Expr::parse(input)?)),
    };
    input.consume(T::Semicolon)?;

    let cond = match input.peek_kind()? {
        T::Semicolon => None,
        _ => Some(Expr::parse(input)?),
    };
    input.consume(T::Semicolon)?;

    let step = match input.peek_kind()? {
        T::RightParen => None,
        _ => Some(Expr::parse(input)?),
    };
    input.consume(T::RightParen)?;

    let body = parse_loop_body(input)?;

    Ok(Stmt::For(ForStmt {
        init,
        cond,
        step,
        body,
        line: keyword.line(),
    }))
}

impl Parse for IfStmt {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        let keyword = input.consume(TokenKind::Keyword(KeywordKind::If))?;
        let cond = parse_condition(input)?;
        let then = Box::new(Stmt::parse(input)?);
        let otherwise = if input.match_token(TokenKind::Keyword(KeywordKind::Else)) {
            Some(Box::new(Stmt::parse(input)?))
        } else {
            None
        };

        Ok(IfStmt {
            cond,
            then,
            otherwise,
            line: keyword.line(),
        })
    }
}

impl Parse for WhileStmt {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        let keyword = input.consume(TokenKind::Keyword(KeywordKind::While))?;
        let cond = parse_condition(input)?;
        let body = parse_loop_body(input)?;

        Ok(WhileStmt {
            cond,
            body,
            line: keyword.line(),
        })
    }
}

impl Parse for WithStmt {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        let keyword = input.consume(TokenKind::Keyword(KeywordKind::With))?;
        let object = parse_condition(input)?;
        let body = Box::new(Stmt::parse(input)?);

        Ok(WithStmt {
            object,
            body,
            line: keyword.line(),
        })
    }
}

impl Parse for SwitchStmt {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        use KeywordKind as K;
        use TokenKind as T;

        let keyword = input.consume(T::Keyword(K::Switch))?;
        let value = parse_condition(input)?;
        input.consume(T::LeftBrace)?;

        input.enter_switch();
        let cases = parse_cases(input);
        input.leave_switch();
        let cases = cases?;

        input.consume(T::RightBrace)?;

        Ok(SwitchStmt {
            value,
            cases,
            line: keyword.line(),
        })
    }
}

fn parse_cases(input: &mut TokenStream) -> Result<Vec<SwitchCase>, ParseError> {
    use KeywordKind as K;
    use TokenKind as T;

    let mut cases: Vec<SwitchCase> = vec![];

    loop {
        let token = input.peek()?.clone();
        match token.kind {
            T::RightBrace => break,
            T::Keyword(K::Case | K::Default) => {
                let mut case = SwitchCase {
                    labels: vec![],
                    body: vec![],
                    line: token.line(),
                };

                // Consecutive labels share one body.
                while let T::Keyword(keyword @ (K::Case | K::Default)) = input.peek_kind()? {
                    input.advance()?;
                    let label = match keyword {
                        K::Case => Some(Expr::parse(input)?),
                        _ => None,
                    };
                    input.consume(T::Colon)?;
                    case.labels.push(label);
                }

                while !matches!(input.peek_kind()?, T::RightBrace | T::Keyword(K::Case | K::Default)) {
                    if input.peek_kind()? == T::EOS {
                        input.consume(T::RightBrace)?;
                    }
                    case.body.push(Stmt::parse(input)?);
                }

                if case.is_default() && cases.iter().any(SwitchCase::is_default) {
                    return Err(ParseError::Misplaced {
                        what: "second default label",
                        line: case.line,
                    });
                }
                cases.push(case);
            }
            found => {
                return Err(ParseError::Unexpected {
                    found,
                    expected: "case label",
                    line: token.line(),
                })
            }
        }
    }

    Ok(cases)
}

impl Parse for ReturnStmt {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        let keyword = input.consume(TokenKind::Keyword(KeywordKind::Return))?;
        let value = match input.peek_kind()? {
            TokenKind::Semicolon => None,
            _ => Some(Expr::parse(input)?),
        };
        input.consume(TokenKind::Semicolon)?;

        Ok(ReturnStmt {
            value,
            line: keyword.line(),
        })
    }
}

/// Parses the definitions, leaving the terminating
/// semicolon to the caller.
impl Parse for VarDecl {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        let keyword = input.consume(TokenKind::Keyword(KeywordKind::Var))?;
        let mut defs = vec![];

        loop {
            let name = Ident::parse(input)?;
            let rhs = if input.match_token(TokenKind::Eq) {
                Some(Expr::parse(input)?)
            } else {
                None
            };
            defs.push(VarDef { name, rhs });

            if !input.match_token(TokenKind::Comma) {
                break;
            }
        }

        Ok(VarDecl {
            defs,
            line: keyword.line(),
        })
    }
}

impl Parse for ConstDef {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        let keyword = input.consume(TokenKind::Keyword(KeywordKind::Const))?;
        let name = Ident::parse(input)?;
        input.consume(TokenKind::Eq)?;
        let rhs = Expr::parse(input)?;
        input.consume(TokenKind::Semicolon)?;

        Ok(Self {
            name,
            rhs,
            line: keyword.line(),
        })
    }
}
