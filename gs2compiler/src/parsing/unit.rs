//! Compilation unit.
use super::{FuncDef, Parse, ParseError, Stmt};
use crate::{
    token_stream::TokenStream,
    tokens::{KeywordKind, TokenKind},
};

/// Root of the syntax tree for one source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompilationUnit {
    pub items: Vec<Item>,
    /// Index of the first item after the `//#CLIENTSIDE` directive.
    pub clientside: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Func(FuncDef),
    Stmt(Stmt),
}

impl CompilationUnit {
    pub fn funcs(&self) -> impl Iterator<Item = &FuncDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Func(func) => Some(func),
            Item::Stmt(_) => None,
        })
    }
}

impl Parse for CompilationUnit {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        use KeywordKind as K;
        use TokenKind as T;

        let mut unit = CompilationUnit::default();
        let mut is_empty = true;

        loop {
            let token = input.peek()?.clone();

            match token.kind {
                T::EOS => break,
                T::Directive => {
                    input.advance()?;
                    if unit.clientside.is_some() {
                        return Err(ParseError::Misplaced {
                            what: "second client side directive",
                            line: token.line(),
                        });
                    }
                    unit.clientside = Some(unit.items.len());
                }
                T::Keyword(K::Function | K::Public) => {
                    unit.items.push(Item::Func(FuncDef::parse(input)?));
                }
                _ => unit.items.push(Item::Stmt(Stmt::parse(input)?)),
            }

            is_empty = false;
        }

        if is_empty {
            return Err(ParseError::EmptySource);
        }

        Ok(unit)
    }
}
