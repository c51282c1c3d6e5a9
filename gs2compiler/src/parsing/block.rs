use super::{Parse, ParseError, Stmt};
use crate::{token_stream::TokenStream, tokens::TokenKind};

/// Braced list of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub line: usize,
}

impl Parse for Block {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        let open = input.consume(TokenKind::LeftBrace)?;
        let mut stmts = vec![];

        loop {
            match input.peek_kind()? {
                TokenKind::RightBrace => break,
                // Let the brace mismatch report the unclosed block.
                TokenKind::EOS => {
                    input.consume(TokenKind::RightBrace)?;
                }
                _ => stmts.push(Stmt::parse(input)?),
            }
        }
        input.consume(TokenKind::RightBrace)?;

        Ok(Block {
            stmts,
            line: open.line(),
        })
    }
}
