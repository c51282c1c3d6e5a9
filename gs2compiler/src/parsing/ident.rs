use super::{Parse, ParseError};
use crate::{token_stream::TokenStream, tokens::TokenKind};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: SmolStr,
    pub line: usize,
}

impl Parse for Ident {
    type Output = Self;
    type Err = ParseError;

    #[inline]
    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        let token = input.consume(TokenKind::Ident)?;
        let name = input.fragment_span(&token.span).unwrap_or_default().into();
        Ok(Ident {
            name,
            line: token.line(),
        })
    }
}
