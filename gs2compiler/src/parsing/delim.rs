//! Delimited list.
use super::{Parse, ParseError};
use crate::{
    token_stream::TokenStream,
    tokens::{Token, TokenKind},
};

#[derive(Debug)]
pub struct Delimited<T, D> {
    pub items: Vec<DelimitedItem<T, D>>,
}

#[derive(Debug)]
pub struct DelimitedItem<T, D> {
    pub item: T,
    pub delim: Option<D>,
}

#[derive(Debug)]
pub struct Comma {
    pub token: Token,
}

impl<T, D> Delimited<T, D>
where
    T: Parse<Output = T, Err = ParseError>,
    D: Parse<Output = Option<D>, Err = ParseError>,
{
    /// Parse items separated by delimiters, stopping before the
    /// closing token. The closing token is left for the caller.
    ///
    /// A trailing delimiter right before the closing token is allowed.
    pub fn parse_until(input: &mut TokenStream, close: TokenKind) -> Result<Self, ParseError> {
        let mut items = vec![];

        while input.peek_kind()? != close {
            let item = T::parse(input)?;
            let delim = D::parse(input)?;
            let done = delim.is_none();
            items.push(DelimitedItem { item, delim });
            if done {
                break;
            }
        }

        Ok(Delimited { items })
    }

    pub fn into_items(self) -> Vec<T> {
        self.items.into_iter().map(|item| item.item).collect()
    }
}

/// Parse a comma token into an AST node.
///
/// Allowed to fail because the lookahead is here and not in the delimiter list.
impl Parse for Comma {
    type Output = Option<Self>;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Option<Self>, ParseError> {
        Ok(match input.peek_kind()? {
            TokenKind::Comma => Some(Comma {
                token: input.consume(TokenKind::Comma)?,
            }),
            _ => None,
        })
    }
}
