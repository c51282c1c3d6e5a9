use super::{Block, Comma, Delimited, Ident, Parse, ParseError};
use crate::{
    token_stream::TokenStream,
    tokens::{KeywordKind, TokenKind},
};

/// Function declaration.
///
/// ```text
/// public function onCreated(a, b) { ... }
/// function obj.onAction() { ... }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub public: bool,
    /// Object the function is declared on, for `function obj.name()`.
    pub object: Option<Ident>,
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Block,
    pub line: usize,
}

impl FuncDef {
    /// Name as it is recorded in the function table.
    pub fn table_name(&self) -> String {
        let mut name = String::new();
        if self.public {
            name.push_str("public.");
        }
        if let Some(object) = &self.object {
            name.push_str(&object.name);
            name.push('.');
        }
        name.push_str(&self.name.name);
        name
    }

    /// Methods declared on another object are not callable by bare name.
    #[inline]
    pub fn is_method(&self) -> bool {
        self.object.is_some()
    }
}

impl Parse for FuncDef {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        let public = input.match_token(TokenKind::Keyword(KeywordKind::Public));
        let keyword = input.consume(TokenKind::Keyword(KeywordKind::Function))?;

        let first = Ident::parse(input)?;
        let (object, name) = if input.match_token(TokenKind::Dot) {
            (Some(first), Ident::parse(input)?)
        } else {
            (None, first)
        };

        input.consume(TokenKind::LeftParen)?;
        let params = Delimited::<Ident, Comma>::parse_until(input, TokenKind::RightParen)?;
        input.consume(TokenKind::RightParen)?;

        let body = Block::parse(input)?;

        Ok(FuncDef {
            public,
            object,
            name,
            params: params.into_items(),
            body,
            line: keyword.line(),
        })
    }
}
