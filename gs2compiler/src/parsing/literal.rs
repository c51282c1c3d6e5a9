use super::{Parse, ParseError};
use crate::{
    lex::unescape,
    token_stream::TokenStream,
    tokens::{KeywordKind, TokenKind},
};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LitValue,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LitValue {
    Int(u32),
    /// Floating point numbers keep their source text, which
    /// is what ends up in the bytecode.
    Float(SmolStr),
    Str(String),
    Bool(bool),
    Null,
}

impl Parse for Literal {
    type Output = Self;
    type Err = ParseError;

    fn parse(input: &mut TokenStream) -> Result<Self, ParseError> {
        use KeywordKind as K;
        use TokenKind as T;

        let token = input.advance()?;
        let line = token.line();
        let fragment = input.fragment_span(&token.span).unwrap_or_default();

        let value = match token.kind {
            T::Int => parse_int(fragment).ok_or(ParseError::InvalidLiteral { line })?,
            T::Float => LitValue::Float(fragment.into()),
            T::Str => LitValue::Str(unescape(fragment)),
            T::Keyword(K::True) => LitValue::Bool(true),
            T::Keyword(K::False) => LitValue::Bool(false),
            T::Keyword(K::Null) => LitValue::Null,
            found => {
                return Err(ParseError::Unexpected {
                    found,
                    expected: "literal",
                    line,
                })
            }
        };

        Ok(Literal { value, line })
    }
}

/// Decimal integers too large for 32 bits are kept as
/// floating point text.
fn parse_int(fragment: &str) -> Option<LitValue> {
    if let Some(hex) = fragment.strip_prefix("0x").or_else(|| fragment.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok().map(LitValue::Int);
    }

    match fragment.parse::<u32>() {
        Ok(value) => Some(LitValue::Int(value)),
        Err(_) if fragment.bytes().all(|b| b.is_ascii_digit()) => Some(LitValue::Float(fragment.into())),
        Err(_) => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), Some(LitValue::Int(42)));
        assert_eq!(parse_int("0xFF"), Some(LitValue::Int(255)));
        assert_eq!(parse_int("4294967296"), Some(LitValue::Float("4294967296".into())));
        assert_eq!(parse_int("0x1FFFFFFFF"), None);
    }
}
