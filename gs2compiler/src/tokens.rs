use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Line the token starts on.
    #[inline]
    pub fn line(&self) -> usize {
        self.span.start_line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Plus,       // `+`
    Minus,      // `-`
    Star,       // `*`
    Slash,      // `/`
    Percent,    // `%`
    Caret,      // `^`
    At,         // `@`
    Bang,       // `!`
    Eq,         // `=`
    EqEq,       // `==`
    BangEq,     // `!=`
    Less,       // `<`
    Greater,    // `>`
    LessEq,     // `<=`
    GreaterEq,  // `>=`
    AndAnd,     // `&&`
    OrOr,       // `||`
    Pipe,       // `|`
    PlusPlus,   // `++`
    MinusMinus, // `--`
    PlusEq,     // `+=`
    MinusEq,    // `-=`
    StarEq,     // `*=`
    SlashEq,    // `/=`
    PercentEq,  // `%=`
    AtEq,       // `@=`
    Question,   // `?`
    Colon,      // `:`
    Semicolon,  // `;`
    Comma,      // `,`
    Dot,        // `.`
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,

    /// Integer literal, decimal or hexadecimal.
    Int,
    /// Floating point literal.
    Float,
    /// Quoted string literal, quotes included in the span.
    Str,

    Ident,

    /// Identifier in the set of reserved words.
    Keyword(KeywordKind),

    /// The `//#CLIENTSIDE` marker comment.
    Directive,

    /// End-of-source
    EOS,
}

impl TokenKind {
    /// Whether the token is one of the assignment operators.
    pub fn is_assign(&self) -> bool {
        use TokenKind as T;
        matches!(
            self,
            T::Eq | T::PlusEq | T::MinusEq | T::StarEq | T::SlashEq | T::PercentEq | T::AtEq
        )
    }
}

impl fmt::Display for TokenKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenKind as T;
        match self {
            T::Plus         => write!(f, "+"),
            T::Minus        => write!(f, "-"),
            T::Star         => write!(f, "*"),
            T::Slash        => write!(f, "/"),
            T::Percent      => write!(f, "%"),
            T::Caret        => write!(f, "^"),
            T::At           => write!(f, "@"),
            T::Bang         => write!(f, "!"),
            T::Eq           => write!(f, "="),
            T::EqEq         => write!(f, "=="),
            T::BangEq       => write!(f, "!="),
            T::Less         => write!(f, "<"),
            T::Greater      => write!(f, ">"),
            T::LessEq       => write!(f, "<="),
            T::GreaterEq    => write!(f, ">="),
            T::AndAnd       => write!(f, "&&"),
            T::OrOr         => write!(f, "||"),
            T::Pipe         => write!(f, "|"),
            T::PlusPlus     => write!(f, "++"),
            T::MinusMinus   => write!(f, "--"),
            T::PlusEq       => write!(f, "+="),
            T::MinusEq      => write!(f, "-="),
            T::StarEq       => write!(f, "*="),
            T::SlashEq      => write!(f, "/="),
            T::PercentEq    => write!(f, "%="),
            T::AtEq         => write!(f, "@="),
            T::Question     => write!(f, "?"),
            T::Colon        => write!(f, ":"),
            T::Semicolon    => write!(f, ";"),
            T::Comma        => write!(f, ","),
            T::Dot          => write!(f, "."),
            T::LeftParen    => write!(f, "("),
            T::RightParen   => write!(f, ")"),
            T::LeftBrace    => write!(f, "{{"),
            T::RightBrace   => write!(f, "}}"),
            T::LeftBracket  => write!(f, "["),
            T::RightBracket => write!(f, "]"),
            T::Int          => write!(f, "integer"),
            T::Float        => write!(f, "float"),
            T::Str          => write!(f, "string"),
            T::Ident        => write!(f, "identifier"),
            T::Keyword(k)   => write!(f, "{}", k),
            T::Directive    => write!(f, "//#CLIENTSIDE"),
            T::EOS          => write!(f, "end-of-source"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordKind {
    Break,
    Case,
    Const,
    Continue,
    Default,
    Else,
    False,
    For,
    Function,
    If,
    In,
    New,
    Null,
    Public,
    Return,
    Switch,
    True,
    Var,
    While,
    With,
}

impl fmt::Display for KeywordKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use KeywordKind as K;
        match self {
            K::Break    => write!(f, "break"),
            K::Case     => write!(f, "case"),
            K::Const    => write!(f, "const"),
            K::Continue => write!(f, "continue"),
            K::Default  => write!(f, "default"),
            K::Else     => write!(f, "else"),
            K::False    => write!(f, "false"),
            K::For      => write!(f, "for"),
            K::Function => write!(f, "function"),
            K::If       => write!(f, "if"),
            K::In       => write!(f, "in"),
            K::New      => write!(f, "new"),
            K::Null     => write!(f, "null"),
            K::Public   => write!(f, "public"),
            K::Return   => write!(f, "return"),
            K::Switch   => write!(f, "switch"),
            K::True     => write!(f, "true"),
            K::Var      => write!(f, "var"),
            K::While    => write!(f, "while"),
            K::With     => write!(f, "with"),
        }
    }
}

impl FromStr for KeywordKind {
    type Err = ();

    #[rustfmt::skip]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use KeywordKind as K;
        match s {
            "break"    => Ok(K::Break),
            "case"     => Ok(K::Case),
            "const"    => Ok(K::Const),
            "continue" => Ok(K::Continue),
            "default"  => Ok(K::Default),
            "else"     => Ok(K::Else),
            "false"    => Ok(K::False),
            "for"      => Ok(K::For),
            "function" => Ok(K::Function),
            "if"       => Ok(K::If),
            "in"       => Ok(K::In),
            "new"      => Ok(K::New),
            "null"     => Ok(K::Null),
            "public"   => Ok(K::Public),
            "return"   => Ok(K::Return),
            "switch"   => Ok(K::Switch),
            "true"     => Ok(K::True),
            "var"      => Ok(K::Var),
            "while"    => Ok(K::While),
            "with"     => Ok(K::With),
            _          => Err(()),
        }
    }
}

/// Chunk of source code, encoded as starting and ending positions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    /// Start position of bytes in source.
    pub start: usize,
    /// Exclusive end position of bytes in source.
    pub end: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl Span {
    /// Slice the source code covered by this span.
    ///
    /// Returns an empty string when the span is out of bounds.
    #[inline]
    pub fn fragment<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or_default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span {
            start,
            end,
            ..Default::default()
        }
    }

    #[test]
    fn test_span_fragment() {
        const CODE: &str = "echo(\"hi\");";

        assert_eq!(span(0, 4).fragment(CODE), "echo");
        assert_eq!(span(4, 5).fragment(CODE), "(");
        assert_eq!(span(5, 9).fragment(CODE), "\"hi\"");
        assert_eq!(span(11, 11).fragment(CODE), "");
        assert_eq!(span(10, 40).fragment(CODE), "");
    }

    #[test]
    fn test_keyword_round_trip() {
        for word in ["function", "public", "while", "with", "null"] {
            let keyword = KeywordKind::from_str(word).unwrap();
            assert_eq!(keyword.to_string(), word);
        }
        assert!(KeywordKind::from_str("echo").is_err());
    }
}
