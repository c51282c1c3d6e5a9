//! Lexical analysis (tokenizer)
use crate::tokens::{KeywordKind, Span, Token, TokenKind};

use itertools::{multipeek, MultiPeek};
use std::{
    error, fmt,
    iter::Iterator,
    str::{CharIndices, FromStr},
};

/// Marker comment that splits server side and client side code.
pub const CLIENTSIDE_DIRECTIVE: &str = "//#CLIENTSIDE";

pub fn debug_print_lexer(lexer: Lexer) {
    let source = lexer.source.text;
    println!("Source Byte Count: {}", source.len());
    println!("line:col   | span      | token                | fragment");

    for result in lexer {
        match result {
            Ok(token) => {
                let position = format!("{}:{}", token.span.start_line, token.span.start_column);
                let span = format!("{}-{}", token.span.start, token.span.end);
                let kind = format!("{:?}", token.kind); // cannot format debug print {:?} into columns
                let fragment = token.span.fragment(source);
                println!("{position:<10} | {span:<9} | {kind:<20} | {fragment}");
            }
            Err(err) => println!("{}", err),
        }
    }
}

/// Lexical analyzer.
pub struct Lexer<'a> {
    pub(crate) source: SourceText<'a>,
    token_start: SourcePos,
    /// Set once end-of-source or an error has been yielded.
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            source: SourceText::new(source_code),
            token_start: SourcePos {
                position: 0,
                line: 1,
                column: 1,
            },
            done: false,
        }
    }

    #[inline]
    pub fn source_code(&self) -> &'a str {
        self.source.text
    }

    /// Rewind the lexer to the start of its source.
    pub fn reset(&mut self) {
        *self = Lexer::new(self.source.text);
    }

    #[rustfmt::skip]
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        use TokenKind as T;

        while !self.source.at_end() {
            if let Some((_, next_char)) = self.source.next_char() {
                self.start_token();

                match next_char {
                    '+' => return Ok(match self.source.peek_char() {
                        Some((_, '+')) => self.advance_token(T::PlusPlus),
                        Some((_, '=')) => self.advance_token(T::PlusEq),
                        _              => self.make_token(T::Plus),
                    }),
                    '-' => return Ok(match self.source.peek_char() {
                        Some((_, '-')) => self.advance_token(T::MinusMinus),
                        Some((_, '=')) => self.advance_token(T::MinusEq),
                        _              => self.make_token(T::Minus),
                    }),
                    '*' => return Ok(self.follow('=', T::StarEq, T::Star)),
                    '%' => return Ok(self.follow('=', T::PercentEq, T::Percent)),
                    '@' => return Ok(self.follow('=', T::AtEq, T::At)),
                    '=' => return Ok(self.follow('=', T::EqEq, T::Eq)),
                    '!' => return Ok(self.follow('=', T::BangEq, T::Bang)),
                    '<' => return Ok(self.follow('=', T::LessEq, T::Less)),
                    '>' => return Ok(self.follow('=', T::GreaterEq, T::Greater)),
                    '&' => return self.pair('&', T::AndAnd),
                    '|' => return Ok(self.follow('|', T::OrOr, T::Pipe)),
                    '^' => return Ok(self.make_token(T::Caret)),
                    '?' => return Ok(self.make_token(T::Question)),
                    ':' => return Ok(self.make_token(T::Colon)),
                    ';' => return Ok(self.make_token(T::Semicolon)),
                    ',' => return Ok(self.make_token(T::Comma)),
                    '.' => return Ok(self.make_token(T::Dot)),
                    '(' => return Ok(self.make_token(T::LeftParen)),
                    ')' => return Ok(self.make_token(T::RightParen)),
                    '{' => return Ok(self.make_token(T::LeftBrace)),
                    '}' => return Ok(self.make_token(T::RightBrace)),
                    '[' => return Ok(self.make_token(T::LeftBracket)),
                    ']' => return Ok(self.make_token(T::RightBracket)),
                    ' ' | '\t' | '\r' | '\n' => self.consume_whitespace(),
                    '/' => match self.source.peek_char() {
                        Some((_, '/')) => {
                            if let Some(directive) = self.consume_line_comment() {
                                return Ok(directive);
                            }
                        }
                        Some((_, '*')) => self.consume_block_comment()?,
                        Some((_, '=')) => return Ok(self.advance_token(T::SlashEq)),
                        _              => return Ok(self.make_token(T::Slash)),
                    },
                    '"' | '\'' => return self.consume_string(next_char),
                    '0'..='9'  => return self.consume_number(next_char),
                    '_' | 'a'..='z'
                        | 'A'..='Z' => return Ok(self.consume_ident()),
                    _ => {
                        return Err(LexError::UnknownCharacter {
                            character: next_char,
                            line: self.token_start.line,
                        })
                    }
                }
            } else {
                break;
            }
        }

        Ok(self.make_eos())
    }

    /// Prime the lexer state for recording a new token.
    fn start_token(&mut self) {
        self.token_start = SourcePos {
            position: self.source.current.0,
            column: self.source.current_column,
            line: self.source.current_line,
        };
    }

    fn make_token(&mut self, token_kind: TokenKind) -> Token {
        let (position, c) = self.source.current;

        // Build span.
        let span = Span {
            start: self.token_start.position,
            end: position + c.len_utf8(),
            start_column: self.token_start.column,
            end_column: self.source.current_column,
            start_line: self.token_start.line,
            end_line: self.source.current_line,
        };

        Token { kind: token_kind, span }
    }

    /// Give end-of-source its own empty span at the end of the text.
    fn make_eos(&mut self) -> Token {
        let position = self.source.byte_count();
        let span = Span {
            start: position,
            end: position,
            start_column: self.source.current_column + 1,
            end_column: self.source.current_column + 1,
            start_line: self.source.current_line,
            end_line: self.source.current_line,
        };

        Token {
            kind: TokenKind::EOS,
            span,
        }
    }

    /// Consume the peeked character as part of the current token.
    fn advance_token(&mut self, token_kind: TokenKind) -> Token {
        self.source.next_char();
        self.make_token(token_kind)
    }

    /// Two character operator when the next character matches, otherwise
    /// the single character operator.
    fn follow(&mut self, expected: char, matched: TokenKind, otherwise: TokenKind) -> Token {
        match self.source.peek_char() {
            Some((_, c)) if c == expected => self.advance_token(matched),
            _ => self.make_token(otherwise),
        }
    }

    /// Operator that is only valid as a doubled character, like `&&`.
    fn pair(&mut self, expected: char, token_kind: TokenKind) -> Result<Token, LexError> {
        match self.source.peek_char() {
            Some((_, c)) if c == expected => Ok(self.advance_token(token_kind)),
            _ => Err(LexError::UnknownCharacter {
                character: expected,
                line: self.token_start.line,
            }),
        }
    }

    /// Consume whitespace characters, including newlines,
    /// until a non-whitespace character is encountered.
    fn consume_whitespace(&mut self) {
        while let Some((_, ' ' | '\t' | '\r' | '\n')) = self.source.peek_char() {
            self.source.next_char();
        }
    }

    /// Skips a line comment, unless it is the client side directive.
    fn consume_line_comment(&mut self) -> Option<Token> {
        while let Some((_, c)) = self.source.peek_char() {
            match c {
                '\n' => break,
                _ => {
                    self.source.next_char();
                }
            }
        }

        if self.token_fragment().trim_end() == CLIENTSIDE_DIRECTIVE {
            Some(self.make_token(TokenKind::Directive))
        } else {
            None
        }
    }

    fn consume_block_comment(&mut self) -> Result<(), LexError> {
        let line = self.token_start.line;

        // Opening star
        self.source.next_char();

        loop {
            match self.source.next_char() {
                Some((_, '*')) => {
                    if let Some((_, '/')) = self.source.peek_char() {
                        self.source.next_char();
                        return Ok(());
                    }
                }
                Some(_) => {}
                None => return Err(LexError::UnterminatedComment { line }),
            }
        }
    }

    fn consume_string(&mut self, quote: char) -> Result<Token, LexError> {
        let line = self.token_start.line;

        loop {
            match self.source.next_char() {
                None | Some((_, '\n')) => return Err(LexError::UnterminatedString { line }),
                Some((_, '\\')) => {
                    // Escaped character is taken as is, and validated when unescaping.
                    if let None | Some((_, '\n')) = self.source.next_char() {
                        return Err(LexError::UnterminatedString { line });
                    }
                }
                Some((_, c)) if c == quote => break,
                Some(_) => {}
            }
        }

        Ok(self.make_token(TokenKind::Str))
    }

    fn consume_number(&mut self, first: char) -> Result<Token, LexError> {
        if first == '0' {
            if let Some((_, 'x' | 'X')) = self.source.peek_char() {
                self.source.next_char();

                let mut digit_count = 0;
                while let Some((_, c)) = self.source.peek_char() {
                    if !c.is_ascii_hexdigit() {
                        break;
                    }
                    self.source.next_char();
                    digit_count += 1;
                }

                if digit_count == 0 {
                    return Err(LexError::InvalidNumber {
                        line: self.token_start.line,
                    });
                }

                return Ok(self.make_token(TokenKind::Int));
            }
        }

        self.consume_digits();

        // Fractional part requires at least one digit after the point,
        // otherwise the dot is member access.
        if let (Some('.'), Some('0'..='9')) = self.source.peek_char2() {
            self.source.next_char();
            self.consume_digits();
            return Ok(self.make_token(TokenKind::Float));
        }

        Ok(self.make_token(TokenKind::Int))
    }

    fn consume_digits(&mut self) {
        while let Some((_, '0'..='9')) = self.source.peek_char() {
            self.source.next_char();
        }
    }

    fn consume_ident(&mut self) -> Token {
        while let Some((_, c)) = self.source.peek_char() {
            match c {
                '_' | 'a'..='z' | 'A'..='Z' | '0'..='9' => {
                    self.source.next_char();
                }
                _ => break,
            }
        }

        // If a valid keyword can be parsed from the source fragment, then
        // the token is a reserved keyword instead of a user defined identifier.
        let token_kind = KeywordKind::from_str(self.token_fragment())
            .map(TokenKind::Keyword)
            .unwrap_or(TokenKind::Ident);
        self.make_token(token_kind)
    }

    fn token_fragment(&self) -> &'a str {
        let (position, c) = self.source.current;
        self.source
            .text
            .get(self.token_start.position..position + c.len_utf8())
            .unwrap_or_default()
    }
}

/// Implement `Lexer` as an interator for consuming
/// tokens lazily.
///
/// The final item is either the end-of-source token, or
/// the first lexical error.
impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.next_token();
        self.done = matches!(
            result,
            Err(_)
                | Ok(Token {
                    kind: TokenKind::EOS,
                    ..
                })
        );
        Some(result)
    }
}

/// Resolve the escape sequences of a quoted string literal.
///
/// The given fragment includes the surrounding quotes.
pub fn unescape(literal: &str) -> String {
    let inner = literal
        .get(1..literal.len().saturating_sub(1))
        .unwrap_or_default();
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some('0') => value.push('\0'),
            Some(other) => value.push(other),
            None => break,
        }
    }

    value
}

/// Wrapper for source code that keeps a cursor position.
///
/// Allows forward lookup via peeking.
pub(crate) struct SourceText<'a> {
    /// Keep reference to the source so the parser can
    /// slice fragments from it.
    pub(crate) text: &'a str,

    /// Iterator over UTF-8 encoded source code.
    ///
    /// The `MultiPeek` wrapper allows for arbitrary lookahead by consuming
    /// the iterator internally and buffering the result. This is required
    /// because UTF-8 characters are variable in width.
    ///
    /// Peeking advances the internal peek cursor by 1. The peek helpers
    /// below always reset the cursor first, so each call looks ahead from
    /// the current character.
    source: MultiPeek<CharIndices<'a>>,

    /// Byte position in the source string of the current character.
    current: (usize, char),
    current_line: usize,
    current_column: usize,
}

impl<'a> SourceText<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            text: source,
            source: multipeek(source.char_indices()),
            current: (0, '\0'),
            current_line: 1,
            current_column: 0,
        }
    }

    /// number of bytes in source.
    fn byte_count(&self) -> usize {
        self.text.len()
    }

    /// Advance the cursor and return the next position and character.
    fn next_char(&mut self) -> Option<(usize, char)> {
        if let Some((index, c)) = self.source.next() {
            if c == '\n' {
                self.current_column = 0;
                self.current_line += 1;
            } else {
                self.current_column += 1;
            }
            self.current = (index, c);
            Some((index, c))
        } else {
            // Source code iterator has reached end-of-file.
            //
            // Set the current index to the size of the source
            // string. There is no End-of-file character, so
            // we just set it to the null-byte.
            self.current = (self.byte_count(), '\0');
            None
        }
    }

    /// Peeks the character after the current one.
    fn peek_char(&mut self) -> Option<(usize, char)> {
        self.source.reset_peek();
        let peeked = self.source.peek().cloned();
        self.source.reset_peek();
        peeked
    }

    /// Two character lookahead.
    fn peek_char2(&mut self) -> (Option<char>, Option<char>) {
        self.source.reset_peek();
        let peeked = (
            self.source.peek().map(|(_, c)| c).cloned(),
            self.source.peek().map(|(_, c)| c).cloned(),
        );
        self.source.reset_peek();
        peeked
    }

    /// Indicates if the cursor is at the end of the source.
    fn at_end(&self) -> bool {
        self.current.0 >= self.byte_count()
    }
}

#[derive(Debug, Default)]
struct SourcePos {
    position: usize,
    column: usize,
    line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnknownCharacter { character: char, line: usize },
    UnterminatedString { line: usize },
    UnterminatedComment { line: usize },
    InvalidNumber { line: usize },
}

impl LexError {
    /// Line where the offending token starts.
    pub fn line(&self) -> usize {
        match self {
            Self::UnknownCharacter { line, .. }
            | Self::UnterminatedString { line }
            | Self::UnterminatedComment { line }
            | Self::InvalidNumber { line } => *line,
        }
    }
}

impl error::Error for LexError {}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownCharacter { character, line } => {
                write!(f, "unknown character {:?} at line {}", character, line)
            }
            Self::UnterminatedString { line } => write!(f, "unterminated string at line {}", line),
            Self::UnterminatedComment { line } => write!(f, "unterminated comment at line {}", line),
            Self::InvalidNumber { line } => write!(f, "invalid number literal at line {}", line),
        }
    }
}
