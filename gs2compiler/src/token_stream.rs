//! Buffered stream of tokens for look ahead.
use crate::{
    lex::{LexError, Lexer},
    tokens::{Span, Token, TokenKind},
};

use itertools::{multipeek, MultiPeek};
use std::{error, fmt, iter::Iterator, slice::SliceIndex};

/// Buffered stream of tokens that allows arbitrary look ahead.
///
/// Tokens are lazily lexed. Peeking or consuming the next token
/// triggers the internal lexer.
///
/// The peek semantics are determined by the internal `MultiPeek`.
/// Calling `TokenStream::peek` is not idempotent, advancing a peek
/// cursor forward by one token for each `peek()` call. The cursor
/// can be reset explicitly using `TokenStream::reset_peek` or
/// implicitly by calling one of the consuming methods.
///
/// The stream also carries the small amount of context the
/// recursive descent needs: current nesting depth and whether
/// the parser is inside a loop or switch body.
pub struct TokenStream<'a> {
    lexer: MultiPeek<Lexer<'a>>,
    /// Keep reference to the source so the parser can
    /// slice fragments from it.
    source: &'a str,
    /// Line of the most recently consumed token.
    last_line: usize,
    depth: usize,
    max_depth: usize,
    loops: usize,
    switches: usize,
}

impl<'a> TokenStream<'a> {
    /// Default limit on nested statements and expressions.
    pub const DEFAULT_MAX_DEPTH: usize = 128;

    #[inline]
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self::with_max_depth(lexer, Self::DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(lexer: Lexer<'a>, max_depth: usize) -> Self {
        Self {
            source: lexer.source_code(),
            lexer: multipeek(lexer),
            last_line: 0,
            depth: 0,
            max_depth,
            loops: 0,
            switches: 0,
        }
    }

    /// Slice a fragment of source code.
    ///
    /// Returns `None` if the given index is out
    /// of bounds.
    #[inline]
    pub fn fragment<I>(&self, index: I) -> Option<&'a str>
    where
        I: SliceIndex<str, Output = str>,
    {
        self.source.get(index)
    }

    #[inline]
    pub fn fragment_span(&self, span: &Span) -> Option<&'a str> {
        self.fragment(span.start..span.end)
    }

    /// Consumes the current token regardless of type.
    ///
    /// Returns `None` when the cursor is at the end of the token stream.
    #[inline]
    pub fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        let next = self.lexer.next();
        if let Some(Ok(token)) = &next {
            self.last_line = token.line();
        }
        next
    }

    /// Consumes the current token if it matches the given token type.
    ///
    /// Returns true when matched. Returns false when token types
    /// do not match, or the token stream is at the end.
    ///
    /// Does not consume the token if the types do not match.
    pub fn match_token(&mut self, token_kind: TokenKind) -> bool {
        // Ensure clean peek state.
        self.lexer.reset_peek();

        let is_match = matches!(self.lexer.peek(), Some(Ok(token)) if token.kind == token_kind);
        self.lexer.reset_peek();

        if is_match {
            self.next_token();
        }
        is_match
    }

    /// Return the current token with advancing the cursor.
    ///
    /// The consumed token must match the given token type, otherwise
    /// a token error is returned.
    pub fn consume(&mut self, token_kind: TokenKind) -> Result<Token, TokenError> {
        // We should not consume the token if the types don't match.
        let encountered = self.peek()?;
        if encountered.kind != token_kind {
            return Err(TokenError::Mismatch {
                expected: token_kind,
                encountered: encountered.kind,
                line: encountered.line(),
            });
        }

        match self.next_token() {
            Some(result) => result.map_err(TokenError::Lex),
            None => Err(TokenError::EndOfSource {
                line: self.last_line,
            }),
        }
    }

    /// Consume the current token regardless of type, failing on lexical errors.
    pub fn advance(&mut self) -> Result<Token, TokenError> {
        match self.next_token() {
            Some(result) => result.map_err(TokenError::Lex),
            None => Err(TokenError::EndOfSource {
                line: self.last_line,
            }),
        }
    }

    /// Return the current token without advancing the cursor.
    ///
    /// The peek cursor is reset before looking, so repeated
    /// calls return the same token.
    #[inline]
    pub fn peek(&mut self) -> Result<&Token, TokenError> {
        self.lexer.reset_peek();
        let last_line = self.last_line;
        match self.lexer.peek() {
            Some(result) => result.as_ref().map_err(|err| TokenError::Lex(err.clone())),
            None => Err(TokenError::EndOfSource { line: last_line }),
        }
    }

    /// Kind of the current token.
    #[inline]
    pub fn peek_kind(&mut self) -> Result<TokenKind, TokenError> {
        self.peek().map(|token| token.kind)
    }

    /// Kind of the token `n` positions after the current one.
    ///
    /// Looking past the end of the stream, or past a lexical error,
    /// yields end-of-source.
    pub fn peek_nth_kind(&mut self, n: usize) -> TokenKind {
        self.lexer.reset_peek();
        let mut kind = TokenKind::EOS;
        for _ in 0..=n {
            kind = match self.lexer.peek() {
                Some(Ok(token)) => token.kind,
                _ => TokenKind::EOS,
            };
        }
        self.lexer.reset_peek();
        kind
    }

    /// Set peek cursor back to the current cursor.
    #[inline]
    pub fn reset_peek(&mut self) {
        self.lexer.reset_peek()
    }

    /// Line of the most recently consumed token.
    #[inline]
    pub fn last_line(&self) -> usize {
        self.last_line
    }

    /// Descend one level of nesting.
    ///
    /// Fails with the current depth when the limit is exceeded.
    pub fn enter(&mut self) -> Result<(), usize> {
        if self.depth >= self.max_depth {
            return Err(self.depth);
        }
        self.depth += 1;
        Ok(())
    }

    #[inline]
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[inline]
    pub fn enter_loop(&mut self) {
        self.loops += 1;
    }

    #[inline]
    pub fn leave_loop(&mut self) {
        self.loops = self.loops.saturating_sub(1);
    }

    #[inline]
    pub fn in_loop(&self) -> bool {
        self.loops > 0
    }

    #[inline]
    pub fn enter_switch(&mut self) {
        self.switches += 1;
    }

    #[inline]
    pub fn leave_switch(&mut self) {
        self.switches = self.switches.saturating_sub(1);
    }

    /// Whether a `break` has something to leave.
    #[inline]
    pub fn can_break(&self) -> bool {
        self.loops > 0 || self.switches > 0
    }
}

/// Error returned when an unexpected token type is encountered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Mismatch {
        expected: TokenKind,
        encountered: TokenKind,
        line: usize,
    },
    EndOfSource {
        line: usize,
    },
    Lex(LexError),
}

impl TokenError {
    pub fn line(&self) -> usize {
        match self {
            Self::Mismatch { line, .. } | Self::EndOfSource { line } => *line,
            Self::Lex(err) => err.line(),
        }
    }
}

impl error::Error for TokenError {}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenError as E;
        match self {
            E::Mismatch {
                expected,
                encountered,
                line,
            } => write!(
                f,
                "encountered unexpected token '{}', expected '{}' at line {}",
                encountered, expected, line
            ),
            E::EndOfSource { line } => write!(f, "unexpected end of source code after line {}", line),
            E::Lex(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl From<LexError> for TokenError {
    fn from(err: LexError) -> Self {
        TokenError::Lex(err)
    }
}
