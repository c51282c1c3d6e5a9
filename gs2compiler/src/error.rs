//! Result and errors.
use crate::{
    compile::{CodegenError, ResolveError},
    header::HeaderError,
    parsing::ParseError,
    token_stream::TokenError,
};
use std::fmt::{self, Display, Formatter};

pub type Gs2Result<T> = std::result::Result<T, CompileError>;

/// Category of a compile failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex,
    Parse,
    UnresolvedReference,
    DuplicateDeclaration,
    UnknownScriptType,
    NestingTooDeep,
    /// Failure of the compiler itself, not caused by the script.
    Internal,
}

impl ErrorKind {
    /// Whether the failure is caused by the script or its header arguments.
    #[inline]
    pub fn is_malformed_input(self) -> bool {
        self != ErrorKind::Internal
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lex => "lex error",
            Self::Parse => "parse error",
            Self::UnresolvedReference => "unresolved reference",
            Self::DuplicateDeclaration => "duplicate declaration",
            Self::UnknownScriptType => "unknown script type",
            Self::NestingTooDeep => "nesting too deep",
            Self::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// First failure of a compile, with the line it is attributed to.
///
/// Line 0 means the error is not tied to a source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub line: usize,
    /// Description of the underlying error, for logs.
    pub detail: String,
}

impl CompileError {
    pub fn new(kind: ErrorKind, line: usize, detail: impl ToString) -> Self {
        Self {
            kind,
            line,
            detail: detail.to_string(),
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for CompileError {}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        let kind = match &err {
            ParseError::Token(TokenError::Lex(_)) => ErrorKind::Lex,
            ParseError::NestingTooDeep { .. } => ErrorKind::NestingTooDeep,
            _ => ErrorKind::Parse,
        };
        CompileError::new(kind, err.line(), err)
    }
}

impl From<ResolveError> for CompileError {
    fn from(err: ResolveError) -> Self {
        let kind = match &err {
            ResolveError::Unresolved { .. } => ErrorKind::UnresolvedReference,
            ResolveError::Duplicate { .. } => ErrorKind::DuplicateDeclaration,
            ResolveError::NotConstant { .. } => ErrorKind::Parse,
        };
        CompileError::new(kind, err.line(), err)
    }
}

impl From<HeaderError> for CompileError {
    fn from(err: HeaderError) -> Self {
        CompileError::new(ErrorKind::UnknownScriptType, 0, err)
    }
}

impl From<CodegenError> for CompileError {
    fn from(err: CodegenError) -> Self {
        CompileError::new(ErrorKind::Internal, 0, err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lex::LexError;

    #[test]
    fn test_error_kinds() {
        let lex = ParseError::Token(TokenError::Lex(LexError::UnterminatedString { line: 4 }));
        let err = CompileError::from(lex);
        assert_eq!(err.kind, ErrorKind::Lex);
        assert_eq!(err.line, 4);

        let mismatch = ParseError::Token(TokenError::EndOfSource { line: 2 });
        assert_eq!(CompileError::from(mismatch).kind, ErrorKind::Parse);

        let nesting = ParseError::NestingTooDeep { limit: 8, line: 9 };
        assert_eq!(CompileError::from(nesting).kind, ErrorKind::NestingTooDeep);

        let unresolved = ResolveError::Unresolved {
            name: "x".into(),
            line: 3,
        };
        assert_eq!(CompileError::from(unresolved).kind, ErrorKind::UnresolvedReference);

        let internal = CompileError::from(CodegenError::ImageTooLarge);
        assert_eq!(internal.kind, ErrorKind::Internal);
        assert!(!internal.kind.is_malformed_input());
    }
}
