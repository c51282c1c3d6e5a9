//! User facing error messages.
use crate::{
    error::{CompileError, ErrorKind},
    source::SourceMap,
};
use std::fmt;

/// Compile failure rendered against the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    kind: ErrorKind,
    line: usize,
    message: String,
}

impl Diagnostic {
    pub fn new(err: &CompileError, source: &SourceMap) -> Self {
        let message = if err.kind.is_malformed_input() {
            format!("malformed input at line {}: {}\n", err.line, source.line(err.line))
        } else {
            format!("internal compiler error: {}\n", err.detail)
        };

        Self {
            kind: err.kind,
            line: err.line,
            message,
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Message text, terminated by a newline.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_malformed_input_message() {
        let source = SourceMap::new("a = 1;\n  b = ;\n");
        let err = CompileError::new(ErrorKind::Parse, 2, "expected expression");
        let diag = Diagnostic::new(&err, &source);

        assert_eq!(diag.message(), "malformed input at line 2:   b = ;\n");
        assert_eq!(diag.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_line_zero() {
        let source = SourceMap::new("");
        let err = CompileError::new(ErrorKind::Parse, 0, "source is empty");

        assert_eq!(Diagnostic::new(&err, &source).message(), "malformed input at line 0: \n");
    }

    #[test]
    fn test_internal_message() {
        let source = SourceMap::new("x = 1;");
        let err = CompileError::new(ErrorKind::Internal, 0, "bytecode image too large");

        assert_eq!(
            Diagnostic::new(&err, &source).to_string(),
            "internal compiler error: bytecode image too large\n"
        );
    }
}
