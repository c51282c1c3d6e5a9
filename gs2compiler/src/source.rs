//! Source text with a line index for diagnostics.
use std::ops::Range;

/// Owned source code, indexed by line.
///
/// Line numbers are 1-based. Line 0 is reserved for errors
/// that are not attributable to any line, and maps to the
/// empty string.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    source: String,
    lines: Vec<Range<usize>>,
}

impl SourceMap {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let lines = index_lines(&source);
        Self { source, lines }
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Exact text of the given line, excluding its terminator.
    ///
    /// Out of range lines, including line 0, yield an empty string.
    pub fn line(&self, line: usize) -> &str {
        line.checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .and_then(|range| self.source.get(range.clone()))
            .unwrap_or_default()
    }

    /// Source contains nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }
}

fn index_lines(source: &str) -> Vec<Range<usize>> {
    let mut lines = vec![];
    let mut start = 0;

    for (index, c) in source.char_indices() {
        if c == '\n' {
            lines.push(start..trim_carriage_return(source, start, index));
            start = index + 1;
        }
    }
    lines.push(start..trim_carriage_return(source, start, source.len()));

    lines
}

/// End of the line with a trailing `\r` of a `\r\n` pair removed.
fn trim_carriage_return(source: &str, start: usize, end: usize) -> usize {
    if end > start && source.as_bytes()[end - 1] == b'\r' {
        end - 1
    } else {
        end
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_line_text_preserves_indentation() {
        let map = SourceMap::new("//#CLIENTSIDE\n\t\tfunction onCreated()\r\n\t\t}");

        assert_eq!(map.line_count(), 3);
        assert_eq!(map.line(0), "");
        assert_eq!(map.line(1), "//#CLIENTSIDE");
        assert_eq!(map.line(2), "\t\tfunction onCreated()");
        assert_eq!(map.line(3), "\t\t}");
        assert_eq!(map.line(4), "");
    }

    #[test]
    fn test_trailing_newline() {
        let map = SourceMap::new("a;\n");

        assert_eq!(map.line_count(), 2);
        assert_eq!(map.line(1), "a;");
        assert_eq!(map.line(2), "");
    }

    #[test]
    fn test_blank() {
        assert!(SourceMap::new("").is_blank());
        assert!(SourceMap::new(" \n\t\r\n").is_blank());
        assert!(!SourceMap::new("//").is_blank());
    }
}
