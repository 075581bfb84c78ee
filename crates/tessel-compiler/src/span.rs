//! Source positions carried through the IR

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location of an IR node, as reported by the parser front-end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span for nodes synthesized by the compiler itself
    pub fn synthetic() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_of_inverted_span_is_zero() {
        let span = Span::new(10, 4, 2, 3);
        assert_eq!(span.len(), 0);
        assert!(span.is_empty());
        assert_eq!(Span::new(4, 10, 2, 3).len(), 6);
    }

    #[test]
    fn test_display_is_line_and_column() {
        assert_eq!(Span::new(0, 5, 12, 7).to_string(), "12:7");
    }
}
