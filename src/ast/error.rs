//! Syntax error type shared by the lexer and parser.

use thiserror::Error;

/// Malformed query text.
///
/// `position` is the 0-based character offset of the offending token; the
/// `Display` form reports it 1-based, the way editors count columns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found} at position {}", .position + 1)]
pub struct ParseError {
    pub position: usize,
    pub expected: String,
    pub found: String,
}

impl ParseError {
    pub fn new(position: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Renders a caret under the failing column of `query`.
    pub fn pointer(&self, query: &str) -> String {
        let line: String = query.chars().filter(|c| *c != '\n').collect();
        let column = self.position.min(line.chars().count());
        format!("{}\n{}^", line, " ".repeat(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_is_one_based() {
        let err = ParseError::new(4, "identifier", "'('");
        assert_eq!(err.to_string(), "expected identifier, found '(' at position 5");
    }

    #[test]
    fn test_pointer_marks_column() {
        let err = ParseError::new(14, "')'", "end of input");
        assert_eq!(
            err.pointer("Commits.Take(1"),
            format!("Commits.Take(1\n{}^", " ".repeat(14))
        );
    }
}
