use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location of a syntax node.
///
/// Lines and columns are 1-based. The executor reads `start_line` for
/// declaration proximity (bond detection) and keys per-statement state
/// (cached results, jackpot counters) on the whole span.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Zero-width span at a single position.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    /// A span covering column 1 of `line`; handy for hand-built trees.
    pub fn line(line: u32) -> Self {
        Self::point(line, 1)
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        let (start_line, start_col) =
            (self.start_line, self.start_col).min((other.start_line, other.start_col));
        let (end_line, end_col) = (self.end_line, self.end_col).max((other.end_line, other.end_col));
        Span::new(start_line, start_col, end_line, end_col)
    }

    /// Number of source lines between the starts of two spans.
    pub fn line_distance(&self, other: &Span) -> u32 {
        self.start_line.abs_diff(other.start_line)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_across_lines_keeps_outer_columns() {
        let merged = Span::new(1, 5, 1, 10).merge(Span::new(2, 3, 2, 8));
        assert_eq!(merged, Span::new(1, 5, 2, 8));
    }

    #[test]
    fn merge_on_one_line_widens_both_ends() {
        let merged = Span::new(1, 5, 1, 10).merge(Span::new(1, 3, 1, 8));
        assert_eq!(merged, Span::new(1, 3, 1, 10));
    }

    #[test]
    fn line_distance_is_symmetric() {
        let a = Span::line(4);
        let b = Span::line(7);
        assert_eq!(a.line_distance(&b), 3);
        assert_eq!(b.line_distance(&a), 3);
    }

    #[test]
    fn display_is_line_colon_column() {
        assert_eq!(Span::new(3, 7, 3, 15).to_string(), "3:7");
    }
}
