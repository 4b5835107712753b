//! Source locations carried through the pipeline for diagnostics.
//!
//! The compiler never does arithmetic on spans beyond merging them; they are
//! produced by whatever parser builds the raw tree and forwarded untouched
//! into error messages.

use std::fmt;

/// A region of template source, identified by its starting position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed, 0 for synthetic nodes).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// A span for nodes the compiler creates that have no source text.
    #[inline]
    pub fn synthetic() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }

    /// Extend this span to cover `other`.
    ///
    /// Synthetic spans are absorbed: merging with one returns the other side.
    pub fn merge(self, other: Span) -> Span {
        if self.is_synthetic() {
            return other;
        }
        if other.is_synthetic() {
            return self;
        }
        if self.line != other.line {
            let (first, last) = if self.line < other.line {
                (self, other)
            } else {
                (other, self)
            };
            return Span::new(first.line, first.col, first.len + last.len);
        }

        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span::new(self.line, start, end - start)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            write!(f, "<synthetic>")
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_line_and_column() {
        assert_eq!(Span::new(3, 15, 5).to_string(), "3:15");
        assert_eq!(Span::synthetic().to_string(), "<synthetic>");
    }

    #[test]
    fn merge_on_one_line_covers_both() {
        let merged = Span::new(1, 10, 3).merge(Span::new(1, 5, 3));
        assert_eq!(merged, Span::new(1, 5, 8));
    }

    #[test]
    fn merge_absorbs_synthetic() {
        let real = Span::new(2, 4, 6);
        assert_eq!(Span::synthetic().merge(real), real);
        assert_eq!(real.merge(Span::synthetic()), real);
    }

    #[test]
    fn merge_across_lines_starts_at_earlier_line() {
        let merged = Span::new(4, 2, 3).merge(Span::new(2, 7, 1));
        assert_eq!(merged.line, 2);
        assert_eq!(merged.col, 7);
        assert_eq!(merged.len, 4);
    }
}
