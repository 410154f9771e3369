//! Source text positions and ranges.

use std::fmt;

pub use text_size::TextRange;
pub use text_size::TextSize;

/// A line and column position in source text.
///
/// Both line and column are 0-indexed internally, but displayed as 1-indexed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineCol {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed column (in UTF-8 bytes, not characters)
    pub col: u32,
}

impl LineCol {
    /// Create a new LineCol position.
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Get 1-indexed line number (for display).
    #[inline]
    pub const fn line_one_indexed(self) -> u32 {
        self.line + 1
    }

    /// Get 1-indexed column number (for display).
    #[inline]
    pub const fn col_one_indexed(self) -> u32 {
        self.col + 1
    }
}

impl fmt::Debug for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line_one_indexed(), self.col_one_indexed())
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line_one_indexed(), self.col_one_indexed())
    }
}

/// A `LineCol` pair covering a [`TextRange`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineRange {
    pub start: LineCol,
    pub end: LineCol,
}

impl LineRange {
    /// Returns true when the range spans more than one line.
    pub fn is_multiline(self) -> bool {
        self.end.line > self.start.line
    }
}

/// Index for converting between byte offsets and line/column positions.
///
/// Building the index is O(document length); lookups are a binary search
/// over line starts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset of the start of each line
    line_starts: Vec<TextSize>,
    /// Total text length, used to clamp out-of-range offsets
    len: TextSize,
}

impl LineIndex {
    /// Build a line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(offset, _)| TextSize::from((offset + 1) as u32)),
        );

        Self {
            line_starts,
            len: TextSize::of(text),
        }
    }

    /// Convert a byte offset to a line/column position.
    ///
    /// Offsets past the end of the text clamp to the last position.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);

        let line_start = self.line_starts[line];
        LineCol {
            line: line as u32,
            col: (offset - line_start).into(),
        }
    }

    /// Convert both ends of a byte range.
    pub fn line_range(&self, range: TextRange) -> LineRange {
        LineRange {
            start: self.line_col(range.start()),
            end: self.line_col(range.end()),
        }
    }

    /// Convert a line/column position to a byte offset.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let line_start = self.line_starts.get(line_col.line as usize)?;
        let offset = *line_start + TextSize::from(line_col.col);
        (offset <= self.len).then_some(offset)
    }

    /// Get the number of lines.
    pub fn len(&self) -> usize {
        self.line_starts.len()
    }

    /// Always false: even empty text has one line.
    pub fn is_empty(&self) -> bool {
        self.line_starts.is_empty()
    }
}
