//! Folding ranges - collapsible regions of a script.
//!
//! Brace bodies, subshells, command substitutions, multi-line literals and
//! heredoc bodies fold, as do runs of two or more comment lines.

use crate::base::{LineIndex, LineRange};
use crate::syntax::ast::{Node, NodeKind};

/// A folding range with position information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldingRange {
    /// Start line (0-indexed)
    pub start_line: u32,
    pub start_col: u32,
    /// End line (0-indexed)
    pub end_line: u32,
    pub end_col: u32,
    pub is_comment: bool,
}

impl FoldingRange {
    fn region(lines: LineRange) -> Self {
        Self {
            start_line: lines.start.line,
            start_col: lines.start.col,
            end_line: lines.end.line,
            end_col: lines.end.col,
            is_comment: false,
        }
    }
}

/// Folding ranges of a parsed file, sorted by start line. At most one range
/// starts on any line; the outermost wins.
pub fn folding_ranges(root: &Node, text: &str, line_index: &LineIndex) -> Vec<FoldingRange> {
    let mut ranges = Vec::new();
    root.walk(&mut |node| {
        if !folds(node) {
            return;
        }
        let lines = line_index.line_range(node.range);
        if lines.is_multiline() {
            ranges.push(FoldingRange::region(lines));
        }
    });
    ranges.extend(comment_runs(text));

    ranges.sort_by_key(|r| (r.start_line, std::cmp::Reverse(r.end_line)));
    ranges.dedup_by_key(|r| r.start_line);
    ranges
}

fn folds(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::Block(_)
            | NodeKind::Subshell(_)
            | NodeKind::CommandSub { .. }
            | NodeKind::List(_)
            | NodeKind::Dict(_)
            | NodeKind::ArgList { .. }
            | NodeKind::StringLit { .. }
            | NodeKind::HeredocBody { .. }
            | NodeKind::Case(_)
    )
}

/// Runs of consecutive whole-line comments.
fn comment_runs(text: &str) -> Vec<FoldingRange> {
    let mut runs = Vec::new();
    let mut run: Option<(u32, u32, u32)> = None;

    for (line, content) in text.lines().enumerate() {
        let line = line as u32;
        let trimmed = content.trim_start();
        if trimmed.starts_with('#') && !trimmed.starts_with("#!") {
            let end_col = content.len() as u32;
            run = Some(match run {
                Some((start, _, _)) => (start, line, end_col),
                None => (line, line, end_col),
            });
            continue;
        }
        runs.extend(run.take());
    }
    runs.extend(run);

    runs.into_iter()
        .filter(|&(start, end, _)| end > start)
        .map(|(start, end, end_col)| FoldingRange {
            start_line: start,
            start_col: 0,
            end_line: end,
            end_col,
            is_comment: true,
        })
        .collect()
}
