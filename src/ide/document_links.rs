//! Document links - clickable `source` arguments.

use std::borrow::Cow;
use std::path::PathBuf;

use crate::base::{FileId, LineIndex};
use crate::hir::FileSet;
use crate::project::SourceFile;

/// A `source` argument that resolved to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    /// The span of the argument in the source file.
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub target_path: PathBuf,
    /// Set when the target is tracked by the workspace.
    pub target_file: Option<FileId>,
    pub tooltip: Cow<'static, str>,
}

/// Links for every `source` statement whose target exists.
pub fn document_links(file: &SourceFile, files: &FileSet, line_index: &LineIndex) -> Vec<DocumentLink> {
    file.sources
        .iter()
        .filter_map(|link| {
            let target = link.target.as_ref()?;
            let lines = line_index.line_range(link.range);
            Some(DocumentLink {
                start_line: lines.start.line,
                start_col: lines.start.col,
                end_line: lines.end.line,
                end_col: lines.end.col,
                target_path: target.clone(),
                target_file: files.lookup(target),
                tooltip: Cow::Owned(format!("Open {}", target.display())),
            })
        })
        .collect()
}
