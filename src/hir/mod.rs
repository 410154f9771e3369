//! Semantic layer: per-file symbols and the cross-file index.
//!
//! - [`SymbolTable`] - declarations and outline of one parsed file
//! - [`WorkspaceIndex`] - symbol tables of all tracked files plus their
//!   `source` dependencies
//! - [`FileSet`] - path to [`FileId`](crate::base::FileId) interning
//!
//! Nothing here reads from disk; see [`crate::project`] for that.

mod resolve;
mod source;
mod symbols;

pub use resolve::{DictKeyMatch, FileEntry, SymbolMatch, WorkspaceIndex};
pub use source::{FileSet, normalize};
pub use symbols::{
    DictKeyInfo, DictKeys, IDENT_SEARCH_WINDOW, OutlineItem, SymbolInfo, SymbolKind, SymbolTable,
    find_identifier,
};
