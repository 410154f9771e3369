//! # ysh-base
//!
//! Parsing and workspace analysis for YSH (and POSIX-ish shell) scripts.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide      → outline, folding, links, go-to-definition, AnalysisHost
//!   ↓
//! project  → `source` resolution, directory and dependency loading
//!   ↓
//! hir      → symbol tables and the cross-file workspace index
//!   ↓
//! syntax   → lexer + scanner + error-tolerant parser
//!   ↓
//! base     → primitives (FileId, TextRange, LineIndex)
//! ```

/// Foundation types: FileId, spans, line/column conversion
pub mod base;

/// Symbol tables and cross-file resolution
pub mod hir;

/// Editor-facing queries
pub mod ide;

/// Filesystem loading and `source` dependencies
pub mod project;

/// Tokens, scanner, parser and tree
pub mod syntax;

pub use base::{FileId, LineCol, LineIndex, LineRange, TextRange, TextSize};
pub use hir::{SymbolKind, SymbolTable, WorkspaceIndex};
pub use ide::AnalysisHost;
pub use syntax::{Parse, ParseOptions, parse, parse_with_options};
