//! IDE features - high-level APIs for editor integrations.
//!
//! Every query is a plain function over parsed files and the workspace
//! index, returning crate types; editor protocol types are a concern of
//! the caller.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use ysh::base::TextSize;
//! use ysh::ide::AnalysisHost;
//!
//! let mut host = AnalysisHost::new();
//! let file = host.open_document(Path::new("main.ysh"), "var x = 1\necho $x\n");
//!
//! let analysis = host.analysis();
//! let outline = analysis.document_symbols(file);
//! let targets = analysis.goto_definition(file, TextSize::from(16));
//! ```

mod analysis;
mod document_links;
mod folding;
mod goto;
mod symbols;

pub use analysis::{Analysis, AnalysisHost};
pub use document_links::{DocumentLink, document_links};
pub use folding::{FoldingRange, folding_ranges};
pub use goto::{IdentifierAt, NavigationTarget, goto_definition, identifier_at};
pub use symbols::{DocumentSymbol, WorkspaceSymbol, document_symbols, workspace_symbols};
