//! Document outline and workspace symbol search.

use smol_str::SmolStr;

use crate::base::{FileId, LineRange};
use crate::hir::{OutlineItem, SymbolKind, SymbolTable, WorkspaceIndex};

/// An outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSymbol {
    pub name: SmolStr,
    pub kind: SymbolKind,
    pub detail: Option<String>,
    /// The whole declaration.
    pub range: LineRange,
    /// The identifier, for highlighting on selection.
    pub selection_range: LineRange,
    pub children: Vec<DocumentSymbol>,
}

impl From<&OutlineItem> for DocumentSymbol {
    fn from(item: &OutlineItem) -> Self {
        Self {
            name: item.name.clone(),
            kind: item.kind,
            detail: item.detail.clone(),
            range: item.lines,
            selection_range: item.name_lines,
            children: item.children.iter().map(Self::from).collect(),
        }
    }
}

/// Outline of one file, in document order.
pub fn document_symbols(table: &SymbolTable) -> Vec<DocumentSymbol> {
    table.outline().iter().map(DocumentSymbol::from).collect()
}

/// A match of a workspace-wide symbol search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSymbol {
    pub file: FileId,
    pub name: SmolStr,
    pub kind: SymbolKind,
    pub selection_range: LineRange,
}

/// Procs, funcs, variables and constants whose name contains `query`,
/// ignoring case. Parameters are left out.
pub fn workspace_symbols(index: &WorkspaceIndex, query: &str) -> Vec<WorkspaceSymbol> {
    let query = query.to_lowercase();
    index
        .files()
        .filter_map(|file| Some((file, index.symbols(file)?)))
        .flat_map(|(file, table)| {
            table
                .iter()
                .filter(|symbol| symbol.kind != SymbolKind::Parameter)
                .filter(|symbol| symbol.name.to_lowercase().contains(&query))
                .map(move |symbol| WorkspaceSymbol {
                    file,
                    name: symbol.name.clone(),
                    kind: symbol.kind,
                    selection_range: symbol.name_lines,
                })
        })
        .collect()
}
