//! The analysis host: owner of all workspace state.
//!
//! [`AnalysisHost`] is the single writer. Editors push document text into
//! it; queries go through the read-only [`Analysis`] view it hands out.
//! Callers that share a host across threads wrap it in a lock and serialize
//! writes.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use tracing::debug;

use super::document_links::{DocumentLink, document_links};
use super::folding::{FoldingRange, folding_ranges};
use super::goto::{NavigationTarget, goto_definition};
use super::symbols::{DocumentSymbol, WorkspaceSymbol, document_symbols, workspace_symbols};
use crate::base::{FileId, TextSize};
use crate::hir::{FileSet, SymbolTable, WorkspaceIndex};
use crate::project::{LoadError, LoadSummary, LoaderOptions, SourceFile, WorkspaceLoader};
use crate::syntax::Diagnostic;

#[derive(Debug, Default)]
pub struct AnalysisHost {
    files: FileSet,
    index: WorkspaceIndex,
    documents: IndexMap<FileId, Arc<SourceFile>, FxBuildHasher>,
    /// Files that came from a directory load; closing them keeps them.
    workspace: FxHashSet<FileId>,
    loader: WorkspaceLoader,
}

impl AnalysisHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader_options(options: LoaderOptions) -> Self {
        Self {
            loader: WorkspaceLoader::with_options(options),
            ..Self::default()
        }
    }

    /// Index an analyzed file, replacing any earlier version. Does not
    /// follow its `source` links.
    pub fn set_file(&mut self, file: SourceFile) -> FileId {
        let id = self.files.file_id(&file.path);
        let dependencies = file
            .dependency_paths()
            .map(|path| self.files.file_id(path))
            .collect();
        self.files.set_contents(id, file.text.clone());
        self.index.insert(id, file.symbols.clone(), dependencies);
        self.documents.insert(id, Arc::new(file));
        id
    }

    /// Start tracking an editor document and load what it sources.
    pub fn open_document(&mut self, path: &Path, text: &str) -> FileId {
        let id = self.set_file(SourceFile::analyze(path, text));
        self.index.add_root(id);
        let loader = self.loader.clone();
        let loaded = loader.load_dependencies(self, id);
        debug!(%id, dependencies = loaded.len(), "opened document");
        id
    }

    /// Re-index an open document after an edit. Only this file's table and
    /// its own dependencies are rebuilt; files no longer reachable from any
    /// root are dropped.
    pub fn update_document(&mut self, path: &Path, text: &str) -> FileId {
        let id = self.open_document(path, text);
        self.prune();
        id
    }

    /// Stop tracking an editor document. If it is still sourced by another
    /// root or belongs to a loaded directory, its disk version is indexed
    /// again. Returns false if the path was never opened.
    pub fn close_document(&mut self, path: &Path) -> bool {
        let Some(id) = self.files.lookup(path) else {
            return false;
        };
        if !self.workspace.contains(&id) {
            self.index.remove_root(id);
        }
        self.prune();

        if self.index.contains(id) {
            if let Some(path) = self.files.path(id) {
                match SourceFile::load(&path) {
                    Ok(file) => {
                        self.set_file(file);
                    }
                    Err(err) => debug!(error = %err, "keeping closed document text"),
                }
            }
        }
        true
    }

    /// Index every script below `dir` as a workspace root.
    pub fn load_directory(&mut self, dir: &Path) -> Result<LoadSummary, LoadError> {
        let loader = self.loader.clone();
        let summary = loader.load_directory_into_host(dir, self)?;
        self.workspace.extend(summary.loaded.iter().copied());
        Ok(summary)
    }

    fn prune(&mut self) {
        for file in self.index.prune_unreachable() {
            self.documents.shift_remove(&file);
            self.files.clear_contents(file);
        }
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn index(&self) -> &WorkspaceIndex {
        &self.index
    }

    pub(crate) fn index_mut(&mut self) -> &mut WorkspaceIndex {
        &mut self.index
    }

    /// Id of a tracked path.
    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.files.lookup(path).filter(|id| self.index.contains(*id))
    }

    pub fn document(&self, file: FileId) -> Option<&SourceFile> {
        self.documents.get(&file).map(|doc| &**doc)
    }

    pub fn analysis(&self) -> Analysis<'_> {
        Analysis { host: self }
    }
}

/// Read-only queries over an [`AnalysisHost`].
#[derive(Clone, Copy, Debug)]
pub struct Analysis<'a> {
    host: &'a AnalysisHost,
}

impl<'a> Analysis<'a> {
    pub fn symbols(&self, file: FileId) -> Option<&'a SymbolTable> {
        self.host.index.symbols(file)
    }

    pub fn diagnostics(&self, file: FileId) -> &'a [Diagnostic] {
        self.host
            .document(file)
            .map_or(&[], |doc| doc.parse.diagnostics.as_slice())
    }

    pub fn goto_definition(&self, file: FileId, offset: TextSize) -> Vec<NavigationTarget> {
        match self.host.document(file) {
            Some(doc) => goto_definition(&self.host.index, file, &doc.text, offset),
            None => Vec::new(),
        }
    }

    pub fn document_symbols(&self, file: FileId) -> Vec<DocumentSymbol> {
        self.symbols(file).map_or_else(Vec::new, document_symbols)
    }

    pub fn workspace_symbols(&self, query: &str) -> Vec<WorkspaceSymbol> {
        workspace_symbols(&self.host.index, query)
    }

    pub fn folding_ranges(&self, file: FileId) -> Vec<FoldingRange> {
        match self.host.document(file) {
            Some(doc) => folding_ranges(&doc.parse.root, &doc.text, doc.symbols.line_index()),
            None => Vec::new(),
        }
    }

    pub fn document_links(&self, file: FileId) -> Vec<DocumentLink> {
        match self.host.document(file) {
            Some(doc) => document_links(doc, &self.host.files, doc.symbols.line_index()),
            None => Vec::new(),
        }
    }
}
