//! Cross-file name resolution.
//!
//! [`WorkspaceIndex`] holds one [`SymbolTable`] per tracked file together
//! with the files it sources. It never touches the filesystem; the project
//! loader resolves `source` paths and feeds the results in.
//!
//! Lookup modes:
//!
//! - [`WorkspaceIndex::lookup`] - the requesting file first, then every
//!   other tracked file (files it sources before unrelated ones)
//! - [`WorkspaceIndex::lookup_global`] - every tracked file
//! - [`WorkspaceIndex::lookup_dict_key`] - literal keys of dict-valued
//!   constants
//!
//! Open documents are registered as roots. [`WorkspaceIndex::prune_unreachable`]
//! drops files no root sources, directly or transitively.

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashSet};
use tracing::debug;

use super::symbols::{DictKeyInfo, SymbolInfo, SymbolTable};
use crate::base::FileId;

// ============================================================================
// ENTRIES
// ============================================================================

/// Indexed state of one file.
#[derive(Clone, Debug)]
pub struct FileEntry {
    pub symbols: Arc<SymbolTable>,
    /// Resolved `source` targets, in statement order, without duplicates.
    pub dependencies: Vec<FileId>,
}

/// A declaration together with the file that owns it.
#[derive(Clone, Copy, Debug)]
pub struct SymbolMatch<'a> {
    pub file: FileId,
    pub symbol: &'a SymbolInfo,
}

/// A literal dict key together with its declaration and file.
#[derive(Clone, Copy, Debug)]
pub struct DictKeyMatch<'a> {
    pub file: FileId,
    pub symbol: &'a SymbolInfo,
    pub key: &'a DictKeyInfo,
}

// ============================================================================
// WORKSPACE INDEX
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct WorkspaceIndex {
    files: IndexMap<FileId, FileEntry, FxBuildHasher>,
    roots: IndexSet<FileId, FxBuildHasher>,
}

impl WorkspaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace one file's table and dependency list. Other files are
    /// untouched.
    pub fn insert(
        &mut self,
        file: FileId,
        symbols: impl Into<Arc<SymbolTable>>,
        dependencies: Vec<FileId>,
    ) {
        let mut seen = FxHashSet::default();
        let dependencies = dependencies
            .into_iter()
            .filter(|&dep| dep != file && seen.insert(dep))
            .collect();
        self.files.insert(
            file,
            FileEntry {
                symbols: symbols.into(),
                dependencies,
            },
        );
    }

    /// Forget a file. Returns true if it was tracked.
    pub fn remove(&mut self, file: FileId) -> bool {
        self.roots.shift_remove(&file);
        self.files.shift_remove(&file).is_some()
    }

    pub fn contains(&self, file: FileId) -> bool {
        self.files.contains_key(&file)
    }

    pub fn entry(&self, file: FileId) -> Option<&FileEntry> {
        self.files.get(&file)
    }

    pub fn symbols(&self, file: FileId) -> Option<&SymbolTable> {
        self.files.get(&file).map(|entry| &*entry.symbols)
    }

    pub fn dependencies(&self, file: FileId) -> &[FileId] {
        self.files
            .get(&file)
            .map_or(&[], |entry| entry.dependencies.as_slice())
    }

    /// Tracked files in insertion order.
    pub fn files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.files.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    // ------------------------------------------------------------------
    // Roots and reachability
    // ------------------------------------------------------------------

    pub fn add_root(&mut self, file: FileId) {
        self.roots.insert(file);
    }

    pub fn remove_root(&mut self, file: FileId) -> bool {
        self.roots.shift_remove(&file)
    }

    pub fn is_root(&self, file: FileId) -> bool {
        self.roots.contains(&file)
    }

    pub fn roots(&self) -> impl Iterator<Item = FileId> + '_ {
        self.roots.iter().copied()
    }

    /// `start` followed by every file it sources, breadth first. Each file
    /// appears once, so cycles terminate.
    pub fn dependency_closure(&self, start: FileId) -> Vec<FileId> {
        self.walk([start])
    }

    /// Every tracked file reachable from some root.
    pub fn reachable(&self) -> FxHashSet<FileId> {
        self.walk(self.roots.iter().copied()).into_iter().collect()
    }

    fn walk(&self, starts: impl IntoIterator<Item = FileId>) -> Vec<FileId> {
        let mut visited = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue: VecDeque<FileId> = starts.into_iter().collect();
        while let Some(file) = queue.pop_front() {
            if !self.files.contains_key(&file) || !visited.insert(file) {
                continue;
            }
            order.push(file);
            queue.extend(self.dependencies(file));
        }
        order
    }

    /// Drop every file no root reaches. Returns the dropped ids.
    pub fn prune_unreachable(&mut self) -> Vec<FileId> {
        let reachable = self.reachable();
        let dropped: Vec<FileId> = self
            .files
            .keys()
            .copied()
            .filter(|file| !reachable.contains(file))
            .collect();
        for &file in &dropped {
            self.files.shift_remove(&file);
        }
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "pruned unreachable files");
        }
        dropped
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Files in lookup order for a request from `from`: `from` itself, the
    /// files it sources, then everything else.
    fn search_order(&self, from: FileId) -> Vec<FileId> {
        let mut order = self.dependency_closure(from);
        let seen: FxHashSet<FileId> = order.iter().copied().collect();
        order.extend(self.files().filter(|file| !seen.contains(file)));
        order
    }

    /// Declarations of `name` in `from`; if it has none, declarations in
    /// every other tracked file.
    pub fn lookup(&self, from: FileId, name: &str) -> Vec<SymbolMatch<'_>> {
        let local = self.matches_in(from, name);
        if !local.is_empty() {
            return local;
        }
        self.search_order(from)
            .into_iter()
            .filter(|&file| file != from)
            .flat_map(|file| self.matches_in(file, name))
            .collect()
    }

    /// Declarations of `name` across all tracked files.
    pub fn lookup_global(&self, name: &str) -> Vec<SymbolMatch<'_>> {
        self.files()
            .flat_map(|file| self.matches_in(file, name))
            .collect()
    }

    /// Literal `key` of the dict-valued constant `name`, searching `from`
    /// first when given.
    pub fn lookup_dict_key(
        &self,
        from: Option<FileId>,
        name: &str,
        key: &str,
    ) -> Vec<DictKeyMatch<'_>> {
        let order = match from {
            Some(from) => self.search_order(from),
            None => self.files().collect(),
        };
        order
            .into_iter()
            .filter_map(|file| {
                let (symbol, key) = self.symbols(file)?.lookup_dict_key(name, key)?;
                Some(DictKeyMatch { file, symbol, key })
            })
            .collect()
    }

    fn matches_in(&self, file: FileId, name: &str) -> Vec<SymbolMatch<'_>> {
        self.symbols(file).map_or_else(Vec::new, |table| {
            table
                .lookup(name)
                .iter()
                .map(|symbol| SymbolMatch { file, symbol })
                .collect()
        })
    }
}
