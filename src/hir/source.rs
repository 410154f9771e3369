//! Path interning for script files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::base::FileId;

/// Maps script paths to stable [`FileId`]s and holds the latest text of
/// each file.
///
/// Paths are canonicalized on the way in so `./lib.ysh`, `lib.ysh` and a
/// symlink to it share one id. Paths that do not exist on disk (unsaved
/// editor buffers) are kept as given.
#[derive(Debug, Default)]
pub struct FileSet {
    inner: RwLock<FileSetInner>,
}

#[derive(Debug, Default)]
struct FileSetInner {
    ids: IndexMap<PathBuf, FileId, FxBuildHasher>,
    paths: IndexMap<FileId, PathBuf, FxBuildHasher>,
    contents: IndexMap<FileId, Arc<str>, FxBuildHasher>,
    next_id: u32,
}

/// `path` canonicalized, or unchanged when it cannot be resolved.
pub fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_owned())
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `path`, assigning a fresh one on first sight.
    pub fn file_id(&self, path: &Path) -> FileId {
        let path = normalize(path);
        if let Some(&id) = self.inner.read().ids.get(&path) {
            return id;
        }

        let mut inner = self.inner.write();
        if let Some(&id) = inner.ids.get(&path) {
            return id;
        }
        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        inner.ids.insert(path.clone(), id);
        inner.paths.insert(id, path);
        id
    }

    /// Id for `path` if it has one already.
    pub fn lookup(&self, path: &Path) -> Option<FileId> {
        self.inner.read().ids.get(&normalize(path)).copied()
    }

    pub fn path(&self, file: FileId) -> Option<PathBuf> {
        self.inner.read().paths.get(&file).cloned()
    }

    pub fn set_contents(&self, file: FileId, contents: impl Into<Arc<str>>) {
        self.inner.write().contents.insert(file, contents.into());
    }

    pub fn contents(&self, file: FileId) -> Option<Arc<str>> {
        self.inner.read().contents.get(&file).cloned()
    }

    /// Forget the file's text. Its id stays reserved for the path.
    pub fn clear_contents(&self, file: FileId) {
        self.inner.write().contents.shift_remove(&file);
    }

    pub fn len(&self) -> usize {
        self.inner.read().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All assigned ids, in assignment order.
    pub fn files(&self) -> Vec<FileId> {
        self.inner.read().paths.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable() {
        let files = FileSet::new();
        let a = files.file_id(Path::new("/nonexistent/a.ysh"));
        let b = files.file_id(Path::new("/nonexistent/b.ysh"));
        assert_ne!(a, b);
        assert_eq!(files.file_id(Path::new("/nonexistent/a.ysh")), a);
        assert_eq!(files.lookup(Path::new("/nonexistent/b.ysh")), Some(b));
        assert_eq!(files.lookup(Path::new("/nonexistent/c.ysh")), None);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_relative_and_canonical_paths_share_an_id() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib.ysh");
        std::fs::write(&file, "proc helper {}\n").unwrap();

        let files = FileSet::new();
        let direct = files.file_id(&file);
        let dotted = files.file_id(&dir.path().join(".").join("lib.ysh"));
        assert_eq!(direct, dotted);
    }

    #[test]
    fn test_contents() {
        let files = FileSet::new();
        let id = files.file_id(Path::new("/nonexistent/main.ysh"));
        assert!(files.contents(id).is_none());

        files.set_contents(id, "var x = 1\n");
        assert_eq!(files.contents(id).as_deref(), Some("var x = 1\n"));

        files.clear_contents(id);
        assert!(files.contents(id).is_none());
        assert_eq!(files.path(id), Some(PathBuf::from("/nonexistent/main.ysh")));
    }
}
