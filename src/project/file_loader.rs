//! Reading and analyzing script files.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::dependencies::{SourceRef, find_sources, resolve_source};
use crate::base::TextRange;
use crate::hir::SymbolTable;
use crate::syntax::{Parse, parse};

/// Extensions treated as scripts when scanning directories.
pub const SCRIPT_EXTENSIONS: &[&str] = &["ysh", "osh", "sh"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("directory not found: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A `source` statement and where it points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLink {
    pub path: String,
    pub range: TextRange,
    pub command_range: TextRange,
    /// Canonical path of an existing target.
    pub target: Option<PathBuf>,
}

/// A parsed script with its symbols and resolved `source` links.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: Arc<str>,
    pub parse: Parse,
    pub symbols: Arc<SymbolTable>,
    pub sources: Vec<SourceLink>,
}

impl SourceFile {
    /// Parse `text` as the contents of `path`. `path` is only used to
    /// resolve `source` arguments.
    pub fn analyze(path: impl Into<PathBuf>, text: impl Into<Arc<str>>) -> Self {
        let path = path.into();
        let text = text.into();
        let parse = parse(&text);
        let symbols = Arc::new(SymbolTable::build(&parse.root, &text));
        let sources = find_sources(&parse.root, &text)
            .into_iter()
            .map(|SourceRef { path: arg, range, command_range }| {
                let target = resolve_source(&arg, &path);
                SourceLink {
                    path: arg,
                    range,
                    command_range,
                    target,
                }
            })
            .collect();

        Self {
            path,
            text,
            parse,
            symbols,
            sources,
        }
    }

    /// Read and analyze a file from disk.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        debug!(path = %path.display(), len = text.len(), "loaded script");
        Ok(Self::analyze(path, text))
    }

    /// Targets of the `source` statements that resolved.
    pub fn dependency_paths(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().filter_map(|link| link.target.as_deref())
    }
}

/// Whether `path` has one of `extensions`.
pub fn is_script(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext))
}

/// Script files below `dir`, sorted. Unreadable entries are skipped.
pub fn collect_file_paths(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::NotADirectory(dir.to_owned()));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if source.depth() == 0 => {
                return Err(LoadError::Walk {
                    path: dir.to_owned(),
                    source,
                });
            }
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_script(entry.path(), extensions) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn extensions() -> Vec<String> {
        SCRIPT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
    }

    #[test]
    fn test_collect_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("main.ysh"), "").unwrap();
        fs::write(dir.path().join("lib/util.sh"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let paths = collect_file_paths(dir.path(), &extensions()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["util.sh", "main.ysh"]);
    }

    #[test]
    fn test_collect_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            collect_file_paths(&missing, &extensions()),
            Err(LoadError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_load_resolves_sources() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lib.ysh"), "proc helper {\n}\n").unwrap();
        let main = dir.path().join("main.ysh");
        fs::write(&main, "source $_this_dir/lib.ysh\nsource gone.ysh\nhelper\n").unwrap();

        let file = SourceFile::load(&main).unwrap();
        assert_eq!(file.sources.len(), 2);
        assert!(file.sources[1].target.is_none());
        let deps: Vec<_> = file.dependency_paths().collect();
        assert_eq!(deps, [fs::canonicalize(dir.path().join("lib.ysh")).unwrap()]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceFile::load(&dir.path().join("none.ysh")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("none.ysh"));
    }
}
