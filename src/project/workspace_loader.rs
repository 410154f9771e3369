use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use super::file_loader::{self, LoadError, SCRIPT_EXTENSIONS, SourceFile};
use crate::base::FileId;
use crate::ide::AnalysisHost;

/// How deep `source` chains are followed from a root file.
pub const MAX_SOURCE_DEPTH: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoaderOptions {
    /// Files further than this many `source` hops from a root are not loaded.
    pub max_depth: usize,
    /// Extensions picked up by directory loads.
    pub extensions: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_SOURCE_DEPTH,
            extensions: SCRIPT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

/// Outcome of a directory load. Files that failed to read do not abort
/// the load.
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub loaded: Vec<FileId>,
    pub failed: Vec<(PathBuf, LoadError)>,
}

/// Loads scripts and the files they `source` into an [`AnalysisHost`].
#[derive(Clone, Debug, Default)]
pub struct WorkspaceLoader {
    options: LoaderOptions,
}

impl WorkspaceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Load one file and everything it sources.
    pub fn load_file_into_host(
        &self,
        path: &Path,
        host: &mut AnalysisHost,
    ) -> Result<FileId, LoadError> {
        let file = SourceFile::load(path)?;
        let id = host.set_file(file);
        self.load_dependencies(host, id);
        Ok(id)
    }

    /// Follow the `source` links of an indexed file, loading each target
    /// from disk once. Open documents are not reloaded since the editor
    /// owns their text. Returns the files loaded, in walk order.
    pub fn load_dependencies(&self, host: &mut AnalysisHost, file: FileId) -> Vec<FileId> {
        let mut visited = FxHashSet::default();
        visited.insert(file);
        let mut loaded = Vec::new();
        self.walk(host, file, 1, &mut visited, &mut loaded);
        loaded
    }

    fn walk(
        &self,
        host: &mut AnalysisHost,
        file: FileId,
        depth: usize,
        visited: &mut FxHashSet<FileId>,
        loaded: &mut Vec<FileId>,
    ) {
        if depth > self.options.max_depth {
            debug!(%file, depth, "source depth limit reached");
            return;
        }

        let dependencies = host.index().dependencies(file).to_vec();
        for dep in dependencies {
            if !visited.insert(dep) {
                continue;
            }
            if !host.index().is_root(dep) {
                let Some(path) = host.files().path(dep) else {
                    continue;
                };
                match SourceFile::load(&path) {
                    Ok(source) => {
                        host.set_file(source);
                        loaded.push(dep);
                    }
                    Err(err) => {
                        debug!(error = %err, "dropping unreadable source target");
                        continue;
                    }
                }
            }
            self.walk(host, dep, depth + 1, visited, loaded);
        }
    }

    /// Load every script below `dir`. Files are read and parsed in parallel,
    /// then indexed in path order; their `source` targets outside `dir` are
    /// followed afterwards.
    pub fn load_directory_into_host(
        &self,
        dir: &Path,
        host: &mut AnalysisHost,
    ) -> Result<LoadSummary, LoadError> {
        let paths = file_loader::collect_file_paths(dir, &self.options.extensions)?;
        info!(dir = %dir.display(), files = paths.len(), "loading directory");

        let results: Vec<_> = paths
            .par_iter()
            .map(|path| (path, SourceFile::load(path)))
            .collect();

        let mut summary = LoadSummary::default();
        for (path, result) in results {
            match result {
                Ok(file) => summary.loaded.push(host.set_file(file)),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to load script");
                    summary.failed.push((path.clone(), err));
                }
            }
        }

        for &file in &summary.loaded {
            host.index_mut().add_root(file);
        }
        for &file in &summary.loaded {
            self.load_dependencies(host, file);
        }
        Ok(summary)
    }
}
