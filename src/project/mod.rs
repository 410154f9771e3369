//! Filesystem side of the workspace: finding scripts, resolving `source`
//! paths and walking the files they pull in.

pub mod dependencies;
pub mod file_loader;
pub mod workspace_loader;

pub use dependencies::{SOURCE_COMMAND, SourceRef, find_sources, resolve_source};
pub use file_loader::{LoadError, SCRIPT_EXTENSIONS, SourceFile, SourceLink, collect_file_paths};
pub use workspace_loader::{LoadSummary, LoaderOptions, MAX_SOURCE_DEPTH, WorkspaceLoader};
