//! Cross-file resolution against scripts on disk.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use ysh::base::TextSize;
use ysh::hir::SymbolKind;
use ysh::ide::AnalysisHost;
use ysh::project::{LoaderOptions, WorkspaceLoader};

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }
    dir
}

fn path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

fn offset_of(text: &str, needle: &str) -> TextSize {
    TextSize::from(text.find(needle).unwrap() as u32)
}

#[test]
fn test_sourced_proc_resolves_across_files() {
    let dir = workspace(&[("a.ysh", "proc helper {\n  echo from a\n}\n")]);
    let b_text = "source a.ysh\nhelper\n";

    let mut host = AnalysisHost::new();
    let b = host.open_document(&path(&dir, "b.ysh"), b_text);
    let a = host.file_id(&path(&dir, "a.ysh")).unwrap();

    let targets = host.analysis().goto_definition(b, offset_of(b_text, "helper\n"));
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].file, a);
    assert_eq!(targets[0].kind, SymbolKind::Procedure);
}

#[test]
fn test_own_declaration_wins() {
    let dir = workspace(&[("a.ysh", "proc helper {\n}\n")]);
    let b_text = "source a.ysh\nproc helper {\n}\nhelper\n";

    let mut host = AnalysisHost::new();
    let b = host.open_document(&path(&dir, "b.ysh"), b_text);

    let found = host.index().lookup(b, "helper");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].file, b);
}

#[test]
fn test_cycle_terminates_and_visits_once() {
    let dir = workspace(&[
        ("a.ysh", "source b.ysh\nvar from_a = 1\n"),
        ("b.ysh", "source a.ysh\nvar from_b = 1\n"),
    ]);

    let mut host = AnalysisHost::new();
    let a = WorkspaceLoader::new()
        .load_file_into_host(&path(&dir, "a.ysh"), &mut host)
        .unwrap();

    assert_eq!(host.index().len(), 2);
    assert_eq!(host.index().dependency_closure(a).len(), 2);
    assert_eq!(host.index().lookup_global("from_a").len(), 1);
    assert_eq!(host.index().lookup_global("from_b").len(), 1);
}

#[test]
fn test_dict_key_in_sourced_file() {
    let dir = workspace(&[(
        "lib/config.ysh",
        "const CONFIG = {\n  project: 'x',\n  zone: 'y',\n}\n",
    )]);
    let main_text = "source $_this_dir/lib/config.ysh\necho $[CONFIG.zone]\n";

    let mut host = AnalysisHost::new();
    let main = host.open_document(&path(&dir, "main.ysh"), main_text);

    let targets = host
        .analysis()
        .goto_definition(main, offset_of(main_text, "zone"));
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].focus_lines.start.line, 2);

    let matches = host.index().lookup_dict_key(None, "CONFIG", "project");
    let found = &matches[0];
    assert!(found.symbol.range.contains_range(found.key.range));
    assert_ne!(found.symbol.range, found.key.range);
}

#[test]
fn test_unresolvable_source_is_silent() {
    let dir = workspace(&[]);
    let text = "source $HOME_LIB/missing.ysh\nsource nope.sh\nvar ok = 1\n";

    let mut host = AnalysisHost::new();
    let main = host.open_document(&path(&dir, "main.ysh"), text);

    assert!(host.analysis().diagnostics(main).is_empty());
    assert!(host.index().dependencies(main).is_empty());
    assert!(host.analysis().document_links(main).is_empty());
}

#[test]
fn test_depth_cap_stops_descent() {
    let mut files = Vec::new();
    for i in 0..14 {
        files.push((format!("f{i}.ysh"), format!("source f{}.ysh\nvar v{i} = 1\n", i + 1)));
    }
    let refs: Vec<(&str, &str)> = files.iter().map(|(n, t)| (n.as_str(), t.as_str())).collect();
    let dir = workspace(&refs);

    let mut host = AnalysisHost::with_loader_options(LoaderOptions::default());
    host.open_document(&path(&dir, "f0.ysh"), &files[0].1);

    // The root plus ten levels of sourced files.
    assert_eq!(host.index().len(), 11);
    assert_eq!(host.index().lookup_global("v10").len(), 1);
    assert!(host.index().lookup_global("v11").is_empty());
}

#[test]
fn test_directory_load_and_links() {
    let dir = workspace(&[
        ("main.ysh", "source lib/util.ysh\nutil-run\n"),
        ("lib/util.ysh", "proc util-run {\n}\n"),
        ("lib/legacy.sh", "legacy_fn() {\n  :\n}\n"),
        ("README.md", "# docs\n"),
    ]);

    let mut host = AnalysisHost::new();
    let summary = host.load_directory(dir.path()).unwrap();
    assert_eq!(summary.loaded.len(), 3);

    let main = host.file_id(&path(&dir, "main.ysh")).unwrap();
    let links = host.analysis().document_links(main);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].target_file, host.file_id(&path(&dir, "lib/util.ysh")));

    let text = fs::read_to_string(path(&dir, "main.ysh")).unwrap();
    let targets = host.analysis().goto_definition(main, offset_of(&text, "run"));
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].name, "util-run");

    assert!(host.close_document(&path(&dir, "main.ysh")));
    assert!(host.file_id(&path(&dir, "main.ysh")).is_some());
}
