//! `source` statement discovery and path resolution.

use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::base::TextRange;
use crate::hir::normalize;
use crate::syntax::ast::{Node, NodeKind};

/// The command that pulls another file's declarations in.
pub const SOURCE_COMMAND: &str = "source";

/// Forms that stand for the directory of the including script. Longer forms
/// come first so a shorter one never matches inside a longer one.
const SCRIPT_DIR_FORMS: &[&str] = &[
    "$(dirname \"${BASH_SOURCE[0]}\")",
    "$(dirname ${BASH_SOURCE[0]})",
    "$(dirname \"$0\")",
    "$(dirname $0)",
    "${_this_dir}",
    "${SCRIPT_DIR}",
    "$_this_dir",
    "$SCRIPT_DIR",
];

/// A `source` statement found in a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRef {
    /// Path argument with one layer of quotes removed.
    pub path: String,
    /// Span of the path argument.
    pub range: TextRange,
    /// Span of the whole command.
    pub command_range: TextRange,
}

/// Every `source` command in `root`, in document order.
pub fn find_sources(root: &Node, text: &str) -> Vec<SourceRef> {
    let mut found = Vec::new();
    root.walk(&mut |node| {
        let NodeKind::Command(cmd) = &node.kind else {
            return;
        };
        if cmd.name() != Some(SOURCE_COMMAND) {
            return;
        }
        let Some(arg) = cmd.args().first() else {
            return;
        };
        let Some(raw) = text.get(Range::<usize>::from(arg.range)) else {
            return;
        };
        found.push(SourceRef {
            path: unquote(raw).to_owned(),
            range: arg.range,
            command_range: node.range,
        });
    });
    found
}

/// Strip one layer of matching quotes.
fn unquote(raw: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = raw
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    raw
}

/// Resolve a `source` argument written in `including_file`.
///
/// Relative paths resolve against the including file's directory, and the
/// script-directory forms expand to that directory. If other variable
/// references remain, the part after the last one is tried relative to the
/// including directory. Returns `None` unless the result names an existing
/// file.
pub fn resolve_source(path: &str, including_file: &Path) -> Option<PathBuf> {
    let dir = including_file.parent().unwrap_or_else(|| Path::new(""));
    let dir_text = dir.to_string_lossy();

    let mut expanded = path.to_owned();
    for form in SCRIPT_DIR_FORMS {
        if expanded.contains(form) {
            expanded = expanded.replace(form, &dir_text);
        }
    }

    let candidate = match expanded.rfind('$') {
        Some(dollar) => {
            let suffix = after_var_ref(&expanded[dollar..]).trim_start_matches('/');
            trace!(path, suffix, "unexpanded variable in source path");
            if suffix.is_empty() {
                return None;
            }
            dir.join(suffix)
        }
        None => dir.join(&expanded),
    };

    if candidate.is_file() {
        Some(normalize(&candidate))
    } else {
        debug!(path, candidate = %candidate.display(), "source target not found");
        None
    }
}

/// The text following the variable reference `var` starts with.
fn after_var_ref(var: &str) -> &str {
    let rest = &var[1..];
    let close = match rest.chars().next() {
        Some('{') => Some('}'),
        Some('(') => Some(')'),
        _ => None,
    };
    match close {
        Some(close) => rest.find(close).map_or("", |end| &rest[end + 1..]),
        None => {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            &rest[end..]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use rstest::rstest;
    use std::fs;

    fn sources(text: &str) -> Vec<String> {
        let parse = parse(text);
        find_sources(&parse.root, text)
            .into_iter()
            .map(|s| s.path)
            .collect()
    }

    #[test]
    fn test_find_sources() {
        let text = "source lib.ysh\nif true {\n  source 'quoted lib.ysh'\n}\necho source x\n";
        assert_eq!(sources(text), ["lib.ysh", "quoted lib.ysh"]);
    }

    #[test]
    fn test_argument_with_variable_kept_whole() {
        let text = "source $_this_dir/lib/util.ysh\n";
        assert_eq!(sources(text), ["$_this_dir/lib/util.ysh"]);
    }

    #[test]
    fn test_argument_range() {
        let text = "source \"lib.ysh\"\n";
        let parse = parse(text);
        let found = find_sources(&parse.root, text);
        assert_eq!(&text[found[0].range], "\"lib.ysh\"");
    }

    #[rstest]
    #[case("lib.ysh")]
    #[case("./lib.ysh")]
    #[case("$_this_dir/lib.ysh")]
    #[case("${_this_dir}/lib.ysh")]
    #[case("$SCRIPT_DIR/lib.ysh")]
    #[case("${SCRIPT_DIR}/lib.ysh")]
    #[case("$(dirname $0)/lib.ysh")]
    #[case("$(dirname \"$0\")/lib.ysh")]
    #[case("$(dirname ${BASH_SOURCE[0]})/lib.ysh")]
    #[case("$(dirname \"${BASH_SOURCE[0]}\")/lib.ysh")]
    #[case("$UNKNOWN/lib.ysh")]
    #[case("${HOME}/lib.ysh")]
    fn test_resolve_forms(#[case] arg: &str) {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib.ysh");
        fs::write(&lib, "").unwrap();
        let main = dir.path().join("main.ysh");

        let resolved = resolve_source(arg, &main);
        assert_eq!(resolved, Some(fs::canonicalize(&lib).unwrap()), "{arg}");
    }

    #[test]
    fn test_missing_target_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.ysh");
        assert_eq!(resolve_source("nope.ysh", &main), None);
        assert_eq!(resolve_source("$ONLY_VAR", &main), None);
    }

    #[rstest]
    #[case("'a b'", "a b")]
    #[case("\"x\"", "x")]
    #[case("'mixed\"", "'mixed\"")]
    #[case("plain", "plain")]
    fn test_unquote(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(unquote(raw), expected);
    }
}
