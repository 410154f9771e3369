//! Whole-script parsing: realistic inputs, spans and recovery.

use rstest::rstest;
use ysh::base::{TextRange, TextSize};
use ysh::syntax::ast::{Node, NodeKind};
use ysh::syntax::diagnostics::codes;
use ysh::syntax::parse;

const DEPLOY_SCRIPT: &str = r#"#!/usr/bin/env ysh
# Deploy helper

const CONFIG = {
  project: 'demo',
  zone: 'us-east1',
}

var targets = ['web', 'worker']

proc deploy (target; verbose = false) {
  if (verbose) {
    echo "deploying $target to $[CONFIG.zone]"
  }
  gcloud deploy $target --project $[CONFIG.project] 2>&1 | tee -a deploy.log
}

func count(items) {
  return (len(items))
}

for t in (targets) {
  deploy $t
}

setvar targets = []
cat <<EOF
done: $(date)
EOF
"#;

fn kinds(nodes: &[Node]) -> Vec<&'static str> {
    nodes
        .iter()
        .map(|node| match &node.kind {
            NodeKind::Command(_) => "command",
            NodeKind::VarDecl(_) => "var",
            NodeKind::ProcDef(_) => "proc",
            NodeKind::FuncDef(_) => "func",
            NodeKind::For(_) => "for",
            NodeKind::Mutation(_) => "mutation",
            NodeKind::HeredocBody { .. } => "heredoc",
            NodeKind::Error => "error",
            _ => "other",
        })
        .collect()
}

#[test]
fn test_deploy_script_parses_cleanly() {
    let parse = parse(DEPLOY_SCRIPT);
    assert!(parse.diagnostics.is_empty(), "{:#?}", parse.diagnostics);
    assert_eq!(
        kinds(parse.statements()),
        ["var", "var", "proc", "func", "for", "mutation", "command", "heredoc"]
    );
}

/// Children outside their parent, and siblings that overlap or run backwards.
fn span_violations(root: &Node) -> Vec<(TextRange, TextRange)> {
    let mut violations = Vec::new();
    root.walk(&mut |node| {
        let children = node.children();
        for child in &children {
            if !node.range.contains_range(child.range) {
                violations.push((node.range, child.range));
            }
        }
        for pair in children.windows(2) {
            if pair[0].range.end() > pair[1].range.start() {
                violations.push((pair[0].range, pair[1].range));
            }
        }
    });
    violations
}

/// Source text outside every top-level statement, with blanks, separators
/// and comments removed.
fn uncovered_text(text: &str, root: &Node) -> String {
    let mut gaps = String::new();
    let mut at = 0;
    for statement in root.statements() {
        let start = usize::from(statement.range.start());
        if start > at {
            gaps.push_str(&text[at..start]);
        }
        at = at.max(usize::from(statement.range.end()));
    }
    gaps.push_str(&text[at..]);
    gaps.lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(str::chars)
        .filter(|c| !matches!(c, ' ' | '\t' | '\r' | ';'))
        .collect()
}

#[test]
fn test_child_spans_nest_inside_parents() {
    let parse = parse(DEPLOY_SCRIPT);
    let violations = span_violations(&parse.root);
    assert!(violations.is_empty(), "{violations:?}");
}

#[test]
fn test_statements_cover_every_token() {
    let parse = parse(DEPLOY_SCRIPT);
    assert_eq!(uncovered_text(DEPLOY_SCRIPT, &parse.root), "");

    let text = "echo a; echo b # trailing\n\n# alone\ncat <<EOF\nbody\nEOF\n)\n";
    let parse = ysh::parse(text);
    assert_eq!(uncovered_text(text, &parse.root), "");
}

#[rstest]
#[case("**$[\n**$\"")]
#[case("varesacfor}func\"\"\"|**$[\n**$\"éa;}aEOF>${")]
#[case("echo `echo (")]
#[case("echo `echo (`")]
#[case("x=`call f(` y")]
#[case("proc p (a, b { echo }\nvar = = =\n")]
#[case("case $x in\n a) cat <<EOF;;\nline\nEOF\n b) ;;\nesac\n")]
#[case("if (x) { echo $[1 +\n} elif\n")]
fn test_spans_hold_on_malformed_input(#[case] text: &str) {
    let parse = parse(text);
    let violations = span_violations(&parse.root);
    assert!(violations.is_empty(), "{text:?}: {violations:?}");
    assert_eq!(parse.root.range, TextRange::up_to(TextSize::of(text)));
}

#[test]
fn test_root_spans_whole_text() {
    let parse = parse(DEPLOY_SCRIPT);
    assert_eq!(
        parse.root.range,
        TextRange::up_to(TextSize::of(DEPLOY_SCRIPT))
    );
}

#[test]
fn test_posix_script() {
    let text = "\
#!/bin/sh
set -eu
SCRIPT_DIR=$(cd \"$(dirname \"$0\")\" && pwd)
. \"$SCRIPT_DIR/env.sh\"

usage() {
  echo \"usage: $0 [-v]\" >&2
  exit 1
}

while [ $# -gt 0 ]; do
  case \"$1\" in
    -v) VERBOSE=1 ;;
    *) usage ;;
  esac
  shift
done

if [ -n \"${VERBOSE:-}\" ]; then
  echo verbose
elif test -f out.log; then
  rm out.log
else
  :
fi
";
    let parse = parse(text);
    assert!(parse.diagnostics.is_empty(), "{:#?}", parse.diagnostics);
    assert!(
        parse
            .statements()
            .iter()
            .any(|node| matches!(&node.kind, NodeKind::ShellFunction { name, .. } if name.text == "usage"))
    );
}

#[test]
fn test_recovery_keeps_later_statements() {
    let text = "var a = 1\nsetvar = oops\nproc later {\n}\n";
    let parse = parse(text);
    assert!(parse.has_errors());
    assert!(
        parse
            .statements()
            .iter()
            .any(|node| matches!(&node.kind, NodeKind::ProcDef(p) if p.name.text == "later"))
    );
}

#[test]
fn test_unclosed_string_reported_once() {
    let parse = parse("echo 'never closed\nmore\n");
    let unterminated: Vec<_> = parse
        .diagnostics
        .iter()
        .filter(|d| d.code == codes::UNTERMINATED)
        .collect();
    assert_eq!(unterminated.len(), 1);
}

#[test]
fn test_diagnostic_ranges_within_text() {
    let text = "proc (\nif {\n}}} fi done esac\n(((\n";
    let parse = parse(text);
    assert!(!parse.diagnostics.is_empty());
    let end = TextSize::of(text);
    assert!(parse.diagnostics.iter().all(|d| d.range.end() <= end));
}
