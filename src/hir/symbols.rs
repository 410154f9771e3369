//! Per-file symbol extraction.
//!
//! One pass over a parsed tree produces a [`SymbolTable`]: a flat,
//! insertion-ordered multimap from name to every declaration of that name,
//! plus an outline of the document. There is no lexical scoping; lookups
//! return every declaration in the file.
//!
//! Identifier spans come straight from the parser wherever it records them.
//! Mutation and shell-assignment targets fall back to a bounded text search
//! near the statement start.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use rustc_hash::FxBuildHasher;
use smol_str::SmolStr;
use tracing::trace;

use crate::base::{LineIndex, LineRange, TextRange, TextSize};
use crate::syntax::ast::{
    Callable, DeclKeyword, MutationKeyword, Name, Node, NodeKind, Param, VarDecl,
};

/// How far past a statement's start the identifier search looks, in bytes.
pub const IDENT_SEARCH_WINDOW: usize = 256;

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern"));
/// `=` or a compound assignment operator at the start of the haystack.
static ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-+*/]?=").expect("assignment pattern"));

// ============================================================================
// SYMBOL TYPES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolKind {
    Procedure,
    Function,
    Variable,
    Constant,
    Parameter,
}

impl SymbolKind {
    pub fn display(&self) -> &'static str {
        match self {
            SymbolKind::Procedure => "proc",
            SymbolKind::Function => "func",
            SymbolKind::Variable => "var",
            SymbolKind::Constant => "const",
            SymbolKind::Parameter => "param",
        }
    }

    /// Procedures and functions.
    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Procedure | SymbolKind::Function)
    }
}

/// Literal key of a dict-valued declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DictKeyInfo {
    pub range: TextRange,
    pub lines: LineRange,
}

pub type DictKeys = IndexMap<SmolStr, DictKeyInfo, FxBuildHasher>;

/// One declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// The whole declaring construct.
    pub range: TextRange,
    /// The identifier alone.
    pub name_range: TextRange,
    pub lines: LineRange,
    pub name_lines: LineRange,
    /// Parameter names of procs and funcs.
    pub params: Option<Vec<SmolStr>>,
    /// Short signature shown by hover and completion.
    pub detail: Option<String>,
    /// Top-level literal keys when the value is a dict literal.
    pub dict_keys: Option<DictKeys>,
}

impl SymbolInfo {
    pub fn dict_key(&self, key: &str) -> Option<&DictKeyInfo> {
        self.dict_keys.as_ref()?.get(key)
    }
}

/// A document outline entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineItem {
    pub name: SmolStr,
    pub kind: SymbolKind,
    pub range: TextRange,
    pub name_range: TextRange,
    pub lines: LineRange,
    pub name_lines: LineRange,
    pub detail: Option<String>,
    /// Declarations nested in a proc or func body.
    pub children: Vec<OutlineItem>,
}

// ============================================================================
// SYMBOL TABLE
// ============================================================================

/// All declarations of one file.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: IndexMap<SmolStr, Vec<SymbolInfo>, FxBuildHasher>,
    outline: Vec<OutlineItem>,
    line_index: LineIndex,
}

impl SymbolTable {
    /// Extract symbols from a parsed tree of `text`.
    pub fn build(root: &Node, text: &str) -> Self {
        let mut builder = Builder {
            text,
            line_index: LineIndex::new(text),
            symbols: IndexMap::default(),
        };
        let mut outline = Vec::new();
        for statement in root.statements() {
            builder.visit(statement, &mut outline);
        }
        trace!(names = builder.symbols.len(), "built symbol table");

        Self {
            symbols: builder.symbols,
            outline,
            line_index: builder.line_index,
        }
    }

    /// Every declaration of `name`, in discovery order.
    pub fn lookup(&self, name: &str) -> &[SymbolInfo] {
        self.symbols.get(name).map_or(&[], Vec::as_slice)
    }

    /// A literal key of a dict-valued declaration of `name`.
    pub fn lookup_dict_key(&self, name: &str, key: &str) -> Option<(&SymbolInfo, &DictKeyInfo)> {
        self.lookup(name)
            .iter()
            .find_map(|symbol| symbol.dict_key(key).map(|info| (symbol, info)))
    }

    /// All declarations, grouped by name in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolInfo> {
        self.symbols.values().flatten()
    }

    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.symbols.keys()
    }

    pub fn outline(&self) -> &[OutlineItem] {
        &self.outline
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

struct Builder<'a> {
    text: &'a str,
    line_index: LineIndex,
    symbols: IndexMap<SmolStr, Vec<SymbolInfo>, FxBuildHasher>,
}

impl Builder<'_> {
    fn visit(&mut self, node: &Node, outline: &mut Vec<OutlineItem>) {
        match &node.kind {
            NodeKind::ProcDef(callable) => {
                self.callable(node, callable, SymbolKind::Procedure, outline);
            }
            NodeKind::FuncDef(callable) => {
                self.callable(node, callable, SymbolKind::Function, outline);
            }
            NodeKind::ShellFunction { name, body } => {
                let detail = format!("{}()", name.text);
                let mut item = self.add(node, name, SymbolKind::Function, Some(Vec::new()), Some(detail));
                self.visit(body, &mut item.children);
                outline.push(item);
            }
            NodeKind::VarDecl(decl) => {
                self.var_decl(node, decl, outline);
                self.visit_children(node, outline);
            }
            NodeKind::Mutation(mutation) => {
                let keyword = match mutation.keyword {
                    MutationKeyword::Setvar => Some("setvar"),
                    MutationKeyword::Setglobal => Some("setglobal"),
                    MutationKeyword::Bare => None,
                };
                for target in &mutation.targets {
                    if let NodeKind::Var(name) = &target.kind {
                        let detail = match keyword {
                            Some(keyword) => format!("{keyword} {name}"),
                            None => format!("{name} ="),
                        };
                        let item = self.searched(node, name, keyword, detail);
                        outline.push(item);
                    }
                }
                self.visit_children(node, outline);
            }
            NodeKind::Command(cmd) if cmd.words.is_empty() => {
                for assignment in &cmd.assignments {
                    if let NodeKind::ShellAssignment { name, .. } = &assignment.kind {
                        let detail = format!("{}=", name.text);
                        let item = self.searched(assignment, &name.text, None, detail);
                        outline.push(item);
                    }
                }
                self.visit_children(node, outline);
            }
            NodeKind::For(stmt) => {
                for var in &stmt.vars {
                    let detail = format!("for {}", var.text);
                    let item = self.add(node, var, SymbolKind::Variable, None, Some(detail));
                    outline.push(item);
                }
                self.visit_children(node, outline);
            }
            _ => self.visit_children(node, outline),
        }
    }

    fn visit_children(&mut self, node: &Node, outline: &mut Vec<OutlineItem>) {
        for child in node.children() {
            self.visit(child, outline);
        }
    }

    fn callable(
        &mut self,
        node: &Node,
        callable: &Callable,
        kind: SymbolKind,
        outline: &mut Vec<OutlineItem>,
    ) {
        if callable.name.text.is_empty() {
            self.visit(&callable.body, outline);
            return;
        }
        let params = callable.param_names();
        let detail = match kind {
            SymbolKind::Procedure => format!("proc {} ({})", callable.name.text, params.join(", ")),
            _ => format!("func {}({})", callable.name.text, params.join(", ")),
        };
        let mut item = self.add(node, &callable.name, kind, Some(params), Some(detail));

        for param in &callable.params {
            if let NodeKind::Param(p) = &param.kind {
                self.param(param, p);
            }
        }
        self.visit(&callable.body, &mut item.children);
        outline.push(item);
    }

    fn param(&mut self, node: &Node, param: &Param) {
        if param.name.text.is_empty() {
            return;
        }
        let detail = param
            .type_name
            .as_ref()
            .map(|ty| format!("{} {}", param.name.text, ty.text));
        self.add(node, &param.name, SymbolKind::Parameter, None, detail);
        if let Some(default) = &param.default {
            let mut ignored = Vec::new();
            self.visit(default, &mut ignored);
        }
    }

    fn var_decl(&mut self, node: &Node, decl: &VarDecl, outline: &mut Vec<OutlineItem>) {
        let (kind, keyword) = match decl.keyword {
            DeclKeyword::Var => (SymbolKind::Variable, "var"),
            DeclKeyword::Const => (SymbolKind::Constant, "const"),
        };
        let dict_keys = match (&decl.keyword, decl.names.as_slice(), decl.value.as_deref()) {
            (DeclKeyword::Const, [_], Some(value)) => self.dict_keys(value),
            _ => None,
        };

        for typed in &decl.names {
            let detail = match &typed.type_name {
                Some(ty) => format!("{keyword} {} {}", typed.name.text, ty.text),
                None => format!("{keyword} {}", typed.name.text),
            };
            outline.push(self.add(node, &typed.name, kind, None, Some(detail)));
        }

        if let (Some(keys), Some(name)) = (dict_keys, decl.names.first()) {
            if let Some(symbol) = self
                .symbols
                .get_mut(&name.name.text)
                .and_then(|list| list.last_mut())
            {
                symbol.dict_keys = Some(keys);
            }
        }
    }

    /// Top-level literal keys of a dict literal.
    fn dict_keys(&self, value: &Node) -> Option<DictKeys> {
        let NodeKind::Dict(entries) = &value.kind else {
            return None;
        };
        let mut keys = DictKeys::default();
        for entry in entries {
            if let NodeKind::DictEntry { key, .. } = &entry.kind {
                if let Some(literal) = key.literal() {
                    let info = DictKeyInfo {
                        range: literal.range,
                        lines: self.line_index.line_range(literal.range),
                    };
                    keys.entry(literal.text).or_insert(info);
                }
            }
        }
        Some(keys)
    }

    /// Record a symbol whose identifier span the parser captured.
    fn add(
        &mut self,
        node: &Node,
        name: &Name,
        kind: SymbolKind,
        params: Option<Vec<SmolStr>>,
        detail: Option<String>,
    ) -> OutlineItem {
        self.insert(node.range, name.text.clone(), name.range, kind, params, detail)
    }

    /// Record a variable whose identifier span is found by text search.
    fn searched(
        &mut self,
        node: &Node,
        name: &str,
        keyword: Option<&str>,
        detail: String,
    ) -> OutlineItem {
        let name_range = find_identifier(self.text, node.range, name, keyword)
            .unwrap_or_else(|| TextRange::empty(node.range.start()));
        self.insert(
            node.range,
            SmolStr::new(name),
            name_range,
            SymbolKind::Variable,
            None,
            Some(detail),
        )
    }

    fn insert(
        &mut self,
        range: TextRange,
        name: SmolStr,
        name_range: TextRange,
        kind: SymbolKind,
        params: Option<Vec<SmolStr>>,
        detail: Option<String>,
    ) -> OutlineItem {
        let info = SymbolInfo {
            name: name.clone(),
            kind,
            range,
            name_range,
            lines: self.line_index.line_range(range),
            name_lines: self.line_index.line_range(name_range),
            params,
            detail: detail.clone(),
            dict_keys: None,
        };
        let item = OutlineItem {
            name: name.clone(),
            kind,
            range,
            name_range,
            lines: info.lines,
            name_lines: info.name_lines,
            detail,
            children: Vec::new(),
        };
        self.symbols.entry(name).or_default().push(info);
        item
    }
}

/// Find `keyword name` or `name =` within the first
/// [`IDENT_SEARCH_WINDOW`] bytes of `range`.
pub fn find_identifier(
    text: &str,
    range: TextRange,
    name: &str,
    keyword: Option<&str>,
) -> Option<TextRange> {
    if name.is_empty() {
        return None;
    }
    let start = usize::from(range.start()).min(text.len());
    let mut end = usize::from(range.end())
        .min(start + IDENT_SEARCH_WINDOW)
        .min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let window = text.get(start..end)?;

    let mut previous: Option<regex::Match<'_>> = None;
    for found in IDENT_RE.find_iter(window) {
        if found.as_str() == name {
            let after_keyword = keyword.is_some_and(|keyword| {
                previous.is_some_and(|prev| {
                    prev.as_str() == keyword
                        && prev.end() < found.start()
                        && window[prev.end()..found.start()].chars().all(char::is_whitespace)
                })
            });
            if after_keyword || ASSIGN_RE.is_match(&window[found.end()..]) {
                let offset = |n: usize| TextSize::from((start + n) as u32);
                return Some(TextRange::new(offset(found.start()), offset(found.end())));
            }
        }
        previous = Some(found);
    }
    None
}
