//! The syntax tree.
//!
//! Every node is a [`Node`]: a source range plus a [`NodeKind`] variant that
//! carries only the fields meaningful for that construct. A child's range is
//! always contained in its parent's, and siblings are ordered and do not
//! overlap.

use smol_str::SmolStr;

use crate::base::TextRange;

/// A tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub range: TextRange,
    pub kind: NodeKind,
}

/// An identifier together with its own span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub text: SmolStr,
    pub range: TextRange,
}

impl Name {
    pub fn new(text: impl Into<SmolStr>, range: TextRange) -> Self {
        Self {
            text: text.into(),
            range,
        }
    }
}

// ============================================================================
// NODE KINDS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Statements ---------------------------------------------------------
    Program(Vec<Node>),
    /// A statement list: brace group, `do ... done` body, condition list.
    Block(Vec<Node>),
    Subshell(Vec<Node>),
    Command(Command),
    Pipeline {
        negated: bool,
        stages: Vec<Node>,
        /// Heredoc bodies read between stages split across lines.
        heredocs: Vec<Node>,
    },
    /// `a && b || c`, kept flat: `ops.len() == commands.len() - 1`.
    AndOr {
        ops: Vec<AndOrOp>,
        commands: Vec<Node>,
        /// Heredoc bodies read between commands split across lines.
        heredocs: Vec<Node>,
    },
    Background(Box<Node>),
    /// A compound command followed by redirects.
    Redirected {
        command: Box<Node>,
        redirects: Vec<Node>,
    },
    Redirect(Redirect),
    HeredocDelimiter {
        delimiter: SmolStr,
        quoted: bool,
    },
    /// Body lines plus the terminator line of a heredoc.
    HeredocBody {
        delimiter: SmolStr,
        text: String,
        terminated: bool,
    },
    ShellAssignment {
        name: Name,
        append: bool,
        value: Option<Box<Node>>,
    },
    ShellFunction {
        name: Name,
        body: Box<Node>,
    },
    ProcDef(Callable),
    FuncDef(Callable),
    Param(Param),
    VarDecl(VarDecl),
    Mutation(Mutation),
    ExprStatement {
        keyword: ExprKeyword,
        expr: Box<Node>,
    },
    If(If),
    ElifArm {
        condition: Box<Node>,
        body: Box<Node>,
    },
    While {
        until: bool,
        style: ConditionStyle,
        condition: Box<Node>,
        body: Box<Node>,
    },
    For(For),
    Case(Case),
    CaseArm {
        patterns: Vec<Node>,
        body: Box<Node>,
    },

    // Words --------------------------------------------------------------
    Word(Vec<Node>),
    /// Unquoted literal text, escapes included verbatim.
    Text(SmolStr),
    StringLit {
        style: StringStyle,
        parts: Vec<Node>,
    },
    /// `$name` or a special parameter such as `$?`.
    SimpleVarSub(SmolStr),
    /// `${name...}`; `suffix` is the raw operator text after the name.
    BracedVarSub {
        name: Name,
        suffix: SmolStr,
    },
    /// `$(...)`, or `@(...)` when `splice` is set.
    CommandSub {
        splice: bool,
        body: Vec<Node>,
    },
    BacktickSub(Vec<Node>),
    /// `$[expr]`
    ExprSub(Box<Node>),
    /// `@name`
    Splice(SmolStr),

    // Expressions --------------------------------------------------------
    Literal(LiteralValue),
    Var(SmolStr),
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    /// `a < b <= c`: `ops.len() == operands.len() - 1`.
    Compare {
        ops: Vec<CompareOp>,
        operands: Vec<Node>,
    },
    /// `then_value if condition else else_value`
    Ternary {
        then_value: Box<Node>,
        condition: Box<Node>,
        else_value: Box<Node>,
    },
    Range {
        op: RangeOp,
        start: Box<Node>,
        end: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        args: Box<Node>,
    },
    /// Positional arguments, then named arguments after `;`.
    ArgList {
        positional: Vec<Node>,
        named: Vec<Node>,
    },
    NamedArg {
        name: Name,
        value: Box<Node>,
    },
    Subscript {
        object: Box<Node>,
        index: Box<Node>,
    },
    Attribute {
        op: AttrOp,
        object: Box<Node>,
        name: Name,
    },
    List(Vec<Node>),
    Tuple(Vec<Node>),
    Dict(Vec<Node>),
    DictEntry {
        key: DictKey,
        value: Option<Box<Node>>,
    },
    /// Eggex body between the slashes, raw.
    Regex(SmolStr),

    /// Input that could not be parsed.
    Error,
}

// ============================================================================
// PAYLOADS
// ============================================================================

/// A simple command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Command {
    /// `NAME=value` prefixes.
    pub assignments: Vec<Node>,
    pub words: Vec<Node>,
    pub redirects: Vec<Node>,
    /// `cmd (a, b; named=1)`
    pub typed_args: Option<Box<Node>>,
    /// `cmd { ... }`
    pub block: Option<Box<Node>>,
}

impl Command {
    /// The command name when the first word is plain literal text.
    pub fn name(&self) -> Option<&str> {
        match &self.words.first()?.kind {
            NodeKind::Word(parts) => match parts.as_slice() {
                [Node {
                    kind: NodeKind::Text(text),
                    ..
                }] => Some(text.as_str()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Arguments after the command name.
    pub fn args(&self) -> &[Node] {
        self.words.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AndOrOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    pub fd: Option<u32>,
    pub op: RedirectOp,
    /// Target word, or a [`NodeKind::HeredocDelimiter`].
    pub target: Option<Box<Node>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectOp {
    /// `<`
    Input,
    /// `>`
    Output,
    /// `>>`
    Append,
    /// `>|`
    Clobber,
    /// `<&`
    DupInput,
    /// `>&`
    DupOutput,
    /// `&>`
    OutputAll,
    /// `<<<`
    HereString,
    /// `<<` and `<<-`
    Heredoc { strip_tabs: bool },
}

/// A `proc` or `func` definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    pub name: Name,
    pub params: Vec<Node>,
    pub body: Box<Node>,
}

impl Callable {
    /// Parameter names in declaration order.
    pub fn param_names(&self) -> Vec<SmolStr> {
        self.params
            .iter()
            .filter_map(|p| match &p.kind {
                NodeKind::Param(param) => Some(param.name.text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Name,
    pub type_name: Option<Name>,
    pub default: Option<Box<Node>>,
    pub group: ParamGroup,
    /// `...rest`
    pub rest: bool,
}

/// Which `;`-separated section of a signature a parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamGroup {
    Word,
    Positional,
    Named,
    Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub keyword: DeclKeyword,
    pub names: Vec<TypedName>,
    pub value: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedName {
    pub name: Name,
    pub type_name: Option<Name>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKeyword {
    Var,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub keyword: MutationKeyword,
    pub targets: Vec<Node>,
    pub op: AssignOp,
    pub value: Box<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKeyword {
    Setvar,
    Setglobal,
    /// `name = value` with no keyword.
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKeyword {
    /// `= expr`
    Equals,
    /// `call expr`
    Call,
}

/// How a control-flow condition was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionStyle {
    /// `(expr)`
    Expr,
    /// A command list.
    Command,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub style: ConditionStyle,
    pub condition: Box<Node>,
    pub then_body: Box<Node>,
    pub elifs: Vec<Node>,
    pub else_body: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub style: ConditionStyle,
    pub vars: Vec<Name>,
    /// One expression in the `Expr` style, otherwise words.
    pub iterable: Vec<Node>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub style: ConditionStyle,
    pub subject: Box<Node>,
    pub arms: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringStyle {
    /// `'...'`
    Single,
    /// `"..."`
    Double,
    /// `$'...'`
    DollarSingle,
    /// `$"..."`
    DollarDouble,
    /// `r'...'`
    Raw,
    /// `'''...'''`
    TripleSingle,
    /// `"""..."""`
    TripleDouble,
    /// `r'''...'''`
    RawTriple,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    BitNot,
    /// `...xs` in argument lists.
    Spread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `===`
    Identical,
    /// `!==`
    NotIdentical,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `~==`
    ApproxEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `~`
    Match,
    /// `!~`
    NotMatch,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeOp {
    /// `..` and `..<`
    Exclusive,
    /// `..=`
    Inclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrOp {
    /// `.`
    Dot,
    /// `->`
    Arrow,
    /// `=>`
    FatArrow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DictKey {
    /// `name:` or shorthand `name`
    Name(Name),
    /// `'quoted':`
    Str(Box<Node>),
    /// `[expr]:`
    Computed(Box<Node>),
}

impl DictKey {
    /// Literal key text and its span, for bare and simply quoted keys.
    pub fn literal(&self) -> Option<Name> {
        match self {
            DictKey::Name(name) => Some(name.clone()),
            DictKey::Str(node) => match &node.kind {
                NodeKind::StringLit { parts, .. } => match parts.as_slice() {
                    [] => Some(Name::new("", node.range)),
                    [
                        Node {
                            kind: NodeKind::Text(text),
                            range,
                        },
                    ] => Some(Name::new(text.clone(), *range)),
                    _ => None,
                },
                _ => None,
            },
            DictKey::Computed(_) => None,
        }
    }
}

// ============================================================================
// TRAVERSAL
// ============================================================================

impl Node {
    /// The range is widened to cover every child, so a zero-width
    /// placeholder recorded before the node's first token stays inside it.
    pub fn new(kind: NodeKind, range: TextRange) -> Self {
        let mut node = Self { range, kind };
        let covered = node
            .children()
            .iter()
            .fold(range, |acc, child| acc.cover(child.range));
        node.range = covered;
        node
    }

    pub fn error(range: TextRange) -> Self {
        Self::new(NodeKind::Error, range)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, NodeKind::Error)
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = Vec::new();
        match &self.kind {
            NodeKind::Program(body)
            | NodeKind::Block(body)
            | NodeKind::Subshell(body)
            | NodeKind::Word(body)
            | NodeKind::BacktickSub(body)
            | NodeKind::List(body)
            | NodeKind::Tuple(body)
            | NodeKind::Dict(body)
            | NodeKind::CommandSub { body, .. }
            | NodeKind::StringLit { parts: body, .. }
            | NodeKind::Compare { operands: body, .. } => out.extend(body),
            NodeKind::Pipeline {
                stages: body,
                heredocs,
                ..
            }
            | NodeKind::AndOr {
                commands: body,
                heredocs,
                ..
            } => {
                out.extend(body);
                out.extend(heredocs);
            }
            NodeKind::Command(cmd) => {
                out.extend(&cmd.assignments);
                out.extend(&cmd.words);
                out.extend(&cmd.redirects);
                out.extend(cmd.typed_args.as_deref());
                out.extend(cmd.block.as_deref());
            }
            NodeKind::Background(inner) | NodeKind::ExprSub(inner) => out.push(inner),
            NodeKind::Redirected { command, redirects } => {
                out.push(command);
                out.extend(redirects);
            }
            NodeKind::Redirect(redirect) => out.extend(redirect.target.as_deref()),
            NodeKind::ShellAssignment { value, .. } => out.extend(value.as_deref()),
            NodeKind::ShellFunction { body, .. } => out.push(body),
            NodeKind::ProcDef(callable) | NodeKind::FuncDef(callable) => {
                out.extend(&callable.params);
                out.push(&callable.body);
            }
            NodeKind::Param(param) => out.extend(param.default.as_deref()),
            NodeKind::VarDecl(decl) => out.extend(decl.value.as_deref()),
            NodeKind::Mutation(mutation) => {
                out.extend(&mutation.targets);
                out.push(&mutation.value);
            }
            NodeKind::ExprStatement { expr, .. } => out.push(expr),
            NodeKind::If(node) => {
                out.push(&node.condition);
                out.push(&node.then_body);
                out.extend(&node.elifs);
                out.extend(node.else_body.as_deref());
            }
            NodeKind::ElifArm { condition, body }
            | NodeKind::While {
                condition, body, ..
            } => {
                out.push(condition);
                out.push(body);
            }
            NodeKind::For(node) => {
                out.extend(&node.iterable);
                out.push(&node.body);
            }
            NodeKind::Case(node) => {
                out.push(&node.subject);
                out.extend(&node.arms);
            }
            NodeKind::CaseArm { patterns, body } => {
                out.extend(patterns);
                out.push(body);
            }
            NodeKind::Unary { operand, .. } => out.push(operand),
            NodeKind::Binary { lhs, rhs, .. } => {
                out.push(lhs);
                out.push(rhs);
            }
            NodeKind::Ternary {
                then_value,
                condition,
                else_value,
            } => {
                out.push(then_value);
                out.push(condition);
                out.push(else_value);
            }
            NodeKind::Range { start, end, .. } => {
                out.push(start);
                out.push(end);
            }
            NodeKind::Call { callee, args } => {
                out.push(callee);
                out.push(args);
            }
            NodeKind::ArgList { positional, named } => {
                out.extend(positional);
                out.extend(named);
            }
            NodeKind::NamedArg { value, .. } => out.push(value),
            NodeKind::Subscript { object, index } => {
                out.push(object);
                out.push(index);
            }
            NodeKind::Attribute { object, .. } => out.push(object),
            NodeKind::DictEntry { key, value } => {
                match key {
                    DictKey::Str(node) | DictKey::Computed(node) => out.push(node),
                    DictKey::Name(_) => {}
                }
                out.extend(value.as_deref());
            }
            NodeKind::HeredocDelimiter { .. }
            | NodeKind::HeredocBody { .. }
            | NodeKind::Text(_)
            | NodeKind::SimpleVarSub(_)
            | NodeKind::BracedVarSub { .. }
            | NodeKind::Splice(_)
            | NodeKind::Literal(_)
            | NodeKind::Var(_)
            | NodeKind::Regex(_)
            | NodeKind::Error => {}
        }
        out.sort_by_key(|node| node.range.start());
        out
    }

    /// Visit this node and its descendants in pre-order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Statement list of a `Program`, `Block` or `Subshell`.
    pub fn statements(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Program(body) | NodeKind::Block(body) | NodeKind::Subshell(body) => body,
            _ => &[],
        }
    }

    /// Innermost node whose range contains `offset`.
    pub fn covering(&self, offset: crate::base::TextSize) -> Option<&Node> {
        if !self.range.contains_inclusive(offset) {
            return None;
        }
        let inner = self
            .children()
            .into_iter()
            .find_map(|child| child.covering(offset));
        Some(inner.unwrap_or(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TextSize;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    fn text(s: &str, start: u32) -> Node {
        Node::new(
            NodeKind::Text(s.into()),
            range(start, start + s.len() as u32),
        )
    }

    fn word(s: &str, start: u32) -> Node {
        let part = text(s, start);
        Node::new(NodeKind::Word(vec![part.clone()]), part.range)
    }

    #[test]
    fn test_command_name_and_args() {
        let cmd = Command {
            words: vec![word("source", 0), word("lib.ysh", 7)],
            ..Default::default()
        };
        assert_eq!(cmd.name(), Some("source"));
        assert_eq!(cmd.args().len(), 1);
        assert_eq!(Command::default().args().len(), 0);
    }

    #[test]
    fn test_children_sorted_by_start() {
        // `>out echo`: redirect before the first word.
        let redirect = Node::new(
            NodeKind::Redirect(Redirect {
                fd: None,
                op: RedirectOp::Output,
                target: Some(Box::new(word("out", 1))),
            }),
            range(0, 4),
        );
        let cmd = Node::new(
            NodeKind::Command(Command {
                words: vec![word("echo", 5)],
                redirects: vec![redirect],
                ..Default::default()
            }),
            range(0, 9),
        );
        let starts: Vec<_> = cmd.children().iter().map(|c| c.range.start()).collect();
        assert_eq!(starts, vec![TextSize::from(0), TextSize::from(5)]);
    }

    #[test]
    fn test_range_widens_to_cover_children() {
        // `**$[` on one line, with the missing operand recorded at 2.
        let missing = Node::error(TextRange::empty(TextSize::from(2)));
        let sub = Node::new(NodeKind::ExprSub(Box::new(missing)), range(4, 6));
        assert_eq!(sub.range, range(2, 6));

        let list = Node::new(NodeKind::List(vec![text("a", 1), text("b", 8)]), range(0, 5));
        assert_eq!(list.range, range(0, 9));
    }

    #[test]
    fn test_walk_pre_order() {
        let program = Node::new(
            NodeKind::Program(vec![word("a", 0), word("b", 2)]),
            range(0, 3),
        );
        let mut kinds = Vec::new();
        program.walk(&mut |node| kinds.push(std::mem::discriminant(&node.kind)));
        assert_eq!(kinds.len(), 5);
        assert_eq!(kinds[0], std::mem::discriminant(&program.kind));
    }

    #[test]
    fn test_covering_finds_innermost() {
        let program = Node::new(
            NodeKind::Program(vec![word("abc", 0), word("de", 4)]),
            range(0, 6),
        );
        let node = program.covering(TextSize::from(5)).unwrap();
        assert!(matches!(node.kind, NodeKind::Text(ref t) if t == "de"));
    }

    #[test]
    fn test_dict_key_literal() {
        let quoted = Node::new(
            NodeKind::StringLit {
                style: StringStyle::Single,
                parts: vec![text("zone", 1)],
            },
            range(0, 6),
        );
        let key = DictKey::Str(Box::new(quoted)).literal().unwrap();
        assert_eq!(key.text, "zone");
        assert_eq!(key.range, range(1, 5));

        let computed = DictKey::Computed(Box::new(text("k", 1)));
        assert!(computed.literal().is_none());
    }
}
