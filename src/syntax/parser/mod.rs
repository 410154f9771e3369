//! Recovering parser for YSH source.
//!
//! The parser drives the [`Lexer`] one token at a time and calls into the
//! [`Scanner`] wherever a token's extent depends on context. Parsing never
//! fails: syntax errors become diagnostics plus `Error` nodes, and every
//! loop either consumes input or force-advances by one token.
//!
//! Governors bound the work done on hostile input. The token and
//! iteration budgets cover the whole document: tripping one ends the parse
//! with a single diagnostic and keeps the statements parsed so far. The
//! nesting and operator-chain limits bound one construct: the statement
//! that trips one becomes an `Error` node and parsing resumes on the next
//! line.
//!
//! The grammar is split by concern:
//! - `statements`: statement lists, definitions, declarations, control flow
//! - `commands`: simple commands, redirects, heredocs
//! - `words`: shell words, strings and substitutions
//! - `expressions`: the typed expression language

mod commands;
mod expressions;
mod statements;
mod words;

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, warn};

use crate::base::{TextRange, TextSize};

use super::ast::{Node, NodeKind};
use super::diagnostics::{Diagnostic, DiagnosticCollector, codes};
use super::error::{GuardError, LexicalError, SyntaxError};
use super::lexer::Lexer;
use super::scanner::{HeredocState, ScanKind, Scanner};
use super::token::{Token, TokenKind};

// ============================================================================
// OPTIONS AND RESULT
// ============================================================================

/// Governor limits for one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParseOptions {
    /// Tokens consumed per document.
    pub max_tokens: usize,
    /// Statement-parse iterations per document.
    pub max_iterations: usize,
    /// Syntactic nesting depth.
    pub max_depth: usize,
    /// Binary operators folded into the expressions being built at once.
    pub max_chain: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_tokens: 100_000,
            max_iterations: 50_000,
            max_depth: 64,
            max_chain: 1024,
        }
    }
}

/// A parsed document: the tree and what went wrong building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parse {
    /// Always a [`NodeKind::Program`] covering the whole text.
    pub root: Node,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parse {
    pub fn into_parts(self) -> (Node, Vec<Diagnostic>) {
        (self.root, self.diagnostics)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Top-level statements.
    pub fn statements(&self) -> &[Node] {
        self.root.statements()
    }
}

/// Parse a document with default limits.
pub fn parse(text: &str) -> Parse {
    parse_with_options(text, &ParseOptions::default())
}

/// Parse a document. Never panics: a panic inside the parser is caught and
/// reported as an internal error diagnostic over an empty program.
pub fn parse_with_options(text: &str, options: &ParseOptions) -> Parse {
    match catch_unwind(AssertUnwindSafe(|| Parser::new(text, *options).parse_program())) {
        Ok(parse) => parse,
        Err(_) => {
            warn!(len = text.len(), "parser panicked, returning empty program");
            let range = TextRange::up_to(TextSize::of(text));
            Parse {
                root: Node::new(NodeKind::Program(Vec::new()), range),
                diagnostics: vec![Diagnostic::error(
                    range,
                    codes::INTERNAL,
                    "internal parser error",
                )],
            }
        }
    }
}

// ============================================================================
// PARSER CORE
// ============================================================================

pub(crate) type PResult<T> = Result<T, GuardError>;

/// What ends a statement list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stop {
    RBrace,
    RParen,
    Backtick,
    SemiSemi,
    Keyword(&'static str),
}

/// Nesting state saved before each statement.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    depth: usize,
    chain: usize,
    newline_skip: u32,
    backtick_depth: u32,
}

pub(crate) struct Parser<'t> {
    text: &'t str,
    lexer: Lexer<'t>,
    scanner: Scanner,
    options: ParseOptions,

    /// End of the last consumed token.
    pos: TextSize,
    /// Next significant token at or after `pos`.
    current: Token,
    /// While positive, newlines are insignificant (inside brackets).
    newline_skip: u32,
    /// While positive, a backtick closes a substitution.
    backtick_depth: u32,

    tokens: usize,
    iterations: usize,
    depth: usize,
    chain: usize,

    /// Heredocs whose start was seen but whose body has not begun.
    pending_heredocs: Vec<HeredocState>,
    /// Bodies read, waiting for the enclosing statement list.
    heredoc_bodies: Vec<Node>,

    diagnostics: DiagnosticCollector,
}

impl<'t> Parser<'t> {
    pub(crate) fn new(text: &'t str, options: ParseOptions) -> Self {
        let lexer = Lexer::new(text);
        let current = lexer.token_at(TextSize::from(0));
        let mut parser = Self {
            text,
            lexer,
            scanner: Scanner::new(),
            options,
            pos: TextSize::from(0),
            current,
            newline_skip: 0,
            backtick_depth: 0,
            tokens: 0,
            iterations: 0,
            depth: 0,
            chain: 0,
            pending_heredocs: Vec::new(),
            heredoc_bodies: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        };
        parser.refresh();
        parser
    }

    pub(crate) fn parse_program(mut self) -> Parse {
        let mut body = Vec::new();
        let end = TextSize::of(self.text);

        match self.statements_into(&mut body, &[]) {
            Ok(()) => self.report_pending_heredocs(),
            Err(guard) => {
                debug!(%guard, tokens = self.tokens, iterations = self.iterations, "parse aborted");
                let start = body.last().map_or(TextSize::from(0), |n| n.range.end());
                let rest = TextRange::new(start, end.max(start));
                self.diagnostics.guard(guard, rest);
                if !rest.is_empty() {
                    body.push(Node::error(rest));
                }
            }
        }

        Parse {
            root: Node::new(NodeKind::Program(body), TextRange::up_to(end)),
            diagnostics: self.diagnostics.finish(),
        }
    }

    // ------------------------------------------------------------------
    // Token access
    // ------------------------------------------------------------------

    /// Re-lex `current` from `pos`, skipping comments and, inside
    /// brackets, newlines.
    fn refresh(&mut self) {
        self.current = self.significant_at(self.pos);
    }

    fn significant_at(&self, mut at: TextSize) -> Token {
        loop {
            let token = self.lexer.token_at(at);
            let skip = match token.kind {
                TokenKind::Comment => true,
                TokenKind::Newline => self.newline_skip > 0,
                _ => false,
            };
            if !skip {
                return token;
            }
            at = token.range.end();
        }
    }

    pub(crate) fn kind(&self) -> TokenKind {
        self.current.kind
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    /// The significant token after `current`.
    pub(crate) fn peek(&self) -> Token {
        self.significant_at(self.current.range.end())
    }

    /// Is `current` glued to the previously consumed token?
    pub(crate) fn adjacent(&self) -> bool {
        self.current.range.start() == self.pos
    }

    /// Is the raw token after `token` glued to it as more word text?
    pub(crate) fn glued_after(&self, token: &Token) -> bool {
        let next = self.lexer.token_at(token.range.end());
        next.range.start() == token.range.end() && continues_word(next.kind)
    }

    /// `current` is the reserved word `word` standing alone.
    pub(crate) fn at_keyword(&self, word: &str) -> bool {
        self.current.is_word(word) && !self.glued_after(&self.current)
    }

    pub(crate) fn at_stop(&self, stops: &[Stop]) -> bool {
        stops.iter().any(|stop| match stop {
            Stop::RBrace => self.at(TokenKind::RBrace),
            Stop::RParen => self.at(TokenKind::RParen),
            Stop::Backtick => self.at(TokenKind::Backtick),
            Stop::SemiSemi => self.at(TokenKind::SemiSemi),
            Stop::Keyword(word) => self.at_keyword(word),
        })
    }

    /// A backtick that closes the enclosing `` `...` `` substitution.
    pub(crate) fn at_closing_backtick(&self) -> bool {
        self.at(TokenKind::Backtick) && self.backtick_depth > 0
    }

    pub(crate) fn start(&self) -> TextSize {
        self.current.range.start()
    }

    /// Range from `start` to the end of the last consumed token.
    pub(crate) fn range_from(&self, start: TextSize) -> TextRange {
        TextRange::new(start, self.pos.max(start))
    }

    pub(crate) fn slice(&self, range: TextRange) -> &'t str {
        &self.text[range]
    }

    // ------------------------------------------------------------------
    // Consuming
    // ------------------------------------------------------------------

    fn count_token(&mut self) -> PResult<()> {
        self.tokens += 1;
        if self.tokens > self.options.max_tokens {
            return Err(GuardError::TokenLimit {
                limit: self.options.max_tokens,
            });
        }
        Ok(())
    }

    pub(crate) fn bump(&mut self) -> PResult<Token> {
        self.count_token()?;
        let token = self.current.clone();
        self.pos = token.range.end();
        if token.kind == TokenKind::Newline && !self.pending_heredocs.is_empty() {
            self.read_heredoc_bodies()?;
        }
        self.refresh();
        Ok(token)
    }

    /// Move to a byte position reached by the scanner or a byte check.
    pub(crate) fn advance_to(&mut self, pos: TextSize) -> PResult<()> {
        self.count_token()?;
        self.pos = pos;
        self.refresh();
        Ok(())
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> PResult<bool> {
        if self.at(kind) {
            self.bump()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn eat_keyword(&mut self, word: &str) -> PResult<bool> {
        if self.at_keyword(word) {
            self.bump()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Consume `kind` or record that it was expected.
    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<bool> {
        if self.eat(kind)? {
            return Ok(true);
        }
        self.error_expected(what);
        Ok(false)
    }

    pub(crate) fn expect_keyword(&mut self, word: &str) -> PResult<bool> {
        if self.eat_keyword(word)? {
            return Ok(true);
        }
        self.error_expected(&format!("`{word}`"));
        Ok(false)
    }

    pub(crate) fn error_expected(&mut self, what: &str) {
        let found = match self.current.kind {
            TokenKind::Eof => "end of input",
            TokenKind::Newline => "newline",
            _ => self.current.text.as_str(),
        };
        let error = SyntaxError::unexpected(found, what, self.current.range);
        self.diagnostics.syntax(error);
    }

    pub(crate) fn lexical_error(&mut self, error: &LexicalError, range: TextRange) {
        self.diagnostics.lexical(error, range);
    }

    /// Zero-width error node at the end of the consumed input.
    pub(crate) fn missing(&mut self, what: &str) -> Node {
        self.error_expected(what);
        Node::error(TextRange::empty(self.pos))
    }

    /// Consume one token as an error node.
    pub(crate) fn force_advance(&mut self, what: &str) -> PResult<Node> {
        self.error_expected(what);
        let token = self.bump()?;
        Ok(Node::error(token.range))
    }

    // ------------------------------------------------------------------
    // Governors
    // ------------------------------------------------------------------

    pub(crate) fn tick(&mut self) -> PResult<()> {
        self.iterations += 1;
        if self.iterations > self.options.max_iterations {
            return Err(GuardError::IterationLimit {
                limit: self.options.max_iterations,
            });
        }
        Ok(())
    }

    pub(crate) fn enter(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(GuardError::NestingLimit {
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    pub(crate) fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Count one operator folded into an expression. Folds build the tree
    /// deeper without recursing, so they have their own budget.
    pub(crate) fn fold(&mut self) -> PResult<()> {
        self.chain += 1;
        if self.chain > self.options.max_chain {
            return Err(GuardError::ChainLimit {
                limit: self.options.max_chain,
            });
        }
        Ok(())
    }

    pub(crate) fn unfold(&mut self, folds: usize) {
        self.chain = self.chain.saturating_sub(folds);
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            depth: self.depth,
            chain: self.chain,
            newline_skip: self.newline_skip,
            backtick_depth: self.backtick_depth,
        }
    }

    /// Abandon the statement starting at `start` after a local guard
    /// tripped: report it, restore the nesting state saved before the
    /// statement and skip to the end of the line.
    pub(crate) fn abandon_statement(
        &mut self,
        guard: GuardError,
        start: TextSize,
        checkpoint: Checkpoint,
    ) -> PResult<Node> {
        debug!(%guard, "abandoning statement");
        self.depth = checkpoint.depth;
        self.chain = checkpoint.chain;
        self.newline_skip = checkpoint.newline_skip;
        self.backtick_depth = checkpoint.backtick_depth;
        self.refresh();

        while !matches!(self.kind(), TokenKind::Newline | TokenKind::Eof) {
            self.bump()?;
        }
        let range = self.range_from(start);
        self.diagnostics.guard(guard, range);
        Ok(Node::error(range))
    }

    /// Run `f` with newlines treated as whitespace.
    pub(crate) fn skipping_newlines<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        self.newline_skip += 1;
        self.refresh();
        let result = f(self);
        self.newline_skip -= 1;
        self.refresh();
        result
    }

    /// Run `f` with newlines significant again (command substitutions
    /// inside brackets).
    pub(crate) fn with_newlines<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let saved = std::mem::replace(&mut self.newline_skip, 0);
        self.refresh();
        let result = f(self);
        self.newline_skip = saved;
        self.refresh();
        result
    }

    // ------------------------------------------------------------------
    // Heredocs
    // ------------------------------------------------------------------

    pub(crate) fn push_heredoc(&mut self, state: HeredocState) {
        self.pending_heredocs.push(state);
    }

    /// Read the bodies of all pending heredocs, starting right after the
    /// newline that ended their command line.
    fn read_heredoc_bodies(&mut self) -> PResult<()> {
        let pending = std::mem::take(&mut self.pending_heredocs);
        for state in pending {
            self.count_token()?;
            let start = self.pos;
            let delimiter = state.delimiter.clone();
            self.scanner.resume_heredoc(state);

            let mut text = String::new();
            let mut terminated = false;
            let valid = [ScanKind::HeredocBody, ScanKind::HeredocEnd];
            while let Some(scanned) = self.scanner.scan(self.text, self.pos, &valid) {
                self.pos = scanned.range.end();
                match scanned.kind {
                    ScanKind::HeredocEnd => {
                        terminated = true;
                        self.skip_line_break();
                        break;
                    }
                    _ => {
                        text.push_str(&scanned.text);
                        if scanned.error.is_some() {
                            break;
                        }
                    }
                }
            }

            let range = self.range_from(start);
            if !terminated {
                debug!(%delimiter, "heredoc not terminated");
                let error = LexicalError::UnterminatedHeredoc {
                    delimiter: delimiter.to_string(),
                };
                self.lexical_error(&error, range);
            }
            if !range.is_empty() {
                self.heredoc_bodies.push(Node::new(
                    NodeKind::HeredocBody {
                        delimiter,
                        text,
                        terminated,
                    },
                    range,
                ));
            }
        }
        self.scanner.reset();
        Ok(())
    }

    fn skip_line_break(&mut self) {
        let rest = &self.text.as_bytes()[usize::from(self.pos)..];
        let skip = match rest {
            [b'\r', b'\n', ..] => 2,
            [b'\n', ..] => 1,
            _ => 0,
        };
        self.pos += TextSize::from(skip);
    }

    /// Move read heredoc bodies into a statement list. A body read in the
    /// middle of the last statement (after `&&` or `|` and a newline) goes
    /// into the command list it interrupts.
    pub(crate) fn drain_heredocs(&mut self, out: &mut Vec<Node>) {
        for body in std::mem::take(&mut self.heredoc_bodies) {
            let nested = out
                .last()
                .is_some_and(|last| last.range.end() > body.range.start());
            if !nested {
                out.push(body);
                continue;
            }
            if let Some(last) = out.last_mut() {
                if let Err(body) = attach_heredoc(last, body) {
                    debug!(range = ?body.range, "heredoc body inside a statement that cannot hold it");
                    self.diagnostics.add(Diagnostic::warning(
                        body.range,
                        codes::DETACHED_HEREDOC,
                        "heredoc body is not attached to any command",
                    ));
                }
            }
        }
    }

    fn report_pending_heredocs(&mut self) {
        for state in std::mem::take(&mut self.pending_heredocs) {
            let error = LexicalError::UnterminatedHeredoc {
                delimiter: state.delimiter.to_string(),
            };
            self.lexical_error(&error, TextRange::empty(self.pos));
        }
    }
}

/// Put `body` into the innermost `&&`/`||` list or pipeline whose lines
/// it falls between. Gives the body back if there is none.
fn attach_heredoc(node: &mut Node, body: Node) -> Result<(), Node> {
    let at = body.range.start();
    match &mut node.kind {
        NodeKind::Background(inner) => attach_heredoc(inner, body),
        NodeKind::Redirected { command, .. } => attach_heredoc(command, body),
        NodeKind::AndOr {
            commands: items,
            heredocs,
            ..
        }
        | NodeKind::Pipeline {
            stages: items,
            heredocs,
            ..
        } => match items.iter_mut().find(|item| item.range.contains(at)) {
            Some(item) => attach_heredoc(item, body),
            None => {
                heredocs.push(body);
                Ok(())
            }
        },
        _ => Err(body),
    }
}

/// Token kinds that extend a word when glued to the previous token.
pub(crate) fn continues_word(kind: TokenKind) -> bool {
    !kind.is_word_terminator() && !matches!(kind, TokenKind::LBrace | TokenKind::RBrace)
}

/// Range covering a list of nodes, or empty at `fallback`.
pub(crate) fn cover(nodes: &[Node], fallback: TextSize) -> TextRange {
    match (nodes.first(), nodes.last()) {
        (Some(first), Some(last)) => first.range.cover(last.range),
        _ => TextRange::empty(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_program() {
        let parse = parse("");
        assert!(matches!(parse.root.kind, NodeKind::Program(ref body) if body.is_empty()));
        assert!(parse.diagnostics.is_empty());
    }

    #[test]
    fn test_program_covers_text() {
        let text = "echo hi\n\n";
        let parse = parse(text);
        assert_eq!(parse.root.range, TextRange::up_to(TextSize::of(text)));
    }

    #[test]
    fn test_token_limit_trips() {
        let options = ParseOptions {
            max_tokens: 5,
            ..Default::default()
        };
        let parse = parse_with_options("echo a b c d e f g\n", &options);
        assert!(parse.diagnostics.iter().any(|d| d.code == codes::GUARD));
        assert!(matches!(parse.statements().last().map(|n| &n.kind), Some(NodeKind::Error)));
    }

    #[test]
    fn test_iteration_limit_keeps_earlier_statements() {
        let options = ParseOptions {
            max_iterations: 3,
            ..Default::default()
        };
        let parse = parse_with_options("a\nb\nc\nd\ne\n", &options);
        let guard = parse.diagnostics.iter().find(|d| d.code == codes::GUARD).unwrap();
        assert!(guard.message.contains("iteration"));
        assert!(parse.statements().len() >= 2);
        assert!(parse.statements().last().unwrap().is_error());
    }

    #[test]
    fn test_nesting_limit_trips() {
        let options = ParseOptions {
            max_depth: 4,
            ..Default::default()
        };
        let parse = parse_with_options("{ { { { { { echo } } } } } }", &options);
        assert!(parse.diagnostics.iter().any(|d| d.message.contains("nesting")));
    }

    #[test]
    fn test_long_operator_chain_is_not_nesting() {
        let terms = vec!["a"; 70].join(" ++ ");
        let text = format!("var s = {terms}\nproc after {{\n}}\n");
        let parse = parse(&text);
        assert!(parse.diagnostics.is_empty(), "{:?}", parse.diagnostics);
        assert_eq!(parse.statements().len(), 2);
    }

    #[test]
    fn test_chain_limit_abandons_only_that_line() {
        let options = ParseOptions {
            max_chain: 8,
            ..Default::default()
        };
        let terms = vec!["1"; 20].join(" + ");
        let text = format!("var s = {terms}\necho after\n");
        let parse = parse_with_options(&text, &options);

        let guards: Vec<_> = parse.diagnostics.iter().filter(|d| d.code == codes::GUARD).collect();
        assert_eq!(guards.len(), 1);
        assert!(guards[0].message.contains("operator chain"));
        assert!(parse.statements()[0].is_error());
        assert!(matches!(parse.statements()[1].kind, NodeKind::Command(_)));
    }

    #[test]
    fn test_nesting_guard_keeps_following_lines() {
        let deep = format!("{}{}", "[".repeat(70), "]".repeat(70));
        let text = format!("var deep = {deep}\nproc after {{\n}}\n");
        let parse = parse(&text);

        let guards = parse.diagnostics.iter().filter(|d| d.code == codes::GUARD).count();
        assert_eq!(guards, 1);
        assert!(parse.statements()[0].is_error());
        assert!(
            parse
                .statements()
                .iter()
                .any(|node| matches!(&node.kind, NodeKind::ProcDef(p) if p.name.text == "after"))
        );
    }

    #[test]
    fn test_heredoc_after_and_is_attached() {
        let text = "cat <<EOF &&\nbody\nEOF\necho next\n";
        let parse = parse(text);
        assert!(parse.diagnostics.is_empty(), "{:?}", parse.diagnostics);
        assert_eq!(parse.statements().len(), 1);

        let NodeKind::AndOr { commands, heredocs, .. } = &parse.statements()[0].kind else {
            panic!("{:?}", parse.statements())
        };
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            &heredocs[..],
            [Node { kind: NodeKind::HeredocBody { text, .. }, .. }] if text == "body\n"
        ));
    }

    #[test]
    fn test_heredoc_between_pipeline_stages() {
        let text = "cat <<EOF |\nx\nEOF\nwc -l\n";
        let parse = parse(text);
        let NodeKind::Pipeline { stages, heredocs, .. } = &parse.statements()[0].kind else {
            panic!("{:?}", parse.statements())
        };
        assert_eq!(stages.len(), 2);
        assert_eq!(heredocs.len(), 1);
        assert!(stages[0].range.end() <= heredocs[0].range.start());
        assert!(heredocs[0].range.end() <= stages[1].range.start());
    }

    #[test]
    fn test_into_parts() {
        let (root, diagnostics) = parse("echo )").into_parts();
        assert!(matches!(root.kind, NodeKind::Program(_)));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, codes::SYNTAX_ERROR);
    }
}
