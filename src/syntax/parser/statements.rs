//! Statement lists, definitions, declarations and control flow.

use crate::base::{TextRange, TextSize};
use crate::syntax::ast::{
    AndOrOp, AssignOp, Callable, Case, ConditionStyle, DeclKeyword, ExprKeyword, For, If,
    MutationKeyword, Mutation, Name, Node, NodeKind, Param, ParamGroup, TypedName, VarDecl,
};
use crate::syntax::token::TokenKind;

use super::{PResult, Parser, Stop, cover};

const IF_CONDITION: &[Stop] = &[
    Stop::Keyword("then"),
    Stop::Keyword("elif"),
    Stop::Keyword("else"),
    Stop::Keyword("fi"),
    Stop::RBrace,
    Stop::RParen,
];
const IF_BODY: &[Stop] = &[
    Stop::Keyword("elif"),
    Stop::Keyword("else"),
    Stop::Keyword("fi"),
    Stop::RBrace,
    Stop::RParen,
];
const ELSE_BODY: &[Stop] = &[Stop::Keyword("fi"), Stop::RBrace, Stop::RParen];
const LOOP_CONDITION: &[Stop] = &[
    Stop::Keyword("do"),
    Stop::Keyword("done"),
    Stop::RBrace,
    Stop::RParen,
];
const LOOP_BODY: &[Stop] = &[Stop::Keyword("done"), Stop::RBrace, Stop::RParen];
const CASE_ARM_BODY: &[Stop] = &[Stop::SemiSemi, Stop::Keyword("esac"), Stop::RBrace];

/// Words that only close or continue a compound command.
const RESERVED: &[&str] = &["then", "fi", "do", "done", "elif", "else", "esac"];

/// A condition plus the body it guards.
struct Arm {
    style: ConditionStyle,
    condition: Node,
    body: Node,
    /// Body written as `{ ... }` rather than `then`/`do` ... keyword.
    braced: bool,
}

impl Parser<'_> {
    // ------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------

    /// Parse statements into `out` until end of input or a stop token.
    pub(crate) fn statements_into(&mut self, out: &mut Vec<Node>, stops: &[Stop]) -> PResult<()> {
        self.statement_list(out, stops, false)
    }

    pub(crate) fn statements(&mut self, stops: &[Stop]) -> PResult<Vec<Node>> {
        let mut out = Vec::new();
        self.statement_list(&mut out, stops, false)?;
        Ok(out)
    }

    /// `stop_after_block`: a condition list ends after a command carrying
    /// a block argument, which becomes the body.
    fn statement_list(
        &mut self,
        out: &mut Vec<Node>,
        stops: &[Stop],
        stop_after_block: bool,
    ) -> PResult<()> {
        loop {
            self.tick()?;
            while matches!(self.kind(), TokenKind::Newline | TokenKind::Semi) {
                self.bump()?;
                self.drain_heredocs(out);
            }
            if self.at_eof() || self.at_stop(stops) {
                break;
            }

            let before = self.pos;
            let start = self.start();
            let checkpoint = self.checkpoint();
            let statement = match self.and_or() {
                Ok(statement) => statement,
                Err(guard) if guard.is_local() => {
                    out.push(self.abandon_statement(guard, start, checkpoint)?);
                    continue;
                }
                Err(guard) => return Err(guard),
            };
            if self.pos == before {
                out.push(self.force_advance("a command")?);
                continue;
            }

            let backgrounded = matches!(statement.kind, NodeKind::Background(_));
            let has_block = stop_after_block && ends_with_block(&statement);
            out.push(statement);
            self.drain_heredocs(out);
            if has_block {
                break;
            }

            let separated = backgrounded
                || matches!(
                    self.kind(),
                    TokenKind::Newline | TokenKind::Semi | TokenKind::Eof
                )
                || self.at_stop(stops);
            if !separated {
                out.push(self.force_advance("`;` or a newline")?);
            }
        }
        Ok(())
    }

    pub(crate) fn block_until(&mut self, stops: &[Stop]) -> PResult<Node> {
        let body = self.statements(stops)?;
        let range = cover(&body, self.pos);
        Ok(Node::new(NodeKind::Block(body), range))
    }

    /// `{ ... }`
    pub(crate) fn brace_block(&mut self) -> PResult<Node> {
        let start = self.start();
        self.enter()?;
        self.bump()?;
        let body = self.statements(&[Stop::RBrace])?;
        self.expect(TokenKind::RBrace, "`}`")?;
        self.exit();
        Ok(Node::new(NodeKind::Block(body), self.range_from(start)))
    }

    /// `( ... )`
    fn subshell(&mut self) -> PResult<Node> {
        let start = self.start();
        self.enter()?;
        self.bump()?;
        let body = self.statements(&[Stop::RParen])?;
        self.expect(TokenKind::RParen, "`)`")?;
        self.exit();
        Ok(Node::new(NodeKind::Subshell(body), self.range_from(start)))
    }

    // ------------------------------------------------------------------
    // And-or lists and pipelines
    // ------------------------------------------------------------------

    fn and_or(&mut self) -> PResult<Node> {
        let start = self.start();
        let first = self.pipeline()?;

        let node = if matches!(self.kind(), TokenKind::AmpAmp | TokenKind::PipePipe) {
            let mut ops = Vec::new();
            let mut commands = vec![first];
            loop {
                let op = match self.kind() {
                    TokenKind::AmpAmp => AndOrOp::And,
                    TokenKind::PipePipe => AndOrOp::Or,
                    _ => break,
                };
                self.bump()?;
                self.skip_newlines()?;
                ops.push(op);

                let before = self.pos;
                let next = self.pipeline()?;
                if self.pos == before {
                    commands.push(self.missing("a command"));
                    break;
                }
                commands.push(next);
            }
            Node::new(
                NodeKind::AndOr {
                    ops,
                    commands,
                    heredocs: Vec::new(),
                },
                self.range_from(start),
            )
        } else {
            first
        };

        if self.eat(TokenKind::Amp)? {
            return Ok(Node::new(
                NodeKind::Background(Box::new(node)),
                self.range_from(start),
            ));
        }
        Ok(node)
    }

    fn pipeline(&mut self) -> PResult<Node> {
        let start = self.start();
        let negated = self.eat(TokenKind::Bang)?;
        let first = self.command()?;
        if !negated && !self.at(TokenKind::Pipe) {
            return Ok(first);
        }

        let mut stages = vec![first];
        while self.eat(TokenKind::Pipe)? {
            self.skip_newlines()?;
            let before = self.pos;
            let stage = self.command()?;
            if self.pos == before {
                stages.push(self.missing("a command"));
                break;
            }
            stages.push(stage);
        }
        Ok(Node::new(
            NodeKind::Pipeline {
                negated,
                stages,
                heredocs: Vec::new(),
            },
            self.range_from(start),
        ))
    }

    pub(crate) fn skip_newlines(&mut self) -> PResult<()> {
        while self.at(TokenKind::Newline) {
            self.bump()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Command dispatch
    // ------------------------------------------------------------------

    fn command(&mut self) -> PResult<Node> {
        let start = self.start();
        let compound = match self.kind() {
            TokenKind::LBrace => self.brace_block()?,
            TokenKind::LParen => self.subshell()?,
            TokenKind::Eq => return self.expr_statement(ExprKeyword::Equals),
            TokenKind::Ident => match self.keyword_statement()? {
                Some((node, true)) => node,
                Some((node, false)) => return Ok(node),
                None => return self.simple_command(),
            },
            _ => return self.simple_command(),
        };
        self.with_trailing_redirects(start, compound)
    }

    /// Statements introduced by a reserved word. The flag marks compound
    /// commands, which may carry trailing redirects.
    fn keyword_statement(&mut self) -> PResult<Option<(Node, bool)>> {
        if self.glued_after(&self.current) {
            return Ok(None);
        }
        let word = self.current.text.clone();
        let node = match word.as_str() {
            "proc" => (self.proc_def()?, false),
            "func" => (self.func_def()?, false),
            "var" => (self.var_decl(DeclKeyword::Var)?, false),
            "const" => (self.var_decl(DeclKeyword::Const)?, false),
            "setvar" => (self.mutation(MutationKeyword::Setvar)?, false),
            "setglobal" => (self.mutation(MutationKeyword::Setglobal)?, false),
            "call" => (self.expr_statement(ExprKeyword::Call)?, false),
            "function" => (self.function_keyword()?, false),
            "if" => (self.if_statement()?, true),
            "while" => (self.while_statement(false)?, true),
            "until" => (self.while_statement(true)?, true),
            "for" => (self.for_statement()?, true),
            "case" => (self.case_statement()?, true),
            w if RESERVED.contains(&w) => (self.force_advance("a command")?, false),
            _ if self.at_bare_mutation() => (self.mutation(MutationKeyword::Bare)?, false),
            _ => return Ok(None),
        };
        Ok(Some(node))
    }

    /// `name = value` with space before the operator.
    fn at_bare_mutation(&self) -> bool {
        let next = self.peek();
        next.range.start() > self.current.range.end()
            && assign_op(next.kind).is_some()
    }

    // ------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------

    /// `proc name (params) { body }`
    fn proc_def(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;
        let name = self.name_word("a proc name")?;
        let params = if self.at(TokenKind::LParen) {
            self.param_list(ParamGroup::Word)?
        } else {
            Vec::new()
        };
        let body = self.definition_body()?;
        self.exit();
        Ok(Node::new(
            NodeKind::ProcDef(Callable {
                name,
                params,
                body: Box::new(body),
            }),
            self.range_from(start),
        ))
    }

    /// `func name(params) { body }`
    fn func_def(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;
        let name = self.ident_name("a function name")?;
        let params = if self.at(TokenKind::LParen) {
            self.param_list(ParamGroup::Positional)?
        } else {
            self.error_expected("`(`");
            Vec::new()
        };
        let body = self.definition_body()?;
        self.exit();
        Ok(Node::new(
            NodeKind::FuncDef(Callable {
                name,
                params,
                body: Box::new(body),
            }),
            self.range_from(start),
        ))
    }

    fn definition_body(&mut self) -> PResult<Node> {
        if self.at(TokenKind::LBrace) {
            return self.brace_block();
        }
        Ok(self.missing("`{`"))
    }

    /// `function name [()] body`
    fn function_keyword(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        let name = self.name_word("a function name")?;
        if self.at(TokenKind::LParen) && self.peek().kind == TokenKind::RParen {
            self.bump()?;
            self.bump()?;
        }
        self.shell_function_body(start, name)
    }

    /// `name() body`, entered with `current` on `(`.
    pub(crate) fn shell_function(&mut self, start: TextSize, name: Name) -> PResult<Node> {
        self.bump()?;
        self.bump()?;
        self.shell_function_body(start, name)
    }

    fn shell_function_body(&mut self, start: TextSize, name: Name) -> PResult<Node> {
        self.skip_newlines()?;
        let body = match self.kind() {
            TokenKind::LBrace => self.brace_block()?,
            TokenKind::LParen => self.subshell()?,
            _ => self.missing("a function body"),
        };
        Ok(Node::new(
            NodeKind::ShellFunction {
                name,
                body: Box::new(body),
            },
            self.range_from(start),
        ))
    }

    /// A name made of glued word pieces, so `my-proc` is one name.
    fn name_word(&mut self, what: &str) -> PResult<Name> {
        if !matches!(self.kind(), TokenKind::Ident | TokenKind::Int) {
            self.error_expected(what);
            return Ok(Name::new("", TextRange::empty(self.pos)));
        }
        let start = self.start();
        self.bump()?;
        while self.adjacent()
            && matches!(
                self.kind(),
                TokenKind::Ident | TokenKind::Int | TokenKind::Minus | TokenKind::Dot
            )
        {
            self.bump()?;
        }
        let range = self.range_from(start);
        Ok(Name::new(self.slice(range), range))
    }

    pub(crate) fn ident_name(&mut self, what: &str) -> PResult<Name> {
        if !self.at(TokenKind::Ident) {
            self.error_expected(what);
            return Ok(Name::new("", TextRange::empty(self.pos)));
        }
        let token = self.bump()?;
        Ok(Name::new(token.text, token.range))
    }

    /// `( a, b; named = 1; block )`
    fn param_list(&mut self, first_group: ParamGroup) -> PResult<Vec<Node>> {
        self.bump()?;
        self.skipping_newlines(|p| {
            let mut params = Vec::new();
            let mut group = first_group;
            loop {
                match p.kind() {
                    TokenKind::RParen | TokenKind::Eof => break,
                    TokenKind::Semi => {
                        p.bump()?;
                        group = next_group(group);
                        continue;
                    }
                    TokenKind::Comma => {
                        p.bump()?;
                        continue;
                    }
                    TokenKind::Ident | TokenKind::Ellipsis => params.push(p.param(group)?),
                    _ => params.push(p.force_advance("a parameter")?),
                }
            }
            p.expect(TokenKind::RParen, "`)`")?;
            Ok(params)
        })
    }

    fn param(&mut self, group: ParamGroup) -> PResult<Node> {
        let start = self.start();
        let rest = self.eat(TokenKind::Ellipsis)?;
        let name = self.ident_name("a parameter name")?;
        let type_name = if self.at(TokenKind::Ident) {
            let token = self.bump()?;
            Some(Name::new(token.text, token.range))
        } else {
            None
        };
        let default = if self.eat(TokenKind::Eq)? {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        Ok(Node::new(
            NodeKind::Param(Param {
                name,
                type_name,
                default,
                group,
                rest,
            }),
            self.range_from(start),
        ))
    }

    // ------------------------------------------------------------------
    // Declarations and mutations
    // ------------------------------------------------------------------

    /// `var x = 1`, `const a, b = f()`, `var x Int`
    fn var_decl(&mut self, keyword: DeclKeyword) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        let mut names = Vec::new();
        loop {
            let name = self.ident_name("a variable name")?;
            if name.text.is_empty() {
                break;
            }
            let type_name = if self.at(TokenKind::Ident) {
                let token = self.bump()?;
                Some(Name::new(token.text, token.range))
            } else {
                None
            };
            names.push(TypedName { name, type_name });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }

        let value = if self.eat(TokenKind::Eq)? {
            Some(Box::new(self.expr_or_tuple()?))
        } else {
            None
        };
        Ok(Node::new(
            NodeKind::VarDecl(VarDecl {
                keyword,
                names,
                value,
            }),
            self.range_from(start),
        ))
    }

    /// `setvar x = 1`, `setglobal d.k += 2`, `x = 3`
    fn mutation(&mut self, keyword: MutationKeyword) -> PResult<Node> {
        let start = self.start();
        if keyword != MutationKeyword::Bare {
            self.bump()?;
        }

        let mut targets = Vec::new();
        loop {
            let before = self.pos;
            let target = self.place()?;
            if self.pos == before {
                break;
            }
            targets.push(target);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }

        let value = match assign_op(self.kind()) {
            Some(op) => {
                self.bump()?;
                let value = self.expr_or_tuple()?;
                return Ok(Node::new(
                    NodeKind::Mutation(Mutation {
                        keyword,
                        targets,
                        op,
                        value: Box::new(value),
                    }),
                    self.range_from(start),
                ));
            }
            None => self.missing("`=`"),
        };
        Ok(Node::new(
            NodeKind::Mutation(Mutation {
                keyword,
                targets,
                op: AssignOp::Assign,
                value: Box::new(value),
            }),
            self.range_from(start),
        ))
    }

    /// `= expr` or `call expr`
    fn expr_statement(&mut self, keyword: ExprKeyword) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        let expr = self.expression()?;
        Ok(Node::new(
            NodeKind::ExprStatement {
                keyword,
                expr: Box::new(expr),
            },
            self.range_from(start),
        ))
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    /// Either `(expr) { body }` or a command list followed by
    /// `body_keyword ... ` (or by a trailing block argument).
    fn conditional_arm(
        &mut self,
        body_keyword: &'static str,
        condition_stops: &[Stop],
        body_stops: &[Stop],
    ) -> PResult<Arm> {
        if self.at(TokenKind::LParen) {
            let condition = self.paren_expr()?;
            let body = self.definition_body()?;
            return Ok(Arm {
                style: ConditionStyle::Expr,
                condition,
                body,
                braced: true,
            });
        }

        let fallback = self.pos;
        let mut list = Vec::new();
        self.statement_list(&mut list, condition_stops, true)?;

        if self.eat_keyword(body_keyword)? {
            let condition = block_node(list, fallback);
            let body = self.block_until(body_stops)?;
            return Ok(Arm {
                style: ConditionStyle::Command,
                condition,
                body,
                braced: false,
            });
        }

        if let Some(body) = list.last_mut().and_then(take_trailing_block) {
            return Ok(Arm {
                style: ConditionStyle::Command,
                condition: block_node(list, fallback),
                body,
                braced: true,
            });
        }

        let body = self.missing(&format!("`{body_keyword}` or `{{`"));
        Ok(Arm {
            style: ConditionStyle::Command,
            condition: block_node(list, fallback),
            body,
            braced: false,
        })
    }

    fn if_statement(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;

        let arm = self.conditional_arm("then", IF_CONDITION, IF_BODY)?;
        let braced = arm.braced;

        let mut elifs = Vec::new();
        while self.at_keyword("elif") {
            let elif_start = self.start();
            self.bump()?;
            let elif = self.conditional_arm("then", IF_CONDITION, IF_BODY)?;
            elifs.push(Node::new(
                NodeKind::ElifArm {
                    condition: Box::new(elif.condition),
                    body: Box::new(elif.body),
                },
                self.range_from(elif_start),
            ));
        }

        let else_body = if self.eat_keyword("else")? {
            let body = if braced {
                self.definition_body()?
            } else {
                self.block_until(ELSE_BODY)?
            };
            Some(Box::new(body))
        } else {
            None
        };

        if !braced {
            self.expect_keyword("fi")?;
        }
        self.exit();

        Ok(Node::new(
            NodeKind::If(If {
                style: arm.style,
                condition: Box::new(arm.condition),
                then_body: Box::new(arm.body),
                elifs,
                else_body,
            }),
            self.range_from(start),
        ))
    }

    fn while_statement(&mut self, until: bool) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;
        let arm = self.conditional_arm("do", LOOP_CONDITION, LOOP_BODY)?;
        if !arm.braced {
            self.expect_keyword("done")?;
        }
        self.exit();
        Ok(Node::new(
            NodeKind::While {
                until,
                style: arm.style,
                condition: Box::new(arm.condition),
                body: Box::new(arm.body),
            },
            self.range_from(start),
        ))
    }

    /// `for x in (expr) { }`, `for i, x in a b { }`, `for x in a b; do ... done`
    fn for_statement(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;

        let mut vars = Vec::new();
        loop {
            let name = self.ident_name("a loop variable")?;
            if name.text.is_empty() {
                break;
            }
            vars.push(name);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }

        let mut style = ConditionStyle::Command;
        let mut iterable = Vec::new();
        if self.eat_keyword("in")? {
            if self.at(TokenKind::LParen) {
                style = ConditionStyle::Expr;
                iterable.push(self.paren_expr()?);
            } else {
                while self.at_word() && !self.at_keyword("do") {
                    iterable.push(self.word()?);
                }
            }
        }

        let body = if self.at(TokenKind::LBrace) {
            self.brace_block()?
        } else {
            while matches!(self.kind(), TokenKind::Semi | TokenKind::Newline) {
                self.bump()?;
            }
            if self.eat_keyword("do")? {
                let body = self.block_until(LOOP_BODY)?;
                self.expect_keyword("done")?;
                body
            } else {
                self.missing("`do` or `{`")
            }
        };
        self.exit();

        Ok(Node::new(
            NodeKind::For(For {
                style,
                vars,
                iterable,
                body: Box::new(body),
            }),
            self.range_from(start),
        ))
    }

    /// `case (x) { pat | pat { body } }` or `case $x in pat) body ;; esac`
    fn case_statement(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;

        let (style, subject, arms) = if self.at(TokenKind::LParen) {
            let subject = self.paren_expr()?;
            let arms = if self.eat(TokenKind::LBrace)? {
                let arms = self.braced_case_arms()?;
                self.expect(TokenKind::RBrace, "`}`")?;
                arms
            } else {
                self.error_expected("`{`");
                Vec::new()
            };
            (ConditionStyle::Expr, subject, arms)
        } else {
            let subject = if self.at_word() {
                self.word()?
            } else {
                self.missing("a word")
            };
            self.skip_newlines()?;
            self.expect_keyword("in")?;
            let arms = self.posix_case_arms()?;
            self.expect_keyword("esac")?;
            (ConditionStyle::Command, subject, arms)
        };
        self.exit();

        Ok(Node::new(
            NodeKind::Case(Case {
                style,
                subject: Box::new(subject),
                arms,
            }),
            self.range_from(start),
        ))
    }

    fn braced_case_arms(&mut self) -> PResult<Vec<Node>> {
        let mut arms = Vec::new();
        loop {
            self.tick()?;
            while matches!(self.kind(), TokenKind::Newline | TokenKind::Semi) {
                self.bump()?;
            }
            if matches!(self.kind(), TokenKind::RBrace | TokenKind::Eof) {
                break;
            }

            let start = self.start();
            let before = self.pos;
            let mut patterns = Vec::new();
            loop {
                let pattern = match self.kind() {
                    TokenKind::LParen => self.paren_expr()?,
                    TokenKind::Slash => self.eggex()?,
                    _ if self.at_word() => self.word()?,
                    _ => break,
                };
                patterns.push(pattern);
                if !self.eat(TokenKind::Pipe)? {
                    break;
                }
            }
            if self.pos == before {
                arms.push(self.force_advance("a case pattern")?);
                continue;
            }

            let body = self.definition_body()?;
            arms.push(Node::new(
                NodeKind::CaseArm {
                    patterns,
                    body: Box::new(body),
                },
                self.range_from(start),
            ));
        }
        Ok(arms)
    }

    fn posix_case_arms(&mut self) -> PResult<Vec<Node>> {
        let mut arms = Vec::new();
        loop {
            self.tick()?;
            self.skip_newlines()?;
            if self.at_eof() || self.at_keyword("esac") || self.at(TokenKind::RBrace) {
                break;
            }

            let start = self.start();
            let before = self.pos;
            self.eat(TokenKind::LParen)?;
            let mut patterns = Vec::new();
            while self.at_word() {
                patterns.push(self.word()?);
                if !self.eat(TokenKind::Pipe)? {
                    break;
                }
            }
            if self.pos == before {
                arms.push(self.force_advance("a case pattern")?);
                continue;
            }
            self.expect(TokenKind::RParen, "`)`")?;

            let body = self.block_until(CASE_ARM_BODY)?;
            self.eat(TokenKind::SemiSemi)?;
            arms.push(Node::new(
                NodeKind::CaseArm {
                    patterns,
                    body: Box::new(body),
                },
                self.range_from(start),
            ));
        }
        Ok(arms)
    }

    // ------------------------------------------------------------------
    // Redirects on compound commands
    // ------------------------------------------------------------------

    fn with_trailing_redirects(&mut self, start: TextSize, command: Node) -> PResult<Node> {
        if !self.at_redirect() {
            return Ok(command);
        }
        let mut redirects = Vec::new();
        while self.at_redirect() {
            redirects.push(self.redirect()?);
        }
        Ok(Node::new(
            NodeKind::Redirected {
                command: Box::new(command),
                redirects,
            },
            self.range_from(start),
        ))
    }
}

fn next_group(group: ParamGroup) -> ParamGroup {
    match group {
        ParamGroup::Word => ParamGroup::Positional,
        ParamGroup::Positional => ParamGroup::Named,
        ParamGroup::Named | ParamGroup::Block => ParamGroup::Block,
    }
}

fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Eq => Some(AssignOp::Assign),
        TokenKind::PlusEq => Some(AssignOp::AddAssign),
        TokenKind::MinusEq => Some(AssignOp::SubAssign),
        TokenKind::StarEq => Some(AssignOp::MulAssign),
        TokenKind::SlashEq => Some(AssignOp::DivAssign),
        _ => None,
    }
}

fn block_node(list: Vec<Node>, fallback: TextSize) -> Node {
    let range = cover(&list, fallback);
    Node::new(NodeKind::Block(list), range)
}

/// Does the statement end in a command with a block argument?
fn ends_with_block(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Command(cmd) => cmd.block.is_some(),
        NodeKind::Pipeline { stages: items, .. } | NodeKind::AndOr { commands: items, .. } => {
            items.last().is_some_and(ends_with_block)
        }
        _ => false,
    }
}

/// Detach the block argument of the statement's last command, shrinking
/// the ranges it leaves behind.
fn take_trailing_block(node: &mut Node) -> Option<Node> {
    let block = match &mut node.kind {
        NodeKind::Command(cmd) => *cmd.block.take()?,
        NodeKind::Pipeline { stages: items, .. } | NodeKind::AndOr { commands: items, .. } => {
            take_trailing_block(items.last_mut()?)?
        }
        _ => return None,
    };
    let end = node
        .children()
        .iter()
        .map(|child| child.range.end())
        .max()
        .unwrap_or(node.range.start());
    node.range = TextRange::new(node.range.start(), end);
    Some(block)
}

#[cfg(test)]
mod tests {
    use crate::syntax::ast::*;
    use crate::syntax::diagnostics::codes;
    use crate::syntax::parser::parse;
    use rstest::rstest;

    fn only(text: &str) -> Node {
        let parse = parse(text);
        assert!(parse.diagnostics.is_empty(), "{text}: {:?}", parse.diagnostics);
        assert_eq!(parse.statements().len(), 1, "{:?}", parse.statements());
        parse.statements()[0].clone()
    }

    #[test]
    fn test_proc_with_param_groups() {
        let node = only("proc deploy (target, ...rest; verbose = false; block) {\n  echo\n}\n");
        let NodeKind::ProcDef(callable) = &node.kind else { panic!("{node:?}") };
        assert_eq!(callable.name.text, "deploy");
        assert_eq!(callable.param_names(), ["target", "rest", "verbose", "block"]);
        let groups: Vec<_> = callable
            .params
            .iter()
            .filter_map(|p| match &p.kind {
                NodeKind::Param(param) => Some((param.group, param.rest)),
                _ => None,
            })
            .collect();
        assert_eq!(groups, [
            (ParamGroup::Word, false),
            (ParamGroup::Word, true),
            (ParamGroup::Positional, false),
            (ParamGroup::Named, false),
        ]);
    }

    #[test]
    fn test_hyphenated_proc_name() {
        let node = only("proc my-tool {\n}\n");
        let NodeKind::ProcDef(callable) = &node.kind else { panic!() };
        assert_eq!(callable.name.text, "my-tool");
    }

    #[test]
    fn test_func_def() {
        let node = only("func add(a Int, b Int = 0) {\n  return (a + b)\n}\n");
        let NodeKind::FuncDef(callable) = &node.kind else { panic!("{node:?}") };
        assert_eq!(callable.name.text, "add");
        assert_eq!(callable.params.len(), 2);
    }

    #[rstest]
    #[case("var x = 1\n", DeclKeyword::Var, 1)]
    #[case("const a, b = 1, 2\n", DeclKeyword::Const, 2)]
    #[case("var n Int\n", DeclKeyword::Var, 1)]
    fn test_var_decl(#[case] text: &str, #[case] keyword: DeclKeyword, #[case] names: usize) {
        let node = only(text);
        let NodeKind::VarDecl(decl) = &node.kind else { panic!("{node:?}") };
        assert_eq!(decl.keyword, keyword);
        assert_eq!(decl.names.len(), names);
    }

    #[rstest]
    #[case("setvar x = 2\n", MutationKeyword::Setvar, AssignOp::Assign)]
    #[case("setglobal d.count += 1\n", MutationKeyword::Setglobal, AssignOp::AddAssign)]
    #[case("x = 3\n", MutationKeyword::Bare, AssignOp::Assign)]
    fn test_mutation(#[case] text: &str, #[case] keyword: MutationKeyword, #[case] op: AssignOp) {
        let node = only(text);
        let NodeKind::Mutation(m) = &node.kind else { panic!("{node:?}") };
        assert_eq!((m.keyword, m.op), (keyword, op));
        assert_eq!(m.targets.len(), 1);
    }

    #[test]
    fn test_expression_statements() {
        assert!(matches!(
            only("= 1 + 2\n").kind,
            NodeKind::ExprStatement { keyword: ExprKeyword::Equals, .. }
        ));
        assert!(matches!(
            only("call list->append(3)\n").kind,
            NodeKind::ExprStatement { keyword: ExprKeyword::Call, .. }
        ));
    }

    #[test]
    fn test_if_expression_style() {
        let node = only("if (x > 1) {\n  echo big\n} elif (x > 0) {\n  echo small\n} else {\n  echo none\n}\n");
        let NodeKind::If(stmt) = &node.kind else { panic!("{node:?}") };
        assert_eq!(stmt.style, ConditionStyle::Expr);
        assert_eq!(stmt.elifs.len(), 1);
        assert!(stmt.else_body.is_some());
    }

    #[test]
    fn test_if_posix_style() {
        let node = only("if test -f x; then\n  echo yes\nelse\n  echo no\nfi\n");
        let NodeKind::If(stmt) = &node.kind else { panic!("{node:?}") };
        assert_eq!(stmt.style, ConditionStyle::Command);
        assert!(stmt.else_body.is_some());
    }

    #[test]
    fn test_if_command_with_block() {
        let parse = parse("if test -f x {\n  echo yes\n}\necho after\n");
        assert!(parse.diagnostics.is_empty(), "{:?}", parse.diagnostics);
        assert_eq!(parse.statements().len(), 2);
        let NodeKind::If(stmt) = &parse.statements()[0].kind else { panic!() };
        let NodeKind::Block(body) = &stmt.then_body.kind else { panic!() };
        assert_eq!(body.len(), 1);
        let NodeKind::Block(condition) = &stmt.condition.kind else { panic!() };
        let NodeKind::Command(cmd) = &condition[0].kind else { panic!() };
        assert!(cmd.block.is_none());
        assert!(condition[0].range.end() <= stmt.then_body.range.start());
    }

    #[rstest]
    #[case("while (i < 3) {\n  setvar i += 1\n}\n", false)]
    #[case("while true; do\n  break\ndone\n", false)]
    #[case("until test -f done.txt; do sleep 1; done\n", true)]
    fn test_loops(#[case] text: &str, #[case] until: bool) {
        let node = only(text);
        assert!(matches!(node.kind, NodeKind::While { until: u, .. } if u == until));
    }

    #[rstest]
    #[case("for x in (items) {\n  echo $x\n}\n", ConditionStyle::Expr, 1)]
    #[case("for i, x in a b c {\n  echo $x\n}\n", ConditionStyle::Command, 2)]
    #[case("for f in *.txt; do\n  cat $f\ndone\n", ConditionStyle::Command, 1)]
    fn test_for(#[case] text: &str, #[case] style: ConditionStyle, #[case] vars: usize) {
        let node = only(text);
        let NodeKind::For(stmt) = &node.kind else { panic!("{node:?}") };
        assert_eq!(stmt.style, style);
        assert_eq!(stmt.vars.len(), vars);
    }

    #[test]
    fn test_case_expression_style() {
        let node = only("case (x) {\n  1 | 2 { echo low }\n  (3) { echo three }\n  /d+/ { echo num }\n  (else) { echo other }\n}\n");
        let NodeKind::Case(stmt) = &node.kind else { panic!("{node:?}") };
        assert_eq!(stmt.arms.len(), 4);
        let NodeKind::CaseArm { patterns, .. } = &stmt.arms[0].kind else { panic!() };
        assert_eq!(patterns.len(), 2);
    }

    #[test]
    fn test_case_posix_style() {
        let node = only("case $x in\n  a|b) echo ab ;;\n  *) echo other ;;\nesac\n");
        let NodeKind::Case(stmt) = &node.kind else { panic!("{node:?}") };
        assert_eq!(stmt.style, ConditionStyle::Command);
        assert_eq!(stmt.arms.len(), 2);
    }

    #[rstest]
    #[case("function greet {\n  echo hi\n}\n")]
    #[case("function greet() {\n  echo hi\n}\n")]
    fn test_function_keyword(#[case] text: &str) {
        let node = only(text);
        assert!(matches!(&node.kind, NodeKind::ShellFunction { name, .. } if name.text == "greet"));
    }

    #[test]
    fn test_and_or_is_flat() {
        let node = only("a && b || c\n");
        let NodeKind::AndOr { ops, commands, .. } = &node.kind else { panic!("{node:?}") };
        assert_eq!(ops, &[AndOrOp::And, AndOrOp::Or]);
        assert_eq!(commands.len(), 3);
    }

    #[test]
    fn test_pipeline_and_background() {
        let parse = parse("! grep x f | wc -l & echo next\n");
        assert!(parse.diagnostics.is_empty(), "{:?}", parse.diagnostics);
        assert_eq!(parse.statements().len(), 2);
        let NodeKind::Background(inner) = &parse.statements()[0].kind else { panic!() };
        assert!(matches!(inner.kind, NodeKind::Pipeline { negated: true, ref stages, .. } if stages.len() == 2));
    }

    #[test]
    fn test_redirected_compound() {
        let node = only("{ echo a; echo b; } > out.txt\n");
        assert!(matches!(node.kind, NodeKind::Redirected { ref redirects, .. } if redirects.len() == 1));
    }

    #[test]
    fn test_stray_reserved_word_recovers() {
        let parse = parse("fi\necho ok\n");
        assert_eq!(parse.diagnostics.len(), 1);
        assert_eq!(parse.diagnostics[0].code, codes::SYNTAX_ERROR);
        assert!(parse.statements()[0].is_error());
        assert!(matches!(parse.statements()[1].kind, NodeKind::Command(_)));
    }

    #[test]
    fn test_missing_closing_brace() {
        let parse = parse("proc p {\n  echo\n");
        assert!(parse.has_errors());
        assert!(matches!(parse.statements()[0].kind, NodeKind::ProcDef(_)));
    }
}
