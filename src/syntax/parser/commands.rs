//! Simple commands, prefix assignments and redirects.

use crate::syntax::ast::{Command, Name, Node, NodeKind, Redirect, RedirectOp};
use crate::syntax::scanner::ScanKind;
use crate::syntax::token::TokenKind;

use super::{PResult, Parser};

impl Parser<'_> {
    /// `NAME=v cmd arg... (typed args) { block }` with redirects anywhere.
    pub(crate) fn simple_command(&mut self) -> PResult<Node> {
        let start = self.start();
        let mut cmd = Command::default();

        loop {
            if self.at_redirect() {
                cmd.redirects.push(self.redirect()?);
                continue;
            }
            match self.kind() {
                TokenKind::LParen => {
                    let is_function = cmd.words.len() == 1
                        && cmd.assignments.is_empty()
                        && cmd.redirects.is_empty()
                        && self.peek().kind == TokenKind::RParen;
                    if is_function {
                        if let Some(word) = cmd.words.pop() {
                            let name = Name::new(self.slice(word.range), word.range);
                            return self.shell_function(start, name);
                        }
                    }
                    if cmd.words.is_empty() || cmd.typed_args.is_some() {
                        break;
                    }
                    cmd.typed_args = Some(Box::new(self.arg_list()?));
                    continue;
                }
                TokenKind::LBrace if self.at_block_open() => {
                    if !cmd.words.is_empty() {
                        cmd.block = Some(Box::new(self.brace_block()?));
                    }
                    break;
                }
                _ => {}
            }

            if !self.at_word() {
                break;
            }
            if cmd.words.is_empty() && self.at_assignment() {
                cmd.assignments.push(self.assignment()?);
                continue;
            }
            cmd.words.push(self.word()?);
        }

        Ok(Node::new(NodeKind::Command(cmd), self.range_from(start)))
    }

    /// `NAME=` or `NAME+=` glued together.
    fn at_assignment(&self) -> bool {
        if !self.at(TokenKind::Ident) {
            return false;
        }
        let next = self.lexer.token_at(self.current.range.end());
        next.range.start() == self.current.range.end()
            && matches!(next.kind, TokenKind::Eq | TokenKind::PlusEq)
    }

    fn assignment(&mut self) -> PResult<Node> {
        let start = self.start();
        let name = self.bump()?;
        let op = self.bump()?;

        let value = if !self.adjacent() {
            None
        } else if self.at(TokenKind::LParen) {
            Some(Box::new(self.array_literal()?))
        } else if self.at_word() {
            Some(Box::new(self.word()?))
        } else {
            None
        };

        Ok(Node::new(
            NodeKind::ShellAssignment {
                name: Name::new(name.text, name.range),
                append: op.kind == TokenKind::PlusEq,
                value,
            },
            self.range_from(start),
        ))
    }

    /// `a=(x y z)`
    fn array_literal(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;
        let items = self.skipping_newlines(|p| {
            let mut items = Vec::new();
            while p.at_word() {
                items.push(p.word()?);
            }
            p.expect(TokenKind::RParen, "`)`")?;
            Ok(items)
        })?;
        self.exit();
        Ok(Node::new(NodeKind::List(items), self.range_from(start)))
    }

    // ------------------------------------------------------------------
    // Redirects
    // ------------------------------------------------------------------

    /// A redirect operator, optionally preceded by a glued fd number.
    pub(crate) fn at_redirect(&self) -> bool {
        if self.kind().is_redirect_operator() {
            return true;
        }
        if !self.at(TokenKind::Int) {
            return false;
        }
        let next = self.lexer.token_at(self.current.range.end());
        next.range.start() == self.current.range.end() && next.kind.is_redirect_operator()
    }

    pub(crate) fn redirect(&mut self) -> PResult<Node> {
        let start = self.start();
        let fd = if self.at(TokenKind::Int) {
            self.bump()?.text.parse::<u32>().ok()
        } else {
            None
        };

        let op_token = self.bump()?;
        let op = match op_token.kind {
            TokenKind::Lt => RedirectOp::Input,
            TokenKind::GtGt => RedirectOp::Append,
            TokenKind::GtPipe => RedirectOp::Clobber,
            TokenKind::LtAmp => RedirectOp::DupInput,
            TokenKind::GtAmp => RedirectOp::DupOutput,
            TokenKind::AmpGt => RedirectOp::OutputAll,
            TokenKind::LtLtLt => RedirectOp::HereString,
            TokenKind::LtLt => return self.heredoc_redirect(start, fd),
            _ => RedirectOp::Output,
        };

        let target = if self.at_word() {
            Some(Box::new(self.word()?))
        } else {
            self.error_expected("a redirect target");
            None
        };
        Ok(Node::new(
            NodeKind::Redirect(Redirect { fd, op, target }),
            self.range_from(start),
        ))
    }

    /// `<<EOF`, `<<-EOF`, `<<'EOF'`. The body is read when the line ends.
    fn heredoc_redirect(&mut self, start: crate::base::TextSize, fd: Option<u32>) -> PResult<Node> {
        let Some(scanned) = self.scanner.scan(self.text, self.pos, &[ScanKind::HeredocStart])
        else {
            self.error_expected("a heredoc delimiter");
            return Ok(Node::new(
                NodeKind::Redirect(Redirect {
                    fd,
                    op: RedirectOp::Heredoc { strip_tabs: false },
                    target: None,
                }),
                self.range_from(start),
            ));
        };

        let strip_tabs = self.slice(scanned.range).starts_with('-');
        let quoted = match &scanned.error {
            Some(error) => {
                self.lexical_error(error, scanned.range);
                false
            }
            None => {
                let state = self.scanner.heredoc().clone();
                let quoted = state.quoted;
                self.push_heredoc(state);
                quoted
            }
        };
        self.scanner.reset();
        self.advance_to(scanned.range.end())?;

        let target = Node::new(
            NodeKind::HeredocDelimiter {
                delimiter: scanned.text.into(),
                quoted,
            },
            scanned.range,
        );
        Ok(Node::new(
            NodeKind::Redirect(Redirect {
                fd,
                op: RedirectOp::Heredoc { strip_tabs },
                target: Some(Box::new(target)),
            }),
            self.range_from(start),
        ))
    }
}
