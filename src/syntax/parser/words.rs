//! Shell words: literal runs, quoted strings and substitutions.

use smol_str::SmolStr;

use crate::base::{TextRange, TextSize};
use crate::syntax::ast::{Name, Node, NodeKind, StringStyle};
use crate::syntax::error::LexicalError;
use crate::syntax::scanner::{QuoteStyle, ScanKind};
use crate::syntax::token::TokenKind;

use super::{PResult, Parser, Stop, continues_word};

impl Parser<'_> {
    /// Can `current` start a word?
    pub(crate) fn at_word(&self) -> bool {
        match self.kind() {
            TokenKind::LBrace => !self.at_block_open(),
            TokenKind::RBrace => false,
            TokenKind::Backtick => self.backtick_depth == 0,
            kind => continues_word(kind),
        }
    }

    /// `{` standing alone, opening a block.
    pub(crate) fn at_block_open(&self) -> bool {
        self.at(TokenKind::LBrace) && !self.glued_after(&self.current)
    }

    /// Does `current` extend the word being built?
    fn in_word(&self) -> bool {
        if !self.adjacent() {
            return false;
        }
        match self.kind() {
            TokenKind::LBrace | TokenKind::RBrace => true,
            TokenKind::Backtick => self.backtick_depth == 0,
            kind => continues_word(kind),
        }
    }

    pub(crate) fn word(&mut self) -> PResult<Node> {
        let start = self.start();
        let mut parts: Vec<Node> = Vec::new();

        loop {
            if !parts.is_empty() && !self.in_word() {
                break;
            }
            // `user@host`: a splice only counts at the start of a word.
            let glued_splice = !parts.is_empty() && self.at(TokenKind::Splice);
            if !glued_splice {
                if let Some(part) = self.substitution()? {
                    parts.push(part);
                    continue;
                }
            }
            if self.kind().is_quote_opener() {
                parts.push(self.string_literal()?);
                continue;
            }
            if self.at_eof() {
                break;
            }
            let token = self.bump()?;
            self.push_text(&mut parts, token.range);
        }

        Ok(Node::new(NodeKind::Word(parts), self.range_from(start)))
    }

    /// Extend a trailing text part or start a new one.
    fn push_text(&self, parts: &mut Vec<Node>, range: TextRange) {
        if let Some(last) = parts.last_mut() {
            if matches!(last.kind, NodeKind::Text(_)) && last.range.end() == range.start() {
                let merged = last.range.cover(range);
                *last = Node::new(NodeKind::Text(SmolStr::new(self.slice(merged))), merged);
                return;
            }
        }
        parts.push(Node::new(NodeKind::Text(SmolStr::new(self.slice(range))), range));
    }

    /// `$x`, `${x}`, `$(cmd)`, `@(cmd)`, `` `cmd` ``, `$[expr]`, `@splice`
    pub(crate) fn substitution(&mut self) -> PResult<Option<Node>> {
        let node = match self.kind() {
            TokenKind::SimpleVar | TokenKind::SpecialVar => {
                let token = self.bump()?;
                Node::new(NodeKind::SimpleVarSub(SmolStr::new(&token.text[1..])), token.range)
            }
            TokenKind::Splice => {
                let token = self.bump()?;
                Node::new(NodeKind::Splice(SmolStr::new(&token.text[1..])), token.range)
            }
            TokenKind::DollarBrace => self.braced_var_sub()?,
            TokenKind::DollarParen | TokenKind::AtParen => self.command_sub()?,
            TokenKind::DollarBracket => self.expr_sub()?,
            TokenKind::Backtick if self.backtick_depth == 0 => self.backtick_sub()?,
            _ => return Ok(None),
        };
        Ok(Some(node))
    }

    /// `${name}`, `${#name}`, `${name:-default}`. The suffix is kept raw.
    fn braced_var_sub(&mut self) -> PResult<Node> {
        let open = self.bump()?;
        let text = self.text;
        let bytes = text.as_bytes();
        let len = bytes.len();

        let mut name_start = usize::from(open.range.end());
        if matches!(bytes.get(name_start), Some(b'#' | b'!'))
            && bytes.get(name_start + 1).is_some_and(|&b| is_name_byte(b))
        {
            name_start += 1;
        }
        let mut i = name_start;
        while i < len && is_name_byte(bytes[i]) {
            i += 1;
        }
        if i == name_start && i < len && b"@#?*!$-".contains(&bytes[i]) {
            i += 1;
        }
        let name_end = i;

        let mut depth = 1usize;
        while i < len {
            match bytes[i] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                b'\n' => break,
                b'\\' => {
                    i = (i + 2).min(len);
                    continue;
                }
                _ => {}
            }
            i += 1;
        }

        let closed = bytes.get(i) == Some(&b'}');
        let end = if closed { i + 1 } else { i };
        let offset = |n: usize| TextSize::from(n as u32);
        let name = Name::new(
            &text[name_start..name_end],
            TextRange::new(offset(name_start), offset(name_end)),
        );
        let suffix = SmolStr::new(&text[name_end..i]);
        let range = TextRange::new(open.range.start(), offset(end));
        if !closed {
            self.error_expected("`}`");
        }
        self.advance_to(offset(end))?;

        Ok(Node::new(NodeKind::BracedVarSub { name, suffix }, range))
    }

    /// `$( ... )` and `@( ... )`
    fn command_sub(&mut self) -> PResult<Node> {
        let start = self.start();
        let splice = self.bump()?.kind == TokenKind::AtParen;
        self.enter()?;
        let body = self.with_newlines(|p| {
            let body = p.statements(&[Stop::RParen])?;
            p.expect(TokenKind::RParen, "`)`")?;
            Ok(body)
        })?;
        self.exit();
        Ok(Node::new(
            NodeKind::CommandSub { splice, body },
            self.range_from(start),
        ))
    }

    /// `` `...` ``
    fn backtick_sub(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;
        self.backtick_depth += 1;
        let body = self.with_newlines(|p| p.statements(&[Stop::Backtick]));
        self.backtick_depth -= 1;
        let body = body?;
        self.expect(TokenKind::Backtick, "a closing backtick")?;
        self.exit();
        Ok(Node::new(NodeKind::BacktickSub(body), self.range_from(start)))
    }

    /// `$[ expr ]`
    fn expr_sub(&mut self) -> PResult<Node> {
        let start = self.start();
        self.bump()?;
        self.enter()?;
        let expr = self.skipping_newlines(|p| {
            let expr = p.expression()?;
            p.expect(TokenKind::RBracket, "`]`")?;
            Ok(expr)
        })?;
        self.exit();
        Ok(Node::new(
            NodeKind::ExprSub(Box::new(expr)),
            self.range_from(start),
        ))
    }

    /// A quoted string of any style, with `current` on its opener.
    ///
    /// Content runs come from the scanner; double-quoted styles interleave
    /// substitutions between runs.
    pub(crate) fn string_literal(&mut self) -> PResult<Node> {
        let start = self.start();
        let opener = self.bump()?;
        let (style, quote) = match opener.kind {
            TokenKind::DoubleQuote => (StringStyle::Double, QuoteStyle::Double),
            TokenKind::DollarDoubleQuote => (StringStyle::DollarDouble, QuoteStyle::Double),
            TokenKind::DollarSingleQuote => (StringStyle::DollarSingle, QuoteStyle::DollarSingle),
            TokenKind::RawQuote => (StringStyle::Raw, QuoteStyle::Single),
            TokenKind::TripleSingleQuote => (StringStyle::TripleSingle, QuoteStyle::Single),
            TokenKind::TripleDoubleQuote => (StringStyle::TripleDouble, QuoteStyle::Double),
            TokenKind::RawTripleQuote => (StringStyle::RawTriple, QuoteStyle::Single),
            _ => (StringStyle::Single, QuoteStyle::Single),
        };
        let triple = matches!(
            style,
            StringStyle::TripleSingle | StringStyle::TripleDouble | StringStyle::RawTriple
        );
        let scan = if triple {
            ScanKind::MultilineStringContent(quote)
        } else {
            ScanKind::StringContent(quote)
        };
        let closer: &[u8] = match (quote, triple) {
            (QuoteStyle::Double, true) => b"\"\"\"",
            (QuoteStyle::Double, false) => b"\"",
            (_, true) => b"'''",
            (_, false) => b"'",
        };

        let mut parts = Vec::new();
        let terminated = loop {
            if let Some(content) = self.scanner.scan(self.text, self.pos, &[scan]) {
                self.advance_to(content.range.end())?;
                parts.push(Node::new(NodeKind::Text(content.text.into()), content.range));
            }

            let rest = &self.text.as_bytes()[usize::from(self.pos)..];
            if rest.starts_with(closer) {
                self.advance_to(self.pos + TextSize::from(closer.len() as u32))?;
                break true;
            }
            if rest.is_empty() {
                break false;
            }

            // Content stopped at `$` or a backtick.
            self.refresh();
            if let Some(sub) = self.substitution()? {
                parts.push(sub);
                continue;
            }
            let at = self.pos;
            self.advance_to(at + TextSize::from(1))?;
            self.push_text(&mut parts, TextRange::at(at, TextSize::from(1)));
        };

        let range = self.range_from(start);
        if !terminated {
            let error = if triple {
                LexicalError::UnterminatedMultilineString
            } else {
                LexicalError::UnterminatedString
            };
            self.lexical_error(&error, range);
        }
        self.refresh();
        Ok(Node::new(NodeKind::StringLit { style, parts }, range))
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
