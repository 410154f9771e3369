//! Context-free lexing on demand.
//!
//! The parser interleaves ordinary tokens with scanner calls, so lexing is
//! driven by offset: [`Lexer::token_at`] lexes exactly one token starting
//! at a byte position and never fails.

use logos::Logos;

use crate::base::{TextRange, TextSize};

use super::token::{Token, TokenKind};

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Lex the token starting at or after `offset`, skipping blanks and
    /// line continuations.
    pub fn token_at(&self, offset: TextSize) -> Token {
        let mut start = usize::from(offset).min(self.text.len());
        while !self.text.is_char_boundary(start) {
            start += 1;
        }

        let rest = &self.text[start..];
        let mut lex = TokenKind::lexer(rest);
        let Some(result) = lex.next() else {
            let end = self.text.len();
            return Token::new(TokenKind::Eof, "", range(end, end));
        };

        let span = lex.span();
        let (lo, hi) = (start + span.start, start + span.end);
        match result {
            Ok(TokenKind::Comment) if !self.starts_word(lo) => {
                Token::new(TokenKind::Hash, "#", range(lo, lo + 1))
            }
            Ok(kind) => Token::new(kind, &self.text[lo..hi], range(lo, hi)),
            Err(()) => {
                let width = self.text[lo..].chars().next().map_or(1, char::len_utf8);
                let hi = lo + width;
                Token::new(TokenKind::Unknown, &self.text[lo..hi], range(lo, hi))
            }
        }
    }

    /// A `#` opens a comment only at the start of a word.
    fn starts_word(&self, offset: usize) -> bool {
        match self.text.as_bytes()[..offset].last() {
            None => true,
            Some(b) => matches!(
                b,
                b' ' | b'\t' | b'\n' | b'\r' | b';' | b'|' | b'&' | b'(' | b')' | b'{' | b'}'
            ),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.token_at(TextSize::from(self.pos as u32));
        if token.kind == TokenKind::Eof {
            return None;
        }
        self.pos = usize::from(token.range.end());
        Some(token)
    }
}

fn range(start: usize, end: usize) -> TextRange {
    TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32))
}

/// Lex a whole document into context-free tokens, comments included.
pub fn tokenize(text: &str) -> Vec<Token> {
    Lexer::new(text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_command() {
        use TokenKind::*;
        assert_eq!(kinds("echo $x | wc -l\n"), vec![
            Ident, SimpleVar, Pipe, Ident, Minus, Ident, Newline
        ]);
    }

    #[rstest]
    #[case("<<", TokenKind::LtLt)]
    #[case("<<<", TokenKind::LtLtLt)]
    #[case("..<", TokenKind::DotDotLt)]
    #[case("...", TokenKind::Ellipsis)]
    #[case("~==", TokenKind::TildeEqEq)]
    #[case("===", TokenKind::EqEqEq)]
    #[case("!==", TokenKind::NotEqEq)]
    #[case("'''", TokenKind::TripleSingleQuote)]
    #[case("r'", TokenKind::RawQuote)]
    #[case("$'", TokenKind::DollarSingleQuote)]
    #[case("$(", TokenKind::DollarParen)]
    #[case("$?", TokenKind::SpecialVar)]
    #[case("@items", TokenKind::Splice)]
    #[case("3.14", TokenKind::Float)]
    #[case("1_000", TokenKind::Int)]
    #[case("\\$", TokenKind::Escaped)]
    #[case("日本語", TokenKind::NonAscii)]
    fn test_single_token(#[case] text: &str, #[case] kind: TokenKind) {
        let tokens = tokenize(text);
        assert_eq!(tokens.len(), 1, "{tokens:?}");
        assert_eq!(tokens[0].kind, kind);
        assert_eq!(tokens[0].text, text);
    }

    #[test]
    fn test_range_is_not_float() {
        use TokenKind::*;
        assert_eq!(kinds("1..5"), vec![Int, DotDot, Int]);
    }

    #[test]
    fn test_comment_at_word_start() {
        let tokens = tokenize("echo hi # note\nls");
        assert_eq!(tokens[2].kind, TokenKind::Comment);
        assert_eq!(tokens[2].text, "# note");
        assert_eq!(tokens[3].kind, TokenKind::Newline);
    }

    #[test]
    fn test_hash_inside_word() {
        use TokenKind::*;
        assert_eq!(kinds("a#b"), vec![Ident, Hash, Ident]);
        assert_eq!(kinds("$#"), vec![SpecialVar]);
    }

    #[test]
    fn test_line_continuation_skipped() {
        use TokenKind::*;
        assert_eq!(kinds("a \\\n b"), vec![Ident, Ident]);
    }

    #[test]
    fn test_unknown_is_one_char() {
        let tokens = tokenize("\x01\x02");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Unknown));
    }

    #[test]
    fn test_token_at_offset_and_eof() {
        let lexer = Lexer::new("var x");
        let tok = lexer.token_at(TextSize::from(3));
        assert_eq!(tok.kind, TokenKind::Ident);
        assert_eq!(tok.text, "x");
        assert_eq!(tok.range, range(4, 5));

        let eof = lexer.token_at(TextSize::from(5));
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.range, range(5, 5));
    }

    #[test]
    fn test_keywords_are_identifiers() {
        let tokens = tokenize("proc if var");
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Ident));
        assert!(tokens[1].is_word("if"));
    }
}
