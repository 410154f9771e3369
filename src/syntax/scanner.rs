//! Context-sensitive scanner.
//!
//! Recognizes the tokens whose boundaries depend on more than a fixed
//! lookahead window: heredoc delimiters and bodies, quoted and triple-quoted
//! string content, and eggex bodies. The caller says which [`ScanKind`]s it
//! currently accepts; the scanner either returns one of them or leaves the
//! position untouched and returns `None`.
//!
//! The scanner never fails hard. An unterminated literal comes back with the
//! content accumulated so far and a [`LexicalError`] attached, and the parser
//! decides whether to report it.

use smol_str::SmolStr;
use tracing::trace;

use crate::base::{TextRange, TextSize};

use super::error::LexicalError;

/// Longest accepted heredoc delimiter, in bytes.
pub const MAX_DELIMITER_LEN: usize = 256;

/// Which quote opened a string whose content is being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuoteStyle {
    /// `'...'` and `r'...'`: no escapes, no substitutions.
    Single,
    /// `"..."` and `$"..."`: escapes, `$` and backtick end a content run.
    Double,
    /// `$'...'`: escapes, no substitutions.
    DollarSingle,
}

impl QuoteStyle {
    fn quote_char(self) -> u8 {
        match self {
            QuoteStyle::Double => b'"',
            QuoteStyle::Single | QuoteStyle::DollarSingle => b'\'',
        }
    }

    fn has_escapes(self) -> bool {
        !matches!(self, QuoteStyle::Single)
    }

    fn has_substitutions(self) -> bool {
        matches!(self, QuoteStyle::Double)
    }
}

/// Token kinds the scanner can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanKind {
    /// Delimiter after `<<` or `<<-`.
    HeredocStart,
    /// Body lines up to (not including) the terminator line.
    HeredocBody,
    /// The terminator line.
    HeredocEnd,
    /// Content of a single-line-quoted string.
    StringContent(QuoteStyle),
    /// Content of a triple-quoted string.
    MultilineStringContent(QuoteStyle),
    /// Content of an eggex `/.../`.
    RegexContent,
}

/// One scanned token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanned {
    pub kind: ScanKind,
    /// Decoded text: the delimiter for heredoc start and end, the body with
    /// stripped tabs removed, or the raw content of a literal.
    pub text: String,
    /// Source bytes consumed.
    pub range: TextRange,
    pub error: Option<LexicalError>,
}

/// Heredoc state carried between scanner calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeredocState {
    pub delimiter: SmolStr,
    /// `<<-`: leading tabs are stripped from body lines and the terminator.
    pub strip_tabs: bool,
    /// The delimiter was quoted or backslash-escaped, so the body is literal.
    pub quoted: bool,
    /// A body is pending or being scanned.
    pub started: bool,
}

/// The context-sensitive scanner. One instance per parse.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    heredoc: HeredocState,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Is a heredoc body currently expected?
    pub fn heredoc_active(&self) -> bool {
        self.heredoc.started
    }

    pub fn heredoc(&self) -> &HeredocState {
        &self.heredoc
    }

    /// Re-enter body mode for a heredoc whose start was scanned earlier.
    pub fn resume_heredoc(&mut self, state: HeredocState) {
        self.heredoc = HeredocState {
            started: true,
            ..state
        };
    }

    /// Drop any heredoc state.
    pub fn reset(&mut self) {
        self.heredoc = HeredocState::default();
    }

    /// Try each accepted kind at `offset`.
    ///
    /// Heredoc body scanning takes priority while a heredoc is active.
    pub fn scan(&mut self, text: &str, offset: TextSize, valid: &[ScanKind]) -> Option<Scanned> {
        let start = usize::from(offset);
        if start > text.len() {
            return None;
        }

        let wants_body = valid
            .iter()
            .any(|k| matches!(k, ScanKind::HeredocBody | ScanKind::HeredocEnd));
        if self.heredoc.started && wants_body {
            return self.scan_heredoc_body(text, start);
        }

        for &kind in valid {
            let scanned = match kind {
                ScanKind::HeredocStart => self.scan_heredoc_start(text, start),
                ScanKind::StringContent(style) => scan_string_content(text, start, style),
                ScanKind::MultilineStringContent(style) => {
                    scan_multiline_content(text, start, style)
                }
                ScanKind::RegexContent => scan_regex_content(text, start),
                ScanKind::HeredocBody | ScanKind::HeredocEnd => None,
            };
            if scanned.is_some() {
                return scanned;
            }
        }
        None
    }

    fn scan_heredoc_start(&mut self, text: &str, start: usize) -> Option<Scanned> {
        let mut cursor = Cursor::new(text, start);

        let strip_tabs = cursor.eat(b'-');
        while matches!(cursor.peek(), Some(b' ' | b'\t')) {
            cursor.bump();
        }

        let (delimiter, quoted) = match cursor.peek()? {
            quote @ (b'\'' | b'"') => {
                cursor.bump();
                let content_start = cursor.pos;
                while let Some(b) = cursor.peek() {
                    if b == quote || b == b'\n' {
                        break;
                    }
                    cursor.bump_char();
                }
                // Closing quote required.
                if !cursor.eat(quote) {
                    return None;
                }
                (&text[content_start..cursor.pos - 1], true)
            }
            b'\\' => {
                cursor.bump();
                let word = cursor.eat_while(is_word_byte);
                (word, true)
            }
            _ => (cursor.eat_while(is_word_byte), false),
        };

        if delimiter.is_empty() {
            return None;
        }

        let range = cursor.range_from(start);
        if delimiter.len() > MAX_DELIMITER_LEN {
            trace!(len = delimiter.len(), "heredoc delimiter over limit");
            return Some(Scanned {
                kind: ScanKind::HeredocStart,
                text: delimiter.to_string(),
                range,
                error: Some(LexicalError::DelimiterTooLong {
                    len: delimiter.len(),
                    max: MAX_DELIMITER_LEN,
                }),
            });
        }

        self.heredoc = HeredocState {
            delimiter: SmolStr::new(delimiter),
            strip_tabs,
            quoted,
            started: true,
        };
        Some(Scanned {
            kind: ScanKind::HeredocStart,
            text: delimiter.to_string(),
            range,
            error: None,
        })
    }

    fn scan_heredoc_body(&mut self, text: &str, start: usize) -> Option<Scanned> {
        let delimiter = self.heredoc.delimiter.clone();
        let bytes = text.as_bytes();
        let mut body = String::new();
        let mut line_start = start;

        while line_start < text.len() {
            let mut content_start = line_start;
            if self.heredoc.strip_tabs {
                while bytes.get(content_start) == Some(&b'\t') {
                    content_start += 1;
                }
            }

            let after = content_start + delimiter.len();
            let is_end = text[content_start..].starts_with(delimiter.as_str())
                && matches!(bytes.get(after), None | Some(b'\n' | b'\r'));
            if is_end {
                if line_start == start {
                    self.heredoc.started = false;
                    return Some(Scanned {
                        kind: ScanKind::HeredocEnd,
                        text: delimiter.to_string(),
                        range: range(line_start, after),
                        error: None,
                    });
                }
                return Some(Scanned {
                    kind: ScanKind::HeredocBody,
                    text: body,
                    range: range(start, line_start),
                    error: None,
                });
            }

            let line_end = text[content_start..]
                .find('\n')
                .map_or(text.len(), |i| content_start + i + 1);
            body.push_str(&text[content_start..line_end]);
            line_start = line_end;
        }

        self.heredoc.started = false;
        if line_start == start {
            return None;
        }
        trace!(delimiter = %delimiter, "heredoc body ran to end of input");
        Some(Scanned {
            kind: ScanKind::HeredocBody,
            text: body,
            range: range(start, line_start),
            error: Some(LexicalError::UnterminatedHeredoc {
                delimiter: delimiter.to_string(),
            }),
        })
    }

    /// Serialize the heredoc state as
    /// `[started, strip_tabs, quoted, len_hi, len_lo, delimiter...]`.
    pub fn serialize(&self) -> Vec<u8> {
        let delimiter = self.heredoc.delimiter.as_bytes();
        let len = delimiter.len().min(MAX_DELIMITER_LEN);

        let mut buffer = Vec::with_capacity(5 + len);
        buffer.push(u8::from(self.heredoc.started));
        buffer.push(u8::from(self.heredoc.strip_tabs));
        buffer.push(u8::from(self.heredoc.quoted));
        buffer.push((len >> 8) as u8);
        buffer.push((len & 0xFF) as u8);
        buffer.extend_from_slice(&delimiter[..len]);
        buffer
    }

    /// Restore state written by [`serialize`](Self::serialize).
    ///
    /// An empty or truncated header resets to the default state; a length
    /// longer than the remaining bytes reads what is there.
    pub fn deserialize(&mut self, buffer: &[u8]) {
        let [started, strip_tabs, quoted, len_hi, len_lo, rest @ ..] = buffer else {
            self.reset();
            return;
        };

        let len = (usize::from(*len_hi) << 8 | usize::from(*len_lo))
            .min(MAX_DELIMITER_LEN)
            .min(rest.len());
        self.heredoc = HeredocState {
            delimiter: SmolStr::new(String::from_utf8_lossy(&rest[..len])),
            strip_tabs: *strip_tabs != 0,
            quoted: *quoted != 0,
            started: *started != 0,
        };
    }
}

fn scan_string_content(text: &str, start: usize, style: QuoteStyle) -> Option<Scanned> {
    let mut cursor = Cursor::new(text, start);
    let quote = style.quote_char();

    while let Some(b) = cursor.peek() {
        match b {
            b if b == quote => break,
            b'\\' if style.has_escapes() => cursor.bump_escape(),
            b'$' | b'`' if style.has_substitutions() => break,
            _ => cursor.bump_char(),
        }
    }

    let error = cursor.at_end().then_some(LexicalError::UnterminatedString);
    cursor.content(start, ScanKind::StringContent(style), error)
}

fn scan_multiline_content(text: &str, start: usize, style: QuoteStyle) -> Option<Scanned> {
    let mut cursor = Cursor::new(text, start);
    let quote = style.quote_char();

    while let Some(b) = cursor.peek() {
        match b {
            b if b == quote && cursor.at_triple(quote) => break,
            b'\\' if style.has_escapes() => cursor.bump_escape(),
            b'$' | b'`' if style.has_substitutions() => break,
            _ => cursor.bump_char(),
        }
    }

    let error = cursor
        .at_end()
        .then_some(LexicalError::UnterminatedMultilineString);
    cursor.content(start, ScanKind::MultilineStringContent(style), error)
}

fn scan_regex_content(text: &str, start: usize) -> Option<Scanned> {
    let mut cursor = Cursor::new(text, start);

    while let Some(b) = cursor.peek() {
        match b {
            b'/' | b'\n' => break,
            b'\\' => cursor.bump_escape(),
            b'[' => {
                cursor.bump();
                while let Some(b) = cursor.peek() {
                    match b {
                        b']' => break,
                        b'\\' => cursor.bump_escape(),
                        _ => cursor.bump_char(),
                    }
                }
                cursor.eat(b']');
            }
            _ => cursor.bump_char(),
        }
    }

    let error = cursor.at_end().then_some(LexicalError::UnterminatedRegex);
    cursor.content(start, ScanKind::RegexContent, error)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn range(start: usize, end: usize) -> TextRange {
    TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32))
}

/// Byte cursor over the input. Every terminator the scanner looks for is
/// ASCII, so stopping on a byte never splits a character.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn bump(&mut self) {
        self.pos = (self.pos + 1).min(self.text.len());
    }

    fn bump_char(&mut self) {
        let len = self.text[self.pos..]
            .chars()
            .next()
            .map_or(0, char::len_utf8);
        self.pos += len;
    }

    /// Backslash plus exactly one following character.
    fn bump_escape(&mut self) {
        self.bump();
        if !self.at_end() {
            self.bump_char();
        }
    }

    fn eat(&mut self, b: u8) -> bool {
        let matched = self.peek() == Some(b);
        if matched {
            self.bump();
        }
        matched
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.text[start..self.pos]
    }

    fn at_triple(&self, quote: u8) -> bool {
        self.text.as_bytes()[self.pos..].starts_with(&[quote; 3])
    }

    fn range_from(&self, start: usize) -> TextRange {
        range(start, self.pos)
    }

    fn content(
        &self,
        start: usize,
        kind: ScanKind,
        error: Option<LexicalError>,
    ) -> Option<Scanned> {
        if self.pos == start {
            return None;
        }
        Some(Scanned {
            kind,
            text: self.text[start..self.pos].to_string(),
            range: self.range_from(start),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(offset: usize) -> TextSize {
        TextSize::from(offset as u32)
    }

    #[test]
    fn test_heredoc_start_bare() {
        let text = "cat <<EOF\n";
        let mut scanner = Scanner::new();
        let tok = scanner.scan(text, at(6), &[ScanKind::HeredocStart]).unwrap();

        assert_eq!(tok.kind, ScanKind::HeredocStart);
        assert_eq!(tok.text, "EOF");
        assert_eq!(tok.range, range(6, 9));
        assert!(scanner.heredoc_active());
        assert!(!scanner.heredoc().quoted);
    }

    #[rstest]
    #[case("'END'\n", "END", true, false)]
    #[case("\"END\"\n", "END", true, false)]
    #[case("\\END\n", "END", true, false)]
    #[case("-EOF\n", "EOF", false, true)]
    #[case("-  'x y'\n", "x y", true, true)]
    #[case(" \tEOF\n", "EOF", false, false)]
    fn test_heredoc_start_forms(
        #[case] text: &str,
        #[case] delimiter: &str,
        #[case] quoted: bool,
        #[case] strip_tabs: bool,
    ) {
        let mut scanner = Scanner::new();
        let tok = scanner.scan(text, at(0), &[ScanKind::HeredocStart]).unwrap();

        assert_eq!(tok.text, delimiter);
        assert_eq!(scanner.heredoc().quoted, quoted);
        assert_eq!(scanner.heredoc().strip_tabs, strip_tabs);
    }

    #[rstest]
    #[case("\n")]
    #[case("'EOF\n'")]
    #[case("")]
    #[case(";")]
    fn test_heredoc_start_no_match(#[case] text: &str) {
        let mut scanner = Scanner::new();
        assert!(scanner.scan(text, at(0), &[ScanKind::HeredocStart]).is_none());
        assert!(!scanner.heredoc_active());
    }

    #[test]
    fn test_heredoc_delimiter_too_long() {
        let text = format!("{}\n", "A".repeat(300));
        let mut scanner = Scanner::new();
        let tok = scanner.scan(&text, at(0), &[ScanKind::HeredocStart]).unwrap();

        assert_eq!(
            tok.error,
            Some(LexicalError::DelimiterTooLong { len: 300, max: 256 })
        );
        assert!(!scanner.heredoc_active());
    }

    #[test]
    fn test_heredoc_delimiter_at_limit() {
        let text = format!("{}\n", "A".repeat(MAX_DELIMITER_LEN));
        let mut scanner = Scanner::new();
        let tok = scanner.scan(&text, at(0), &[ScanKind::HeredocStart]).unwrap();
        assert!(tok.error.is_none());
        assert!(scanner.heredoc_active());
    }

    #[test]
    fn test_heredoc_body_then_end() {
        let text = "cat <<EOF\nline1\nline2\nEOF\n";
        let mut scanner = Scanner::new();
        scanner.scan(text, at(6), &[ScanKind::HeredocStart]).unwrap();

        let valid = [ScanKind::HeredocBody, ScanKind::HeredocEnd];
        let body = scanner.scan(text, at(10), &valid).unwrap();
        assert_eq!(body.kind, ScanKind::HeredocBody);
        assert_eq!(body.text, "line1\nline2\n");
        assert!(scanner.heredoc_active());

        let end = scanner.scan(text, body.range.end(), &valid).unwrap();
        assert_eq!(end.kind, ScanKind::HeredocEnd);
        assert_eq!(end.range, range(22, 25));
        assert!(!scanner.heredoc_active());
    }

    #[test]
    fn test_heredoc_strip_tabs() {
        let text = "<<-EOF\n\tindented\n\tEOF\n";
        let mut scanner = Scanner::new();
        scanner.scan(text, at(2), &[ScanKind::HeredocStart]).unwrap();

        let valid = [ScanKind::HeredocBody, ScanKind::HeredocEnd];
        let body = scanner.scan(text, at(7), &valid).unwrap();
        assert_eq!(body.text, "indented\n");

        let end = scanner.scan(text, body.range.end(), &valid).unwrap();
        assert_eq!(end.kind, ScanKind::HeredocEnd);
    }

    #[test]
    fn test_heredoc_delimiter_prefix_is_content() {
        let text = "EOFX\nEOF";
        let mut scanner = Scanner::new();
        scanner.resume_heredoc(HeredocState {
            delimiter: "EOF".into(),
            ..Default::default()
        });

        let body = scanner
            .scan(text, at(0), &[ScanKind::HeredocBody, ScanKind::HeredocEnd])
            .unwrap();
        assert_eq!(body.text, "EOFX\n");
    }

    #[test]
    fn test_heredoc_unterminated() {
        let text = "a\nb\n";
        let mut scanner = Scanner::new();
        scanner.resume_heredoc(HeredocState {
            delimiter: "EOF".into(),
            ..Default::default()
        });

        let body = scanner.scan(text, at(0), &[ScanKind::HeredocBody]).unwrap();
        assert_eq!(body.text, "a\nb\n");
        assert!(matches!(
            body.error,
            Some(LexicalError::UnterminatedHeredoc { .. })
        ));
        assert!(!scanner.heredoc_active());
    }

    #[rstest]
    #[case("hello\"", QuoteStyle::Double, "hello", false)]
    #[case("a\\\"b\" tail", QuoteStyle::Double, "a\\\"b", false)]
    #[case("pre $x\"", QuoteStyle::Double, "pre ", false)]
    #[case("pre `x`\"", QuoteStyle::Double, "pre ", false)]
    #[case("c:\\dir'", QuoteStyle::Single, "c:\\dir", false)]
    #[case("$x'", QuoteStyle::Single, "$x", false)]
    #[case("\\'x'", QuoteStyle::DollarSingle, "\\'x", false)]
    #[case("open", QuoteStyle::Double, "open", true)]
    fn test_string_content(
        #[case] text: &str,
        #[case] style: QuoteStyle,
        #[case] expected: &str,
        #[case] unterminated: bool,
    ) {
        let mut scanner = Scanner::new();
        let tok = scanner
            .scan(text, at(0), &[ScanKind::StringContent(style)])
            .unwrap();
        assert_eq!(tok.text, expected);
        assert_eq!(tok.error.is_some(), unterminated);
    }

    #[test]
    fn test_string_content_empty_is_no_match() {
        let mut scanner = Scanner::new();
        let valid = [ScanKind::StringContent(QuoteStyle::Double)];
        assert!(scanner.scan("\"", at(0), &valid).is_none());
        assert!(scanner.scan("$x\"", at(0), &valid).is_none());
    }

    #[test]
    fn test_escape_consumes_multibyte_char() {
        let mut scanner = Scanner::new();
        let tok = scanner
            .scan("\\é\"", at(0), &[ScanKind::StringContent(QuoteStyle::Double)])
            .unwrap();
        assert_eq!(tok.text, "\\é");
    }

    #[rstest]
    #[case("one\ntwo'''", QuoteStyle::Single, "one\ntwo")]
    #[case("it's '' fine'''", QuoteStyle::Single, "it's '' fine")]
    #[case("say \"hi\" $name\"\"\"", QuoteStyle::Double, "say \"hi\" ")]
    fn test_multiline_content(
        #[case] text: &str,
        #[case] style: QuoteStyle,
        #[case] expected: &str,
    ) {
        let mut scanner = Scanner::new();
        let tok = scanner
            .scan(text, at(0), &[ScanKind::MultilineStringContent(style)])
            .unwrap();
        assert_eq!(tok.text, expected);
        assert!(tok.error.is_none());
    }

    #[rstest]
    #[case(" digit+ / rest", " digit+ ", false)]
    #[case(" [a/z] /", " [a/z] ", false)]
    #[case(" \\/ /", " \\/ ", false)]
    #[case(" [\\]/] /", " [\\]/] ", false)]
    #[case(" d+\nnext", " d+", false)]
    #[case(" d+", " d+", true)]
    fn test_regex_content(#[case] text: &str, #[case] expected: &str, #[case] unterminated: bool) {
        let mut scanner = Scanner::new();
        let tok = scanner.scan(text, at(0), &[ScanKind::RegexContent]).unwrap();
        assert_eq!(tok.text, expected);
        assert_eq!(tok.error.is_some(), unterminated);
    }

    #[test]
    fn test_first_matching_kind_wins() {
        let mut scanner = Scanner::new();
        let tok = scanner
            .scan(
                "abc/",
                at(0),
                &[ScanKind::HeredocStart, ScanKind::RegexContent],
            )
            .unwrap();
        assert_eq!(tok.kind, ScanKind::HeredocStart);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut scanner = Scanner::new();
        scanner.scan("-'END'\n", at(0), &[ScanKind::HeredocStart]).unwrap();

        let buffer = scanner.serialize();
        assert_eq!(&buffer[..5], &[1, 1, 1, 0, 3]);
        assert_eq!(&buffer[5..], b"END");

        let mut restored = Scanner::new();
        restored.deserialize(&buffer);
        assert_eq!(restored.heredoc(), scanner.heredoc());
    }

    #[rstest]
    #[case(&[])]
    #[case(&[1, 1])]
    fn test_deserialize_short_buffer_resets(#[case] buffer: &[u8]) {
        let mut scanner = Scanner::new();
        scanner.resume_heredoc(HeredocState {
            delimiter: "X".into(),
            ..Default::default()
        });
        scanner.deserialize(buffer);
        assert_eq!(scanner.heredoc(), &HeredocState::default());
    }

    #[test]
    fn test_deserialize_overlong_length_reads_available() {
        let mut scanner = Scanner::new();
        scanner.deserialize(&[1, 0, 0, 0xFF, 0xFF, b'A', b'B']);
        assert_eq!(scanner.heredoc().delimiter, "AB");
        assert!(scanner.heredoc_active());
    }
}
