//! Context-free token kinds.
//!
//! Everything a regular grammar can recognize lives here as a `logos`
//! pattern. Constructs whose boundaries depend on context (heredoc bodies,
//! quoted content, eggex bodies) are left to the [`Scanner`].
//!
//! Keywords are deliberately absent: `if`, `proc`, `var`, ... lex as
//! [`TokenKind::Ident`] and are classified by the parser depending on
//! position, so `echo if` keeps `if` as a plain argument.
//!
//! [`Scanner`]: crate::syntax::Scanner

use logos::Logos;
use smol_str::SmolStr;

use crate::base::TextRange;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"\\\r?\n")]
pub enum TokenKind {
    // ═══════════════════════════════════════════════════════════════════
    // Structure
    // ═══════════════════════════════════════════════════════════════════
    #[token("\n")]
    Newline,

    #[regex(r"#[^\n]*")]
    Comment,

    // ═══════════════════════════════════════════════════════════════════
    // Shell operators
    // ═══════════════════════════════════════════════════════════════════
    #[token("|")]
    Pipe,
    #[token("||")]
    PipePipe,
    #[token("&")]
    Amp,
    #[token("&&")]
    AmpAmp,
    #[token(";")]
    Semi,
    #[token(";;")]
    SemiSemi,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<<")]
    LtLt,
    #[token("<<<")]
    LtLtLt,
    #[token(">>")]
    GtGt,
    #[token(">&")]
    GtAmp,
    #[token("<&")]
    LtAmp,
    #[token("&>")]
    AmpGt,
    #[token(">|")]
    GtPipe,

    // ═══════════════════════════════════════════════════════════════════
    // Punctuation
    // ═══════════════════════════════════════════════════════════════════
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("..<")]
    DotDotLt,
    #[token("..=")]
    DotDotEq,
    #[token("...")]
    Ellipsis,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("@")]
    At,
    #[token("`")]
    Backtick,

    // ═══════════════════════════════════════════════════════════════════
    // Expression operators
    // ═══════════════════════════════════════════════════════════════════
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    NotEq,
    #[token("!==")]
    NotEqEq,
    #[token("~==")]
    TildeEqEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("!")]
    Bang,
    #[token("!~")]
    BangTilde,
    #[token("~")]
    Tilde,
    #[token("+")]
    Plus,
    #[token("++")]
    PlusPlus,
    #[token("+=")]
    PlusEq,
    #[token("-")]
    Minus,
    #[token("-=")]
    MinusEq,
    #[token("->")]
    ThinArrow,
    #[token("=>")]
    FatArrow,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("*=")]
    StarEq,
    #[token("/")]
    Slash,
    #[token("//")]
    SlashSlash,
    #[token("/=")]
    SlashEq,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,

    // ═══════════════════════════════════════════════════════════════════
    // Substitutions and sigils
    // ═══════════════════════════════════════════════════════════════════
    #[token("$")]
    Dollar,
    #[token("$(")]
    DollarParen,
    #[token("${")]
    DollarBrace,
    #[token("$[")]
    DollarBracket,
    #[token("@(")]
    AtParen,
    /// `$name`
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*")]
    SimpleVar,
    /// `$1`, `$?`, `$@`, `$#`, `$$`, `$!`, `$*`, `$-`
    #[regex(r"\$[0-9@#?$!*\-]")]
    SpecialVar,
    /// `@name`
    #[regex(r"@[A-Za-z_][A-Za-z0-9_]*")]
    Splice,

    // ═══════════════════════════════════════════════════════════════════
    // Quote openers (content is scanned separately)
    // ═══════════════════════════════════════════════════════════════════
    #[token("'")]
    SingleQuote,
    #[token("\"")]
    DoubleQuote,
    #[token("'''")]
    TripleSingleQuote,
    #[token("\"\"\"")]
    TripleDoubleQuote,
    #[token("$'")]
    DollarSingleQuote,
    #[token("$\"")]
    DollarDoubleQuote,
    #[token("r'")]
    RawQuote,
    #[token("r'''")]
    RawTripleQuote,

    // ═══════════════════════════════════════════════════════════════════
    // Words and literals
    // ═══════════════════════════════════════════════════════════════════
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9][0-9_]*")]
    Int,
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    Float,
    /// Backslash escape of one character: `\$`, `\ `, `\"`.
    #[regex(r"\\[^\r\n]")]
    Escaped,
    /// Runs of non-ASCII text (identifiers in other scripts, emoji, ...).
    #[regex(r"[^\x00-\x7F]+")]
    NonAscii,

    /// `#` glued to preceding word text; never produced by logos directly.
    Hash,
    /// One character the patterns above do not cover.
    Unknown,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Tokens that end a shell word: metacharacters and separators.
    pub fn is_word_terminator(self) -> bool {
        matches!(
            self,
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::Comment
                | TokenKind::Pipe
                | TokenKind::PipePipe
                | TokenKind::Amp
                | TokenKind::AmpAmp
                | TokenKind::Semi
                | TokenKind::SemiSemi
                | TokenKind::LParen
                | TokenKind::RParen
        ) || self.is_redirect_operator()
    }

    /// Redirection operators, excluding fd-number prefixes.
    pub fn is_redirect_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::LtLt
                | TokenKind::LtLtLt
                | TokenKind::GtGt
                | TokenKind::GtAmp
                | TokenKind::LtAmp
                | TokenKind::AmpGt
                | TokenKind::GtPipe
        )
    }

    /// Openers of quoted strings.
    pub fn is_quote_opener(self) -> bool {
        matches!(
            self,
            TokenKind::SingleQuote
                | TokenKind::DoubleQuote
                | TokenKind::TripleSingleQuote
                | TokenKind::TripleDoubleQuote
                | TokenKind::DollarSingleQuote
                | TokenKind::DollarDoubleQuote
                | TokenKind::RawQuote
                | TokenKind::RawTripleQuote
        )
    }
}

/// A token with its literal text and half-open byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
    pub range: TextRange,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<SmolStr>, range: TextRange) -> Self {
        Self {
            kind,
            text: text.into(),
            range,
        }
    }

    /// Is this an identifier with exactly this text?
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }
}
