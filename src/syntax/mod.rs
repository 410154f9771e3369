//! Lexing, scanning and parsing of YSH scripts.
//!
//! - [`lexer`] - context-free tokens (logos)
//! - [`scanner`] - context-sensitive spans: heredocs, string bodies, eggex
//! - [`parser`] - recursive descent over both, producing an [`ast::Node`]
//!   tree and [`Diagnostic`]s
//!
//! Parsing never fails: malformed input yields a partial tree plus
//! diagnostics.

pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod scanner;
pub mod token;

pub use diagnostics::{Diagnostic, Severity};
pub use error::{GuardError, LexicalError, SyntaxError};
pub use parser::{Parse, ParseOptions, parse, parse_with_options};
pub use scanner::{MAX_DELIMITER_LEN, Scanner};
pub use token::{Token, TokenKind};
