//! Error taxonomy for the syntax layer.
//!
//! None of these escape [`parse`](crate::syntax::parse): lexical and syntax
//! errors become diagnostics next to a best-effort tree, and a guard error
//! aborts the current construct and is reported once.

use thiserror::Error;

use crate::base::TextRange;

/// A literal the scanner could not close.
///
/// The scanner still returns whatever it accumulated; this value rides along
/// on the scanned token so the parser can decide how to report it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LexicalError {
    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated multiline string literal")]
    UnterminatedMultilineString,

    #[error("unterminated heredoc: missing terminator `{delimiter}`")]
    UnterminatedHeredoc { delimiter: String },

    #[error("unterminated regex literal")]
    UnterminatedRegex,

    #[error("heredoc delimiter is {len} bytes long, the maximum is {max}")]
    DelimiterTooLong { len: usize, max: usize },
}

/// An unexpected token, recovered by force-advancing past it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }

    pub fn unexpected(found: &str, expected: &str, range: TextRange) -> Self {
        Self::new(format!("unexpected `{found}`, expected {expected}"), range)
    }
}

/// A parser governor tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GuardError {
    #[error("token limit of {limit} exceeded")]
    TokenLimit { limit: usize },

    #[error("iteration limit of {limit} exceeded")]
    IterationLimit { limit: usize },

    #[error("nesting depth limit of {limit} exceeded")]
    NestingLimit { limit: usize },

    #[error("operator chain limit of {limit} exceeded")]
    ChainLimit { limit: usize },
}

impl GuardError {
    /// Limits that bound one construct rather than the whole document.
    /// Parsing resumes at the next line after one of these trips.
    pub fn is_local(self) -> bool {
        matches!(self, Self::NestingLimit { .. } | Self::ChainLimit { .. })
    }
}
