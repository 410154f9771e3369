//! Diagnostics produced while parsing.
//!
//! A [`Diagnostic`] is plain data: a byte range, a severity, a stable code
//! and a message. Consumers convert ranges to line/column with a
//! [`LineIndex`](crate::base::LineIndex) when they publish.

use std::fmt;

use crate::base::TextRange;

use super::error::{GuardError, LexicalError, SyntaxError};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub range: TextRange,
    pub severity: Severity,
    /// Stable code, see [`codes`].
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(range: TextRange, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(range: TextRange, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}..{}]: {}",
            self.code,
            u32::from(self.range.start()),
            u32::from(self.range.end()),
            self.message
        )
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable diagnostic codes.
pub mod codes {
    /// Unexpected token.
    pub const SYNTAX_ERROR: &str = "E0001";
    /// Literal or heredoc not closed before end of input.
    pub const UNTERMINATED: &str = "E0002";
    /// Heredoc delimiter over the length limit.
    pub const DELIMITER_TOO_LONG: &str = "E0003";
    /// A governor tripped; the rest of the document is not parsed.
    pub const GUARD: &str = "E0004";
    /// The parser panicked and was recovered.
    pub const INTERNAL: &str = "E0005";

    /// Heredoc body read inside a statement with no command list to hold it.
    pub const DETACHED_HEREDOC: &str = "W0001";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during a parse.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn syntax(&mut self, error: SyntaxError) {
        self.add(Diagnostic::error(
            error.range,
            codes::SYNTAX_ERROR,
            error.message,
        ));
    }

    pub fn lexical(&mut self, error: &LexicalError, range: TextRange) {
        let code = match error {
            LexicalError::DelimiterTooLong { .. } => codes::DELIMITER_TOO_LONG,
            _ => codes::UNTERMINATED,
        };
        self.add(Diagnostic::error(range, code, error.to_string()));
    }

    pub fn guard(&mut self, error: GuardError, range: TextRange) {
        self.add(Diagnostic::error(range, codes::GUARD, error.to_string()));
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Consume the collector, returning diagnostics in source order.
    pub fn finish(mut self) -> Vec<Diagnostic> {
        self.diagnostics.sort_by_key(|d| d.range.start());
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TextSize;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    #[test]
    fn test_severity_to_lsp() {
        assert_eq!(Severity::Error.to_lsp(), 1);
        assert_eq!(Severity::Hint.to_lsp(), 4);
    }

    #[test]
    fn test_collector_codes() {
        let mut collector = DiagnosticCollector::new();
        collector.lexical(&LexicalError::UnterminatedString, range(0, 3));
        collector.guard(GuardError::NestingLimit { limit: 64 }, range(5, 9));

        assert!(collector.has_errors());
        let diagnostics = collector.finish();
        assert_eq!(diagnostics[0].code, codes::UNTERMINATED);
        assert_eq!(diagnostics[1].code, codes::GUARD);
    }

    #[test]
    fn test_finish_sorts_by_start() {
        let mut collector = DiagnosticCollector::new();
        collector.add(Diagnostic::warning(range(10, 11), codes::SYNTAX_ERROR, "late"));
        collector.syntax(SyntaxError::new("early", range(1, 2)));

        let diagnostics = collector.finish();
        assert_eq!(diagnostics[0].message, "early");
        assert_eq!(diagnostics[1].severity, Severity::Warning);
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::error(range(2, 4), codes::SYNTAX_ERROR, "boom");
        assert_eq!(diag.to_string(), "E0001[2..4]: boom");
    }
}
