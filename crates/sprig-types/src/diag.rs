use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of diagnostics stored before new ones are dropped.
///
/// Counting continues past the cap so hosts can still report the true
/// total.
pub const MAX_DIAGNOSTICS: usize = 20;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single compile-stage diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Source location.
    pub span: Span,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", self.span, tag, self.message)
    }
}

/// Ordered diagnostic accumulator shared by the lexer, parser, and
/// checker.
///
/// Stages push into the trace and keep going; callers inspect
/// [`Trace::has_errors`] once the pipeline finishes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    pub diagnostics: Vec<Diagnostic>,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl Trace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any errors were recorded.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, respecting the MAX_DIAGNOSTICS limit.
    pub fn push_error(&mut self, message: impl Into<String>, span: Span) {
        if self.diagnostics.len() < MAX_DIAGNOSTICS {
            self.diagnostics.push(Diagnostic::error(message, span));
        }
        self.total_errors += 1;
    }

    /// Add a warning, respecting the MAX_DIAGNOSTICS limit.
    pub fn push_warning(&mut self, message: impl Into<String>, span: Span) {
        if self.diagnostics.len() < MAX_DIAGNOSTICS {
            self.diagnostics.push(Diagnostic::warning(message, span));
        }
        self.total_warnings += 1;
    }

    /// Append another stage's trace, keeping the storage cap and the
    /// true totals.
    pub fn merge(&mut self, other: Trace) {
        for diagnostic in other.diagnostics {
            if self.diagnostics.len() < MAX_DIAGNOSTICS {
                self.diagnostics.push(diagnostic);
            }
        }
        self.total_errors += other.total_errors;
        self.total_warnings += other.total_warnings;
    }
}
