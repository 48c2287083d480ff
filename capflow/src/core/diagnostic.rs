//! Structured failure records.

use super::{ErrorCategory, Rank};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a failure originated: which implementation of which operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    /// The operation being executed.
    pub operation: String,
    /// Rank of the implementation that failed.
    pub rank: Rank,
    /// Mechanism description of the implementation that failed.
    pub implementation: String,
}

impl DiagnosticContext {
    /// Creates a new diagnostic context.
    #[must_use]
    pub fn new(operation: impl Into<String>, rank: Rank, implementation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            rank,
            implementation: implementation.into(),
        }
    }
}

impl fmt::Display for DiagnosticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [rank {}: {}]",
            self.operation, self.rank, self.implementation
        )
    }
}

/// Why an implementation attempt failed.
///
/// Causes are owned by value, so a chain is always finite and acyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Root-cause classification.
    pub category: ErrorCategory,
    /// Human-readable message.
    pub message: String,
    /// Originating call. Only the outermost diagnostic of a chain carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<DiagnosticContext>,
    /// The error that caused this one, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<Diagnostic>>,
}

impl Diagnostic {
    /// Creates a diagnostic without context or cause.
    #[must_use]
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            context: None,
            cause: None,
        }
    }

    /// Attaches the originating context.
    #[must_use]
    pub fn with_context(mut self, context: DiagnosticContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Attaches a cause.
    #[must_use]
    pub fn with_cause(mut self, cause: Diagnostic) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Iterates over the nested causes, outermost first, excluding `self`.
    pub fn causes(&self) -> Causes<'_> {
        Causes {
            next: self.cause.as_deref(),
        }
    }

    /// Returns the number of nested causes.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.causes().count()
    }

    /// Returns the innermost diagnostic of the chain (`self` if there is no cause).
    #[must_use]
    pub fn root_cause(&self) -> &Diagnostic {
        self.causes().last().unwrap_or(self)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)?;
        for cause in self.causes() {
            write!(f, " (caused by {}: {})", cause.category, cause.message)?;
        }
        Ok(())
    }
}

/// Iterator over a diagnostic's cause chain.
#[derive(Debug, Clone)]
pub struct Causes<'a> {
    next: Option<&'a Diagnostic>,
}

impl<'a> Iterator for Causes<'a> {
    type Item = &'a Diagnostic;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause.as_deref();
        Some(current)
    }
}
