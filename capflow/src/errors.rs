//! Error types for the capflow framework.
//!
//! Configuration and platform errors are fatal and propagate to the caller.
//! `ImplementationError` is the recoverable kind: the executor converts it
//! into a diagnostic and moves on to the next rank.

use crate::core::{ErrorCategory, Rank};
use crate::platform::{Platform, PlatformRequirement};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The main error type for capflow operations.
#[derive(Debug, Error)]
pub enum CapflowError {
    /// The host does not satisfy the declared platform.
    #[error("{0}")]
    Environment(#[from] EnvironmentMismatch),

    /// The registry rejected a registration or lookup.
    #[error("{0}")]
    Registry(#[from] RegistryError),

    /// The executor configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl CapflowError {
    /// Returns the structured error info for this error.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        match self {
            Self::Environment(err) => err.error_info(),
            Self::Registry(err) => err.error_info(),
            Self::Config(err) => err.error_info(),
        }
    }
}

/// Metadata about a fatal error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "REGISTRY-002-DUPLICATE_RANK").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("summary".to_string(), serde_json::json!(self.summary));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        if !self.context.is_empty() {
            map.insert("context".to_string(), serde_json::json!(self.context));
        }
        map
    }
}

/// Raised by the platform gate when the host does not satisfy the target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Environment mismatch: running on {current}, requires {required}")]
pub struct EnvironmentMismatch {
    /// The detected host platform.
    pub current: Platform,
    /// The declared requirement.
    pub required: PlatformRequirement,
}

impl EnvironmentMismatch {
    /// Creates a new environment mismatch error.
    #[must_use]
    pub fn new(current: Platform, required: PlatformRequirement) -> Self {
        Self { current, required }
    }

    /// Returns the structured error info.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        ErrorInfo::new("PLATFORM-001-MISMATCH", self.to_string())
            .with_fix_hint("Run on a host matching the declared platform, or relax the requirement.")
            .with_context_entry("current", self.current.to_string())
            .with_context_entry("required", self.required.to_string())
    }
}

/// Errors raised by the capability registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No implementation was ever registered under this name.
    #[error("Unknown operation: {operation}")]
    UnknownOperation {
        /// The operation name.
        operation: String,
    },

    /// The rank is already taken for this operation.
    #[error("Duplicate rank {rank} for operation '{operation}' (already held by '{existing}')")]
    DuplicateRank {
        /// The operation name.
        operation: String,
        /// The contested rank.
        rank: Rank,
        /// Description of the implementation already holding the rank.
        existing: String,
    },

    /// The operation name is empty or blank.
    #[error("Invalid operation name: '{operation}'")]
    InvalidOperationName {
        /// The rejected name.
        operation: String,
    },
}

impl RegistryError {
    /// Creates an unknown operation error.
    #[must_use]
    pub fn unknown_operation(operation: impl Into<String>) -> Self {
        Self::UnknownOperation {
            operation: operation.into(),
        }
    }

    /// Creates a duplicate rank error.
    #[must_use]
    pub fn duplicate_rank(operation: impl Into<String>, rank: Rank, existing: impl Into<String>) -> Self {
        Self::DuplicateRank {
            operation: operation.into(),
            rank,
            existing: existing.into(),
        }
    }

    /// Returns the structured error info.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        match self {
            Self::UnknownOperation { operation } => {
                ErrorInfo::new("REGISTRY-001-UNKNOWN_OPERATION", self.to_string())
                    .with_fix_hint("Register at least one implementation before executing the operation.")
                    .with_context_entry("operation", operation)
            }
            Self::DuplicateRank { operation, rank, existing } => {
                ErrorInfo::new("REGISTRY-002-DUPLICATE_RANK", self.to_string())
                    .with_fix_hint("Give each implementation of an operation a distinct rank.")
                    .with_context_entry("operation", operation)
                    .with_context_entry("rank", rank.to_string())
                    .with_context_entry("existing", existing)
            }
            Self::InvalidOperationName { operation } => {
                ErrorInfo::new("REGISTRY-003-INVALID_NAME", self.to_string())
                    .with_fix_hint("Use a non-empty, stable key such as 'resolve-artifact-url'.")
                    .with_context_entry("operation", operation)
            }
        }
    }
}

/// Errors raised while loading or validating executor configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("Invalid configuration document: {0}")]
    Parse(String),

    /// A field holds an unusable value.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// The offending field.
        field: String,
        /// Why the value is rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the structured error info.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        match self {
            Self::Parse(_) => ErrorInfo::new("CONFIG-001-PARSE", self.to_string()),
            Self::InvalidValue { field, .. } => {
                ErrorInfo::new("CONFIG-002-INVALID_VALUE", self.to_string())
                    .with_context_entry("field", field)
            }
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// A failure reported by an implementation.
///
/// Recoverable: the executor records it as a diagnostic and falls back to
/// the next rank. Any `anyhow::Error` converts into it with its cause chain
/// intact.
pub struct ImplementationError {
    category: ErrorCategory,
    message: String,
    source: Option<anyhow::Error>,
    /// `source` is this error's own outermost layer, not a cause of it.
    absorbed: bool,
}

impl ImplementationError {
    /// Creates an error with an explicit category.
    #[must_use]
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            source: None,
            absorbed: false,
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, message)
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    /// Creates an error for a mechanism unavailable on this host.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unsupported, message)
    }

    /// Creates an argument validation error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InvalidInput, message)
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, message)
    }

    /// Creates the error recorded when an attempt exceeds its timeout.
    #[must_use]
    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            ErrorCategory::Timeout,
            format!("implementation did not finish within {}ms", limit.as_millis()),
        )
    }

    /// Creates the error recorded when an attempt is abandoned on cancellation.
    #[must_use]
    pub fn cancelled(reason: impl fmt::Display) -> Self {
        Self::new(ErrorCategory::Cancelled, format!("cancelled: {reason}"))
    }

    /// Attaches an underlying cause.
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(anyhow::Error::new(source));
        self.absorbed = false;
        self
    }

    /// Returns the category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("category".to_string(), serde_json::json!(self.category));
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(ref source) = self.source {
            map.insert("source".to_string(), serde_json::json!(source.to_string()));
        }
        map
    }
}

impl fmt::Debug for ImplementationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplementationError")
            .field("category", &self.category)
            .field("message", &self.message)
            .field("source", &self.source.as_ref().map(ToString::to_string))
            .finish()
    }
}

impl fmt::Display for ImplementationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ImplementationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let inner: &(dyn std::error::Error + 'static) = self.source.as_deref()?;
        if self.absorbed {
            inner.source()
        } else {
            Some(inner)
        }
    }
}

impl From<anyhow::Error> for ImplementationError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<Self>() {
            Ok(inner) => return inner,
            Err(err) => err,
        };
        let category = crate::diagnostics::classify_chain(err.chain());
        Self {
            category,
            message: err.to_string(),
            source: Some(err),
            absorbed: true,
        }
    }
}

impl From<std::io::Error> for ImplementationError {
    fn from(err: std::io::Error) -> Self {
        let category = crate::diagnostics::classify(&err);
        Self::new(category, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for ImplementationError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorCategory::Serialization, err.to_string()).with_source(err)
    }
}
