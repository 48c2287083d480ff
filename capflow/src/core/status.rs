//! Attempt status and error category enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an implementation within an operation's fallback chain.
///
/// Rank 0 is the preferred implementation; higher ranks are tried in order.
pub type Rank = u32;

/// Classification of the root cause of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// DNS, connection or transport failure.
    Network,
    /// A file, resource or endpoint does not exist.
    NotFound,
    /// The host refused access.
    PermissionDenied,
    /// The mechanism is not available on this host.
    Unsupported,
    /// The arguments were rejected by the implementation.
    InvalidInput,
    /// Any other I/O failure.
    Io,
    /// Encoding or decoding failed.
    Serialization,
    /// The implementation exceeded its time budget.
    Timeout,
    /// The attempt was interrupted by cancellation.
    Cancelled,
    /// A bug or panic inside the implementation.
    Internal,
    /// Nothing more specific could be determined.
    Unknown,
}

impl Default for ErrorCategory {
    fn default() -> Self {
        Self::Unknown
    }
}

impl ErrorCategory {
    /// Returns the stable snake_case label used in reports and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::Unsupported => "unsupported",
            Self::InvalidInput => "invalid_input",
            Self::Io => "io",
            Self::Serialization => "serialization",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true when this category says nothing about the cause.
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single implementation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// The implementation returned a value.
    Succeeded,
    /// The implementation returned an error or panicked.
    Failed,
    /// The implementation did not finish within its timeout.
    TimedOut,
    /// The attempt was abandoned because the call was cancelled.
    Cancelled,
}

impl AttemptStatus {
    /// Returns true for the successful status.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
