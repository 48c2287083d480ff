//! Record of one implementation attempt.

use super::{AttemptStatus, Diagnostic, Rank};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which implementation was tried, how it went and how long it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionAttempt {
    /// Rank of the implementation.
    pub rank: Rank,
    /// Mechanism description of the implementation.
    pub implementation: String,
    /// Outcome of the attempt.
    pub status: AttemptStatus,
    /// When the attempt started.
    pub started_at: DateTime<Utc>,
    /// Elapsed wall time in milliseconds.
    pub duration_ms: f64,
    /// Failure details, present for every non-successful attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

impl ExecutionAttempt {
    /// Creates a successful attempt record.
    #[must_use]
    pub fn succeeded(
        rank: Rank,
        implementation: impl Into<String>,
        started_at: DateTime<Utc>,
        duration_ms: f64,
    ) -> Self {
        Self {
            rank,
            implementation: implementation.into(),
            status: AttemptStatus::Succeeded,
            started_at,
            duration_ms,
            diagnostic: None,
        }
    }

    /// Creates a non-successful attempt record.
    #[must_use]
    pub fn unsuccessful(
        rank: Rank,
        implementation: impl Into<String>,
        status: AttemptStatus,
        started_at: DateTime<Utc>,
        duration_ms: f64,
        diagnostic: Diagnostic,
    ) -> Self {
        Self {
            rank,
            implementation: implementation.into(),
            status,
            started_at,
            duration_ms,
            diagnostic: Some(diagnostic),
        }
    }

    /// Returns the elapsed time as a `Duration`.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_ms.max(0.0) / 1000.0)
    }

    /// Returns true if this attempt produced the value.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
