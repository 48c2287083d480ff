//! Terminal outcome of executing an operation.

use super::{Diagnostic, ExecutionAttempt, Rank};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The terminal outcome of one `execute` call.
///
/// Every variant carries the ordered attempt log, so the diagnostics of
/// fallen-through ranks remain visible even when a later rank succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// An implementation produced a value.
    Succeeded {
        /// Identifier of this execution.
        execution_id: Uuid,
        /// The operation that was executed.
        operation: String,
        /// Rank of the implementation that succeeded.
        rank: Rank,
        /// Mechanism description of the implementation that succeeded.
        implementation: String,
        /// The produced value.
        value: serde_json::Value,
        /// Every attempt in rank order, the successful one last.
        attempts: Vec<ExecutionAttempt>,
    },
    /// Every implementation in the chain failed.
    Exhausted {
        /// Identifier of this execution.
        execution_id: Uuid,
        /// The operation that was executed.
        operation: String,
        /// Every attempt in rank order.
        attempts: Vec<ExecutionAttempt>,
    },
    /// The call was cancelled before the chain finished.
    Cancelled {
        /// Identifier of this execution.
        execution_id: Uuid,
        /// The operation that was executed.
        operation: String,
        /// The cancellation reason.
        reason: String,
        /// Attempts made before cancellation was observed.
        attempts: Vec<ExecutionAttempt>,
    },
}

impl ExecutionResult {
    /// Returns the execution identifier.
    #[must_use]
    pub fn execution_id(&self) -> Uuid {
        match self {
            Self::Succeeded { execution_id, .. }
            | Self::Exhausted { execution_id, .. }
            | Self::Cancelled { execution_id, .. } => *execution_id,
        }
    }

    /// Returns the operation name.
    #[must_use]
    pub fn operation(&self) -> &str {
        match self {
            Self::Succeeded { operation, .. }
            | Self::Exhausted { operation, .. }
            | Self::Cancelled { operation, .. } => operation,
        }
    }

    /// Returns the attempts in the order they were made.
    #[must_use]
    pub fn attempts(&self) -> &[ExecutionAttempt] {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts, .. } => attempts,
        }
    }

    /// Returns the diagnostics of all failed attempts, in attempt order.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        self.attempts()
            .iter()
            .filter_map(|a| a.diagnostic.as_ref())
            .collect()
    }

    /// Returns true if an implementation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Returns true if every implementation failed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns true if the call was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the rank that succeeded, if any.
    #[must_use]
    pub fn succeeded_rank(&self) -> Option<Rank> {
        match self {
            Self::Succeeded { rank, .. } => Some(*rank),
            _ => None,
        }
    }

    /// Returns the produced value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Succeeded { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Consumes the result, returning the produced value, if any.
    #[must_use]
    pub fn into_value(self) -> Option<serde_json::Value> {
        match self {
            Self::Succeeded { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns the summed duration of all attempts in milliseconds.
    #[must_use]
    pub fn total_duration_ms(&self) -> f64 {
        self.attempts().iter().map(|a| a.duration_ms).sum()
    }

    /// Returns a short label for the outcome.
    #[must_use]
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Exhausted { .. } => "exhausted",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Serializes the result to JSON.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttemptStatus, ErrorCategory};
    use chrono::Utc;

    fn failed(rank: Rank, message: &str) -> ExecutionAttempt {
        ExecutionAttempt::unsuccessful(
            rank,
            format!("impl-{rank}"),
            AttemptStatus::Failed,
            Utc::now(),
            1.0,
            Diagnostic::new(ErrorCategory::Network, message),
        )
    }

    #[test]
    fn test_succeeded_accessors() {
        let result = ExecutionResult::Succeeded {
            execution_id: Uuid::now_v7(),
            operation: "resolve-url".to_string(),
            rank: 1,
            implementation: "impl-1".to_string(),
            value: serde_json::json!("https://cdn.example/sandbox/26.0/w1"),
            attempts: vec![
                failed(0, "dns failure"),
                ExecutionAttempt::succeeded(1, "impl-1", Utc::now(), 2.0),
            ],
        };

        assert!(result.is_success());
        assert_eq!(result.succeeded_rank(), Some(1));
        assert_eq!(result.operation(), "resolve-url");
        assert_eq!(result.diagnostics().len(), 1);
        assert_eq!(result.diagnostics()[0].message, "dns failure");
        assert!((result.total_duration_ms() - 3.0).abs() < f64::EPSILON);
        assert_eq!(
            result.into_value(),
            Some(serde_json::json!("https://cdn.example/sandbox/26.0/w1"))
        );
    }

    #[test]
    fn test_exhausted_has_no_value() {
        let result = ExecutionResult::Exhausted {
            execution_id: Uuid::now_v7(),
            operation: "op".to_string(),
            attempts: vec![failed(0, "a"), failed(1, "b")],
        };

        assert!(result.is_exhausted());
        assert!(result.value().is_none());
        assert_eq!(result.succeeded_rank(), None);
        let messages: Vec<_> = result.diagnostics().iter().map(|d| d.message.clone()).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }

    #[test]
    fn test_json_is_tagged_by_outcome() {
        let result = ExecutionResult::Cancelled {
            execution_id: Uuid::now_v7(),
            operation: "op".to_string(),
            reason: "shutdown".to_string(),
            attempts: Vec::new(),
        };

        let json = result.to_json().unwrap();
        assert_eq!(json["outcome"], "cancelled");
        assert_eq!(json["reason"], "shutdown");

        let back: ExecutionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
