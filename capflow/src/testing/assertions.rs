//! Test assertions for execution results.

use super::MockImplementation;
use crate::core::{ErrorCategory, ExecutionResult, Rank};

/// Asserts that `rank` succeeded with `value`.
pub fn assert_succeeded_with(result: &ExecutionResult, rank: Rank, value: &serde_json::Value) {
    match result {
        ExecutionResult::Succeeded {
            rank: actual_rank,
            value: actual_value,
            ..
        } => {
            assert_eq!(*actual_rank, rank, "Expected rank {rank} to succeed, got {actual_rank}");
            assert_eq!(actual_value, value, "Unexpected value from rank {rank}");
        }
        other => panic!("Expected success, got {}: {other:?}", other.outcome_label()),
    }
}

/// Asserts that the chain was exhausted with exactly `count` diagnostics.
pub fn assert_exhausted_with(result: &ExecutionResult, count: usize) {
    assert!(
        result.is_exhausted(),
        "Expected exhausted, got {}",
        result.outcome_label()
    );
    assert_eq!(
        result.diagnostics().len(),
        count,
        "Expected {count} diagnostics, got {:?}",
        result.diagnostics()
    );
}

/// Asserts that the call was cancelled.
pub fn assert_cancelled(result: &ExecutionResult) {
    assert!(
        result.is_cancelled(),
        "Expected cancelled, got {}",
        result.outcome_label()
    );
}

/// Asserts the ranks attempted, in order.
pub fn assert_attempted_ranks(result: &ExecutionResult, ranks: &[Rank]) {
    let actual: Vec<Rank> = result.attempts().iter().map(|a| a.rank).collect();
    assert_eq!(actual, ranks, "Unexpected attempt order");
}

/// Asserts the diagnostic categories, in attempt order.
pub fn assert_diagnostic_categories(result: &ExecutionResult, categories: &[ErrorCategory]) {
    let actual: Vec<ErrorCategory> = result.diagnostics().iter().map(|d| d.category).collect();
    assert_eq!(actual, categories, "Unexpected diagnostic categories");
}

/// Asserts that a mock was never invoked.
pub fn assert_not_called(mock: &MockImplementation) {
    assert_eq!(
        mock.call_count(),
        0,
        "Expected no calls, got {}",
        mock.call_count()
    );
}
