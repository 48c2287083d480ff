//! Testing utilities for fallback chains.
//!
//! This module provides:
//! - Mock, succeeding, failing and slow implementations
//! - Assertions over execution results

mod assertions;
mod mocks;

pub use assertions::{
    assert_attempted_ranks, assert_cancelled, assert_diagnostic_categories,
    assert_exhausted_with, assert_not_called, assert_succeeded_with,
};
pub use mocks::{
    FailingImplementation, MockImplementation, MockResponse, SlowImplementation,
    SuccessImplementation,
};
