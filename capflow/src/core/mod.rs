//! Core domain model types for capflow.
//!
//! This module contains the records produced by an execution:
//! - Ranks, error categories and attempt statuses
//! - Diagnostics with their cause chains
//! - Attempt records and the terminal execution result

mod attempt;
mod diagnostic;
mod result;
mod status;

pub use attempt::ExecutionAttempt;
pub use diagnostic::{Causes, Diagnostic, DiagnosticContext};
pub use result::ExecutionResult;
pub use status::{AttemptStatus, ErrorCategory, Rank};
