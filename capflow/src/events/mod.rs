//! Event sink system for observability.
//!
//! The executor reports each step of a fallback chain to an `EventSink`.
//! Event types are the constants below.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// An operation passed the platform gate and its chain was resolved.
pub const OPERATION_STARTED: &str = "operation.started";
/// An implementation is about to be invoked.
pub const IMPLEMENTATION_STARTED: &str = "implementation.started";
/// An implementation failed, timed out or panicked.
pub const IMPLEMENTATION_FAILED: &str = "implementation.failed";
/// An implementation produced a value.
pub const IMPLEMENTATION_SUCCEEDED: &str = "implementation.succeeded";
/// The operation completed with a value.
pub const OPERATION_SUCCEEDED: &str = "operation.succeeded";
/// Every rank failed.
pub const OPERATION_EXHAUSTED: &str = "operation.exhausted";
/// The call was cancelled.
pub const OPERATION_CANCELLED: &str = "operation.cancelled";
