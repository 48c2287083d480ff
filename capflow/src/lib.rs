//! # Capflow
//!
//! Ranked capability fallback execution with structured diagnostics.
//!
//! An *operation* (for example "resolve a URL") is backed by an ordered
//! chain of interchangeable *implementations*, each using a different
//! mechanism. Capflow provides:
//!
//! - **Platform gating**: refuse to run on a host that cannot host the chain
//! - **Capability registry**: ranked chains per operation, frozen before use
//! - **Fallback execution**: first success wins, every failure is recorded
//! - **Diagnostics**: classified failures with their full cause chain
//! - **Reporting**: text, key-value and JSON renderings of an outcome
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use capflow::prelude::*;
//!
//! let mut registry = CapabilityRegistry::new();
//! registry.register("resolve-url", NativeResolver::new(), 0)?;
//! registry.register("resolve-url", SystemResolver::new(), 1)?;
//! registry.register("resolve-url", BuiltinResolver::new(), 2)?;
//!
//! let executor = FallbackExecutor::new(registry.freeze());
//! let result = executor.execute("resolve-url", json!({"url": url}), None).await?;
//! println!("{}", Reporter::render(&result));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod core;
pub mod diagnostics;
pub mod errors;
pub mod events;
pub mod executor;
pub mod observability;
pub mod platform;
pub mod registry;
pub mod report;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::core::{
        AttemptStatus, Diagnostic, DiagnosticContext, ErrorCategory, ExecutionAttempt,
        ExecutionResult, Rank,
    };
    pub use crate::diagnostics::DiagnosticsCollector;
    pub use crate::errors::{
        CapflowError, ConfigError, EnvironmentMismatch, ImplementationError, RegistryError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::executor::{ExecutorConfig, FallbackExecutor};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::platform::{Platform, PlatformGate, PlatformRequirement};
    pub use crate::registry::{
        Args, CapabilityRegistry, FnImplementation, FrozenRegistry, Implementation, Output,
    };
    pub use crate::report::Reporter;
}
