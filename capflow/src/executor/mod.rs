//! Fallback executor.
//!
//! Runs an operation's chain in ascending rank order and stops at the first
//! implementation that produces a value. Every failed rank leaves a
//! diagnostic in the attempt log.

mod config;

pub use config::ExecutorConfig;

use crate::cancellation::CancellationToken;
use crate::core::{AttemptStatus, DiagnosticContext, ExecutionAttempt, ExecutionResult};
use crate::diagnostics::DiagnosticsCollector;
use crate::errors::{CapflowError, ConfigError, ImplementationError};
use crate::events::{self, EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::platform::PlatformGate;
use crate::registry::{Args, FrozenRegistry, Output, RankedImplementation};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// Raw outcome of one implementation invocation.
enum Invocation {
    Value(Output),
    Failed(AttemptStatus, ImplementationError),
    Panicked(Box<dyn Any + Send>),
}

/// Executes operations against a frozen registry.
///
/// The executor holds no per-call state; one instance may serve any number
/// of concurrent `execute` calls.
pub struct FallbackExecutor {
    registry: FrozenRegistry,
    gate: PlatformGate,
    config: ExecutorConfig,
    event_sink: Arc<dyn EventSink>,
}

impl FallbackExecutor {
    /// Creates an executor with default configuration and no event sink.
    #[must_use]
    pub fn new(registry: FrozenRegistry) -> Self {
        Self {
            registry,
            gate: PlatformGate::detect(),
            config: ExecutorConfig::default(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Replaces the configuration after validating it.
    pub fn with_config(mut self, config: ExecutorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Replaces the platform gate.
    #[must_use]
    pub fn with_gate(mut self, gate: PlatformGate) -> Self {
        self.gate = gate;
        self
    }

    /// Sets the sink that receives execution events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &FrozenRegistry {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Executes `operation` with `args`.
    ///
    /// `timeout` bounds each implementation separately; `None` uses the
    /// configured default. Failures of individual implementations are part
    /// of the returned `ExecutionResult`. `Err` is reserved for an
    /// environment mismatch or an unknown operation, in which case no
    /// implementation was invoked.
    pub async fn execute(
        &self,
        operation: &str,
        args: Args,
        timeout: Option<Duration>,
    ) -> Result<ExecutionResult, CapflowError> {
        let token = CancellationToken::new();
        self.execute_with_cancellation(operation, args, timeout, &token)
            .await
    }

    /// Executes `operation`, stopping early if `token` is cancelled.
    ///
    /// The token is checked before each rank and raced against the
    /// in-flight implementation. Cancellation yields
    /// `ExecutionResult::Cancelled` carrying the attempts made so far.
    /// An implementation that has already finished when the token fires
    /// keeps its result; only a pending attempt is abandoned.
    pub async fn execute_with_cancellation(
        &self,
        operation: &str,
        args: Args,
        timeout: Option<Duration>,
        token: &CancellationToken,
    ) -> Result<ExecutionResult, CapflowError> {
        if let Some(required) = &self.config.required_platform {
            self.gate.check_environment(required)?;
        }

        let chain = self.registry.resolve(operation)?;
        let execution_id = Uuid::now_v7();
        let timeout = timeout.unwrap_or_else(|| self.config.default_timeout());

        let span = tracing::info_span!(
            "execute",
            execution_id = %execution_id,
            operation = %operation,
        );

        Ok(self
            .run_chain(execution_id, operation, chain, &args, timeout, token)
            .instrument(span)
            .await)
    }

    async fn run_chain(
        &self,
        execution_id: Uuid,
        operation: &str,
        chain: &[RankedImplementation],
        args: &Args,
        timeout: Duration,
        token: &CancellationToken,
    ) -> ExecutionResult {
        self.emit(
            events::OPERATION_STARTED,
            serde_json::json!({
                "execution_id": execution_id.to_string(),
                "operation": operation,
                "implementations": chain.len(),
                "timeout_ms": duration_ms(timeout),
            }),
        );

        let mut attempts = Vec::with_capacity(chain.len());

        for entry in chain {
            if token.is_cancelled() {
                return self.cancelled(execution_id, operation, token, attempts);
            }

            let implementation = entry.description();
            debug!(rank = entry.rank, implementation, "Invoking implementation");
            self.emit(
                events::IMPLEMENTATION_STARTED,
                serde_json::json!({
                    "execution_id": execution_id.to_string(),
                    "operation": operation,
                    "rank": entry.rank,
                    "implementation": implementation,
                }),
            );

            let started_at = Utc::now();
            let timer = SpanTimer::start(format!("{operation}#{}", entry.rank));
            let invocation = invoke(entry, args, timeout, token).await;
            let elapsed_ms = timer.finish();

            let context = DiagnosticContext::new(operation, entry.rank, implementation);
            let (status, diagnostic) = match invocation {
                Invocation::Value(value) => {
                    attempts.push(ExecutionAttempt::succeeded(
                        entry.rank,
                        implementation,
                        started_at,
                        elapsed_ms,
                    ));
                    return self.succeeded(execution_id, operation, entry, value, attempts);
                }
                Invocation::Failed(status, err) => {
                    (status, DiagnosticsCollector::from_error(&err, context))
                }
                Invocation::Panicked(payload) => (
                    AttemptStatus::Failed,
                    DiagnosticsCollector::from_panic(payload.as_ref(), context),
                ),
            };

            warn!(
                rank = entry.rank,
                implementation,
                status = %status,
                category = %diagnostic.category,
                duration_ms = elapsed_ms,
                "Implementation failed: {}",
                diagnostic.message
            );
            self.emit(
                events::IMPLEMENTATION_FAILED,
                serde_json::json!({
                    "execution_id": execution_id.to_string(),
                    "operation": operation,
                    "rank": entry.rank,
                    "implementation": implementation,
                    "status": status.to_string(),
                    "category": diagnostic.category.as_str(),
                    "message": diagnostic.message,
                    "duration_ms": elapsed_ms,
                }),
            );

            attempts.push(ExecutionAttempt::unsuccessful(
                entry.rank,
                implementation,
                status,
                started_at,
                elapsed_ms,
                diagnostic,
            ));

            if status == AttemptStatus::Cancelled {
                return self.cancelled(execution_id, operation, token, attempts);
            }
        }

        error!(
            attempts = attempts.len(),
            "All implementations of '{}' failed",
            operation
        );
        self.emit(
            events::OPERATION_EXHAUSTED,
            serde_json::json!({
                "execution_id": execution_id.to_string(),
                "operation": operation,
                "attempts": attempts.len(),
            }),
        );

        ExecutionResult::Exhausted {
            execution_id,
            operation: operation.to_string(),
            attempts,
        }
    }

    fn succeeded(
        &self,
        execution_id: Uuid,
        operation: &str,
        entry: &RankedImplementation,
        value: Output,
        attempts: Vec<ExecutionAttempt>,
    ) -> ExecutionResult {
        let implementation = entry.description();
        let fallbacks = attempts.len() - 1;
        if fallbacks > 0 {
            info!(
                rank = entry.rank,
                implementation,
                fallbacks,
                "Operation succeeded after fallback"
            );
        } else {
            debug!(rank = entry.rank, implementation, "Operation succeeded");
        }

        self.emit(
            events::IMPLEMENTATION_SUCCEEDED,
            serde_json::json!({
                "execution_id": execution_id.to_string(),
                "operation": operation,
                "rank": entry.rank,
                "implementation": implementation,
            }),
        );
        self.emit(
            events::OPERATION_SUCCEEDED,
            serde_json::json!({
                "execution_id": execution_id.to_string(),
                "operation": operation,
                "rank": entry.rank,
                "fallbacks": fallbacks,
            }),
        );

        ExecutionResult::Succeeded {
            execution_id,
            operation: operation.to_string(),
            rank: entry.rank,
            implementation: implementation.to_string(),
            value,
            attempts,
        }
    }

    fn cancelled(
        &self,
        execution_id: Uuid,
        operation: &str,
        token: &CancellationToken,
        attempts: Vec<ExecutionAttempt>,
    ) -> ExecutionResult {
        let reason = token.reason().unwrap_or_else(|| "cancelled".to_string());
        warn!(reason = %reason, attempts = attempts.len(), "Operation cancelled");
        self.emit(
            events::OPERATION_CANCELLED,
            serde_json::json!({
                "execution_id": execution_id.to_string(),
                "operation": operation,
                "reason": reason,
                "attempts": attempts.len(),
            }),
        );

        ExecutionResult::Cancelled {
            execution_id,
            operation: operation.to_string(),
            reason,
            attempts,
        }
    }

    fn emit(&self, event_type: &str, data: serde_json::Value) {
        if self.config.emit_events {
            self.event_sink.try_emit(event_type, Some(data));
        }
    }
}

/// Runs one implementation under the timeout, racing the cancellation token.
///
/// The implementation is polled first, so an attempt that completes in the
/// same poll as the cancellation keeps its outcome.
async fn invoke(
    entry: &RankedImplementation,
    args: &Args,
    timeout: Duration,
    token: &CancellationToken,
) -> Invocation {
    let call = AssertUnwindSafe(entry.implementation.invoke(args)).catch_unwind();

    tokio::select! {
        biased;
        outcome = tokio::time::timeout(timeout, call) => match outcome {
            Ok(Ok(Ok(value))) => Invocation::Value(value),
            Ok(Ok(Err(err))) => Invocation::Failed(AttemptStatus::Failed, err),
            Ok(Err(payload)) => Invocation::Panicked(payload),
            Err(_) => Invocation::Failed(AttemptStatus::TimedOut, ImplementationError::timeout(timeout)),
        },
        () = token.cancelled() => {
            let reason = token.reason().unwrap_or_else(|| "cancelled".to_string());
            Invocation::Failed(AttemptStatus::Cancelled, ImplementationError::cancelled(reason))
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl fmt::Debug for FallbackExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackExecutor")
            .field("registry", &self.registry)
            .field("gate", &self.gate)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorCategory;
    use crate::events::CollectingEventSink;
    use crate::platform::{Platform, PlatformRequirement};
    use crate::registry::CapabilityRegistry;
    use crate::testing::{
        assert_attempted_ranks, assert_cancelled, assert_diagnostic_categories,
        assert_exhausted_with, assert_not_called, assert_succeeded_with, FailingImplementation,
        MockImplementation, SlowImplementation,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn executor_for(registry: CapabilityRegistry) -> FallbackExecutor {
        FallbackExecutor::new(registry.freeze())
    }

    #[tokio::test]
    async fn test_first_rank_success_skips_the_rest() {
        let first = Arc::new(MockImplementation::succeeding("primary", json!("a")));
        let second = Arc::new(MockImplementation::succeeding("secondary", json!("b")));

        let mut registry = CapabilityRegistry::new();
        registry.register_arc("op", first.clone(), 0).unwrap();
        registry.register_arc("op", second.clone(), 1).unwrap();

        let result = executor_for(registry)
            .execute("op", json!({}), None)
            .await
            .unwrap();

        assert_succeeded_with(&result, 0, &json!("a"));
        assert!(result.diagnostics().is_empty());
        assert_eq!(first.call_count(), 1);
        assert_not_called(&second);
    }

    #[tokio::test]
    async fn test_falls_through_to_rank_k() {
        let mocks: Vec<Arc<MockImplementation>> = vec![
            Arc::new(MockImplementation::failing("r0", ErrorCategory::Network, "down")),
            Arc::new(MockImplementation::failing("r1", ErrorCategory::NotFound, "missing")),
            Arc::new(MockImplementation::succeeding("r2", json!(2))),
            Arc::new(MockImplementation::succeeding("r3", json!(3))),
        ];

        let mut registry = CapabilityRegistry::new();
        for (rank, mock) in (0..).zip(&mocks) {
            registry.register_arc("op", mock.clone(), rank).unwrap();
        }

        let result = executor_for(registry)
            .execute("op", json!({"k": "v"}), None)
            .await
            .unwrap();

        assert_succeeded_with(&result, 2, &json!(2));
        assert_attempted_ranks(&result, &[0, 1, 2]);
        assert_diagnostic_categories(&result, &[ErrorCategory::Network, ErrorCategory::NotFound]);
        assert_eq!(mocks[0].call_count(), 1);
        assert_eq!(mocks[1].call_count(), 1);
        assert_eq!(mocks[2].call_count(), 1);
        assert_not_called(&mocks[3]);
        assert_eq!(mocks[2].recorded_args(), vec![json!({"k": "v"})]);
    }

    #[tokio::test]
    async fn test_exhaustion_keeps_every_diagnostic_in_order() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register("op", FailingImplementation::new("a", ErrorCategory::Io, "first"), 0)
            .unwrap();
        registry
            .register("op", FailingImplementation::unsupported("b"), 5)
            .unwrap();
        registry
            .register("op", FailingImplementation::new("c", ErrorCategory::PermissionDenied, "third"), 9)
            .unwrap();

        let result = executor_for(registry)
            .execute("op", json!(null), None)
            .await
            .unwrap();

        assert_exhausted_with(&result, 3);
        assert_attempted_ranks(&result, &[0, 5, 9]);
        let contexts: Vec<_> = result
            .diagnostics()
            .iter()
            .map(|d| d.context.clone().unwrap())
            .collect();
        assert_eq!(contexts[0], DiagnosticContext::new("op", 0, "a"));
        assert_eq!(contexts[1], DiagnosticContext::new("op", 5, "b"));
        assert_eq!(contexts[2], DiagnosticContext::new("op", 9, "c"));
    }

    #[tokio::test]
    async fn test_unknown_operation_is_an_error() {
        let executor = executor_for(CapabilityRegistry::new());
        let err = executor.execute("missing", json!({}), None).await.unwrap_err();
        assert!(matches!(err, CapflowError::Registry(_)));
    }

    #[tokio::test]
    async fn test_environment_mismatch_invokes_nothing() {
        let mock = Arc::new(MockImplementation::succeeding("any", json!(1)));
        let mut registry = CapabilityRegistry::new();
        registry.register_arc("op", mock.clone(), 0).unwrap();

        let executor = executor_for(registry)
            .with_gate(PlatformGate::for_platform(Platform::new("linux", "unix", "x86_64")))
            .with_config(
                ExecutorConfig::new().with_required_platform(PlatformRequirement::family("windows")),
            )
            .unwrap();

        let err = executor.execute("op", json!({}), None).await.unwrap_err();
        assert!(matches!(err, CapflowError::Environment(_)));
        assert_not_called(&mock);
    }

    #[tokio::test]
    async fn test_environment_match_runs_chain() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register("op", MockImplementation::succeeding("any", json!(1)), 0)
            .unwrap();

        let executor = executor_for(registry)
            .with_gate(PlatformGate::for_platform(Platform::new("macos", "unix", "aarch64")))
            .with_config(
                ExecutorConfig::new().with_required_platform(PlatformRequirement::family("unix")),
            )
            .unwrap();

        let result = executor.execute("op", json!({}), None).await.unwrap();
        assert_succeeded_with(&result, 0, &json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_through() {
        let mut registry = CapabilityRegistry::new();
        registry.register("op", SlowImplementation::hanging("hangs"), 0).unwrap();
        registry
            .register("op", MockImplementation::succeeding("fast", json!("ok")), 1)
            .unwrap();

        let result = executor_for(registry)
            .execute("op", json!({}), Some(Duration::from_millis(50)))
            .await
            .unwrap();

        assert_succeeded_with(&result, 1, &json!("ok"));
        let attempt = &result.attempts()[0];
        assert_eq!(attempt.status, AttemptStatus::TimedOut);
        let diagnostic = attempt.diagnostic.as_ref().unwrap();
        assert_eq!(diagnostic.category, ErrorCategory::Timeout);
        assert_eq!(diagnostic.message, "implementation did not finish within 50ms");
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_diagnostic() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register("op", MockImplementation::panicking("broken", "boom"), 0)
            .unwrap();
        registry
            .register("op", MockImplementation::succeeding("fine", json!(true)), 1)
            .unwrap();

        let result = executor_for(registry)
            .execute("op", json!({}), None)
            .await
            .unwrap();

        assert_succeeded_with(&result, 1, &json!(true));
        let diagnostic = result.diagnostics()[0];
        assert_eq!(diagnostic.category, ErrorCategory::Internal);
        assert_eq!(diagnostic.message, "implementation panicked: boom");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mock = Arc::new(MockImplementation::succeeding("never", json!(1)));
        let mut registry = CapabilityRegistry::new();
        registry.register_arc("op", mock.clone(), 0).unwrap();

        let token = CancellationToken::new();
        token.cancel("shutting down");

        let result = executor_for(registry)
            .execute_with_cancellation("op", json!({}), None, &token)
            .await
            .unwrap();

        assert_cancelled(&result);
        assert!(result.attempts().is_empty());
        assert_not_called(&mock);
        assert!(matches!(
            result,
            ExecutionResult::Cancelled { ref reason, .. } if reason == "shutting down"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_attempt_stops_chain() {
        let later = Arc::new(MockImplementation::succeeding("later", json!(1)));
        let mut registry = CapabilityRegistry::new();
        registry.register("op", SlowImplementation::hanging("slow"), 0).unwrap();
        registry.register_arc("op", later.clone(), 1).unwrap();

        let executor = executor_for(registry);
        let token = Arc::new(CancellationToken::new());
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                token.cancel("user abort");
            })
        };

        let result = executor
            .execute_with_cancellation("op", json!({}), Some(Duration::from_secs(60)), &token)
            .await
            .unwrap();
        canceller.await.unwrap();

        assert_cancelled(&result);
        assert_attempted_ranks(&result, &[0]);
        assert_eq!(result.attempts()[0].status, AttemptStatus::Cancelled);
        assert_diagnostic_categories(&result, &[ErrorCategory::Cancelled]);
        assert_not_called(&later);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_attempt_outlives_late_cancel() {
        let token = Arc::new(CancellationToken::new());
        let release = Arc::new(tokio::sync::Notify::new());
        let later = Arc::new(MockImplementation::succeeding("later", json!(1)));

        let mut registry = CapabilityRegistry::new();
        let gate = release.clone();
        registry
            .register_fn("op", 0, "waits for commit", move |_| {
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    Ok::<_, ImplementationError>(json!("committed"))
                }
            })
            .unwrap();
        registry.register_arc("op", later.clone(), 1).unwrap();

        // cancel and completion become visible to the same poll
        let trigger = {
            let token = token.clone();
            let release = release.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                token.cancel("late cancel");
                release.notify_one();
            })
        };

        let result = executor_for(registry)
            .execute_with_cancellation("op", json!({}), None, &token)
            .await
            .unwrap();
        trigger.await.unwrap();

        assert_succeeded_with(&result, 0, &json!("committed"));
        assert!(result.diagnostics().is_empty());
        assert_not_called(&later);
    }

    #[tokio::test]
    async fn test_events_follow_the_chain() {
        let sink = Arc::new(CollectingEventSink::new());
        let mut registry = CapabilityRegistry::new();
        registry
            .register("op", FailingImplementation::unsupported("missing tool"), 0)
            .unwrap();
        registry
            .register("op", MockImplementation::succeeding("builtin", json!(1)), 1)
            .unwrap();

        let executor = executor_for(registry).with_event_sink(sink.clone());
        executor.execute("op", json!({}), None).await.unwrap();

        assert_eq!(
            sink.event_types(),
            vec![
                events::OPERATION_STARTED,
                events::IMPLEMENTATION_STARTED,
                events::IMPLEMENTATION_FAILED,
                events::IMPLEMENTATION_STARTED,
                events::IMPLEMENTATION_SUCCEEDED,
                events::OPERATION_SUCCEEDED,
            ]
        );
        let failed = &sink.events_of_type(events::IMPLEMENTATION_FAILED)[0];
        let data = failed.1.as_ref().unwrap();
        assert_eq!(data["category"], "unsupported");
        assert_eq!(data["rank"], 0);
    }

    #[tokio::test]
    async fn test_events_disabled() {
        let sink = Arc::new(CollectingEventSink::new());
        let mut registry = CapabilityRegistry::new();
        registry
            .register("op", MockImplementation::succeeding("x", json!(1)), 0)
            .unwrap();

        let executor = executor_for(registry)
            .with_event_sink(sink.clone())
            .with_config(ExecutorConfig::new().with_events(false))
            .unwrap();
        executor.execute("op", json!({}), None).await.unwrap();

        assert!(sink.is_empty());
    }

    #[test]
    fn test_with_config_rejects_zero_timeout() {
        let config = ExecutorConfig {
            default_timeout_ms: 0,
            ..ExecutorConfig::default()
        };
        let err = executor_for(CapabilityRegistry::new())
            .with_config(config)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_fn("echo", 0, "echo args", |args| async move {
                Ok::<_, ImplementationError>(args)
            })
            .unwrap();
        let executor = Arc::new(executor_for(registry));

        let calls = (0..16).map(|i| {
            let executor = executor.clone();
            tokio::spawn(async move { executor.execute("echo", json!(i), None).await })
        });
        let results = futures::future::join_all(calls).await;

        let mut ids = std::collections::HashSet::new();
        for (i, joined) in results.into_iter().enumerate() {
            let result = joined.unwrap().unwrap();
            assert_succeeded_with(&result, 0, &json!(i));
            assert!(ids.insert(result.execution_id()));
        }
    }
}
