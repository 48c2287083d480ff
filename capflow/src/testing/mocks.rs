//! Mock implementations for testing fallback chains.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::core::ErrorCategory;
use crate::errors::ImplementationError;
use crate::registry::{Args, Implementation, Output};

/// What a `MockImplementation` does when invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// Return this value.
    Value(Output),
    /// Fail with this category and message.
    Error(ErrorCategory, String),
    /// Panic with this message.
    Panic(String),
}

/// A mock implementation that counts calls and returns a scripted response.
#[derive(Debug)]
pub struct MockImplementation {
    description: String,
    response: Mutex<MockResponse>,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    recorded_args: Mutex<Vec<Args>>,
}

impl MockImplementation {
    /// Creates a mock with the given response.
    #[must_use]
    pub fn new(description: impl Into<String>, response: MockResponse) -> Self {
        Self {
            description: description.into(),
            response: Mutex::new(response),
            delay: None,
            call_count: AtomicUsize::new(0),
            recorded_args: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock that returns `value`.
    #[must_use]
    pub fn succeeding(description: impl Into<String>, value: Output) -> Self {
        Self::new(description, MockResponse::Value(value))
    }

    /// Creates a mock that fails.
    #[must_use]
    pub fn failing(
        description: impl Into<String>,
        category: ErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        Self::new(description, MockResponse::Error(category, message.into()))
    }

    /// Creates a mock that panics.
    #[must_use]
    pub fn panicking(description: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(description, MockResponse::Panic(message.into()))
    }

    /// Sleeps for `delay` before responding.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replaces the scripted response.
    pub fn set_response(&self, response: MockResponse) {
        *self.response.lock() = response;
    }

    /// Returns the number of times the implementation was invoked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Returns the arguments of each invocation.
    #[must_use]
    pub fn recorded_args(&self) -> Vec<Args> {
        self.recorded_args.lock().clone()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        self.call_count.store(0, Ordering::SeqCst);
        self.recorded_args.lock().clear();
    }
}

#[async_trait]
impl Implementation for MockImplementation {
    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, args: &Args) -> Result<Output, ImplementationError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.recorded_args.lock().push(args.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.response.lock().clone();
        match response {
            MockResponse::Value(value) => Ok(value),
            MockResponse::Error(category, message) => Err(ImplementationError::new(category, message)),
            MockResponse::Panic(message) => panic!("{message}"),
        }
    }
}

/// An implementation that always succeeds with a fixed value.
#[derive(Debug)]
pub struct SuccessImplementation {
    description: String,
    value: Output,
}

impl SuccessImplementation {
    /// Creates a new success implementation.
    #[must_use]
    pub fn new(description: impl Into<String>, value: Output) -> Self {
        Self {
            description: description.into(),
            value,
        }
    }
}

#[async_trait]
impl Implementation for SuccessImplementation {
    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, _args: &Args) -> Result<Output, ImplementationError> {
        Ok(self.value.clone())
    }
}

/// An implementation that always fails.
#[derive(Debug)]
pub struct FailingImplementation {
    description: String,
    category: ErrorCategory,
    message: String,
}

impl FailingImplementation {
    /// Creates a new failing implementation.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        category: ErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            category,
            message: message.into(),
        }
    }

    /// Creates an implementation whose mechanism is missing on this host.
    #[must_use]
    pub fn unsupported(description: impl Into<String>) -> Self {
        let description = description.into();
        let message = format!("{description} is not available on this host");
        Self::new(description, ErrorCategory::Unsupported, message)
    }
}

#[async_trait]
impl Implementation for FailingImplementation {
    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, _args: &Args) -> Result<Output, ImplementationError> {
        Err(ImplementationError::new(self.category, self.message.clone()))
    }
}

/// An implementation that takes time before succeeding.
#[derive(Debug)]
pub struct SlowImplementation {
    description: String,
    delay: Duration,
    value: Output,
}

impl SlowImplementation {
    /// Creates a new slow implementation.
    #[must_use]
    pub fn new(description: impl Into<String>, delay: Duration, value: Output) -> Self {
        Self {
            description: description.into(),
            delay,
            value,
        }
    }

    /// Creates a slow implementation that never finishes in practice.
    #[must_use]
    pub fn hanging(description: impl Into<String>) -> Self {
        Self::new(description, Duration::from_secs(24 * 60 * 60), Output::Null)
    }
}

#[async_trait]
impl Implementation for SlowImplementation {
    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, _args: &Args) -> Result<Output, ImplementationError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_counts_and_records() {
        let mock = MockImplementation::succeeding("mock", json!(1));

        assert_eq!(mock.invoke(&json!({"a": 1})).await.unwrap(), json!(1));
        mock.set_response(MockResponse::Error(ErrorCategory::Io, "disk".into()));
        let err = mock.invoke(&json!({})).await.unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Io);
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.recorded_args(), vec![json!({"a": 1}), json!({})]);

        mock.reset();
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_unsupported() {
        let imp = FailingImplementation::unsupported("container api");
        let err = imp.invoke(&json!({})).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Unsupported);
        assert_eq!(err.message(), "container api is not available on this host");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_implementation_waits() {
        let imp = SlowImplementation::new("slow", Duration::from_secs(5), json!("done"));
        let start = tokio::time::Instant::now();
        assert_eq!(imp.invoke(&json!({})).await.unwrap(), json!("done"));
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
