//! Implementation trait and function adapters.

use crate::errors::ImplementationError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt::Debug;
use std::future::Future;

/// Argument payload passed unmodified to every implementation in a chain.
pub type Args = serde_json::Value;

/// Value produced by a successful implementation.
pub type Output = serde_json::Value;

/// Trait for one concrete mechanism of performing an operation.
///
/// Implementations validate their own arguments. A validation failure is
/// an ordinary failure as far as fallback is concerned. An implementation
/// that fails part-way must not leave partial resources behind; the
/// executor performs no rollback.
#[async_trait]
pub trait Implementation: Send + Sync + Debug {
    /// Returns a human-readable description of the mechanism used.
    fn description(&self) -> &str;

    /// Performs the operation.
    ///
    /// # Arguments
    ///
    /// * `args` - The caller's argument payload
    async fn invoke(&self, args: &Args) -> Result<Output, ImplementationError>;
}

type BoxedFn = Box<dyn Fn(Args) -> BoxFuture<'static, Result<Output, ImplementationError>> + Send + Sync>;

/// An async function-based implementation.
pub struct FnImplementation {
    description: String,
    func: BoxedFn,
}

impl FnImplementation {
    /// Creates a new function-based implementation.
    pub fn new<F, Fut>(description: impl Into<String>, func: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Output, ImplementationError>> + Send + 'static,
    {
        Self {
            description: description.into(),
            func: Box::new(move |args| Box::pin(func(args))),
        }
    }
}

impl Debug for FnImplementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnImplementation")
            .field("description", &self.description)
            .finish()
    }
}

#[async_trait]
impl Implementation for FnImplementation {
    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, args: &Args) -> Result<Output, ImplementationError> {
        (self.func)(args.clone()).await
    }
}
