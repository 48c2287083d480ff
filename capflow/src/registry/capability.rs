//! Capability registry for ranked implementation chains.
//!
//! Registration happens on a mutable `CapabilityRegistry` during start-up.
//! `freeze` turns it into a read-only `FrozenRegistry` that executors share
//! without locking.

use super::{Args, FnImplementation, Implementation, Output};
use crate::core::Rank;
use crate::errors::{ImplementationError, RegistryError};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// An implementation together with its rank in the chain.
#[derive(Debug, Clone)]
pub struct RankedImplementation {
    /// Position in the chain; 0 is preferred.
    pub rank: Rank,
    /// The implementation.
    pub implementation: Arc<dyn Implementation>,
}

impl RankedImplementation {
    /// Returns the implementation's mechanism description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.implementation.description()
    }
}

/// Registry in its configuration phase.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    operations: BTreeMap<String, BTreeMap<Rank, Arc<dyn Implementation>>>,
}

impl CapabilityRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an implementation at `rank` for `operation`.
    ///
    /// Fails with `DuplicateRank` if the rank is taken; the existing
    /// implementation is kept.
    pub fn register<I>(
        &mut self,
        operation: impl Into<String>,
        implementation: I,
        rank: Rank,
    ) -> Result<(), RegistryError>
    where
        I: Implementation + 'static,
    {
        self.register_arc(operation, Arc::new(implementation), rank)
    }

    /// Registers a shared implementation at `rank` for `operation`.
    pub fn register_arc(
        &mut self,
        operation: impl Into<String>,
        implementation: Arc<dyn Implementation>,
        rank: Rank,
    ) -> Result<(), RegistryError> {
        let operation = operation.into();
        if operation.trim().is_empty() {
            return Err(RegistryError::InvalidOperationName { operation });
        }

        let chain = self.operations.entry(operation.clone()).or_default();
        if let Some(existing) = chain.get(&rank) {
            return Err(RegistryError::duplicate_rank(
                operation,
                rank,
                existing.description(),
            ));
        }

        debug!(
            operation = %operation,
            rank,
            implementation = implementation.description(),
            "Registered implementation"
        );
        chain.insert(rank, implementation);
        Ok(())
    }

    /// Registers an async closure at `rank` for `operation`.
    pub fn register_fn<F, Fut>(
        &mut self,
        operation: impl Into<String>,
        rank: Rank,
        description: impl Into<String>,
        func: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Output, ImplementationError>> + Send + 'static,
    {
        self.register(operation, FnImplementation::new(description, func), rank)
    }

    /// Returns the chain for `operation`, sorted ascending by rank.
    pub fn resolve(&self, operation: &str) -> Result<Vec<RankedImplementation>, RegistryError> {
        self.operations
            .get(operation)
            .filter(|chain| !chain.is_empty())
            .map(ranked)
            .ok_or_else(|| RegistryError::unknown_operation(operation))
    }

    /// Returns true if `operation` has at least one implementation.
    #[must_use]
    pub fn contains(&self, operation: &str) -> bool {
        self.operations.get(operation).is_some_and(|c| !c.is_empty())
    }

    /// Lists registered operation names in sorted order.
    pub fn operations(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }

    /// Ends the configuration phase.
    #[must_use]
    pub fn freeze(self) -> FrozenRegistry {
        let operations: HashMap<String, Arc<[RankedImplementation]>> = self
            .operations
            .iter()
            .filter(|(_, chain)| !chain.is_empty())
            .map(|(name, chain)| (name.clone(), Arc::from(ranked(chain))))
            .collect();

        debug!(operations = operations.len(), "Registry frozen");
        FrozenRegistry {
            operations: Arc::new(operations),
        }
    }
}

fn ranked(chain: &BTreeMap<Rank, Arc<dyn Implementation>>) -> Vec<RankedImplementation> {
    chain
        .iter()
        .map(|(rank, implementation)| RankedImplementation {
            rank: *rank,
            implementation: Arc::clone(implementation),
        })
        .collect()
}

/// Read-only registry shared by executors.
///
/// Cloning is cheap; clones share the same chains.
#[derive(Debug, Clone)]
pub struct FrozenRegistry {
    operations: Arc<HashMap<String, Arc<[RankedImplementation]>>>,
}

impl FrozenRegistry {
    /// Returns the chain for `operation`, sorted ascending by rank.
    pub fn resolve(&self, operation: &str) -> Result<&[RankedImplementation], RegistryError> {
        self.operations
            .get(operation)
            .map(|chain| &chain[..])
            .ok_or_else(|| RegistryError::unknown_operation(operation))
    }

    /// Returns true if `operation` is registered.
    #[must_use]
    pub fn contains(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    /// Lists registered operation names in sorted order.
    pub fn operations(&self) -> Vec<String> {
        let mut names: Vec<_> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns `(rank, description)` pairs for `operation`.
    pub fn describe(&self, operation: &str) -> Result<Vec<(Rank, String)>, RegistryError> {
        Ok(self
            .resolve(operation)?
            .iter()
            .map(|r| (r.rank, r.description().to_string()))
            .collect())
    }

    /// Returns the number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if no operations are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SuccessImplementation;
    use pretty_assertions::assert_eq;

    fn ok(desc: &str) -> SuccessImplementation {
        SuccessImplementation::new(desc, serde_json::json!(desc))
    }

    #[test]
    fn test_registry_creation() {
        let registry = CapabilityRegistry::new();
        assert!(registry.operations().is_empty());
        assert!(registry.freeze().is_empty());
    }

    #[test]
    fn test_resolve_sorts_by_rank() {
        let mut registry = CapabilityRegistry::new();
        registry.register("op", ok("third"), 7).unwrap();
        registry.register("op", ok("first"), 0).unwrap();
        registry.register("op", ok("second"), 2).unwrap();

        let chain = registry.resolve("op").unwrap();
        let ranks: Vec<_> = chain.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![0, 2, 7]);
        assert_eq!(chain[0].description(), "first");
    }

    #[test]
    fn test_resolve_missing_operation() {
        let registry = CapabilityRegistry::new();
        assert_eq!(
            registry.resolve("missing-op").unwrap_err(),
            RegistryError::unknown_operation("missing-op")
        );

        let frozen = registry.freeze();
        assert!(matches!(
            frozen.resolve("missing-op"),
            Err(RegistryError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn test_duplicate_rank_keeps_first() {
        let mut registry = CapabilityRegistry::new();
        registry.register("op", ok("original"), 0).unwrap();

        let err = registry.register("op", ok("intruder"), 0).unwrap_err();
        assert_eq!(err, RegistryError::duplicate_rank("op", 0, "original"));

        let frozen = registry.freeze();
        assert_eq!(frozen.describe("op").unwrap(), vec![(0, "original".to_string())]);
    }

    #[test]
    fn test_same_rank_different_operations() {
        let mut registry = CapabilityRegistry::new();
        registry.register("a", ok("a0"), 0).unwrap();
        registry.register("b", ok("b0"), 0).unwrap();

        assert!(registry.contains("a"));
        assert!(registry.contains("b"));
        assert_eq!(registry.operations(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_blank_operation_name_rejected() {
        let mut registry = CapabilityRegistry::new();
        let err = registry.register("  ", ok("x"), 0).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidOperationName { .. }));
        assert!(registry.operations().is_empty());
    }

    #[tokio::test]
    async fn test_register_fn() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_fn("greet", 0, "closure", |_| async {
                Ok::<_, ImplementationError>(serde_json::json!("hi"))
            })
            .unwrap();

        let frozen = registry.freeze();
        let chain = frozen.resolve("greet").unwrap();
        let out = chain[0].implementation.invoke(&serde_json::json!({})).await.unwrap();
        assert_eq!(out, serde_json::json!("hi"));
    }

    #[test]
    fn test_frozen_clones_share_chains() {
        let mut registry = CapabilityRegistry::new();
        registry.register("op", ok("only"), 0).unwrap();
        let frozen = registry.freeze();
        let clone = frozen.clone();

        let a = frozen.resolve("op").unwrap();
        let b = clone.resolve("op").unwrap();
        assert!(Arc::ptr_eq(&a[0].implementation, &b[0].implementation));
        assert_eq!(clone.len(), 1);
    }
}
