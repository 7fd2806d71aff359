use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use super::source::{OfferingSource, SourceError};
use super::traits::HandlerSet;
use super::types::OfferingDescriptor;
use super::validation::{DescriptorViolation, HandlerViolation, bind_handlers, parse_descriptor};

/// Why an offering could not be resolved
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("offering '{0}' not found")]
    NotFound(String),

    #[error("offering '{offering}' has an invalid descriptor: {}", join(.violations))]
    InvalidDescriptor {
        offering: String,
        violations: Vec<DescriptorViolation>,
    },

    #[error("offering '{offering}' has invalid handlers: {}", join(.violations))]
    InvalidHandlers {
        offering: String,
        violations: Vec<HandlerViolation>,
    },

    #[error("failed to load offering '{offering}': {source}")]
    Source {
        offering: String,
        #[source]
        source: SourceError,
    },
}

impl LoadError {
    /// Every violated rule, rendered for operators and offering authors
    pub fn violations(&self) -> Vec<String> {
        match self {
            LoadError::InvalidDescriptor { violations, .. } => {
                violations.iter().map(ToString::to_string).collect()
            }
            LoadError::InvalidHandlers { violations, .. } => {
                violations.iter().map(ToString::to_string).collect()
            }
            LoadError::NotFound(_) | LoadError::Source { .. } => Vec::new(),
        }
    }
}

fn join<T: ToString>(violations: &[T]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Descriptor and handler set of one offering that passed every check
#[derive(Debug, Clone)]
pub struct ResolvedOffering {
    pub descriptor: OfferingDescriptor,
    pub handlers: HandlerSet,
}

/// Resolves offering names to validated descriptor + handler pairs.
///
/// Successful resolutions are cached for the lifetime of the registry.
/// Concurrent first lookups of one name share a single load; failed loads
/// are not cached and leave no entry behind, so fixing an offering and
/// retrying succeeds.
pub struct OfferingRegistry {
    source: Arc<dyn OfferingSource>,
    cache: Mutex<HashMap<String, Arc<OnceCell<Arc<ResolvedOffering>>>>>,
}

impl OfferingRegistry {
    pub fn new(source: Arc<dyn OfferingSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, name: &str) -> Result<Arc<ResolvedOffering>, LoadError> {
        let cell = {
            let mut cache = self.cache.lock().await;
            cache.entry(name.to_string()).or_default().clone()
        };

        if let Some(resolved) = cell.get() {
            return Ok(resolved.clone());
        }

        let result = cell.get_or_try_init(|| self.load(name)).await.cloned();
        if result.is_err() {
            self.evict_failed(name, &cell).await;
        }
        result
    }

    /// Drop the slot of a failed load unless another lookup is still waiting on it
    async fn evict_failed(&self, name: &str, cell: &Arc<OnceCell<Arc<ResolvedOffering>>>) {
        let mut cache = self.cache.lock().await;
        let idle = cache.get(name).is_some_and(|slot| {
            Arc::ptr_eq(slot, cell) && !slot.initialized() && Arc::strong_count(slot) == 2
        });
        if idle {
            cache.remove(name);
        }
    }

    /// Whether `name` has been resolved successfully before
    pub async fn is_cached(&self, name: &str) -> bool {
        self.cache
            .lock()
            .await
            .get(name)
            .is_some_and(|cell| cell.initialized())
    }

    /// Names of every offering resolved so far, sorted
    pub async fn cached_names(&self) -> Vec<String> {
        let cache = self.cache.lock().await;
        let mut names: Vec<String> = cache
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    async fn load(&self, name: &str) -> Result<Arc<ResolvedOffering>, LoadError> {
        debug!(offering = name, "Loading offering");

        let raw = self
            .source
            .load_descriptor(name)
            .await
            .map_err(|source| LoadError::Source {
                offering: name.to_string(),
                source,
            })?
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;

        let descriptor = parse_descriptor(&raw).map_err(|violations| {
            warn!(offering = name, count = violations.len(), "Offering descriptor is invalid");
            LoadError::InvalidDescriptor {
                offering: name.to_string(),
                violations,
            }
        })?;

        let exports = self
            .source
            .load_handlers(name)
            .await
            .map_err(|source| LoadError::Source {
                offering: name.to_string(),
                source,
            })?;

        let handlers = bind_handlers(&descriptor, exports).map_err(|violations| {
            warn!(offering = name, count = violations.len(), "Offering handlers break their contract");
            LoadError::InvalidHandlers {
                offering: name.to_string(),
                violations,
            }
        })?;

        info!(
            offering = name,
            required_funds = descriptor.required_funds,
            validates = handlers.capabilities().validate_requirements,
            "Offering resolved"
        );

        Ok(Arc::new(ResolvedOffering {
            descriptor,
            handlers,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offerings::source::MemorySource;
    use crate::offerings::traits::{
        ExecuteJob, HandlerError, HandlerExports, RequestAdditionalFunds,
    };
    use crate::offerings::types::{DeliverableResult, FundsRequest, PaymentMode, Requirements};
    use crate::offerings::validation::ContractViolation;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct Done;

    #[async_trait]
    impl ExecuteJob for Done {
        async fn execute_job(
            &self,
            _request: &Requirements,
        ) -> Result<DeliverableResult, HandlerError> {
            Ok(DeliverableResult::new("done"))
        }
    }

    #[async_trait]
    impl RequestAdditionalFunds for Done {
        async fn request_additional_funds(
            &self,
            _request: &Requirements,
        ) -> Result<FundsRequest, HandlerError> {
            Ok(FundsRequest {
                amount: 3.0,
                token_contract_address: "0xtoken".to_string(),
                token_symbol: "VIRTUAL".to_string(),
                mode: PaymentMode::Request,
            })
        }
    }

    fn descriptor(name: &str, required_funds: bool) -> Value {
        json!({
            "name": name,
            "description": "test offering",
            "jobFee": 1,
            "requiredFunds": required_funds
        })
    }

    fn execute_only() -> HandlerExports {
        HandlerExports::builder().execute_job(Arc::new(Done)).build()
    }

    fn with_funds() -> HandlerExports {
        HandlerExports::builder()
            .execute_job(Arc::new(Done))
            .request_additional_funds(Arc::new(Done))
            .build()
    }

    #[tokio::test]
    async fn test_resolve_unknown_offering() {
        let registry = OfferingRegistry::new(Arc::new(MemorySource::new()));
        let result = registry.resolve("missing").await;
        assert!(matches!(result, Err(LoadError::NotFound(name)) if name == "missing"));
    }

    #[tokio::test]
    async fn test_resolve_valid_offering() {
        let source = Arc::new(MemorySource::new());
        source
            .put_offering("done", descriptor("done", false), execute_only())
            .await;

        let registry = OfferingRegistry::new(source);
        let resolved = registry.resolve("done").await.unwrap();
        assert_eq!(resolved.descriptor.name, "done");
        assert!(registry.is_cached("done").await);
    }

    #[tokio::test]
    async fn test_required_funds_without_handler_is_rejected() {
        let source = Arc::new(MemorySource::new());
        source
            .put_offering("paid", descriptor("paid", true), execute_only())
            .await;

        let registry = OfferingRegistry::new(source);
        let err = registry.resolve("paid").await.unwrap_err();
        match err {
            LoadError::InvalidHandlers { violations, .. } => assert_eq!(
                violations,
                vec![HandlerViolation::Contract(ContractViolation::MissingFundsHandler)]
            ),
            other => panic!("expected InvalidHandlers, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_funds_handler_without_required_funds_is_rejected() {
        let source = Arc::new(MemorySource::new());
        source
            .put_offering("free", descriptor("free", false), with_funds())
            .await;

        let registry = OfferingRegistry::new(source);
        let err = registry.resolve("free").await.unwrap_err();
        assert!(err.to_string().contains("requestAdditionalFunds is exported"));
        assert!(!registry.is_cached("free").await);
    }

    #[tokio::test]
    async fn test_invalid_descriptor_lists_all_violations() {
        let source = Arc::new(MemorySource::new());
        source
            .put_offering("broken", json!({"jobFee": -2}), execute_only())
            .await;

        let registry = OfferingRegistry::new(source);
        let err = registry.resolve("broken").await.unwrap_err();
        assert!(matches!(err, LoadError::InvalidDescriptor { .. }));
        assert_eq!(err.violations().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_resolution_is_not_cached() {
        let source = Arc::new(MemorySource::new());
        source
            .put_offering("paid", descriptor("paid", true), execute_only())
            .await;

        let registry = OfferingRegistry::new(source.clone());
        assert!(registry.resolve("paid").await.is_err());

        source.put_handlers("paid", with_funds()).await;
        let resolved = registry.resolve("paid").await.unwrap();
        assert!(resolved.handlers.capabilities().request_additional_funds);
        assert_eq!(source.load_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_names_leave_no_cache_entries() {
        let source = Arc::new(MemorySource::new());
        source
            .put_offering("paid", descriptor("paid", true), execute_only())
            .await;
        let registry = OfferingRegistry::new(source);

        for i in 0..100 {
            assert!(registry.resolve(&format!("nope-{i}")).await.is_err());
        }
        assert!(registry.resolve("paid").await.is_err());

        assert!(registry.cache.lock().await.is_empty());
        assert!(registry.cached_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_resolution_is_memoized() {
        let source = Arc::new(MemorySource::new());
        source
            .put_offering("done", descriptor("done", false), execute_only())
            .await;

        let registry = OfferingRegistry::new(source.clone());
        let first = registry.resolve("done").await.unwrap();
        let second = registry.resolve("done").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.load_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_resolution_loads_once() {
        let source = Arc::new(MemorySource::new());
        source
            .put_offering("done", descriptor("done", false), execute_only())
            .await;

        let registry = Arc::new(OfferingRegistry::new(source.clone()));
        let lookups: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.resolve("done").await.is_ok() })
            })
            .collect();

        for lookup in lookups {
            assert!(lookup.await.unwrap());
        }
        assert_eq!(source.load_count(), 1);
        assert_eq!(registry.cached_names().await, vec!["done".to_string()]);
    }
}
