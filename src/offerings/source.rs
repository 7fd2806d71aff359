use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::HandlerExports;

/// File holding an offering's descriptor inside its directory
pub const DESCRIPTOR_FILE: &str = "offering.json";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage boundary consumed by the offering registry.
///
/// Given an offering name, a source exposes the raw descriptor document and
/// the capabilities exported by the offering's handler module.
#[async_trait]
pub trait OfferingSource: Send + Sync {
    /// Raw descriptor bytes, or `None` when no offering has that name
    async fn load_descriptor(&self, name: &str) -> Result<Option<Vec<u8>>, SourceError>;

    /// Exported capabilities; empty exports when no module is registered
    async fn load_handlers(&self, name: &str) -> Result<HandlerExports, SourceError>;
}

/// Handler modules compiled into the binary, keyed by offering name
#[derive(Clone, Debug, Default)]
pub struct HandlerCatalog {
    modules: BTreeMap<String, HandlerExports>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, offering: impl Into<String>, exports: HandlerExports) {
        self.modules.insert(offering.into(), exports);
    }

    pub fn get(&self, offering: &str) -> Option<HandlerExports> {
        self.modules.get(offering).cloned()
    }

    pub fn contains(&self, offering: &str) -> bool {
        self.modules.contains_key(offering)
    }

    /// Catalog with the handler modules that ship with offerbox
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(
            super::builtin::GREETING_OFFERING,
            super::builtin::greeting_exports(),
        );
        catalog
    }
}

/// Offerings laid out on disk as `<root>/<name>/offering.json`
pub struct DirectorySource {
    root: PathBuf,
    catalog: HandlerCatalog,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, catalog: HandlerCatalog) -> Self {
        Self {
            root: root.into(),
            catalog,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn descriptor_path(&self, name: &str) -> Option<PathBuf> {
        // Names map to a single directory level under the root
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
        {
            return None;
        }
        Some(self.root.join(name).join(DESCRIPTOR_FILE))
    }
}

#[async_trait]
impl OfferingSource for DirectorySource {
    async fn load_descriptor(&self, name: &str) -> Result<Option<Vec<u8>>, SourceError> {
        let Some(path) = self.descriptor_path(name) else {
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(offering = name, path = %path.display(), "Read offering descriptor");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_handlers(&self, name: &str) -> Result<HandlerExports, SourceError> {
        Ok(self.catalog.get(name).unwrap_or_else(|| {
            debug!(offering = name, "No handler module registered");
            HandlerExports::default()
        }))
    }
}

/// In-memory offerings, used by tests and embedders that build offerings in code.
///
/// Counts descriptor loads so callers can observe registry caching.
#[derive(Default)]
pub struct MemorySource {
    descriptors: RwLock<HashMap<String, Value>>,
    handlers: RwLock<HashMap<String, HandlerExports>>,
    loads: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_descriptor(&self, name: impl Into<String>, descriptor: Value) {
        self.descriptors.write().await.insert(name.into(), descriptor);
    }

    pub async fn put_handlers(&self, name: impl Into<String>, exports: HandlerExports) {
        self.handlers.write().await.insert(name.into(), exports);
    }

    /// Insert a descriptor and its handler module in one call
    pub async fn put_offering(&self, name: &str, descriptor: Value, exports: HandlerExports) {
        self.put_descriptor(name, descriptor).await;
        self.put_handlers(name, exports).await;
    }

    /// Number of descriptor loads served so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OfferingSource for MemorySource {
    async fn load_descriptor(&self, name: &str) -> Result<Option<Vec<u8>>, SourceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match self.descriptors.read().await.get(name) {
            Some(descriptor) => Ok(Some(serde_json::to_vec(descriptor)?)),
            None => Ok(None),
        }
    }

    async fn load_handlers(&self, name: &str) -> Result<HandlerExports, SourceError> {
        Ok(self
            .handlers
            .read()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default())
    }
}
