//! Typed accessors and the main store facade.

use crate::backend::{Backend, FileBackend, FileBackendConfig};
use crate::error::Result;
use crate::subjects::{ObservableRegistry, Subject};
use crate::types::{typed_value, Kind, PrefValue, Value};
use std::sync::Arc;

/// Type-safe get/save over a backend. Leaf component; has no knowledge of
/// subjects or the registry.
pub struct TypedStore {
    backend: Arc<dyn Backend>,
}

impl TypedStore {
    /// Create a typed view over a backend handle.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Read a key, falling back to `default` when absent.
    ///
    /// Absence is not an error; a stored value of another kind is.
    pub fn get_or<T: PrefValue>(&self, key: &str, default: T) -> Result<T> {
        match self.backend.read(key)? {
            Some(value) => typed_value(key, value),
            None => Ok(default),
        }
    }

    /// Read a key, falling back to the kind's canonical default.
    pub fn get<T: PrefValue>(&self, key: &str) -> Result<T> {
        self.get_or(key, T::canonical_default())
    }

    /// Write and durably commit a value. Single attempt; backend failures
    /// propagate. Never pushes to a subject directly; observers are
    /// reached through the backend's change-notification channel.
    pub fn save<T: PrefValue>(&self, key: &str, value: T) -> Result<()> {
        self.backend.write(key, value.into_value())
    }

    /// Whether a value is stored under `key`, of any kind.
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.backend.read(key)?.is_some())
    }

    /// Remove a key. A no-op when absent.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove(key)
    }

    /// All stored keys.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.backend.keys()
    }

    /// Read a key as a runtime kind, falling back to the kind's canonical
    /// default. Used by notification dispatch, which has no static type.
    pub(crate) fn read_kind(&self, key: &str, kind: Kind) -> Result<Value> {
        match self.backend.read(key)? {
            Some(value) if value.kind() == kind => Ok(value),
            Some(value) => Err(crate::error::PrefsError::TypeMismatch {
                key: key.to_string(),
                expected: kind,
                found: value.kind(),
            }),
            None => Ok(kind.default_value()),
        }
    }
}

/// The main preference store.
///
/// Composes a backend handle, typed accessors, and the observable
/// registry. Plain getters and setters talk straight to the backend; the
/// observe accessors return standing subjects that follow every committed
/// change to their key, whichever handle produced it.
pub struct PrefStore {
    store: TypedStore,
    registry: ObservableRegistry,
}

impl PrefStore {
    /// Open a file-backed store for a namespace.
    pub fn open(config: FileBackendConfig) -> Result<Self> {
        let backend = Arc::new(FileBackend::open(config)?);
        Ok(Self::with_backend(backend))
    }

    /// Build a store over any backend implementation.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            store: TypedStore::new(Arc::clone(&backend)),
            registry: ObservableRegistry::new(backend),
        }
    }

    /// Read a key, falling back to the kind's canonical default.
    pub fn get<T: PrefValue>(&self, key: &str) -> Result<T> {
        self.store.get(key)
    }

    /// Read a key, falling back to `default` when absent.
    pub fn get_or<T: PrefValue>(&self, key: &str, default: T) -> Result<T> {
        self.store.get_or(key, default)
    }

    /// Write and durably commit a value.
    pub fn save<T: PrefValue>(&self, key: &str, value: T) -> Result<()> {
        self.store.save(key, value)
    }

    /// Observe a key with the kind's canonical default.
    pub fn observe<T: PrefValue>(&self, key: &str) -> Result<Subject<T>> {
        self.registry.observe(key, T::canonical_default())
    }

    /// Observe a key with an explicit default. Returns the same underlying
    /// subject on every call for a given (key, kind).
    pub fn observe_or<T: PrefValue>(&self, key: &str, default: T) -> Result<Subject<T>> {
        self.registry.observe(key, default)
    }

    /// Whether a value is stored under `key`, of any kind.
    pub fn contains(&self, key: &str) -> Result<bool> {
        self.store.contains(key)
    }

    /// Remove a key. Observers of the key are refreshed to their kind's
    /// canonical default.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key)
    }

    /// All stored keys.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.store.keys()
    }

    /// Cancel the registry's backend listener. Call before dropping the
    /// store if the backend handle is shared and outlives it.
    pub fn shutdown(&self) {
        self.registry.shutdown()
    }
}
