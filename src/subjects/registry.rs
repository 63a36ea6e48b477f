//! Observable registry: lazy subject management and change fan-out.

use crate::backend::{Backend, ListenerId};
use crate::error::Result;
use crate::store::TypedStore;
use crate::subjects::subject::{RawSubject, Subject};
use crate::types::{Kind, PrefValue};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Shared state reachable from the backend listener.
struct RegistryInner {
    store: TypedStore,
    /// One subject per (key, kind) pair that has ever been observed.
    subjects: RwLock<HashMap<(String, Kind), Arc<RawSubject>>>,
}

impl RegistryInner {
    /// Refresh every subject registered under a changed key, one per kind.
    ///
    /// A refresh failure for one (key, kind) is logged and skipped; the
    /// remaining subjects for the event are still processed.
    fn refresh_key(&self, key: &str) {
        let matching: Vec<Arc<RawSubject>> = {
            let subjects = self.subjects.read();
            Kind::ALL
                .iter()
                .filter_map(|kind| subjects.get(&(key.to_string(), *kind)).cloned())
                .collect()
        };

        for subject in matching {
            match self.store.read_kind(key, subject.kind()) {
                Ok(value) => subject.push(value),
                Err(error) => {
                    tracing::warn!(
                        key,
                        kind = %subject.kind(),
                        error = %error,
                        "failed to refresh subject after change"
                    );
                }
            }
        }
    }
}

/// Maintains one replay-latest subject per observed (key, kind) pair and
/// feeds them from the backend's change-notification channel.
///
/// The registry installs its backend listener once at construction. The
/// listener captures only a weak reference, and [`shutdown`] (also run on
/// drop) cancels it, so a listed callback never outlives the registry.
///
/// [`shutdown`]: ObservableRegistry::shutdown
pub struct ObservableRegistry {
    inner: Arc<RegistryInner>,
    backend: Arc<dyn Backend>,
    listener: Mutex<Option<ListenerId>>,
}

impl ObservableRegistry {
    /// Create a registry over a backend and install the change listener.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let inner = Arc::new(RegistryInner {
            store: TypedStore::new(Arc::clone(&backend)),
            subjects: RwLock::new(HashMap::new()),
        });

        let dispatch: Weak<RegistryInner> = Arc::downgrade(&inner);
        let listener = backend.subscribe(Box::new(move |key| {
            if let Some(inner) = dispatch.upgrade() {
                inner.refresh_key(key);
            }
        }));

        Self {
            inner,
            backend,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Get the subject for (key, `T::KIND`), creating it on first use.
    ///
    /// The backend is re-read with `default` on every call and the result
    /// pushed into the subject, even if unchanged, so an existing subject
    /// is refreshed eagerly. Repeated calls return handles to the same
    /// underlying subject; subjects are never evicted.
    pub fn observe<T: PrefValue>(&self, key: &str, default: T) -> Result<Subject<T>> {
        let raw = {
            let mut subjects = self.inner.subjects.write();
            Arc::clone(
                subjects
                    .entry((key.to_string(), T::KIND))
                    .or_insert_with(|| Arc::new(RawSubject::new(key, T::KIND))),
            )
        };

        // Map lock released before the backend read.
        let value = self.inner.store.get_or(key, default)?;
        raw.push(value.into_value());

        Ok(Subject::from_raw(raw))
    }

    /// Cancel the backend listener. Subjects stay valid but no longer
    /// receive backend changes. Idempotent; also run on drop.
    pub fn shutdown(&self) {
        if let Some(id) = self.listener.lock().take() {
            self.backend.unsubscribe(id);
        }
    }

    /// Number of subjects ever created.
    pub fn subject_count(&self) -> usize {
        self.inner.subjects.read().len()
    }
}

impl Drop for ObservableRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FileBackend, FileBackendConfig};
    use crate::types::Value;
    use tempfile::TempDir;

    fn test_backend(dir: &TempDir) -> Arc<FileBackend> {
        Arc::new(
            FileBackend::open(FileBackendConfig {
                dir: dir.path().join("prefs"),
                namespace: "app".to_string(),
                create_if_missing: true,
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_subject_created_lazily() {
        let dir = TempDir::new().unwrap();
        let registry = ObservableRegistry::new(test_backend(&dir));
        assert_eq!(registry.subject_count(), 0);

        registry.observe::<i32>("count", 0).unwrap();
        assert_eq!(registry.subject_count(), 1);
    }

    #[test]
    fn test_observe_is_idempotent_on_identity() {
        let dir = TempDir::new().unwrap();
        let registry = ObservableRegistry::new(test_backend(&dir));

        let first = registry.observe::<i32>("count", 0).unwrap();
        let second = registry.observe::<i32>("count", 99).unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(registry.subject_count(), 1);
    }

    #[test]
    fn test_immediate_emission() {
        let dir = TempDir::new().unwrap();
        let backend = test_backend(&dir);
        backend.write("count", Value::Int(9)).unwrap();

        let registry = ObservableRegistry::new(backend);

        let stored = registry.observe::<i32>("count", 0).unwrap();
        assert_eq!(stored.latest().unwrap(), 9);

        let absent = registry.observe::<i32>("missing", 7).unwrap();
        assert_eq!(absent.latest().unwrap(), 7);
    }

    #[test]
    fn test_eager_refresh_emits_duplicate() {
        let dir = TempDir::new().unwrap();
        let registry = ObservableRegistry::new(test_backend(&dir));

        let subject = registry.observe::<i32>("count", 3).unwrap();
        let sub = subject.subscribe();
        assert_eq!(sub.recv().unwrap(), 3);

        registry.observe::<i32>("count", 3).unwrap();
        assert_eq!(sub.recv().unwrap(), 3);
    }

    #[test]
    fn test_change_propagation() {
        let dir = TempDir::new().unwrap();
        let backend = test_backend(&dir);
        let registry = ObservableRegistry::new(Arc::clone(&backend) as Arc<dyn Backend>);

        let subject = registry.observe::<i32>("count", 0).unwrap();
        let sub = subject.subscribe();
        assert_eq!(sub.recv().unwrap(), 0);

        backend.write("count", Value::Int(42)).unwrap();

        assert_eq!(subject.latest().unwrap(), 42);
        assert_eq!(sub.recv().unwrap(), 42);
    }

    #[test]
    fn test_cross_kind_isolation() {
        let dir = TempDir::new().unwrap();
        let backend = test_backend(&dir);
        let registry = ObservableRegistry::new(Arc::clone(&backend) as Arc<dyn Backend>);

        let other = registry.observe::<i32>("k2", 10).unwrap();
        backend.write("k", Value::String("text".into())).unwrap();

        assert_eq!(other.latest().unwrap(), 10);
    }

    #[test]
    fn test_kind_collision_refreshes_independently() {
        let dir = TempDir::new().unwrap();
        let backend = test_backend(&dir);
        let registry = ObservableRegistry::new(Arc::clone(&backend) as Arc<dyn Backend>);

        // Same key observed under two kinds: a tolerated misuse.
        let as_string = registry.observe::<String>("k", String::new()).unwrap();
        let as_int = registry.observe::<i32>("k", 0).unwrap();
        assert_eq!(registry.subject_count(), 2);

        backend.write("k", Value::Int(7)).unwrap();

        // The int subject follows the store; the string subject's refresh
        // hits a type mismatch and is skipped, keeping its last value.
        assert_eq!(as_int.latest().unwrap(), 7);
        assert_eq!(as_string.latest().unwrap(), "");
    }

    #[test]
    fn test_shutdown_stops_dispatch() {
        let dir = TempDir::new().unwrap();
        let backend = test_backend(&dir);
        let registry = ObservableRegistry::new(Arc::clone(&backend) as Arc<dyn Backend>);

        let subject = registry.observe::<i32>("count", 0).unwrap();
        registry.shutdown();

        backend.write("count", Value::Int(5)).unwrap();
        assert_eq!(subject.latest().unwrap(), 0);
        assert_eq!(backend.listener_count(), 0);
    }

    #[test]
    fn test_drop_cancels_listener() {
        let dir = TempDir::new().unwrap();
        let backend = test_backend(&dir);

        {
            let registry = ObservableRegistry::new(Arc::clone(&backend) as Arc<dyn Backend>);
            registry.observe::<i32>("count", 0).unwrap();
            assert_eq!(backend.listener_count(), 1);
        }

        assert_eq!(backend.listener_count(), 0);
        backend.write("count", Value::Int(5)).unwrap();
    }
}
