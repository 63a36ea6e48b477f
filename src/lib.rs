//! # Preference Store
//!
//! A typed, observable key-value preference store: typed accessors over a
//! durable key/value backend, plus per-key replay-latest subjects that
//! follow every committed change, regardless of who made it.
//!
//! ## Core Concepts
//!
//! - **Values**: six kinds (string, i32, i64, f64, bool, string set), each
//!   with a canonical default used when a key is absent
//! - **Subjects**: one replay-latest broadcast per observed (key, kind),
//!   created lazily and never evicted
//! - **Change fan-out**: writes commit durably, then the backend's change
//!   channel refreshes every subject registered under the changed key
//!
//! ## Example
//!
//! ```ignore
//! use prefstore::{FileBackendConfig, PrefStore};
//!
//! let store = PrefStore::open(FileBackendConfig {
//!     dir: "./prefs".into(),
//!     namespace: "app".into(),
//!     ..Default::default()
//! })?;
//!
//! let count = store.observe_or("count", 0i32)?;
//! let sub = count.subscribe();
//!
//! store.save("count", 5i32)?;
//! assert_eq!(count.latest()?, 5);
//! ```

pub mod backend;
pub mod error;
pub mod store;
pub mod subjects;
pub mod types;

// Re-exports
pub use backend::{Backend, ChangeListener, FileBackend, FileBackendConfig, ListenerId};
pub use error::{PrefsError, Result};
pub use store::{PrefStore, TypedStore};
pub use subjects::{ObservableRegistry, Subject, Subscription};
pub use types::{Kind, PrefValue, Value};
