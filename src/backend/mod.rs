//! Backend key/value storage interface.
//!
//! The preference store is backed by any durable key/value engine that can
//! commit a value atomically and report committed changes back through a
//! registered listener. [`FileBackend`] is the bundled implementation.

mod file;

pub use file::{FileBackend, FileBackendConfig};

use crate::error::Result;
use crate::types::Value;

/// Identifier for a registered change listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Callback invoked once per key whenever a commit changes that key's
/// stored value. The callback receives only the key; interpretation of the
/// value's kind happens on read.
pub type ChangeListener = Box<dyn Fn(&str) + Send + Sync>;

/// Durable key/value storage consumed by the preference store.
///
/// `write` and `remove` must be atomic and durable before returning, and
/// must invoke every registered listener for each key whose stored value
/// actually changed, regardless of which handle produced the commit.
///
/// Listeners run on the committing thread and must not call back into
/// `write`, `remove`, `subscribe`, or `unsubscribe`.
pub trait Backend: Send + Sync {
    /// Read the stored value for a key, if present.
    fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Write and durably commit a value for a key.
    fn write(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a key. Listeners fire only if the key existed.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys with a stored value.
    fn keys(&self) -> Result<Vec<String>>;

    /// Register a change listener. The returned id cancels it.
    fn subscribe(&self, listener: ChangeListener) -> ListenerId;

    /// Cancel a previously registered listener.
    fn unsubscribe(&self, id: ListenerId);
}
