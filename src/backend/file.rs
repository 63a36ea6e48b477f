//! Durable file-backed implementation of [`Backend`].
//!
//! Each namespace owns one preference file plus a lock file. Commits
//! rewrite the file atomically (temp file + rename) before the in-memory
//! map is swapped and listeners fire, so a failed commit never publishes.

use crate::backend::{Backend, ChangeListener, ListenerId};
use crate::error::{PrefsError, Result};
use crate::types::Value;
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Magic bytes for the preference file.
const PREFS_MAGIC: &[u8; 4] = b"PRF\0";

/// Current preference file format version.
const PREFS_VERSION: u8 = 1;

/// Configuration for a file backend.
///
/// The namespace resolves to `<dir>/<namespace>.prefs` at construction and
/// is fixed for the backend's lifetime.
#[derive(Clone, Debug)]
pub struct FileBackendConfig {
    /// Directory holding the preference file and its lock.
    pub dir: PathBuf,

    /// Store identity within the directory.
    pub namespace: String,

    /// Whether to create the directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./prefs"),
            namespace: "default".to_string(),
            create_if_missing: true,
        }
    }
}

/// File-backed durable key/value store with change notification.
pub struct FileBackend {
    /// Path to the preference file.
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// In-memory copy of the committed entries.
    entries: RwLock<HashMap<String, Value>>,

    /// Registered change listeners.
    listeners: RwLock<HashMap<ListenerId, ChangeListener>>,

    /// Counter for generating listener ids.
    next_listener_id: AtomicU64,

    /// Serializes commits so clone-modify-swap is race free.
    commit_lock: Mutex<()>,
}

impl FileBackend {
    /// Open a namespace, creating the directory if configured to.
    pub fn open(config: FileBackendConfig) -> Result<Self> {
        if !config.dir.exists() {
            if config.create_if_missing {
                fs::create_dir_all(&config.dir)?;
            } else {
                return Err(PrefsError::Storage(format!(
                    "preference directory {} does not exist",
                    config.dir.display()
                )));
            }
        }

        let lock_file = Self::acquire_lock(&config.dir, &config.namespace)?;
        let path = config.dir.join(format!("{}.prefs", config.namespace));

        let entries = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            _lock_file: lock_file,
            entries: RwLock::new(entries),
            listeners: RwLock::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
        })
    }

    /// Path of the preference file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire_lock(dir: &Path, namespace: &str) -> Result<File> {
        let lock_path = dir.join(format!("{}.lock", namespace));
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| PrefsError::Locked)?;

        Ok(lock_file)
    }

    /// Read and verify the preference file.
    fn load_from_file(path: &Path) -> Result<HashMap<String, Value>> {
        let mut file = File::open(path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != PREFS_MAGIC {
            return Err(PrefsError::InvalidFormat(
                "Invalid preference file magic".into(),
            ));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != PREFS_VERSION {
            return Err(PrefsError::InvalidFormat(format!(
                "Unsupported preference file version: {}",
                version[0]
            )));
        }

        let mut crc_bytes = [0u8; 4];
        file.read_exact(&mut crc_bytes)?;
        let expected_crc = u32::from_le_bytes(crc_bytes);

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes) as usize;

        let mut encoded = vec![0u8; len];
        file.read_exact(&mut encoded)?;

        let got_crc = crc32fast::hash(&encoded);
        if got_crc != expected_crc {
            return Err(PrefsError::ChecksumMismatch {
                expected: expected_crc,
                got: got_crc,
            });
        }

        let entries: HashMap<String, Value> = rmp_serde::from_slice(&encoded)?;
        Ok(entries)
    }

    /// Durably write the full entry map, replacing the live file atomically.
    fn persist(&self, entries: &HashMap<String, Value>) -> Result<()> {
        let encoded = rmp_serde::to_vec(entries)?;
        let crc = crc32fast::hash(&encoded);

        let tmp_path = self.path.with_extension("prefs.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;

            file.write_all(PREFS_MAGIC)?;
            file.write_all(&[PREFS_VERSION])?;
            file.write_all(&crc.to_le_bytes())?;
            file.write_all(&(encoded.len() as u64).to_le_bytes())?;
            file.write_all(&encoded)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Invoke every listener for a changed key.
    fn notify(&self, key: &str) {
        let listeners = self.listeners.read();
        for listener in listeners.values() {
            listener(key);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl Backend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: Value) -> Result<()> {
        let _commit = self.commit_lock.lock();

        let next = {
            let entries = self.entries.read();
            if entries.get(key) == Some(&value) {
                return Ok(());
            }
            let mut next = entries.clone();
            next.insert(key.to_string(), value);
            next
        };

        self.persist(&next)?;
        *self.entries.write() = next;

        // Still under the commit lock, so listeners observe commit order.
        self.notify(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _commit = self.commit_lock.lock();

        let next = {
            let entries = self.entries.read();
            if !entries.contains_key(key) {
                return Ok(());
            }
            let mut next = entries.clone();
            next.remove(key);
            next
        };

        self.persist(&next)?;
        *self.entries.write() = next;

        self.notify(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn subscribe(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().insert(id, listener);
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.write().remove(&id);
    }
}
