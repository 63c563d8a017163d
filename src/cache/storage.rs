//! Persistent Store Module
//!
//! Synchronous string key-value storage shared by every tab of an origin.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{CacheError, Result};

// == Store Trait ==
/// Origin-scoped key-value storage.
///
/// Writes are last-write-wins. No compare-and-swap is offered, so callers must
/// tolerate read-then-write races.
pub trait KvStore: Debug + Send + Sync {
    /// Returns the stored value, or `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

// == Memory Store ==
/// In-process store. Share one `Arc<MemoryStore>` between coordinators to
/// model several tabs of the same origin.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every key, like a user clearing site data.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// == File Store ==
/// Directory-backed store, one file per key, shareable between processes.
///
/// Values are written to a temporary file and renamed into place, so a reader
/// sees either the old or the new value, never a partial write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) the store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| store_error("create", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(store_error("read", &path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));

        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            store_error("write", &path, e)
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_error("remove", &path, e)),
        }
    }
}

fn store_error(action: &str, path: &Path, err: io::Error) -> CacheError {
    CacheError::Store(format!("{} {}: {}", action, path.display(), err))
}

/// Longest encoded key used verbatim as a file name stem.
const MAX_ENCODED_STEM: usize = 200;
/// Readable prefix kept in front of the digest of an over-long key.
const HASHED_PREFIX_LEN: usize = 64;

/// Maps a key onto a portable file name; bytes outside `[A-Za-z0-9_-]` are
/// written as `%XX`.
///
/// Encodings longer than `MAX_ENCODED_STEM` become `<prefix>~<sha256 hex>`.
/// `~` never appears in a plain encoding, so the two forms cannot collide.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }

    if encoded.len() <= MAX_ENCODED_STEM {
        return encoded;
    }

    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    // The encoding is pure ASCII, so any byte offset is a char boundary.
    format!("{}~{}", &encoded[..HASHED_PREFIX_LEN], digest)
}
