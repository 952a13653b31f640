//! cache::backend
//!
//! Raw key-value backends for [`CacheStore`](super::CacheStore).
//!
//! Backends store opaque byte blobs under string keys. They never expire,
//! inspect, or transform values.
//!
//! - [`MemoryBackend`]: process-local map, for tests and single-process use
//! - [`FileBackend`]: one file per key in a directory, written atomically

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::RwLock;

use super::CacheError;

/// Storage behind a cache store.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Read the blob stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write `value` at `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Every key starting with `prefix`, in no particular order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError>;

    /// Release the backend. Later operations fail with [`CacheError::Closed`].
    async fn close(&self) -> Result<(), CacheError>;
}

#[async_trait]
impl<B: KvBackend + ?Sized> KvBackend for Box<B> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        (**self).set(key, value).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        (**self).keys(prefix).await
    }

    async fn close(&self) -> Result<(), CacheError> {
        (**self).close().await
    }
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), CacheError> {
        if self.closed.load(Ordering::Acquire) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.ensure_open()?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.ensure_open()?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        self.ensure_open()?;
        Ok(self
            .entries
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Extension for entry files.
const ENTRY_EXT: &str = "entry";

/// Directory-backed store.
///
/// Each key lives in `<dir>/<sha256(key)>.entry`. The file holds the key on
/// its first line followed by the value bytes, so keys can be recovered by
/// scanning. Writes go to a uniquely named temp file and are renamed into
/// place, so readers see either the old or the new value, never a partial one.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    closed: AtomicBool,
}

impl FileBackend {
    /// Use `dir`, which is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            closed: AtomicBool::new(false),
        }
    }

    /// Directory holding the entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_open(&self) -> Result<(), CacheError> {
        if self.closed.load(Ordering::Acquire) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{}.{}", digest, ENTRY_EXT))
    }

    /// Split an entry file into its key and value.
    fn decode_entry(bytes: &[u8]) -> Option<(&str, &[u8])> {
        let newline = bytes.iter().position(|b| *b == b'\n')?;
        let key = std::str::from_utf8(&bytes[..newline]).ok()?;
        Some((key, &bytes[newline + 1..]))
    }
}

fn backend_err(context: &str, err: std::io::Error) -> CacheError {
    CacheError::Backend(format!("{}: {}", context, err))
}

#[async_trait]
impl KvBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.ensure_open()?;
        let bytes = match fs::read(self.entry_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(backend_err("cannot read cache entry", e)),
        };
        match Self::decode_entry(&bytes) {
            Some((stored_key, value)) if stored_key == key => Ok(Some(value.to_vec())),
            Some(_) => Ok(None),
            None => Err(CacheError::Backend("malformed cache entry".into())),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.ensure_open()?;
        if key.contains('\n') {
            return Err(CacheError::Backend("cache keys cannot contain newlines".into()));
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| backend_err("cannot create cache directory", e))?;

        let mut contents = Vec::with_capacity(key.len() + 1 + value.len());
        contents.extend_from_slice(key.as_bytes());
        contents.push(b'\n');
        contents.extend_from_slice(&value);

        let final_path = self.entry_path(key);
        let temp_path = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        fs::write(&temp_path, &contents)
            .await
            .map_err(|e| backend_err("cannot write temp file", e))?;

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(backend_err("cannot rename temp file", e));
        }
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        self.ensure_open()?;
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(backend_err("cannot list cache directory", e)),
        };

        let mut keys = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| backend_err("cannot list cache directory", e))?
        {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                // Replaced or removed between listing and reading.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(backend_err("cannot read cache entry", e)),
            };
            if let Some((key, _)) = Self::decode_entry(&bytes) {
                if key.starts_with(prefix) {
                    keys.push(key.to_string());
                }
            }
        }
        Ok(keys)
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
