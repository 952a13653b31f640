//! cache
//!
//! Namespaced, opaque-value cache store and the cache-aside freshness policy
//! built on it.
//!
//! # Keys
//!
//! An entry is addressed by `(namespace, table, id)`. The store owns the
//! namespace; callers pass table and id. Reads and writes both use
//! `{namespace}:{table}.{id}`.
//!
//! # Values
//!
//! Values are serialized to JSON bytes and never inspected afterwards.
//! Freshness is decided by [`FreshnessPolicy`], not by the store.
//!
//! # Example
//!
//! ```
//! use chaincall::cache::{CacheStore, MemoryBackend};
//!
//! # tokio_test::block_on(async {
//! let store = CacheStore::new(MemoryBackend::new(), "blog");
//! store.put("Comment", "42", &vec!["first", "second"]).await.unwrap();
//!
//! let back: Option<Vec<String>> = store.get("Comment", "42").await.unwrap();
//! assert_eq!(back, Some(vec!["first".to_string(), "second".to_string()]));
//! # });
//! ```

mod backend;
mod freshness;

pub use backend::{FileBackend, KvBackend, MemoryBackend};
pub use freshness::{
    CacheRead, CachedEntry, Clock, FreshnessPolicy, ManualClock, ReadSource, SystemClock,
    DEFAULT_FRESHNESS,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors from cache operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("failed to serialize cache value: {0}")]
    Serialize(String),

    #[error("failed to deserialize cache value: {0}")]
    Deserialize(String),

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache store is closed")]
    Closed,
}

/// Separator between table and id in stored keys.
const ID_SEPARATOR: char = '.';

/// Namespaced cache over a [`KvBackend`].
#[derive(Debug)]
pub struct CacheStore<B> {
    backend: B,
    namespace: String,
}

impl<B: KvBackend> CacheStore<B> {
    pub fn new(backend: B, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// `{namespace}:{table}`
    pub fn prefix(&self, table: &str) -> String {
        format!("{}:{}", self.namespace, table)
    }

    /// Backend key for one entry: `{namespace}:{table}.{id}`.
    pub fn key(&self, table: &str, id: &str) -> String {
        format!("{}{}{}", self.prefix(table), ID_SEPARATOR, id)
    }

    /// Serialize and store `value`, overwriting any previous entry.
    ///
    /// Returns `id`.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        table: &str,
        id: &str,
        value: &T,
    ) -> Result<String, CacheError> {
        let blob = serde_json::to_vec(value).map_err(|e| CacheError::Serialize(e.to_string()))?;
        self.backend.set(&self.key(table, id), blob).await?;
        Ok(id.to_string())
    }

    /// Read and deserialize an entry. Absent entries are `Ok(None)`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<Option<T>, CacheError> {
        match self.backend.get(&self.key(table, id)).await? {
            Some(blob) => decode(&blob).map(Some),
            None => Ok(None),
        }
    }

    /// Every `(id, value)` in `table`, in no particular order.
    ///
    /// Ids are recovered by stripping the table prefix and separator from
    /// each stored key. Entries removed between the scan and the read are
    /// skipped.
    pub async fn entries<T: DeserializeOwned>(
        &self,
        table: &str,
    ) -> Result<Vec<(String, T)>, CacheError> {
        let scan_prefix = format!("{}{}", self.prefix(table), ID_SEPARATOR);
        let keys = self.backend.keys(&scan_prefix).await?;

        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let id = key[scan_prefix.len()..].to_string();
            if let Some(blob) = self.backend.get(&key).await? {
                out.push((id, decode(&blob)?));
            }
        }
        Ok(out)
    }

    /// Every value in `table`, in no particular order.
    pub async fn enumerate<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, CacheError> {
        Ok(self
            .entries(table)
            .await?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// Release the backend.
    pub async fn close(&self) -> Result<(), CacheError> {
        self.backend.close().await
    }
}

fn decode<T: DeserializeOwned>(blob: &[u8]) -> Result<T, CacheError> {
    serde_json::from_slice(blob).map_err(|e| CacheError::Deserialize(e.to_string()))
}
