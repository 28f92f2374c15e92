pub mod sled;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::base::types::{Res, Void};

// Traits.

/// Generic key-value store trait that backends must implement.
///
/// Values are raw JSON bytes; the typed surface with fallback semantics lives
/// on [`KvClient`]. A namespace is a per-(chat, table) partition of the store,
/// created lazily on first use.
#[async_trait]
pub trait GenericKvStore: Send + Sync + 'static {
    /// Write `bytes` under `key` in `namespace`, overwriting any existing
    /// value. The write is durable on disk once this returns.
    async fn put_raw(&self, namespace: &str, key: &str, bytes: &[u8]) -> Void;

    /// Read the raw bytes stored under `key` in `namespace`.
    async fn get_raw(&self, namespace: &str, key: &str) -> Res<Option<Vec<u8>>>;

    /// Delete the entry at `key` in `namespace`. Absent keys are not an error.
    async fn delete_raw(&self, namespace: &str, key: &str) -> Void;
}

// Structs.

/// Store client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct KvClient {
    inner: Arc<dyn GenericKvStore>,
}

impl Deref for KvClient {
    type Target = dyn GenericKvStore;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl KvClient {
    pub fn new(inner: Arc<dyn GenericKvStore>) -> Self {
        Self { inner }
    }

    /// Serializes `value` to JSON and writes it under `namespace`/`key`.
    pub async fn put<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> Void {
        let bytes = serde_json::to_vec(value)?;
        self.inner.put_raw(namespace, key, &bytes).await
    }

    /// Removes the entry at `namespace`/`key` if present.
    pub async fn delete(&self, namespace: &str, key: &str) -> Void {
        self.inner.delete_raw(namespace, key).await
    }

    /// Reads and decodes the value at `namespace`/`key`, returning `fallback`
    /// when the key is absent or the stored bytes cannot be decoded.
    ///
    /// This never fails: a missing key and a corrupt value are
    /// indistinguishable to callers, both yield `fallback`.
    pub async fn fetch_or<T: DeserializeOwned>(&self, namespace: &str, key: &str, fallback: T) -> T {
        match self.inner.get_raw(namespace, key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(err) => {
                    debug!("Discarding undecodable value at `{namespace}`/`{key}`: {err}");
                    fallback
                }
            },
            Ok(None) => fallback,
            Err(err) => {
                debug!("Store read failed for `{namespace}`/`{key}`: {err}");
                fallback
            }
        }
    }
}
