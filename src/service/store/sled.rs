//! Sled implementation for mention-bot storage.

use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use sled::{Db, Tree};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::base::{
    config::Config,
    types::{Res, Void},
};

use super::{GenericKvStore, KvClient};

// Extra methods on `KvClient` applied by the sled implementation.

impl KvClient {
    /// Creates a sled-backed store rooted at the configured storage directory.
    pub fn sled(config: &Config) -> Res<Self> {
        Self::sled_at(&config.storage_dir)
    }

    /// Creates a sled-backed store rooted at an explicit path.
    pub fn sled_at(path: &Path) -> Res<Self> {
        Ok(Self::new(Arc::new(SledKvStore::open(path)?)))
    }
}

// Structs.

/// Sled-backed store: one embedded database, one tree per namespace.
///
/// Tree handles are opened lazily and memoized in a registry whose lifetime is
/// that of the store itself. No TTL or expiry applies to stored entries.
pub struct SledKvStore {
    db: Db,
    trees: RwLock<HashMap<String, Tree>>,
}

impl SledKvStore {
    /// Opens (or creates) the database at `path`.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Res<Self> {
        let db = sled::open(path)?;

        info!("Storage initialized at `{}`.", path.display());

        Ok(Self {
            db,
            trees: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the tree for `namespace`, opening and caching it on first use.
    async fn tree(&self, namespace: &str) -> Res<Tree> {
        if let Some(tree) = self.trees.read().await.get(namespace) {
            return Ok(tree.clone());
        }

        let tree = self.db.open_tree(namespace)?;
        self.trees.write().await.insert(namespace.to_string(), tree.clone());

        Ok(tree)
    }
}

#[async_trait]
impl GenericKvStore for SledKvStore {
    async fn put_raw(&self, namespace: &str, key: &str, bytes: &[u8]) -> Void {
        let tree = self.tree(namespace).await?;

        tree.insert(key.as_bytes(), bytes)?;
        tree.flush_async().await?;

        Ok(())
    }

    async fn get_raw(&self, namespace: &str, key: &str) -> Res<Option<Vec<u8>>> {
        let tree = self.tree(namespace).await?;

        Ok(tree.get(key.as_bytes())?.map(|value| value.to_vec()))
    }

    async fn delete_raw(&self, namespace: &str, key: &str) -> Void {
        let tree = self.tree(namespace).await?;

        tree.remove(key.as_bytes())?;
        tree.flush_async().await?;

        Ok(())
    }
}

// Tests.
