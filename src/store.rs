//! Opaque string-keyed store backing the gateway.
//!
//! Values are raw strings, JSON-encoded by convention; the store itself
//! never inspects them. Last write wins.

use anyhow::{Context, Result};
use fjall::Keyspace;
use std::path::Path;
use tokio::task;

#[derive(Clone)]
pub struct SensorStore {
    store: Keyspace,
}

fn get_raw(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

fn put_raw(store: Keyspace, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
    store.insert(key, value)?;
    Ok(())
}

impl SensorStore {
    /// Opens (or creates) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.as_ref().display()))?;
        let items = db.keyspace("sensors", fjall::KeyspaceCreateOptions::default)?;
        Ok(SensorStore { store: items })
    }

    /// Returns the raw stored string for `key`, or `None` on a miss.
    #[tracing::instrument(name = "store_get", level = "debug", skip(self))]
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_raw(store, key_bytes)).await??;

        Ok(maybe_bytes.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Stores `value` under `key`, replacing any previous value.
    #[tracing::instrument(name = "store_put", level = "debug", skip(self, value))]
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        let value = value.as_bytes().to_vec();

        task::spawn_blocking(move || put_raw(store, key, value)).await??;
        Ok(())
    }
}
