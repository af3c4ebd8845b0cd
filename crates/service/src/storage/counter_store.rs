use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use tokio::{fs, sync::RwLock};

use crate::errors::StoreError;

/// JSON file-backed counter store for one group.
///
/// Persists a `BTreeMap<String, u64>` of counter key to hit count. One
/// instance maps to one file under the storage root; key enumeration comes
/// back in ascending key order.
#[derive(Debug)]
pub struct CounterStore {
    inner: RwLock<BTreeMap<String, u64>>,
    file_path: PathBuf,
}

impl CounterStore {
    /// Open the store at the given path. Creates the file with an empty map
    /// if missing. A file that exists but does not parse is an error:
    /// silently resetting counters would break the hit-count invariant.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, StoreError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }

        let map: BTreeMap<String, u64> = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupt(format!("{}: {e}", file_path.display())))?,
            Err(_) => {
                let empty = BTreeMap::new();
                let data =
                    serde_json::to_vec(&empty).map_err(|e| StoreError::Io(e.to_string()))?;
                fs::write(&file_path, data)
                    .await
                    .map_err(|e| StoreError::Io(e.to_string()))?;
                empty
            }
        };

        Ok(Arc::new(Self { inner: RwLock::new(map), file_path }))
    }

    /// Add 1 to the counter (absent counts as 0), persist the map before
    /// returning, and return the new value. Mutation and write-out happen
    /// under one write-lock hold so concurrent increments serialize.
    pub async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let mut map = self.inner.write().await;
        let value = map.entry(key.to_string()).or_insert(0);
        *value = value.saturating_add(1);
        let new_value = *value;
        self.save(&map).await?;
        Ok(new_value)
    }

    /// Current value of a counter, `None` when absent. Fallible so callers
    /// can tell a missing key apart from a failed read.
    pub async fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let map = self.inner.read().await;
        Ok(map.get(key).copied())
    }

    /// All counter keys, ascending.
    pub async fn keys(&self) -> Vec<String> {
        let map = self.inner.read().await;
        map.keys().cloned().collect()
    }

    /// Flush the current map to disk. Called once at shutdown.
    pub async fn close(&self) -> Result<(), StoreError> {
        let map = self.inner.read().await;
        self.save(&map).await
    }

    async fn save(&self, map: &BTreeMap<String, u64>) -> Result<(), StoreError> {
        let data = serde_json::to_vec(map).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::write(&self.file_path, data)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn tmp_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("counter_store_{}.json", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn increment_persists_and_reloads() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = CounterStore::open(&tmp).await?;

        assert_eq!(store.increment("clicks").await?, 1);
        assert_eq!(store.increment("clicks").await?, 2);
        assert_eq!(store.increment("views").await?, 1);
        assert_eq!(store.get("clicks").await?, Some(2));
        assert_eq!(store.get("missing").await?, None);

        // reload from disk to ensure every increment was written through
        let reloaded = CounterStore::open(&tmp).await?;
        assert_eq!(reloaded.get("clicks").await?, Some(2));
        assert_eq!(reloaded.get("views").await?, Some(1));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn keys_come_back_sorted() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = CounterStore::open(&tmp).await?;
        store.increment("zeta").await?;
        store.increment("alpha").await?;
        store.increment("mid").await?;
        assert_eq!(store.keys().await, vec!["alpha", "mid", "zeta"]);
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_fails_open() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        tokio::fs::write(&tmp, b"not json at all").await?;
        let err = CounterStore::open(&tmp).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_increments_do_not_lose_updates() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = CounterStore::open(&tmp).await?;

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move { store.increment("hits").await }));
        }
        for task in tasks {
            task.await??;
        }
        assert_eq!(store.get("hits").await?, Some(50));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
