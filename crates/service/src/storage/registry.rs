use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::errors::StoreError;
use crate::storage::counter_store::CounterStore;

/// Process-wide registry of open counter stores, keyed by group name.
///
/// Populated lazily: the first request touching a group opens its store,
/// later requests share the same handle. Drained exactly once at shutdown
/// via [`StoreRegistry::close_all`].
pub struct StoreRegistry {
    data_dir: PathBuf,
    stores: RwLock<HashMap<String, Arc<CounterStore>>>,
}

impl StoreRegistry {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Arc<Self> {
        Arc::new(Self {
            data_dir: data_dir.into(),
            stores: RwLock::new(HashMap::new()),
        })
    }

    /// Get the open store for a group, opening it on first access.
    /// Double-checked under the write lock so concurrent first accesses to
    /// one group open the store exactly once.
    pub async fn get_or_open(&self, group: &str) -> Result<Arc<CounterStore>, StoreError> {
        validate_group(group)?;

        {
            let stores = self.stores.read().await;
            if let Some(store) = stores.get(group) {
                return Ok(Arc::clone(store));
            }
        }

        let mut stores = self.stores.write().await;
        if let Some(store) = stores.get(group) {
            return Ok(Arc::clone(store));
        }

        let path = self.data_dir.join(format!("{group}.json"));
        let store = CounterStore::open(path).await?;
        stores.insert(group.to_string(), Arc::clone(&store));
        debug!(%group, "opened counter store");
        Ok(store)
    }

    /// Close every open store, draining the registry. All closes are
    /// attempted; the first failure is returned after the sweep.
    pub async fn close_all(&self) -> Result<(), StoreError> {
        let mut stores = self.stores.write().await;
        let drained: Vec<(String, Arc<CounterStore>)> = stores.drain().collect();
        let count = drained.len();

        let mut first_err = None;
        for (group, store) in drained {
            if let Err(e) = store.close().await {
                error!(%group, error = %e, "failed to close counter store");
                first_err.get_or_insert(e);
            }
        }
        info!(count, "closed counter stores");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Group names become file names under the storage root; reject anything
/// that would escape it.
fn validate_group(group: &str) -> Result<(), StoreError> {
    if group.is_empty()
        || group == "."
        || group == ".."
        || group.contains('/')
        || group.contains('\\')
    {
        return Err(StoreError::invalid_group(group));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn tmp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("store_registry_{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn same_group_shares_one_store() -> Result<(), anyhow::Error> {
        let dir = tmp_dir();
        let registry = StoreRegistry::new(&dir);

        let a = registry.get_or_open("teamA").await?;
        let b = registry.get_or_open("teamA").await?;
        assert!(Arc::ptr_eq(&a, &b));

        a.increment("clicks").await?;
        assert_eq!(b.get("clicks").await?, Some(1));

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn groups_are_isolated() -> Result<(), anyhow::Error> {
        let dir = tmp_dir();
        let registry = StoreRegistry::new(&dir);

        registry.get_or_open("one").await?.increment("k").await?;
        let other = registry.get_or_open("two").await?;
        assert_eq!(other.get("k").await?, None);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn close_all_drains_and_allows_reopen() -> Result<(), anyhow::Error> {
        let dir = tmp_dir();
        let registry = StoreRegistry::new(&dir);

        registry.get_or_open("teamA").await?.increment("clicks").await?;
        registry.close_all().await?;

        // reopen reads the persisted value back
        let store = registry.get_or_open("teamA").await?;
        assert_eq!(store.get("clicks").await?, Some(1));

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn path_escaping_group_names_rejected() {
        let dir = tmp_dir();
        let registry = StoreRegistry::new(&dir);

        for bad in ["..", "a/b", "a\\b", ""] {
            let err = registry.get_or_open(bad).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidGroup(_)), "{bad:?}");
        }
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
