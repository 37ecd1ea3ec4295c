use std::sync::Arc;

use dashmap::DashMap;
use umap_files::package::types::Package;

/// Concurrent, size bounded package cache. Keys are case-insensitive. Once the capacity is reached an arbitrary
/// entry is evicted before inserting, there is no recency tracking. Concurrent inserts may overshoot the capacity
/// by the number of racing writers.
pub struct PackageCache {
    inner: DashMap<String, Arc<Package>>,
    capacity: usize,
}

impl PackageCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: DashMap::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<Arc<Package>> {
        self.inner
            .get(&key.to_ascii_lowercase())
            .map(|entry| entry.value().clone())
    }

    #[inline]
    pub fn insert(&self, key: &str, package: Arc<Package>) {
        let key = key.to_ascii_lowercase();
        if !self.inner.contains_key(&key) {
            self.try_evict();
        }

        self.inner.insert(key, package);
    }

    #[inline]
    fn try_evict(&self) {
        while self.inner.len() >= self.capacity {
            // The shard guard of the iterator must be gone before removing, otherwise this deadlocks.
            let victim = self.inner.iter().next().map(|entry| entry.key().clone());
            match victim {
                Some(victim) => {
                    self.inner.remove(&victim);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn shrink_to_fit(&self) {
        self.inner.shrink_to_fit()
    }
}
