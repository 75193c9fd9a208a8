use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use glyph_types::ContentRef;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock` as
/// shared slices, so reads only clone the bytes handed back to the caller.
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<ContentRef, Arc<[u8]>>>,
    next_ref: AtomicU64,
    max_blob_size: Option<usize>,
}

impl InMemoryContentStore {
    /// Create a new empty store with no size ceiling.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            next_ref: AtomicU64::new(1),
            max_blob_size: None,
        }
    }

    /// Create a store that rejects blobs larger than `limit` bytes.
    pub fn with_max_blob_size(limit: usize) -> Self {
        Self {
            max_blob_size: Some(limit),
            ..Self::new()
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|blob| blob.len() as u64)
            .sum()
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn write(&self, data: &[u8]) -> StoreResult<ContentRef> {
        if let Some(limit) = self.max_blob_size {
            if data.len() > limit {
                return Err(StoreError::TooLarge {
                    size: data.len(),
                    limit,
                });
            }
        }
        let mut map = self.blobs.write().map_err(|_| StoreError::LockPoisoned)?;
        let content = ContentRef::from_raw(self.next_ref.fetch_add(1, Ordering::SeqCst));
        map.insert(content, Arc::from(data));
        Ok(content)
    }

    fn read(&self, content: ContentRef) -> StoreResult<Vec<u8>> {
        if content.is_null() {
            return Err(StoreError::Dangling(content));
        }
        let map = self.blobs.read().map_err(|_| StoreError::LockPoisoned)?;
        map.get(&content)
            .map(|blob| blob.to_vec())
            .ok_or(StoreError::Dangling(content))
    }

    fn contains(&self, content: ContentRef) -> StoreResult<bool> {
        let map = self.blobs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.contains_key(&content))
    }

    fn discard(&self, content: ContentRef) -> StoreResult<bool> {
        let mut map = self.blobs.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.remove(&content).is_some())
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("blob_count", &self.len())
            .field("max_blob_size", &self.max_blob_size)
            .finish()
    }
}
