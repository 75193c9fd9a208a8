//! Insertion-ordered enumeration of every canonical key ever written.

use std::collections::HashMap;

use glyph_types::CanonicalKey;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Ordered set of canonical keys in first-insertion order.
///
/// Backed by a list plus a `key → 1-based position` map, so membership is
/// O(1) and pages are stable: keys are only ever appended, never removed or
/// reordered. Serialized as the bare list; positions are rebuilt on load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CanonicalKey>", into = "Vec<CanonicalKey>")]
pub struct EnumerationIndex {
    keys: Vec<CanonicalKey>,
    positions: HashMap<CanonicalKey, u64>,
}

impl EnumerationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `key` if it is not already present.
    ///
    /// Returns `true` when the key was newly inserted.
    pub fn insert(&mut self, key: CanonicalKey) -> bool {
        if self.positions.contains_key(&key) {
            return false;
        }
        self.keys.push(key);
        self.positions.insert(key, self.keys.len() as u64);
        true
    }

    /// Number of distinct keys ever inserted.
    pub fn count(&self) -> u64 {
        self.keys.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.positions.contains_key(key)
    }

    /// 1-based insertion position of `key`.
    pub fn position(&self, key: &CanonicalKey) -> Option<u64> {
        self.positions.get(key).copied()
    }

    /// Keys in insertion order starting at `offset`, at most `limit` of them.
    ///
    /// An `offset` at or past the end yields an empty page rather than an
    /// error; `limit` is truncated to whatever remains.
    pub fn page(&self, offset: u64, limit: u64) -> Vec<CanonicalKey> {
        let count = self.count();
        if offset >= count {
            return Vec::new();
        }
        let end = offset.saturating_add(limit).min(count);
        self.keys[offset as usize..end as usize].to_vec()
    }

    /// All keys in insertion order.
    pub fn keys(&self) -> &[CanonicalKey] {
        &self.keys
    }
}

impl TryFrom<Vec<CanonicalKey>> for EnumerationIndex {
    type Error = IndexError;

    fn try_from(keys: Vec<CanonicalKey>) -> Result<Self, Self::Error> {
        let mut index = Self::new();
        for key in keys {
            if !index.insert(key) {
                return Err(IndexError::DuplicateKey(key));
            }
        }
        Ok(index)
    }
}

impl From<EnumerationIndex> for Vec<CanonicalKey> {
    fn from(index: EnumerationIndex) -> Self {
        index.keys
    }
}
