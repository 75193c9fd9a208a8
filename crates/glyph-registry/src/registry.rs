use std::collections::HashMap;

use glyph_index::{EnumerationIndex, KeyPresence};
use glyph_types::{CanonicalKey, ContentRef, Record};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KeyRegistryError, KeyRegistryResult};

/// Outcome of a successful [`KeyRegistry::upsert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Upsert {
    /// The record now current for the key.
    pub record: Record,
    /// `true` when this was the key's first record.
    pub created: bool,
}

/// Current records, version history, and the enumeration of all keys.
///
/// The registry holds no content, only references into a content store.
/// It is a plain data structure; the caller serializes access.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRegistry {
    current: HashMap<CanonicalKey, Record>,
    /// Every committed version, keyed by `(key, version)`. Insert-only.
    history: HashMap<(CanonicalKey, u32), Record>,
    enumeration: EnumerationIndex,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `content` to `key` as its next version.
    ///
    /// The content must already be durably written; this only commits
    /// metadata. A new key starts at version 1 and is appended to the
    /// enumeration. An existing key gets `current + 1`, and its previous
    /// record stays in the history untouched.
    pub fn upsert(
        &mut self,
        key: CanonicalKey,
        content: ContentRef,
        width: u32,
        height: u32,
    ) -> KeyRegistryResult<Upsert> {
        if content.is_null() {
            return Err(KeyRegistryError::NullContent { key });
        }

        let (version, created) = match self.current.get(&key) {
            Some(existing) => (
                existing
                    .version
                    .checked_add(1)
                    .ok_or(KeyRegistryError::VersionOverflow { key })?,
                false,
            ),
            None => (1, true),
        };

        let record = Record {
            content,
            width,
            height,
            version,
        };

        if self.history.contains_key(&(key, version)) {
            return Err(KeyRegistryError::IntegrityViolation {
                key,
                reason: format!("version {version} already present in history"),
            });
        }
        self.history.insert((key, version), record);
        self.current.insert(key, record);
        if created {
            self.enumeration.insert(key);
        }

        debug!(%key, version, %content, created, "record committed");
        Ok(Upsert { record, created })
    }

    /// The current record for `key`.
    pub fn get_current(&self, key: &CanonicalKey) -> KeyRegistryResult<Record> {
        self.current
            .get(key)
            .copied()
            .ok_or(KeyRegistryError::NotFound { key: *key })
    }

    /// The record committed as `version` of `key`.
    pub fn get_version(&self, key: &CanonicalKey, version: u32) -> KeyRegistryResult<Record> {
        self.history
            .get(&(*key, version))
            .copied()
            .ok_or(KeyRegistryError::VersionNotFound {
                key: *key,
                version,
            })
    }

    /// The current version number of `key`.
    pub fn current_version(&self, key: &CanonicalKey) -> KeyRegistryResult<u32> {
        self.get_current(key).map(|record| record.version)
    }

    /// Every record of `key`, oldest first.
    pub fn history(&self, key: &CanonicalKey) -> KeyRegistryResult<Vec<Record>> {
        let latest = self.current_version(key)?;
        (1..=latest)
            .map(|version| self.get_version(key, version))
            .collect()
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.current.contains_key(key)
    }

    /// Number of distinct keys with a record.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn enumeration(&self) -> &EnumerationIndex {
        &self.enumeration
    }

    /// Check the structural invariants, e.g. after loading a snapshot.
    ///
    /// Verifies that every key's history is exactly `1..=current`, that the
    /// current record equals the latest history entry, and that the
    /// enumeration lists exactly the keys with records.
    pub fn check_integrity(&self) -> KeyRegistryResult<()> {
        let mut expected_history = 0usize;
        for (key, current) in &self.current {
            if current.version == 0 {
                return Err(KeyRegistryError::IntegrityViolation {
                    key: *key,
                    reason: "current record has version 0".into(),
                });
            }
            for version in 1..=current.version {
                let record = self.history.get(&(*key, version)).ok_or_else(|| {
                    KeyRegistryError::IntegrityViolation {
                        key: *key,
                        reason: format!("history is missing version {version}"),
                    }
                })?;
                if record.version != version || record.content.is_null() {
                    return Err(KeyRegistryError::IntegrityViolation {
                        key: *key,
                        reason: format!("history entry {version} is malformed"),
                    });
                }
            }
            if self.history.get(&(*key, current.version)) != Some(current) {
                return Err(KeyRegistryError::IntegrityViolation {
                    key: *key,
                    reason: "current record differs from latest history entry".into(),
                });
            }
            if !self.enumeration.contains(key) {
                return Err(KeyRegistryError::IntegrityViolation {
                    key: *key,
                    reason: "key missing from enumeration".into(),
                });
            }
            expected_history += current.version as usize;
        }

        if let Some(key) = self
            .enumeration
            .keys()
            .iter()
            .find(|key| !self.current.contains_key(*key))
        {
            return Err(KeyRegistryError::IntegrityViolation {
                key: *key,
                reason: "enumerated key has no record".into(),
            });
        }
        if let Some((key, version)) = self
            .history
            .keys()
            .find(|(key, _)| !self.current.contains_key(key))
        {
            return Err(KeyRegistryError::IntegrityViolation {
                key: *key,
                reason: format!("orphaned history entry {version}"),
            });
        }
        if self.history.len() != expected_history {
            return Err(KeyRegistryError::IntegrityViolation {
                key: CanonicalKey::zero(),
                reason: format!(
                    "history holds {} entries, expected {expected_history}",
                    self.history.len()
                ),
            });
        }
        Ok(())
    }
}

impl KeyPresence for KeyRegistry {
    fn has_record(&self, key: &CanonicalKey) -> bool {
        self.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(n: u8) -> CanonicalKey {
        CanonicalKey::from_hash([n; 32])
    }

    fn content(n: u64) -> ContentRef {
        ContentRef::from_raw(n)
    }

    #[test]
    fn first_upsert_creates_version_one() {
        let mut registry = KeyRegistry::new();
        let upsert = registry.upsert(key(1), content(10), 32, 32).unwrap();
        assert!(upsert.created);
        assert_eq!(upsert.record.version, 1);
        assert_eq!(registry.current_version(&key(1)).unwrap(), 1);
        assert_eq!(registry.enumeration().count(), 1);
    }

    #[test]
    fn update_bumps_version_and_keeps_history() {
        let mut registry = KeyRegistry::new();
        registry.upsert(key(1), content(10), 32, 32).unwrap();
        let upsert = registry.upsert(key(1), content(11), 64, 64).unwrap();
        assert!(!upsert.created);
        assert_eq!(upsert.record.version, 2);

        let v1 = registry.get_version(&key(1), 1).unwrap();
        assert_eq!(v1.content, content(10));
        assert_eq!((v1.width, v1.height), (32, 32));

        let current = registry.get_current(&key(1)).unwrap();
        assert_eq!(current, registry.get_version(&key(1), 2).unwrap());
        assert_eq!(registry.enumeration().count(), 1);
    }

    #[test]
    fn missing_key_is_not_found() {
        let registry = KeyRegistry::new();
        assert_eq!(
            registry.get_current(&key(1)).unwrap_err(),
            KeyRegistryError::NotFound { key: key(1) }
        );
        assert!(registry.current_version(&key(1)).is_err());
    }

    #[test]
    fn unassigned_version_is_reported_with_context() {
        let mut registry = KeyRegistry::new();
        registry.upsert(key(1), content(10), 1, 1).unwrap();
        assert_eq!(
            registry.get_version(&key(1), 2).unwrap_err(),
            KeyRegistryError::VersionNotFound {
                key: key(1),
                version: 2
            }
        );
        assert!(registry.get_version(&key(1), 0).is_err());
    }

    #[test]
    fn null_content_is_rejected() {
        let mut registry = KeyRegistry::new();
        assert!(matches!(
            registry.upsert(key(1), ContentRef::null(), 1, 1),
            Err(KeyRegistryError::NullContent { .. })
        ));
        assert!(registry.is_empty());
        assert!(registry.enumeration().is_empty());
    }

    #[test]
    fn history_is_oldest_first() {
        let mut registry = KeyRegistry::new();
        for n in 1..=4 {
            registry.upsert(key(7), content(n), 1, 1).unwrap();
        }
        let versions: Vec<u32> = registry
            .history(&key(7))
            .unwrap()
            .iter()
            .map(|r| r.version)
            .collect();
        assert_eq!(versions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn integrity_check_passes_on_normal_use() {
        let mut registry = KeyRegistry::new();
        registry.upsert(key(1), content(1), 1, 1).unwrap();
        registry.upsert(key(2), content(2), 1, 1).unwrap();
        registry.upsert(key(1), content(3), 1, 1).unwrap();
        registry.check_integrity().unwrap();
    }

    #[test]
    fn integrity_check_catches_tampered_current() {
        let mut registry = KeyRegistry::new();
        registry.upsert(key(1), content(1), 1, 1).unwrap();
        registry.current.get_mut(&key(1)).unwrap().width = 99;
        assert!(matches!(
            registry.check_integrity(),
            Err(KeyRegistryError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn snapshot_roundtrip_preserves_state() {
        let mut registry = KeyRegistry::new();
        registry.upsert(key(1), content(1), 16, 16).unwrap();
        registry.upsert(key(1), content(2), 32, 32).unwrap();
        registry.upsert(key(2), content(3), 8, 8).unwrap();

        let bytes = bincode::serialize(&registry).unwrap();
        let restored: KeyRegistry = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored, registry);
        restored.check_integrity().unwrap();
    }

    #[test]
    fn presence_follows_records() {
        let mut registry = KeyRegistry::new();
        assert!(!registry.has_record(&key(1)));
        registry.upsert(key(1), content(1), 1, 1).unwrap();
        assert!(registry.has_record(&key(1)));
    }

    proptest! {
        #[test]
        fn versions_are_gapless_and_increasing(ops in proptest::collection::vec(0u8..5, 1..60)) {
            let mut registry = KeyRegistry::new();
            let mut expected: HashMap<u8, u32> = HashMap::new();
            for (i, k) in ops.iter().enumerate() {
                let upsert = registry.upsert(key(*k), content(i as u64 + 1), 1, 1).unwrap();
                let next = expected.entry(*k).or_insert(0);
                *next += 1;
                prop_assert_eq!(upsert.record.version, *next);
                prop_assert_eq!(upsert.created, *next == 1);
            }
            prop_assert_eq!(registry.enumeration().count(), expected.len() as u64);
            prop_assert!(registry.check_integrity().is_ok());
        }

        #[test]
        fn committed_versions_never_change(updates in 1usize..20) {
            let mut registry = KeyRegistry::new();
            registry.upsert(key(1), content(1), 1, 1).unwrap();
            let first = registry.get_version(&key(1), 1).unwrap();
            for n in 0..updates {
                registry.upsert(key(1), content(n as u64 + 2), 2, 2).unwrap();
                prop_assert_eq!(registry.get_version(&key(1), 1).unwrap(), first);
            }
        }
    }
}
