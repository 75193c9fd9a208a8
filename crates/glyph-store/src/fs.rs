//! Filesystem-backed content store.
//!
//! Layout under the store root:
//!
//! ```text
//! objects/{first 2 hex}/{16 hex digits of ref}   one file per blob
//! tmp/                                           in-flight writes
//! ```
//!
//! Blob file format:
//!
//! ```text
//! [4 bytes: magic "GLB1"]
//! [32 bytes: BLAKE3 digest of payload]
//! [N bytes: payload]
//! ```
//!
//! Writes go to a temp file in `tmp/`, are synced, and are then renamed into
//! place, so a crashed or rejected write never leaves a visible blob.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use glyph_crypto::ContentDigest;
use glyph_types::ContentRef;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

const OBJECTS_DIR: &str = "objects";
const TMP_DIR: &str = "tmp";
const MAGIC: &[u8; 4] = b"GLB1";
const HEADER_SIZE: usize = MAGIC.len() + ContentDigest::LEN;

/// Content store keeping one immutable file per blob.
pub struct FsContentStore {
    root: PathBuf,
    /// Next reference to issue. Held across the rename so two writers can
    /// never race for the same file name.
    next_ref: Mutex<u64>,
    max_blob_size: Option<usize>,
}

impl FsContentStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// Scans existing blobs to resume reference allocation after the highest
    /// reference already on disk. Leftover temp files from interrupted
    /// writes are removed.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(OBJECTS_DIR))?;
        fs::create_dir_all(root.join(TMP_DIR))?;

        for entry in fs::read_dir(root.join(TMP_DIR))? {
            let path = entry?.path();
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove stale temp blob");
            }
        }

        let highest = Self::scan_highest_ref(&root)?;
        debug!(root = %root.display(), highest, "content store opened");

        Ok(Self {
            root,
            next_ref: Mutex::new(highest + 1),
            max_blob_size: None,
        })
    }

    /// Reject blobs larger than `limit` bytes.
    pub fn with_max_blob_size(mut self, limit: usize) -> Self {
        self.max_blob_size = Some(limit);
        self
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scan_highest_ref(root: &Path) -> StoreResult<u64> {
        let mut highest = 0u64;
        for shard in fs::read_dir(root.join(OBJECTS_DIR))? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for blob in fs::read_dir(shard.path())? {
                let name = blob?.file_name();
                let Some(raw) = name
                    .to_str()
                    .and_then(|s| u64::from_str_radix(s, 16).ok())
                else {
                    continue;
                };
                highest = highest.max(raw);
            }
        }
        Ok(highest)
    }

    fn blob_path(&self, content: ContentRef) -> PathBuf {
        let name = format!("{:016x}", content.as_u64());
        self.root.join(OBJECTS_DIR).join(&name[..2]).join(name)
    }

    fn decode(content: ContentRef, raw: Vec<u8>) -> StoreResult<Vec<u8>> {
        if raw.len() < HEADER_SIZE || &raw[..MAGIC.len()] != MAGIC {
            return Err(StoreError::Corrupt {
                content,
                reason: "missing blob header".into(),
            });
        }
        let mut digest = [0u8; ContentDigest::LEN];
        digest.copy_from_slice(&raw[MAGIC.len()..HEADER_SIZE]);
        let digest = ContentDigest::from_raw(digest);

        let payload = raw[HEADER_SIZE..].to_vec();
        if !digest.matches(&payload) {
            return Err(StoreError::Corrupt {
                content,
                reason: format!("digest mismatch, expected {digest}"),
            });
        }
        Ok(payload)
    }
}

impl ContentStore for FsContentStore {
    fn write(&self, data: &[u8]) -> StoreResult<ContentRef> {
        if let Some(limit) = self.max_blob_size {
            if data.len() > limit {
                return Err(StoreError::TooLarge {
                    size: data.len(),
                    limit,
                });
            }
        }

        let mut tmp = NamedTempFile::new_in(self.root.join(TMP_DIR))?;
        tmp.write_all(MAGIC)?;
        tmp.write_all(ContentDigest::compute(data).as_bytes())?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;

        let mut next = self.next_ref.lock().map_err(|_| StoreError::LockPoisoned)?;
        let content = ContentRef::from_raw(*next);
        let dest = self.blob_path(content);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        // On failure the temp file is dropped and deleted; nothing is visible.
        tmp.persist_noclobber(&dest).map_err(|e| StoreError::Io(e.error))?;
        *next += 1;

        debug!(%content, len = data.len(), "blob written");
        Ok(content)
    }

    fn read(&self, content: ContentRef) -> StoreResult<Vec<u8>> {
        if content.is_null() {
            return Err(StoreError::Dangling(content));
        }
        let mut file = match File::open(self.blob_path(content)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Dangling(content));
            }
            Err(e) => return Err(e.into()),
        };
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;
        Self::decode(content, raw)
    }

    fn contains(&self, content: ContentRef) -> StoreResult<bool> {
        if content.is_null() {
            return Ok(false);
        }
        Ok(self.blob_path(content).is_file())
    }

    fn discard(&self, content: ContentRef) -> StoreResult<bool> {
        if content.is_null() {
            return Ok(false);
        }
        match fs::remove_file(self.blob_path(content)) {
            Ok(()) => {
                debug!(%content, "blob discarded");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for FsContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsContentStore")
            .field("root", &self.root)
            .field("max_blob_size", &self.max_blob_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(dir.path()).unwrap();
        let content = store.write(b"\x89PNG payload").unwrap();
        assert_eq!(store.read(content).unwrap(), b"\x89PNG payload");
        assert!(store.contains(content).unwrap());
    }

    #[test]
    fn empty_blob_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(dir.path()).unwrap();
        let content = store.write(b"").unwrap();
        assert!(store.read(content).unwrap().is_empty());
    }

    #[test]
    fn refs_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = {
            let store = FsContentStore::open(dir.path()).unwrap();
            (store.write(b"one").unwrap(), store.write(b"two").unwrap())
        };

        let store = FsContentStore::open(dir.path()).unwrap();
        assert_eq!(store.read(a).unwrap(), b"one");
        assert_eq!(store.read(b).unwrap(), b"two");

        let c = store.write(b"three").unwrap();
        assert!(c.as_u64() > b.as_u64());
    }

    #[test]
    fn missing_and_null_refs_are_dangling() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.read(ContentRef::null()),
            Err(StoreError::Dangling(_))
        ));
        assert!(matches!(
            store.read(ContentRef::from_raw(77)),
            Err(StoreError::Dangling(_))
        ));
    }

    #[test]
    fn corruption_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(dir.path()).unwrap();
        let content = store.write(b"pristine bytes").unwrap();

        let path = store.blob_path(content);
        let mut raw = fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        fs::write(&path, raw).unwrap();

        assert!(matches!(
            store.read(content),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn oversize_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(dir.path())
            .unwrap()
            .with_max_blob_size(3);
        assert!(matches!(
            store.write(b"four"),
            Err(StoreError::TooLarge { size: 4, limit: 3 })
        ));
        assert_eq!(FsContentStore::scan_highest_ref(dir.path()).unwrap(), 0);
        assert_eq!(fs::read_dir(dir.path().join(TMP_DIR)).unwrap().count(), 0);
    }

    #[test]
    fn discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(dir.path()).unwrap();
        let content = store.write(b"staged").unwrap();
        assert!(store.discard(content).unwrap());
        assert!(!store.contains(content).unwrap());
        assert!(!store.discard(content).unwrap());
    }

    #[test]
    fn stale_temp_files_are_cleaned_on_open() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(TMP_DIR)).unwrap();
        fs::write(dir.path().join(TMP_DIR).join("partial"), b"half").unwrap();

        FsContentStore::open(dir.path()).unwrap();
        assert_eq!(fs::read_dir(dir.path().join(TMP_DIR)).unwrap().count(), 0);
    }
}
