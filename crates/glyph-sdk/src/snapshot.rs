//! On-disk persistence of registry metadata.
//!
//! Blobs live in the content store; a snapshot holds everything else: the
//! key registry (records, history, enumeration) and both binding tables.
//! Snapshots are bincode-encoded and replaced atomically.

use std::fs;
use std::io::Write;
use std::path::Path;

use glyph_index::BindingIndex;
use glyph_registry::KeyRegistry;
use glyph_store::ContentStore;
use glyph_types::Address;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{RegistryError, RegistryResult};

const FORMAT_VERSION: u32 = 1;

/// Mutable registry metadata guarded by the registry's state lock.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    pub keys: KeyRegistry,
    pub bindings: BindingIndex,
}

impl RegistryState {
    /// Check internal consistency and that every record resolves in `store`.
    pub fn verify(&self, store: &dyn ContentStore) -> RegistryResult<()> {
        self.keys
            .check_integrity()
            .map_err(|e| RegistryError::Snapshot(e.to_string()))?;
        if let Some(key) = self.bindings.targets().find(|key| !self.keys.contains(key)) {
            return Err(RegistryError::Snapshot(format!(
                "binding targets key {key} with no record"
            )));
        }
        for key in self.keys.enumeration().keys() {
            for record in self.keys.history(key)? {
                if !store.contains(record.content)? {
                    return Err(RegistryError::Snapshot(format!(
                        "version {} of {key} points at missing blob {}",
                        record.version, record.content
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    format_version: u32,
    owner: Address,
    state: RegistryState,
}

/// Write `state` to `path` via a temp file in the same directory + rename.
pub(crate) fn save(path: &Path, owner: Address, state: &RegistryState) -> RegistryResult<()> {
    let bytes = bincode::serialize(&SnapshotRef {
        format_version: FORMAT_VERSION,
        owner,
        state,
    })
    .map_err(|e| RegistryError::Snapshot(e.to_string()))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(storage)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(storage)?;
    tmp.write_all(&bytes).map_err(storage)?;
    tmp.as_file().sync_all().map_err(storage)?;
    tmp.persist(path).map_err(|e| storage(e.error))?;

    info!(
        path = %path.display(),
        keys = state.keys.len(),
        bytes = bytes.len(),
        "snapshot saved"
    );
    Ok(())
}

/// Read a snapshot, returning the owner it was written under and its state.
pub(crate) fn load(path: &Path) -> RegistryResult<(Address, RegistryState)> {
    let bytes = fs::read(path).map_err(storage)?;
    let snapshot: Snapshot =
        bincode::deserialize(&bytes).map_err(|e| RegistryError::Snapshot(e.to_string()))?;
    if snapshot.format_version != FORMAT_VERSION {
        return Err(RegistryError::Snapshot(format!(
            "unsupported snapshot format {}",
            snapshot.format_version
        )));
    }
    info!(
        path = %path.display(),
        keys = snapshot.state.keys.len(),
        "snapshot loaded"
    );
    Ok((snapshot.owner, snapshot.state))
}

/// Borrowing twin of [`Snapshot`] so saving does not clone the state.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    format_version: u32,
    owner: Address,
    state: &'a RegistryState,
}

fn storage(err: std::io::Error) -> RegistryError {
    RegistryError::StorageFailure(err.to_string())
}
