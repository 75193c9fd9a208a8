use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fs2::FileExt;
use glyph_crypto::KeyHasher;
use glyph_gate::{AccessGuard, FormatValidator, GateConfig};
use glyph_index::BindingRequest;
use glyph_store::{ContentStore, FsContentStore, InMemoryContentStore};
use glyph_types::{Address, CanonicalKey, ContentRef, DomainId, FormatTag, Record, Slug};
use tracing::{debug, info, warn};

use crate::batch::{BindBatch, SetBatch};
use crate::config::RegistryConfig;
use crate::encoder::encode_data_uri;
use crate::error::{RegistryError, RegistryResult};
use crate::snapshot::{self, RegistryState};

/// High-level registry API.
///
/// Mutations are owner-only and serialize on a single writer lock. Each one
/// validates and writes its blobs before taking the state lock, then commits
/// all metadata in one short critical section, so readers never observe a
/// partially applied batch.
pub struct Registry {
    guard: AccessGuard,
    validator: FormatValidator,
    store: Arc<dyn ContentStore>,
    state: RwLock<RegistryState>,
    writer: Mutex<()>,
    snapshot_path: Option<PathBuf>,
    /// Exclusive lock on `data_dir`, held for the registry's lifetime.
    _dir_lock: Option<File>,
}

const LOCK_FILE: &str = "LOCK";

impl Registry {
    /// Create an empty registry over `store`. Nothing is persisted.
    pub fn new(owner: Address, gate: GateConfig, store: Arc<dyn ContentStore>) -> Self {
        Self {
            guard: AccessGuard::new(owner),
            validator: FormatValidator::new(gate),
            store,
            state: RwLock::new(RegistryState::default()),
            writer: Mutex::new(()),
            snapshot_path: None,
            _dir_lock: None,
        }
    }

    /// Create an empty registry backed by memory.
    pub fn in_memory(owner: Address) -> Self {
        Self::new(
            owner,
            GateConfig::default(),
            Arc::new(InMemoryContentStore::new()),
        )
    }

    /// Open the persistent registry under `config.data_dir`.
    ///
    /// Loads the snapshot if one exists. The snapshot must have been written
    /// under the configured owner and every record must resolve in the blob
    /// store. Fails with `Config` while another registry holds `data_dir`.
    pub fn open(config: &RegistryConfig) -> RegistryResult<Self> {
        let dir_lock = lock_data_dir(&config.data_dir)?;
        let store = FsContentStore::open(config.blob_dir())?;
        let snapshot_path = config.snapshot_path();

        let state = if snapshot_path.exists() {
            let (owner, state) = snapshot::load(&snapshot_path)?;
            if owner != config.owner {
                return Err(RegistryError::Config(format!(
                    "snapshot belongs to owner {owner}, config names {}",
                    config.owner
                )));
            }
            state.verify(&store)?;
            state
        } else {
            RegistryState::default()
        };

        info!(
            data_dir = %config.data_dir.display(),
            owner = %config.owner,
            keys = state.keys.len(),
            "registry opened"
        );
        Ok(Self {
            guard: AccessGuard::new(config.owner),
            validator: FormatValidator::new(config.gate.clone()),
            store: Arc::new(store),
            state: RwLock::new(state),
            writer: Mutex::new(()),
            snapshot_path: Some(snapshot_path),
            _dir_lock: Some(dir_lock),
        })
    }

    pub fn owner(&self) -> Address {
        self.guard.owner()
    }

    /// Persist the current metadata. Returns `false` for in-memory registries.
    pub fn save_snapshot(&self) -> RegistryResult<bool> {
        let Some(path) = &self.snapshot_path else {
            debug!("in-memory registry, snapshot skipped");
            return Ok(false);
        };
        let _writer = self.lock_writer()?;
        let state = self.read_state()?;
        snapshot::save(path, self.owner(), &state)?;
        Ok(true)
    }

    // ---- Mutations ----

    /// Store `data` as the next version of `slug`.
    pub fn set(
        &self,
        caller: &Address,
        slug: &Slug,
        data: &[u8],
        width: u32,
        height: u32,
        format: FormatTag,
    ) -> RegistryResult<Record> {
        self.guard.authorize(caller)?;
        self.validator.validate(format, data)?;
        let key = KeyHasher::derive(slug);

        let _writer = self.lock_writer()?;
        let content = self.store.write(data)?;
        let committed = self.write_state().and_then(|mut state| {
            state
                .keys
                .upsert(key, content, width, height)
                .map_err(RegistryError::from)
        });

        match committed {
            Ok(upsert) => {
                info!(
                    %slug,
                    %key,
                    version = upsert.record.version,
                    created = upsert.created,
                    "content set"
                );
                Ok(upsert.record)
            }
            Err(err) => {
                self.discard_staged(&[content]);
                Err(err)
            }
        }
    }

    /// Apply every item of `batch`, or none of them.
    ///
    /// Lengths, batch size and every payload's format are checked before the
    /// store is touched. If a blob write fails, blobs already written for this
    /// batch are discarded. Returns the committed records in batch order.
    pub fn set_batch(&self, caller: &Address, batch: SetBatch) -> RegistryResult<Vec<Record>> {
        self.guard.authorize(caller)?;
        batch.check_lengths()?;
        self.check_batch_len(batch.len())?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        for (index, (format, data)) in batch.formats.iter().zip(&batch.data).enumerate() {
            self.validator
                .validate(*format, data)
                .inspect_err(|err| warn!(index, error = %err, "batch rejected"))?;
        }
        let keys: Vec<CanonicalKey> = batch.slugs.iter().map(KeyHasher::derive).collect();

        let _writer = self.lock_writer()?;
        self.plan_versions(&keys)?;

        let mut staged = Vec::with_capacity(keys.len());
        for (index, data) in batch.data.iter().enumerate() {
            match self.store.write(data) {
                Ok(content) => staged.push(content),
                Err(err) => {
                    warn!(index, error = %err, "batch write failed");
                    self.discard_staged(&staged);
                    return Err(err.into());
                }
            }
        }

        // Versions were planned under the writer lock, so no upsert below
        // can overflow.
        let committed = self.write_state().and_then(|mut state| {
            keys.iter()
                .zip(&staged)
                .zip(batch.widths.iter().zip(&batch.heights))
                .map(|((key, content), (width, height))| {
                    state
                        .keys
                        .upsert(*key, *content, *width, *height)
                        .map(|upsert| upsert.record)
                        .map_err(RegistryError::from)
                })
                .collect::<RegistryResult<Vec<_>>>()
        });

        match committed {
            Ok(records) => {
                info!(count = records.len(), "batch committed");
                Ok(records)
            }
            Err(err) => {
                self.discard_staged(&staged);
                Err(err)
            }
        }
    }

    /// Point `(entity, domain)` at the key of `slug`, which must have a record.
    pub fn bind(
        &self,
        caller: &Address,
        entity: Address,
        domain: DomainId,
        slug: &Slug,
    ) -> RegistryResult<CanonicalKey> {
        self.guard.authorize(caller)?;
        let key = KeyHasher::derive(slug);

        let _writer = self.lock_writer()?;
        let mut state = self.write_state()?;
        let RegistryState { keys, bindings } = &mut *state;
        bindings.bind(&*keys, entity, domain, key)?;
        info!(%entity, %domain, %slug, "entity bound");
        Ok(key)
    }

    /// Bind every `(entity, domain, slug)` triple, or none of them.
    pub fn bind_batch(&self, caller: &Address, batch: BindBatch) -> RegistryResult<usize> {
        self.guard.authorize(caller)?;
        batch.check_lengths()?;
        self.check_batch_len(batch.len())?;

        let requests: Vec<BindingRequest> = batch
            .entities
            .iter()
            .zip(&batch.domains)
            .zip(&batch.slugs)
            .map(|((entity, domain), slug)| BindingRequest {
                entity: *entity,
                domain: *domain,
                key: KeyHasher::derive(slug),
            })
            .collect();

        let _writer = self.lock_writer()?;
        let mut state = self.write_state()?;
        let RegistryState { keys, bindings } = &mut *state;
        let bound = bindings
            .bind_batch(&*keys, &requests)
            .inspect_err(|err| warn!(error = %err, "binding batch rejected"))?;
        info!(count = bound, "binding batch committed");
        Ok(bound)
    }

    /// Point `domain` at the key of `slug`, which must have a record.
    pub fn bind_domain(
        &self,
        caller: &Address,
        domain: DomainId,
        slug: &Slug,
    ) -> RegistryResult<CanonicalKey> {
        self.guard.authorize(caller)?;
        let key = KeyHasher::derive(slug);

        let _writer = self.lock_writer()?;
        let mut state = self.write_state()?;
        let RegistryState { keys, bindings } = &mut *state;
        bindings.bind_domain(&*keys, domain, key)?;
        info!(%domain, %slug, "domain bound");
        Ok(key)
    }

    // ---- Queries ----

    /// Current content of `key`.
    pub fn get(&self, key: &CanonicalKey) -> RegistryResult<Vec<u8>> {
        let record = self.record(key)?;
        self.load(&record)
    }

    pub fn get_by_slug(&self, slug: &Slug) -> RegistryResult<Vec<u8>> {
        self.get(&KeyHasher::derive(slug))
    }

    /// Current record of `key`.
    pub fn record(&self, key: &CanonicalKey) -> RegistryResult<Record> {
        Ok(self.read_state()?.keys.get_current(key)?)
    }

    /// Content committed as `version` of `key`.
    pub fn get_version(&self, key: &CanonicalKey, version: u32) -> RegistryResult<Vec<u8>> {
        let record = self.record_version(key, version)?;
        self.load(&record)
    }

    pub fn record_version(&self, key: &CanonicalKey, version: u32) -> RegistryResult<Record> {
        Ok(self.read_state()?.keys.get_version(key, version)?)
    }

    pub fn current_version(&self, key: &CanonicalKey) -> RegistryResult<u32> {
        Ok(self.read_state()?.keys.current_version(key)?)
    }

    /// Format of the current content of `key`, read from its signature.
    ///
    /// Records do not carry the declared format, so this is how callers
    /// pick a MIME type for content they did not write.
    pub fn detect_format(&self, key: &CanonicalKey) -> RegistryResult<Option<FormatTag>> {
        Ok(self.validator.detect(&self.get(key)?))
    }

    /// Every record of `key`, oldest first.
    pub fn history(&self, key: &CanonicalKey) -> RegistryResult<Vec<Record>> {
        Ok(self.read_state()?.keys.history(key)?)
    }

    pub fn resolve(&self, entity: &Address, domain: DomainId) -> RegistryResult<Option<CanonicalKey>> {
        Ok(self.read_state()?.bindings.resolve(entity, domain))
    }

    pub fn resolve_domain(&self, domain: DomainId) -> RegistryResult<Option<CanonicalKey>> {
        Ok(self.read_state()?.bindings.resolve_domain(domain))
    }

    pub fn get_by_entity(&self, entity: &Address, domain: DomainId) -> RegistryResult<Vec<u8>> {
        let key = self
            .resolve(entity, domain)?
            .ok_or(RegistryError::BindingNotFound {
                entity: Some(*entity),
                domain,
            })?;
        self.get(&key)
    }

    pub fn get_by_domain(&self, domain: DomainId) -> RegistryResult<Vec<u8>> {
        let key = self
            .resolve_domain(domain)?
            .ok_or(RegistryError::BindingNotFound {
                entity: None,
                domain,
            })?;
        self.get(&key)
    }

    pub fn has_binding(&self, entity: &Address, domain: DomainId) -> RegistryResult<bool> {
        Ok(self.read_state()?.bindings.has_binding(entity, domain))
    }

    /// Current content of `key` as a `data:` URI.
    pub fn data_uri(&self, key: &CanonicalKey, mime: &str) -> RegistryResult<String> {
        Ok(encode_data_uri(mime, &self.get(key)?))
    }

    pub fn data_uri_by_entity(
        &self,
        entity: &Address,
        domain: DomainId,
        mime: &str,
    ) -> RegistryResult<String> {
        Ok(encode_data_uri(mime, &self.get_by_entity(entity, domain)?))
    }

    /// Current content of each key; missing keys yield an empty vector.
    pub fn batch_get(&self, keys: &[CanonicalKey]) -> RegistryResult<Vec<Vec<u8>>> {
        let records: Vec<Option<Record>> = {
            let state = self.read_state()?;
            keys.iter()
                .map(|key| state.keys.get_current(key).ok())
                .collect()
        };
        Ok(records.iter().map(|record| self.load_or_empty(record.as_ref())).collect())
    }

    /// Content bound to each `(entity, domain)`; unbound pairs yield an
    /// empty vector.
    pub fn batch_get_by_entity(
        &self,
        pairs: &[(Address, DomainId)],
    ) -> RegistryResult<Vec<Vec<u8>>> {
        let records: Vec<Option<Record>> = {
            let state = self.read_state()?;
            pairs
                .iter()
                .map(|(entity, domain)| {
                    state
                        .bindings
                        .resolve(entity, *domain)
                        .and_then(|key| state.keys.get_current(&key).ok())
                })
                .collect()
        };
        Ok(records.iter().map(|record| self.load_or_empty(record.as_ref())).collect())
    }

    /// `data:` URI of each key; missing keys yield an empty string.
    pub fn batch_data_uri(&self, keys: &[CanonicalKey], mime: &str) -> RegistryResult<Vec<String>> {
        Ok(self
            .batch_get(keys)?
            .iter()
            .map(|data| encode_data_uri(mime, data))
            .collect())
    }

    /// Number of distinct keys ever written.
    pub fn count(&self) -> RegistryResult<u64> {
        Ok(self.read_state()?.keys.enumeration().count())
    }

    /// Keys in insertion order; see [`glyph_index::EnumerationIndex::page`].
    pub fn page(&self, offset: u64, limit: u64) -> RegistryResult<Vec<CanonicalKey>> {
        Ok(self.read_state()?.keys.enumeration().page(offset, limit))
    }

    /// 1-based insertion position of `key`.
    pub fn position(&self, key: &CanonicalKey) -> RegistryResult<Option<u64>> {
        Ok(self.read_state()?.keys.enumeration().position(key))
    }

    // ---- Internals ----

    fn load(&self, record: &Record) -> RegistryResult<Vec<u8>> {
        Ok(self.store.read(record.content)?)
    }

    fn load_or_empty(&self, record: Option<&Record>) -> Vec<u8> {
        let Some(record) = record else {
            return Vec::new();
        };
        self.load(record).unwrap_or_else(|err| {
            warn!(content = %record.content, error = %err, "batch read degraded to placeholder");
            Vec::new()
        })
    }

    fn check_batch_len(&self, len: usize) -> RegistryResult<()> {
        let limit = self.validator.config().max_batch_len;
        if len > limit {
            return Err(RegistryError::InvalidData {
                reason: format!("batch of {len} items exceeds the limit of {limit}"),
            });
        }
        Ok(())
    }

    /// Fail if committing `keys` in order would overflow any version counter.
    fn plan_versions(&self, keys: &[CanonicalKey]) -> RegistryResult<()> {
        let state = self.read_state()?;
        let mut planned: HashMap<CanonicalKey, u32> = HashMap::new();
        for key in keys {
            let current = match planned.get(key) {
                Some(version) => *version,
                None => state.keys.current_version(key).unwrap_or(0),
            };
            let next = current.checked_add(1).ok_or_else(|| {
                RegistryError::Internal(format!("version counter of {key} is exhausted"))
            })?;
            planned.insert(*key, next);
        }
        Ok(())
    }

    fn discard_staged(&self, staged: &[ContentRef]) {
        for content in staged {
            if let Err(err) = self.store.discard(*content) {
                warn!(%content, error = %err, "failed to discard staged blob");
            }
        }
        debug!(count = staged.len(), "staged blobs discarded");
    }

    fn lock_writer(&self) -> RegistryResult<MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| RegistryError::Internal("writer lock poisoned".into()))
    }

    fn read_state(&self) -> RegistryResult<RwLockReadGuard<'_, RegistryState>> {
        self.state
            .read()
            .map_err(|_| RegistryError::Internal("state lock poisoned".into()))
    }

    fn write_state(&self) -> RegistryResult<RwLockWriteGuard<'_, RegistryState>> {
        self.state
            .write()
            .map_err(|_| RegistryError::Internal("state lock poisoned".into()))
    }
}

/// Take the advisory lock that keeps two registries off one `data_dir`.
fn lock_data_dir(data_dir: &Path) -> RegistryResult<File> {
    let storage = |e: std::io::Error| RegistryError::StorageFailure(e.to_string());
    fs::create_dir_all(data_dir).map_err(storage)?;
    let path = data_dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&path)
        .map_err(storage)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
            warn!(path = %path.display(), "data directory already locked");
            Err(RegistryError::Config(format!(
                "{} is in use by another registry",
                data_dir.display()
            )))
        }
        Err(e) => Err(storage(e)),
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("owner", &self.owner())
            .field("snapshot_path", &self.snapshot_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::SetItem;
    use glyph_gate::PNG_SIGNATURE;

    const OWNER: Address = Address::from_raw([0x0a; 20]);
    const TOKEN: Address = Address::from_raw([0x7b; 20]);

    fn slug(s: &str) -> Slug {
        Slug::new(s).unwrap()
    }

    fn png(tail: &[u8]) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(tail);
        data
    }

    fn item(name: &str, data: Vec<u8>, format: FormatTag) -> SetItem {
        SetItem {
            slug: slug(name),
            data,
            width: 32,
            height: 32,
            format,
        }
    }

    fn registry() -> Registry {
        Registry::in_memory(OWNER)
    }

    fn set_png(registry: &Registry, name: &str, tail: &[u8]) -> Record {
        registry
            .set(&OWNER, &slug(name), &png(tail), 32, 32, FormatTag::Png)
            .unwrap()
    }

    // ---- Scenarios ----

    #[test]
    fn first_insert_is_version_one() {
        let registry = registry();
        set_png(&registry, "protocols/uniswap", b"X");
        let key = KeyHasher::derive_str("protocols/uniswap");
        assert_eq!(registry.current_version(&key).unwrap(), 1);
        assert_eq!(registry.count().unwrap(), 1);
    }

    #[test]
    fn update_keeps_prior_version_readable() {
        let registry = registry();
        set_png(&registry, "protocols/uniswap", b"X");
        let record = set_png(&registry, "protocols/uniswap", b"Y");
        let key = KeyHasher::derive_str("protocols/uniswap");

        assert_eq!(record.version, 2);
        assert_eq!(registry.current_version(&key).unwrap(), 2);
        assert_eq!(registry.get_version(&key, 1).unwrap(), png(b"X"));
        assert_eq!(registry.get_version(&key, 2).unwrap(), png(b"Y"));
        assert_eq!(registry.get(&key).unwrap(), png(b"Y"));
        assert_eq!(registry.count().unwrap(), 1);
        assert!(matches!(
            registry.get_version(&key, 3),
            Err(RegistryError::VersionNotFound { version: 3, .. })
        ));
    }

    #[test]
    fn batch_with_invalid_item_commits_nothing() {
        let registry = registry();
        set_png(&registry, "protocols/aave", b"A");
        let before = registry.count().unwrap();

        let batch: SetBatch = [
            item("protocols/one", png(b"1"), FormatTag::Png),
            item("protocols/two", b"not a png".to_vec(), FormatTag::Png),
            item("protocols/three", png(b"3"), FormatTag::Png),
        ]
        .into_iter()
        .collect();
        let err = registry.set_batch(&OWNER, batch).unwrap_err();

        assert!(matches!(
            err,
            RegistryError::InvalidFormat { format: FormatTag::Png, .. }
        ));
        assert_eq!(registry.count().unwrap(), before);
        assert!(registry.get_by_slug(&slug("protocols/one")).is_err());
    }

    #[test]
    fn bind_to_unknown_slug_fails() {
        let registry = registry();
        let err = registry
            .bind(&OWNER, TOKEN, DomainId(1), &slug("tokens/usdc"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "cannot bind to unknown key {}",
                KeyHasher::derive_str("tokens/usdc")
            )
        );
        assert!(matches!(err, RegistryError::UnknownKey { .. }));
        assert!(!registry.has_binding(&TOKEN, DomainId(1)).unwrap());
    }

    #[test]
    fn data_uri_of_one_byte_payload() {
        // Single-byte payloads cannot pass format validation, so write
        // straight through the store and link the record by hand.
        let store = Arc::new(InMemoryContentStore::new());
        let registry = Registry::new(OWNER, GateConfig::default(), store.clone());
        let key = KeyHasher::derive_str("icons/dot");
        let content = store.write(&[0x2a]).unwrap();
        registry
            .write_state()
            .unwrap()
            .keys
            .upsert(key, content, 1, 1)
            .unwrap();

        let uri = registry.data_uri(&key, "image/png").unwrap();
        let payload = uri.strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(payload.len(), 4);
        assert!(payload.ends_with("=="));
    }

    #[test]
    fn page_past_end_is_empty() {
        let registry = registry();
        for name in ["icons/a", "icons/b", "icons/c"] {
            set_png(&registry, name, b"p");
        }
        assert!(registry.page(5, 10).unwrap().is_empty());
        assert_eq!(registry.page(1, 10).unwrap().len(), 2);
        assert_eq!(
            registry.page(0, 1).unwrap(),
            vec![KeyHasher::derive_str("icons/a")]
        );
    }

    // ---- Authorization ----

    #[test]
    fn non_owner_cannot_mutate() {
        let registry = registry();
        let stranger = Address::from_raw([0xee; 20]);
        set_png(&registry, "tokens/usdc", b"u");

        let err = registry
            .set(&stranger, &slug("tokens/usdc"), &png(b"x"), 1, 1, FormatTag::Png)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { caller } if caller == stranger));
        assert!(registry
            .bind(&stranger, TOKEN, DomainId(1), &slug("tokens/usdc"))
            .is_err());
        assert!(registry
            .bind_domain(&stranger, DomainId(1), &slug("tokens/usdc"))
            .is_err());
        assert!(registry.set_batch(&stranger, SetBatch::new()).is_err());
        assert!(registry.bind_batch(&stranger, BindBatch::new()).is_err());

        let key = KeyHasher::derive_str("tokens/usdc");
        assert_eq!(registry.current_version(&key).unwrap(), 1);
    }

    #[test]
    fn empty_payload_is_invalid_data() {
        let registry = registry();
        assert!(matches!(
            registry.set(&OWNER, &slug("icons/empty"), b"", 1, 1, FormatTag::Svg),
            Err(RegistryError::InvalidData { .. })
        ));
        assert_eq!(registry.count().unwrap(), 0);
    }

    // ---- Batches ----

    #[test]
    fn batch_commits_in_order_with_repeated_slugs() {
        let registry = registry();
        let batch: SetBatch = [
            item("icons/a", png(b"1"), FormatTag::Png),
            item("icons/b", b"<svg/>".to_vec(), FormatTag::Svg),
            item("icons/a", png(b"2"), FormatTag::Png),
        ]
        .into_iter()
        .collect();
        let records = registry.set_batch(&OWNER, batch).unwrap();

        let versions: Vec<u32> = records.iter().map(|r| r.version).collect();
        assert_eq!(versions, vec![1, 1, 2]);
        assert_eq!(registry.count().unwrap(), 2);
        assert_eq!(registry.get_by_slug(&slug("icons/a")).unwrap(), png(b"2"));
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let registry = registry();
        let mut batch: SetBatch = [item("icons/a", png(b"1"), FormatTag::Png)]
            .into_iter()
            .collect();
        batch.widths.push(16);
        assert!(matches!(
            registry.set_batch(&OWNER, batch),
            Err(RegistryError::LengthMismatch { field: "widths", expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let registry = Registry::new(
            OWNER,
            GateConfig {
                max_batch_len: 2,
                ..GateConfig::default()
            },
            Arc::new(InMemoryContentStore::new()),
        );
        let batch: SetBatch = ["icons/a", "icons/b", "icons/c"]
            .into_iter()
            .map(|name| item(name, png(b"p"), FormatTag::Png))
            .collect();
        assert!(matches!(
            registry.set_batch(&OWNER, batch),
            Err(RegistryError::InvalidData { .. })
        ));
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let registry = registry();
        assert!(registry.set_batch(&OWNER, SetBatch::new()).unwrap().is_empty());
        assert_eq!(registry.bind_batch(&OWNER, BindBatch::new()).unwrap(), 0);
    }

    #[test]
    fn failed_store_write_discards_staged_blobs() {
        let store = Arc::new(InMemoryContentStore::with_max_blob_size(16));
        let registry = Registry::new(OWNER, GateConfig::default(), store.clone());
        let batch: SetBatch = [
            item("icons/small", png(b"ok"), FormatTag::Png),
            item("icons/large", png(&[0u8; 32]), FormatTag::Png),
        ]
        .into_iter()
        .collect();

        assert!(matches!(
            registry.set_batch(&OWNER, batch),
            Err(RegistryError::StorageFailure(_))
        ));
        assert!(store.is_empty());
        assert_eq!(registry.count().unwrap(), 0);
    }

    // ---- Bindings ----

    #[test]
    fn entity_and_domain_bindings() {
        let registry = registry();
        set_png(&registry, "tokens/usdc", b"usdc");
        set_png(&registry, "chains/ethereum", b"eth");

        registry
            .bind(&OWNER, TOKEN, DomainId(1), &slug("tokens/usdc"))
            .unwrap();
        registry
            .bind_domain(&OWNER, DomainId(1), &slug("chains/ethereum"))
            .unwrap();

        assert!(registry.has_binding(&TOKEN, DomainId(1)).unwrap());
        assert_eq!(registry.get_by_entity(&TOKEN, DomainId(1)).unwrap(), png(b"usdc"));
        assert_eq!(registry.get_by_domain(DomainId(1)).unwrap(), png(b"eth"));
        assert!(matches!(
            registry.get_by_entity(&TOKEN, DomainId(10)),
            Err(RegistryError::BindingNotFound { entity: Some(_), .. })
        ));
        assert!(matches!(
            registry.get_by_domain(DomainId(10)),
            Err(RegistryError::BindingNotFound { entity: None, .. })
        ));

        // A binding follows the key, so updates show through it.
        set_png(&registry, "tokens/usdc", b"usdc-v2");
        assert_eq!(
            registry.get_by_entity(&TOKEN, DomainId(1)).unwrap(),
            png(b"usdc-v2")
        );
    }

    #[test]
    fn bind_batch_is_all_or_nothing() {
        let registry = registry();
        set_png(&registry, "tokens/usdc", b"usdc");
        let other = Address::from_raw([0x11; 20]);

        let mut batch = BindBatch::new();
        batch.push(TOKEN, DomainId(1), slug("tokens/usdc"));
        batch.push(other, DomainId(1), slug("tokens/missing"));
        assert!(matches!(
            registry.bind_batch(&OWNER, batch),
            Err(RegistryError::UnknownKey { .. })
        ));
        assert!(!registry.has_binding(&TOKEN, DomainId(1)).unwrap());

        let mut batch = BindBatch::new();
        batch.push(TOKEN, DomainId(1), slug("tokens/usdc"));
        batch.push(other, DomainId(137), slug("tokens/usdc"));
        assert_eq!(registry.bind_batch(&OWNER, batch).unwrap(), 2);
        assert!(registry.has_binding(&other, DomainId(137)).unwrap());
    }

    // ---- Batch reads ----

    #[test]
    fn batch_reads_use_placeholders() {
        let registry = registry();
        set_png(&registry, "tokens/usdc", b"usdc");
        registry
            .bind(&OWNER, TOKEN, DomainId(1), &slug("tokens/usdc"))
            .unwrap();
        let present = KeyHasher::derive_str("tokens/usdc");
        let absent = KeyHasher::derive_str("tokens/none");

        let blobs = registry.batch_get(&[present, absent]).unwrap();
        assert_eq!(blobs, vec![png(b"usdc"), Vec::new()]);

        let blobs = registry
            .batch_get_by_entity(&[(TOKEN, DomainId(10)), (TOKEN, DomainId(1))])
            .unwrap();
        assert_eq!(blobs, vec![Vec::new(), png(b"usdc")]);

        let uris = registry.batch_data_uri(&[absent, present], "image/png").unwrap();
        assert_eq!(uris[0], "");
        assert!(uris[1].starts_with("data:image/png;base64,"));
    }

    #[test]
    fn single_reads_raise_on_missing() {
        let registry = registry();
        let absent = KeyHasher::derive_str("tokens/none");
        assert!(matches!(registry.get(&absent), Err(RegistryError::NotFound { .. })));
        assert!(matches!(
            registry.data_uri(&absent, "image/png"),
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            registry.current_version(&absent),
            Err(RegistryError::NotFound { .. })
        ));
    }

    // ---- Concurrency ----

    #[test]
    fn readers_never_see_partial_batches() {
        let registry = registry();
        let rounds = 20;
        let per_batch = 4u64;

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..rounds {
                    let batch: SetBatch = (0..per_batch)
                        .map(|i| item(&format!("icons/{round}-{i}"), png(b"c"), FormatTag::Png))
                        .collect();
                    registry.set_batch(&OWNER, batch).unwrap();
                }
            });
            for _ in 0..3 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        assert_eq!(registry.count().unwrap() % per_batch, 0);
                    }
                });
            }
        });
        assert_eq!(registry.count().unwrap(), rounds * per_batch);
    }

    // ---- Persistence ----

    fn config_in(dir: &std::path::Path) -> RegistryConfig {
        RegistryConfig {
            data_dir: dir.to_path_buf(),
            owner: OWNER,
            ..RegistryConfig::default()
        }
    }

    #[test]
    fn reopen_restores_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        {
            let registry = Registry::open(&config).unwrap();
            set_png(&registry, "tokens/usdc", b"v1");
            set_png(&registry, "tokens/usdc", b"v2");
            registry
                .bind(&OWNER, TOKEN, DomainId(1), &slug("tokens/usdc"))
                .unwrap();
            assert!(registry.save_snapshot().unwrap());
        }

        let registry = Registry::open(&config).unwrap();
        let key = KeyHasher::derive_str("tokens/usdc");
        assert_eq!(registry.current_version(&key).unwrap(), 2);
        assert_eq!(registry.get_version(&key, 1).unwrap(), png(b"v1"));
        assert_eq!(registry.get_by_entity(&TOKEN, DomainId(1)).unwrap(), png(b"v2"));

        // New writes after reopening get fresh blobs.
        let record = set_png(&registry, "tokens/dai", b"dai");
        assert_eq!(registry.get_by_slug(&slug("tokens/dai")).unwrap(), png(b"dai"));
        assert_ne!(record.content, registry.record(&key).unwrap().content);
    }

    #[test]
    fn snapshot_owner_must_match_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        Registry::open(&config).unwrap().save_snapshot().unwrap();

        let other = RegistryConfig {
            owner: Address::from_raw([0xff; 20]),
            ..config
        };
        assert!(matches!(Registry::open(&other), Err(RegistryError::Config(_))));
    }

    #[test]
    fn data_dir_admits_one_registry_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let first = Registry::open(&config).unwrap();
        set_png(&first, "tokens/usdc", b"v1");

        assert!(matches!(Registry::open(&config), Err(RegistryError::Config(_))));

        first.save_snapshot().unwrap();
        drop(first);
        let second = Registry::open(&config).unwrap();
        let key = KeyHasher::derive_str("tokens/usdc");
        assert_eq!(second.get_version(&key, 1).unwrap(), png(b"v1"));
    }

    #[test]
    fn detect_format_reads_stored_signature() {
        let registry = registry();
        registry
            .set(&OWNER, &slug("icons/logo"), b"<svg/>", 24, 24, FormatTag::Svg)
            .unwrap();
        set_png(&registry, "icons/photo", b"p");

        let logo = KeyHasher::derive_str("icons/logo");
        assert_eq!(registry.detect_format(&logo).unwrap(), Some(FormatTag::Svg));
        let photo = KeyHasher::derive_str("icons/photo");
        assert_eq!(registry.detect_format(&photo).unwrap(), Some(FormatTag::Png));
        assert!(registry
            .detect_format(&KeyHasher::derive_str("icons/none"))
            .is_err());
    }

    #[test]
    fn in_memory_registry_skips_snapshot() {
        assert!(!registry().save_snapshot().unwrap());
    }
}
