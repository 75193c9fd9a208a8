use glyph_types::ContentRef;

use crate::error::StoreResult;

/// Immutable blob store.
///
/// All implementations must satisfy these invariants:
/// - `read(write(b)) == b` for every byte string `b`, including empty ones.
/// - A failed `write` leaves no blob visible and issues no reference.
/// - The null reference is never issued and `read` rejects it as dangling.
/// - Concurrent reads are always safe (blobs are immutable).
pub trait ContentStore: Send + Sync {
    /// Store `data` and return a fresh reference to it.
    fn write(&self, data: &[u8]) -> StoreResult<ContentRef>;

    /// Dereference a blob.
    ///
    /// Returns `StoreError::Dangling` for the null reference and for
    /// references this store never issued.
    fn read(&self, content: ContentRef) -> StoreResult<Vec<u8>>;

    /// Check whether a reference resolves to a blob.
    fn contains(&self, content: ContentRef) -> StoreResult<bool>;

    /// Remove a blob that was written but never linked to a record.
    ///
    /// This exists only so an aborted batch can roll back its staged blobs.
    /// Discarding a linked blob breaks the registry. Returns `true` if the
    /// blob existed.
    fn discard(&self, content: ContentRef) -> StoreResult<bool>;

    /// Dereference several blobs.
    ///
    /// Default implementation calls `read()` for each reference and keeps
    /// per-item results, so one dangling reference does not fail the rest.
    fn read_batch(&self, refs: &[ContentRef]) -> Vec<StoreResult<Vec<u8>>> {
        refs.iter().map(|content| self.read(*content)).collect()
    }
}
