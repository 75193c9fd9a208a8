//! Error types for the index crate.

use glyph_types::{CanonicalKey, DomainId};

/// Errors that can occur during index operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// A binding targets a key with no current record.
    #[error("unknown key {key}: no record to bind (domain {domain})")]
    UnknownKey { key: CanonicalKey, domain: DomainId },

    /// A persisted enumeration list contained the same key twice.
    #[error("duplicate key in enumeration list: {0}")]
    DuplicateKey(CanonicalKey),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
