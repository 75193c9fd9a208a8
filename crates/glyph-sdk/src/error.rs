use glyph_gate::GateError;
use glyph_index::IndexError;
use glyph_registry::KeyRegistryError;
use glyph_store::StoreError;
use glyph_types::{Address, CanonicalKey, ContentRef, DomainId, FormatTag};
use thiserror::Error;

/// Every failure the registry reports to callers.
///
/// Lower crates keep their own error enums; they are folded into this
/// taxonomy at the SDK boundary so callers match on one type.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no record for key {key}")]
    NotFound { key: CanonicalKey },

    #[error("version {version} was never assigned to key {key}")]
    VersionNotFound { key: CanonicalKey, version: u32 },

    #[error("no binding for {}", binding_target(.entity, .domain))]
    BindingNotFound {
        entity: Option<Address>,
        domain: DomainId,
    },

    #[error("cannot bind to unknown key {key}")]
    UnknownKey { key: CanonicalKey },

    #[error("batch field `{field}` has {actual} items, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid {format} content: {reason}")]
    InvalidFormat { format: FormatTag, reason: String },

    #[error("invalid data: {reason}")]
    InvalidData { reason: String },

    #[error("dangling content reference {0}")]
    DanglingReference(ContentRef),

    #[error("unauthorized caller {caller}")]
    Unauthorized { caller: Address },

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

fn binding_target(entity: &Option<Address>, domain: &DomainId) -> String {
    match entity {
        Some(entity) => format!("entity {entity} on domain {domain}"),
        None => format!("domain {domain}"),
    }
}

impl From<KeyRegistryError> for RegistryError {
    fn from(err: KeyRegistryError) -> Self {
        match err {
            KeyRegistryError::NotFound { key } => Self::NotFound { key },
            KeyRegistryError::VersionNotFound { key, version } => {
                Self::VersionNotFound { key, version }
            }
            KeyRegistryError::NullContent { .. } => Self::DanglingReference(ContentRef::null()),
            other @ (KeyRegistryError::VersionOverflow { .. }
            | KeyRegistryError::IntegrityViolation { .. }) => Self::Internal(other.to_string()),
        }
    }
}

impl From<IndexError> for RegistryError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::UnknownKey { key, .. } => Self::UnknownKey { key },
            other @ IndexError::DuplicateKey(_) => Self::Snapshot(other.to_string()),
        }
    }
}

impl From<GateError> for RegistryError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthorized { caller } => Self::Unauthorized { caller },
            GateError::InvalidFormat { format, reason } => Self::InvalidFormat { format, reason },
            GateError::InvalidData { reason } => Self::InvalidData { reason },
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Dangling(content) => Self::DanglingReference(content),
            other => Self::StorageFailure(other.to_string()),
        }
    }
}
