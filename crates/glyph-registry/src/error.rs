use glyph_types::CanonicalKey;

/// Errors produced by key registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyRegistryError {
    #[error("no record for key {key}")]
    NotFound { key: CanonicalKey },

    #[error("version {version} was never assigned to key {key}")]
    VersionNotFound { key: CanonicalKey, version: u32 },

    #[error("refusing to link key {key} to a null content reference")]
    NullContent { key: CanonicalKey },

    #[error("version counter exhausted for key {key}")]
    VersionOverflow { key: CanonicalKey },

    #[error("integrity violation for key {key}: {reason}")]
    IntegrityViolation { key: CanonicalKey, reason: String },
}

pub type KeyRegistryResult<T> = Result<T, KeyRegistryError>;
