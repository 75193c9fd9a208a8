use glyph_types::ContentRef;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The reference is null or was never issued by this store.
    #[error("dangling content reference: {0}")]
    Dangling(ContentRef),

    /// The blob exceeds the store's size ceiling.
    #[error("blob of {size} bytes exceeds store limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    /// Stored bytes no longer match their recorded digest.
    #[error("corrupt blob {content}: {reason}")]
    Corrupt { content: ContentRef, reason: String },

    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding store state was poisoned by a panicking thread.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
