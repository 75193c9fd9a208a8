//! Immutable blob storage for the Glyph Registry.
//!
//! A content store accepts bytes, returns an opaque [`ContentRef`], and
//! dereferences that handle to exactly the bytes written, forever. The
//! registry never interprets blob contents; the store never interprets
//! references beyond looking them up.
//!
//! # Storage Backends
//!
//! All backends implement the [`ContentStore`] trait:
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsContentStore`] -- one file per blob, written via temp file + rename
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written. No API rewrites a blob in place.
//! 2. Write-then-link: the caller links a reference to metadata only after
//!    `write` returned it.
//! 3. A failed write leaves nothing visible.
//! 4. Every write allocates a fresh reference; identical bytes are not
//!    deduplicated.
//! 5. Concurrent reads are always safe.
//!
//! [`ContentRef`]: glyph_types::ContentRef

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsContentStore;
pub use memory::InMemoryContentStore;
pub use traits::ContentStore;
