//! Foundation types for the Glyph Registry.
//!
//! This crate provides the identity and structural types shared by every
//! other Glyph crate. It has no cryptographic dependencies: canonical keys
//! are *derived* in `glyph-crypto`, but represented here.
//!
//! # Key Types
//!
//! - [`Slug`] -- Human-readable `{category}/{name}` identifier
//! - [`CanonicalKey`] -- 256-bit digest of a slug; the true storage key
//! - [`Address`] -- 20-byte principal / external entity address
//! - [`DomainId`] -- Numeric domain (e.g. chain id) for secondary lookups
//! - [`ContentRef`] -- Opaque handle to an immutable stored blob
//! - [`Record`] -- Current metadata for a canonical key
//! - [`FormatTag`] -- Caller-declared content format

pub mod address;
pub mod content;
pub mod error;
pub mod format;
pub mod key;

pub use address::{Address, DomainId};
pub use content::{ContentRef, Record};
pub use error::TypeError;
pub use format::FormatTag;
pub use key::{CanonicalKey, Slug};
