//! High-level SDK for the Glyph Registry.
//!
//! [`Registry`] ties the lower crates together: the gate checks callers and
//! payloads, the content store holds blobs, the key registry versions
//! records, and the binding index resolves entities and domains. This is
//! the entry point for applications embedding the registry.
//!
//! # Quick Start
//!
//! ```rust
//! use glyph_sdk::{Registry, Slug, FormatTag, Address};
//!
//! let owner = Address::from_raw([1u8; 20]);
//! let registry = Registry::in_memory(owner);
//! let slug = Slug::new("protocols/uniswap").unwrap();
//!
//! let record = registry
//!     .set(&owner, &slug, b"<svg viewBox=\"0 0 24 24\"/>", 24, 24, FormatTag::Svg)
//!     .unwrap();
//! assert_eq!(record.version, 1);
//! assert!(registry
//!     .data_uri(&glyph_sdk::KeyHasher::derive(&slug), FormatTag::Svg.mime())
//!     .unwrap()
//!     .starts_with("data:image/svg+xml;base64,"));
//! ```

pub mod batch;
pub mod config;
pub mod encoder;
pub mod error;
pub mod registry;
pub mod snapshot;

pub use batch::{BindBatch, SetBatch, SetItem};
pub use config::RegistryConfig;
pub use encoder::encode_data_uri;
pub use error::{RegistryError, RegistryResult};
pub use registry::Registry;
pub use snapshot::RegistryState;

// Re-export key types
pub use glyph_crypto::KeyHasher;
pub use glyph_gate::GateConfig;
pub use glyph_types::{Address, CanonicalKey, ContentRef, DomainId, FormatTag, Record, Slug};
