//! Lookup indices for the Glyph Registry.
//!
//! These are plain, single-threaded data structures. The registry facade
//! owns them behind its writer lock, so none of them synchronizes on its
//! own.
//!
//! # Key Types
//!
//! - [`EnumerationIndex`] -- insertion-ordered set of canonical keys with
//!   O(1) membership and stable pagination
//! - [`BindingIndex`] -- overwritable `(entity, domain) → key` and
//!   `domain → key` pointers into the registry
//! - [`KeyPresence`] -- the seam bindings use to check that a target key
//!   has a current record

pub mod binding;
pub mod enumeration;
pub mod error;

pub use binding::{BindingIndex, BindingRequest, KeyPresence};
pub use enumeration::EnumerationIndex;
pub use error::{IndexError, IndexResult};
