//! Canonical key → record registry with append-only version history.
//!
//! The [`KeyRegistry`] is the registry's system of record. It links content
//! references (already written to a content store by the caller) to
//! canonical keys, assigns versions, and keeps every version ever committed.
//!
//! # Invariants
//!
//! 1. Versions for a key run 1, 2, 3, … with no gaps, decreases, or resets.
//! 2. A `(key, version)` entry is written once and never changed.
//! 3. The current record of a key always equals its highest history entry.
//! 4. The first record of a key appends that key to the enumeration index;
//!    later versions do not.

pub mod error;
pub mod registry;

pub use error::{KeyRegistryError, KeyRegistryResult};
pub use registry::{KeyRegistry, Upsert};
