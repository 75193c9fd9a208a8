use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to an immutable blob in a content store.
///
/// The zero value is the "absent" reference carried by a default record;
/// stores never issue it and refuse to dereference it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ContentRef(u64);

impl ContentRef {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The absent reference.
    pub const fn null() -> Self {
        Self(0)
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref:{:016x}", self.0)
    }
}

/// Metadata committed for one version of a canonical key.
///
/// Records are values: the registry copies them into the version history
/// and never mutates one after it is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Where the content bytes live.
    pub content: ContentRef,
    pub width: u32,
    pub height: u32,
    /// 1-based, strictly increasing per key.
    pub version: u32,
}

impl Record {
    /// Returns `true` for the default (never-written) record.
    pub fn is_empty(&self) -> bool {
        self.version == 0 && self.content.is_null()
    }
}
